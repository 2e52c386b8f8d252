pub mod generator;
pub mod committer;
pub mod schedule;

pub use generator::generate_slots;
pub use committer::SlotCommitService;
pub use schedule::ScheduleService;
