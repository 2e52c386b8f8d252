pub mod actions;
pub mod lifecycle;
pub mod encounter;
pub mod completion;
pub mod booking;

pub use actions::available_actions;
pub use lifecycle::{AppointmentLifecycle, AppointmentService};
pub use encounter::EncounterService;
pub use completion::CompletionCoordinator;
pub use booking::BookingService;
