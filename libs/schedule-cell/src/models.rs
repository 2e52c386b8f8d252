// libs/schedule-cell/src/models.rs
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use chrono::{DateTime, Utc, NaiveDate, NaiveTime};
use std::fmt;

// ==============================================================================
// CORE SCHEDULING MODELS
// ==============================================================================

/// An actor's bookable-availability envelope over a date horizon.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Schedule {
    pub id: Uuid,
    pub actor_id: Uuid,
    pub horizon_start: NaiveDate,
    pub horizon_end: NaiveDate,
    /// 0 = Sunday .. 6 = Saturday
    pub allowed_weekdays: Vec<u8>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum SlotStatus {
    Free,
    Busy,
    BusyTentative,
}

impl fmt::Display for SlotStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SlotStatus::Free => write!(f, "free"),
            SlotStatus::Busy => write!(f, "busy"),
            SlotStatus::BusyTentative => write!(f, "busy-tentative"),
        }
    }
}

/// One committed bookable interval belonging to a Schedule.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Slot {
    pub id: Uuid,
    pub schedule_id: Uuid,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub status: SlotStatus,
}

/// A generated interval that has not been committed to the store yet.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CandidateSlot {
    pub schedule_id: Uuid,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub status: SlotStatus,
}

// ==============================================================================
// REQUEST/RESPONSE MODELS
// ==============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateScheduleRequest {
    pub actor_id: Uuid,
    pub horizon_start: NaiveDate,
    pub horizon_end: NaiveDate,
    pub allowed_weekdays: Vec<u8>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtendHorizonRequest {
    pub new_horizon_end: NaiveDate,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct BreakWindow {
    pub start: NaiveTime,
    pub end: NaiveTime,
}

/// Recurring availability pattern to expand into discrete slots.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SlotGenerationRequest {
    pub range_start: NaiveDate,
    pub range_end: NaiveDate,
    pub daily_start: NaiveTime,
    pub daily_end: NaiveTime,
    pub slot_duration_minutes: i64,
    /// 0 = Sunday .. 6 = Saturday
    pub allowed_weekdays: Vec<u8>,
    pub break_window: Option<BreakWindow>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SlotGenerationOutcome {
    pub candidates: Vec<CandidateSlot>,
    pub skipped_past_count: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommitSlotsRequest {
    pub candidates: Vec<CandidateSlot>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct CommitProgress {
    pub processed: usize,
    pub total: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RejectedSlot {
    pub candidate: CandidateSlot,
    pub reason: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SlotCommitOutcome {
    pub created: Vec<Slot>,
    pub rejected: Vec<RejectedSlot>,
}

/// Per-item verdict returned by the store's batch commit endpoint. The store
/// validates each candidate against every already-committed slot of the same
/// schedule, including ones created by earlier chunks of the same run.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum SlotCommitItem {
    Created { slot: Slot },
    Rejected { candidate: CandidateSlot, reason: String },
}

// ==============================================================================
// ERROR TYPES
// ==============================================================================

#[derive(Debug, Clone, thiserror::Error)]
pub enum ScheduleError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("all {} candidate slots rejected by overlap validation", .rejected.len())]
    AllRejected { rejected: Vec<RejectedSlot> },

    #[error("batch commit aborted after {processed}/{total} slots: {message}")]
    Transport {
        message: String,
        created: Vec<Slot>,
        rejected: Vec<RejectedSlot>,
        processed: usize,
        total: usize,
    },

    #[error("Schedule not found")]
    ScheduleNotFound,

    #[error("Store error: {0}")]
    Store(String),
}
