// libs/appointment-cell/src/models.rs
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use chrono::{DateTime, Utc};
use std::fmt;
use std::str::FromStr;

// ==============================================================================
// CORE LIFECYCLE MODELS
// ==============================================================================

/// A booking request referencing participants and optionally a slot.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Appointment {
    pub id: Uuid,
    pub status: AppointmentStatus,
    pub slot_id: Option<Uuid>,
    pub participants: Vec<Participant>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum AppointmentStatus {
    Pending,
    Proposed,
    Waitlist,
    Booked,
    Arrived,
    Fulfilled,
    Cancelled,
    Noshow,
    EnteredInError,
}

impl AppointmentStatus {
    /// Terminal statuses permit no further transition.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            AppointmentStatus::Fulfilled
                | AppointmentStatus::Cancelled
                | AppointmentStatus::Noshow
                | AppointmentStatus::EnteredInError
        )
    }
}

impl fmt::Display for AppointmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppointmentStatus::Pending => write!(f, "pending"),
            AppointmentStatus::Proposed => write!(f, "proposed"),
            AppointmentStatus::Waitlist => write!(f, "waitlist"),
            AppointmentStatus::Booked => write!(f, "booked"),
            AppointmentStatus::Arrived => write!(f, "arrived"),
            AppointmentStatus::Fulfilled => write!(f, "fulfilled"),
            AppointmentStatus::Cancelled => write!(f, "cancelled"),
            AppointmentStatus::Noshow => write!(f, "noshow"),
            AppointmentStatus::EnteredInError => write!(f, "entered-in-error"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Participant {
    pub actor_id: Uuid,
    pub role: ParticipantRole,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ParticipantRole {
    Patient,
    Practitioner,
}

/// The clinical-visit record tied 1:1 to an appointment. Exists only once
/// the owning appointment has reached `arrived`; "no encounter yet" is the
/// absence of the record, not a status.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Encounter {
    pub id: Uuid,
    pub appointment_id: Uuid,
    pub status: EncounterStatus,
    pub period_start: Option<DateTime<Utc>>,
    pub period_end: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum EncounterStatus {
    Planned,
    InProgress,
    OnHold,
    Finished,
}

impl fmt::Display for EncounterStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EncounterStatus::Planned => write!(f, "planned"),
            EncounterStatus::InProgress => write!(f, "in-progress"),
            EncounterStatus::OnHold => write!(f, "on-hold"),
            EncounterStatus::Finished => write!(f, "finished"),
        }
    }
}

// ==============================================================================
// ACTIONS
// ==============================================================================

/// Everything a caller may do to an appointment/encounter pair. The resolver
/// computes the permitted subset from current statuses; executors re-check it
/// before mutating.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum AppointmentAction {
    Confirm,
    Cancel,
    MarkArrived,
    StartEncounter,
    SignalNearCompletion,
    CompleteEncounter,
}

impl fmt::Display for AppointmentAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppointmentAction::Confirm => write!(f, "confirm"),
            AppointmentAction::Cancel => write!(f, "cancel"),
            AppointmentAction::MarkArrived => write!(f, "mark-arrived"),
            AppointmentAction::StartEncounter => write!(f, "start-encounter"),
            AppointmentAction::SignalNearCompletion => write!(f, "signal-near-completion"),
            AppointmentAction::CompleteEncounter => write!(f, "complete-encounter"),
        }
    }
}

impl FromStr for AppointmentAction {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "confirm" => Ok(AppointmentAction::Confirm),
            "cancel" => Ok(AppointmentAction::Cancel),
            "mark-arrived" => Ok(AppointmentAction::MarkArrived),
            "start-encounter" => Ok(AppointmentAction::StartEncounter),
            "signal-near-completion" => Ok(AppointmentAction::SignalNearCompletion),
            "complete-encounter" => Ok(AppointmentAction::CompleteEncounter),
            other => Err(format!("unknown action '{}'", other)),
        }
    }
}

// ==============================================================================
// REQUEST/RESPONSE MODELS
// ==============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookAppointmentRequest {
    pub slot_id: Uuid,
    pub participants: Vec<Participant>,
}

/// Result of executing an action: whichever records the action touched.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActionOutcome {
    pub appointment: Option<Appointment>,
    pub encounter: Option<Encounter>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompletionOutcome {
    pub appointment: Appointment,
    pub encounter: Encounter,
}

// ==============================================================================
// ERROR TYPES
// ==============================================================================

#[derive(Debug, Clone, thiserror::Error)]
pub enum LifecycleError {
    #[error("Appointment not found")]
    AppointmentNotFound,

    #[error("Encounter not found")]
    EncounterNotFound,

    #[error("Slot not found")]
    SlotNotFound,

    #[error("Slot is not free")]
    SlotUnavailable,

    #[error("action '{action}' is not permitted in state '{current}'")]
    State {
        current: String,
        action: AppointmentAction,
    },

    #[error("visit completion partially applied (encounter finished: {encounter_finished}, appointment fulfilled: {appointment_fulfilled}): {detail}")]
    PartialCompletion {
        encounter_finished: bool,
        appointment_fulfilled: bool,
        detail: String,
    },

    #[error("Store error: {0}")]
    Store(String),
}
