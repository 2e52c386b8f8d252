// libs/appointment-cell/src/services/actions.rs
use crate::models::{AppointmentAction, AppointmentStatus, EncounterStatus};

/// Resolve the set of permitted actions for an appointment/encounter pair.
///
/// Pure. The UI calls this to decide what to offer; every executor calls it
/// again on freshly fetched state before mutating, because the caller's
/// snapshot may be stale.
pub fn available_actions(
    appointment: AppointmentStatus,
    encounter: Option<EncounterStatus>,
) -> Vec<AppointmentAction> {
    match appointment {
        AppointmentStatus::Pending => {
            vec![AppointmentAction::Confirm, AppointmentAction::Cancel]
        }
        AppointmentStatus::Booked => {
            vec![AppointmentAction::Cancel, AppointmentAction::MarkArrived]
        }
        AppointmentStatus::Arrived => match encounter {
            // No encounter yet, or one still planned: the next step is the
            // same action either way (create, then begin)
            None | Some(EncounterStatus::Planned) => vec![AppointmentAction::StartEncounter],
            Some(EncounterStatus::InProgress) => vec![
                AppointmentAction::SignalNearCompletion,
                AppointmentAction::CompleteEncounter,
            ],
            Some(EncounterStatus::OnHold) => vec![AppointmentAction::CompleteEncounter],
            // A finished encounter under a still-arrived appointment is
            // partial-completion residue; reconciliation happens out of band
            Some(EncounterStatus::Finished) => vec![],
        },
        // Not operable by this core: no transition row admits them
        AppointmentStatus::Proposed | AppointmentStatus::Waitlist => vec![],
        // Terminal
        AppointmentStatus::Fulfilled
        | AppointmentStatus::Cancelled
        | AppointmentStatus::Noshow
        | AppointmentStatus::EnteredInError => vec![],
    }
}

/// Human-readable label for the combined state, used in StateError messages.
pub fn state_label(
    appointment: AppointmentStatus,
    encounter: Option<EncounterStatus>,
) -> String {
    match encounter {
        Some(enc) => format!("{} / encounter {}", appointment, enc),
        None => appointment.to_string(),
    }
}
