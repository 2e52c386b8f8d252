// libs/appointment-cell/src/handlers.rs
use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use axum_extra::TypedHeader;
use headers::{Authorization, authorization::Bearer};
use serde_json::{json, Value};
use uuid::Uuid;

use shared_config::AppConfig;
use shared_models::error::AppError;

use crate::models::{
    ActionOutcome, AppointmentAction, BookAppointmentRequest, LifecycleError,
};
use crate::services::actions::available_actions;
use crate::services::booking::BookingService;
use crate::services::completion::CompletionCoordinator;
use crate::services::encounter::EncounterService;
use crate::services::lifecycle::AppointmentService;

fn map_lifecycle_error(e: LifecycleError) -> AppError {
    match e {
        LifecycleError::AppointmentNotFound => {
            AppError::NotFound("Appointment not found".to_string())
        }
        LifecycleError::EncounterNotFound => AppError::NotFound("Encounter not found".to_string()),
        LifecycleError::SlotNotFound => AppError::NotFound("Slot not found".to_string()),
        LifecycleError::SlotUnavailable => {
            AppError::Conflict("Slot is no longer available".to_string())
        }
        LifecycleError::State { .. } => AppError::Conflict(e.to_string()),
        LifecycleError::PartialCompletion { .. } => AppError::Internal(e.to_string()),
        LifecycleError::Store(msg) => AppError::Internal(msg),
    }
}

// ==============================================================================
// APPOINTMENT HANDLERS
// ==============================================================================

#[axum::debug_handler]
pub async fn book_appointment(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Json(request): Json<BookAppointmentRequest>,
) -> Result<Json<Value>, AppError> {
    let service = BookingService::new(&state);

    let appointment = service
        .book_appointment(request, auth.token())
        .await
        .map_err(map_lifecycle_error)?;

    Ok(Json(json!({
        "success": true,
        "appointment": appointment,
        "message": "Appointment booked successfully"
    })))
}

#[axum::debug_handler]
pub async fn get_appointment(
    State(state): State<Arc<AppConfig>>,
    Path(appointment_id): Path<Uuid>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
) -> Result<Json<Value>, AppError> {
    let service = AppointmentService::new(&state);

    let appointment = service
        .get_appointment(appointment_id, auth.token())
        .await
        .map_err(map_lifecycle_error)?;

    Ok(Json(json!(appointment)))
}

/// What the caller may do next, given the pair's current statuses. The UI
/// drives its controls from this; executors re-check it server-side.
#[axum::debug_handler]
pub async fn get_available_actions(
    State(state): State<Arc<AppConfig>>,
    Path(appointment_id): Path<Uuid>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
) -> Result<Json<Value>, AppError> {
    let service = AppointmentService::new(&state);

    let appointment = service
        .get_appointment(appointment_id, auth.token())
        .await
        .map_err(map_lifecycle_error)?;
    let encounter = service
        .get_encounter(appointment_id, auth.token())
        .await
        .map_err(map_lifecycle_error)?;

    let actions = available_actions(appointment.status, encounter.as_ref().map(|e| e.status));

    Ok(Json(json!({
        "appointment_id": appointment_id,
        "appointment_status": appointment.status,
        "encounter_status": encounter.as_ref().map(|e| e.status),
        "actions": actions
    })))
}

#[axum::debug_handler]
pub async fn execute_action(
    State(state): State<Arc<AppConfig>>,
    Path((appointment_id, action)): Path<(Uuid, String)>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
) -> Result<Response, AppError> {
    let action: AppointmentAction = action
        .parse()
        .map_err(|e: String| AppError::BadRequest(e))?;
    let token = auth.token();

    let result = match action {
        AppointmentAction::Confirm
        | AppointmentAction::Cancel
        | AppointmentAction::MarkArrived => {
            let service = AppointmentService::new(&state);
            service
                .transition(appointment_id, action, token)
                .await
                .map(|appointment| ActionOutcome {
                    appointment: Some(appointment),
                    encounter: None,
                })
        }
        AppointmentAction::StartEncounter => {
            let service = EncounterService::new(&state);
            service
                .start_encounter(appointment_id, token)
                .await
                .map(|encounter| ActionOutcome {
                    appointment: None,
                    encounter: Some(encounter),
                })
        }
        AppointmentAction::SignalNearCompletion => {
            let service = EncounterService::new(&state);
            service
                .signal_near_completion(appointment_id, token)
                .await
                .map(|encounter| ActionOutcome {
                    appointment: None,
                    encounter: Some(encounter),
                })
        }
        AppointmentAction::CompleteEncounter => {
            let coordinator = CompletionCoordinator::new(&state);
            coordinator
                .complete(appointment_id, token)
                .await
                .map(|outcome| ActionOutcome {
                    appointment: Some(outcome.appointment),
                    encounter: Some(outcome.encounter),
                })
        }
    };

    match result {
        Ok(outcome) => Ok(Json(json!({
            "success": true,
            "appointment": outcome.appointment,
            "encounter": outcome.encounter
        }))
        .into_response()),
        // The inconsistent half-applied state is reported explicitly so the
        // caller can reconcile; it must never look like a clean failure
        Err(LifecycleError::PartialCompletion {
            encounter_finished,
            appointment_fulfilled,
            detail,
        }) => Ok((
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({
                "success": false,
                "error": "visit completion partially applied",
                "encounter_finished": encounter_finished,
                "appointment_fulfilled": appointment_fulfilled,
                "detail": detail
            })),
        )
            .into_response()),
        Err(e) => Err(map_lifecycle_error(e)),
    }
}
