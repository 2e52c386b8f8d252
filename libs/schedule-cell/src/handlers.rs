// libs/schedule-cell/src/handlers.rs
use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use axum_extra::TypedHeader;
use headers::{Authorization, authorization::Bearer};
use chrono::Utc;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::info;
use uuid::Uuid;

use shared_config::AppConfig;
use shared_models::error::AppError;

use crate::models::{
    CommitSlotsRequest, CreateScheduleRequest, ExtendHorizonRequest, ScheduleError,
    SlotGenerationRequest, SlotStatus,
};
use crate::services::committer::SlotCommitService;
use crate::services::generator::generate_slots;
use crate::services::schedule::ScheduleService;

#[derive(Debug, Deserialize)]
pub struct SlotListQuery {
    pub status: Option<SlotStatus>,
}

fn map_schedule_error(e: ScheduleError) -> AppError {
    match e {
        ScheduleError::Validation(msg) => AppError::ValidationError(msg),
        ScheduleError::ScheduleNotFound => AppError::NotFound("Schedule not found".to_string()),
        ScheduleError::AllRejected { rejected } => AppError::Conflict(format!(
            "all {} candidate slots rejected by overlap validation",
            rejected.len()
        )),
        ScheduleError::Transport { message, .. } => AppError::Gateway(message),
        ScheduleError::Store(msg) => AppError::Internal(msg),
    }
}

// ==============================================================================
// SCHEDULE HANDLERS
// ==============================================================================

#[axum::debug_handler]
pub async fn create_schedule(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Json(request): Json<CreateScheduleRequest>,
) -> Result<Json<Value>, AppError> {
    let service = ScheduleService::new(&state);

    let schedule = service
        .create_schedule(request, auth.token())
        .await
        .map_err(map_schedule_error)?;

    Ok(Json(json!({
        "success": true,
        "schedule": schedule
    })))
}

#[axum::debug_handler]
pub async fn get_schedule(
    State(state): State<Arc<AppConfig>>,
    Path(schedule_id): Path<Uuid>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
) -> Result<Json<Value>, AppError> {
    let service = ScheduleService::new(&state);

    let schedule = service
        .get_schedule(schedule_id, auth.token())
        .await
        .map_err(map_schedule_error)?;

    Ok(Json(json!(schedule)))
}

#[axum::debug_handler]
pub async fn list_slots(
    State(state): State<Arc<AppConfig>>,
    Path(schedule_id): Path<Uuid>,
    Query(query): Query<SlotListQuery>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
) -> Result<Json<Value>, AppError> {
    let service = ScheduleService::new(&state);

    let slots = service
        .get_slots(schedule_id, query.status, auth.token())
        .await
        .map_err(map_schedule_error)?;

    Ok(Json(json!({
        "schedule_id": schedule_id,
        "slots": slots
    })))
}

#[axum::debug_handler]
pub async fn extend_horizon(
    State(state): State<Arc<AppConfig>>,
    Path(schedule_id): Path<Uuid>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Json(request): Json<ExtendHorizonRequest>,
) -> Result<Json<Value>, AppError> {
    let service = ScheduleService::new(&state);

    let schedule = service
        .extend_horizon(schedule_id, request, auth.token())
        .await
        .map_err(map_schedule_error)?;

    Ok(Json(json!({
        "success": true,
        "schedule": schedule
    })))
}

// ==============================================================================
// SLOT GENERATION AND COMMIT HANDLERS
// ==============================================================================

/// Expand a recurring pattern into candidate slots. Pure preview: nothing is
/// written to the store until the caller commits the candidates.
#[axum::debug_handler]
pub async fn generate_schedule_slots(
    Path(schedule_id): Path<Uuid>,
    Json(pattern): Json<SlotGenerationRequest>,
) -> Result<Json<Value>, AppError> {
    let outcome = generate_slots(schedule_id, &pattern, Utc::now()).map_err(map_schedule_error)?;

    Ok(Json(json!({
        "success": true,
        "candidates": outcome.candidates,
        "skipped_past_count": outcome.skipped_past_count
    })))
}

/// Commit candidate slots in sequential chunks. Partial success (some
/// rejected) is reported with per-item reasons; a mid-run transport failure
/// answers 502 with everything committed before the abort.
#[axum::debug_handler]
pub async fn commit_schedule_slots(
    State(state): State<Arc<AppConfig>>,
    Path(schedule_id): Path<Uuid>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Json(request): Json<CommitSlotsRequest>,
) -> Result<Response, AppError> {
    if request
        .candidates
        .iter()
        .any(|c| c.schedule_id != schedule_id)
    {
        return Err(AppError::BadRequest(
            "candidate slots must all belong to the schedule being committed".to_string(),
        ));
    }

    let service = SlotCommitService::new(&state);

    let result = service
        .commit_slots(
            &request.candidates,
            |progress| {
                info!(
                    "slot commit progress for schedule {}: {}/{}",
                    schedule_id, progress.processed, progress.total
                );
            },
            auth.token(),
        )
        .await;

    match result {
        Ok(outcome) => Ok(Json(json!({
            "success": true,
            "created": outcome.created,
            "rejected": outcome.rejected
        }))
        .into_response()),
        Err(ScheduleError::AllRejected { rejected }) => Ok((
            StatusCode::CONFLICT,
            Json(json!({
                "success": false,
                "error": "all candidate slots rejected by overlap validation",
                "rejected": rejected
            })),
        )
            .into_response()),
        Err(ScheduleError::Transport {
            message,
            created,
            rejected,
            processed,
            total,
        }) => Ok((
            StatusCode::BAD_GATEWAY,
            Json(json!({
                "success": false,
                "error": message,
                "created": created,
                "rejected": rejected,
                "processed": processed,
                "total": total
            })),
        )
            .into_response()),
        Err(e) => Err(map_schedule_error(e)),
    }
}
