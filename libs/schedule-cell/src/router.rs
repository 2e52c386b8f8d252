// libs/schedule-cell/src/router.rs
use std::sync::Arc;

use axum::{
    Router,
    routing::{get, post, patch},
};

use shared_config::AppConfig;

use crate::handlers;

pub fn schedule_routes(state: Arc<AppConfig>) -> Router {
    Router::new()
        .route("/", post(handlers::create_schedule))
        .route("/{schedule_id}", get(handlers::get_schedule))
        .route("/{schedule_id}/horizon", patch(handlers::extend_horizon))
        .route("/{schedule_id}/slots", get(handlers::list_slots))
        .route("/{schedule_id}/slots/generate", post(handlers::generate_schedule_slots))
        .route("/{schedule_id}/slots/commit", post(handlers::commit_schedule_slots))
        .with_state(state)
}
