// libs/schedule-cell/src/services/schedule.rs
use chrono::Utc;
use reqwest::Method;
use serde_json::{json, Value};
use tracing::debug;
use uuid::Uuid;

use shared_config::AppConfig;
use shared_database::store::StoreClient;

use crate::models::{
    CreateScheduleRequest, ExtendHorizonRequest, Schedule, ScheduleError, Slot, SlotStatus,
};

pub struct ScheduleService {
    store: StoreClient,
}

impl ScheduleService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            store: StoreClient::new(config),
        }
    }

    /// Create a schedule envelope for an actor.
    pub async fn create_schedule(
        &self,
        request: CreateScheduleRequest,
        auth_token: &str,
    ) -> Result<Schedule, ScheduleError> {
        debug!("Creating schedule for actor: {}", request.actor_id);

        if request.horizon_start > request.horizon_end {
            return Err(ScheduleError::Validation(
                "horizon start must not be after horizon end".to_string(),
            ));
        }

        if request.allowed_weekdays.iter().any(|d| *d > 6) {
            return Err(ScheduleError::Validation(
                "weekday values must be between 0 (Sunday) and 6 (Saturday)".to_string(),
            ));
        }

        let schedule_data = json!({
            "actor_id": request.actor_id,
            "horizon_start": request.horizon_start,
            "horizon_end": request.horizon_end,
            "allowed_weekdays": request.allowed_weekdays,
            "created_at": Utc::now().to_rfc3339(),
            "updated_at": Utc::now().to_rfc3339()
        });

        let mut headers = reqwest::header::HeaderMap::new();
        headers.insert("Prefer", reqwest::header::HeaderValue::from_static("return=representation"));

        let result: Vec<Value> = self
            .store
            .request_with_headers(
                Method::POST,
                "/rest/v1/schedules",
                Some(auth_token),
                Some(schedule_data),
                Some(headers),
            )
            .await
            .map_err(|e| ScheduleError::Store(e.to_string()))?;

        let row = result
            .into_iter()
            .next()
            .ok_or_else(|| ScheduleError::Store("failed to create schedule".to_string()))?;

        let schedule: Schedule =
            serde_json::from_value(row).map_err(|e| ScheduleError::Store(e.to_string()))?;
        debug!("Schedule created with ID: {}", schedule.id);

        Ok(schedule)
    }

    pub async fn get_schedule(
        &self,
        schedule_id: Uuid,
        auth_token: &str,
    ) -> Result<Schedule, ScheduleError> {
        let path = format!("/rest/v1/schedules?id=eq.{}", schedule_id);
        let result: Vec<Value> = self
            .store
            .request(Method::GET, &path, Some(auth_token), None)
            .await
            .map_err(|e| ScheduleError::Store(e.to_string()))?;

        let row = result.into_iter().next().ok_or(ScheduleError::ScheduleNotFound)?;
        serde_json::from_value(row).map_err(|e| ScheduleError::Store(e.to_string()))
    }

    /// List a schedule's committed slots, optionally filtered by status.
    pub async fn get_slots(
        &self,
        schedule_id: Uuid,
        status: Option<SlotStatus>,
        auth_token: &str,
    ) -> Result<Vec<Slot>, ScheduleError> {
        let mut path = format!(
            "/rest/v1/slots?schedule_id=eq.{}&order=start_time.asc",
            schedule_id
        );
        if let Some(status) = status {
            path.push_str(&format!("&status=eq.{}", status));
        }

        let result: Vec<Value> = self
            .store
            .request(Method::GET, &path, Some(auth_token), None)
            .await
            .map_err(|e| ScheduleError::Store(e.to_string()))?;

        result
            .into_iter()
            .map(|row| serde_json::from_value(row).map_err(|e| ScheduleError::Store(e.to_string())))
            .collect()
    }

    /// Extend the planning horizon. The one permitted mutation on a schedule
    /// once slots exist against it; the horizon can only grow.
    pub async fn extend_horizon(
        &self,
        schedule_id: Uuid,
        request: ExtendHorizonRequest,
        auth_token: &str,
    ) -> Result<Schedule, ScheduleError> {
        debug!("Extending horizon for schedule: {}", schedule_id);

        let current = self.get_schedule(schedule_id, auth_token).await?;

        if request.new_horizon_end <= current.horizon_end {
            return Err(ScheduleError::Validation(format!(
                "new horizon end {} must be after current horizon end {}",
                request.new_horizon_end, current.horizon_end
            )));
        }

        let update_data = json!({
            "horizon_end": request.new_horizon_end,
            "updated_at": Utc::now().to_rfc3339()
        });

        let path = format!("/rest/v1/schedules?id=eq.{}", schedule_id);
        let mut headers = reqwest::header::HeaderMap::new();
        headers.insert("Prefer", reqwest::header::HeaderValue::from_static("return=representation"));

        let result: Vec<Value> = self
            .store
            .request_with_headers(Method::PATCH, &path, Some(auth_token), Some(update_data), Some(headers))
            .await
            .map_err(|e| ScheduleError::Store(e.to_string()))?;

        let row = result
            .into_iter()
            .next()
            .ok_or_else(|| ScheduleError::Store("failed to extend schedule horizon".to_string()))?;

        serde_json::from_value(row).map_err(|e| ScheduleError::Store(e.to_string()))
    }
}
