// libs/appointment-cell/src/services/lifecycle.rs
use chrono::Utc;
use reqwest::Method;
use serde_json::{json, Value};
use tracing::{debug, info, warn};
use uuid::Uuid;

use shared_config::AppConfig;
use shared_database::store::StoreClient;

use crate::models::{
    Appointment, AppointmentAction, AppointmentStatus, Encounter, LifecycleError,
};
use crate::services::actions::{available_actions, state_label};

/// Pure transition table for the appointment half of the state machine.
pub struct AppointmentLifecycle;

impl AppointmentLifecycle {
    pub fn new() -> Self {
        Self
    }

    /// Resolve the target status for an action, or fail the guard.
    pub fn target_status(
        &self,
        current: &AppointmentStatus,
        action: AppointmentAction,
    ) -> Result<AppointmentStatus, LifecycleError> {
        match (current, action) {
            (AppointmentStatus::Pending, AppointmentAction::Confirm) => {
                Ok(AppointmentStatus::Booked)
            }
            (
                AppointmentStatus::Pending | AppointmentStatus::Booked,
                AppointmentAction::Cancel,
            ) => Ok(AppointmentStatus::Cancelled),
            (AppointmentStatus::Booked, AppointmentAction::MarkArrived) => {
                Ok(AppointmentStatus::Arrived)
            }
            _ => {
                warn!(
                    "Invalid appointment transition attempted: {} via {}",
                    current, action
                );
                Err(LifecycleError::State {
                    current: current.to_string(),
                    action,
                })
            }
        }
    }

    /// All statuses reachable from the given one. `arrived -> fulfilled` is
    /// listed even though only the completion coordinator performs it.
    pub fn valid_transitions(&self, current: &AppointmentStatus) -> Vec<AppointmentStatus> {
        match current {
            AppointmentStatus::Pending => vec![
                AppointmentStatus::Booked,
                AppointmentStatus::Cancelled,
            ],
            AppointmentStatus::Booked => vec![
                AppointmentStatus::Arrived,
                AppointmentStatus::Cancelled,
            ],
            AppointmentStatus::Arrived => vec![AppointmentStatus::Fulfilled],
            AppointmentStatus::Proposed | AppointmentStatus::Waitlist => vec![],
            // Terminal states - no transitions allowed
            AppointmentStatus::Fulfilled
            | AppointmentStatus::Cancelled
            | AppointmentStatus::Noshow
            | AppointmentStatus::EnteredInError => vec![],
        }
    }
}

impl Default for AppointmentLifecycle {
    fn default() -> Self {
        Self::new()
    }
}

/// Fetches and mutates appointment records, enforcing the transition table
/// against the store's current state rather than the caller's snapshot.
pub struct AppointmentService {
    store: StoreClient,
    lifecycle: AppointmentLifecycle,
}

impl AppointmentService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            store: StoreClient::new(config),
            lifecycle: AppointmentLifecycle::new(),
        }
    }

    pub async fn get_appointment(
        &self,
        appointment_id: Uuid,
        auth_token: &str,
    ) -> Result<Appointment, LifecycleError> {
        let path = format!("/rest/v1/appointments?id=eq.{}", appointment_id);
        let result: Vec<Value> = self
            .store
            .request(Method::GET, &path, Some(auth_token), None)
            .await
            .map_err(|e| LifecycleError::Store(e.to_string()))?;

        let row = result
            .into_iter()
            .next()
            .ok_or(LifecycleError::AppointmentNotFound)?;

        serde_json::from_value(row).map_err(|e| LifecycleError::Store(e.to_string()))
    }

    /// The encounter owned by an appointment, if one has been created.
    pub async fn get_encounter(
        &self,
        appointment_id: Uuid,
        auth_token: &str,
    ) -> Result<Option<Encounter>, LifecycleError> {
        let path = format!("/rest/v1/encounters?appointment_id=eq.{}", appointment_id);
        let result: Vec<Value> = self
            .store
            .request(Method::GET, &path, Some(auth_token), None)
            .await
            .map_err(|e| LifecycleError::Store(e.to_string()))?;

        match result.into_iter().next() {
            Some(row) => serde_json::from_value(row)
                .map(Some)
                .map_err(|e| LifecycleError::Store(e.to_string())),
            None => Ok(None),
        }
    }

    /// Apply `confirm`, `cancel` or `mark-arrived` as a single optimistic
    /// request. The guard runs against freshly fetched state; a stale caller
    /// gets a StateError, never a silent no-op.
    pub async fn transition(
        &self,
        appointment_id: Uuid,
        action: AppointmentAction,
        auth_token: &str,
    ) -> Result<Appointment, LifecycleError> {
        debug!("Executing {} on appointment {}", action, appointment_id);

        let appointment = self.get_appointment(appointment_id, auth_token).await?;
        let encounter = self.get_encounter(appointment_id, auth_token).await?;

        let allowed = available_actions(appointment.status, encounter.as_ref().map(|e| e.status));
        if !allowed.contains(&action) {
            return Err(LifecycleError::State {
                current: state_label(appointment.status, encounter.as_ref().map(|e| e.status)),
                action,
            });
        }

        let target = self.lifecycle.target_status(&appointment.status, action)?;
        let updated = self
            .patch_status(appointment_id, target, auth_token)
            .await?;

        // A cancelled booking releases its slot hold. Best effort: the
        // cancellation itself has already been applied.
        if action == AppointmentAction::Cancel {
            if let Some(slot_id) = appointment.slot_id {
                if let Err(e) = self.release_slot(slot_id, auth_token).await {
                    warn!("Failed to release slot {} after cancellation: {}", slot_id, e);
                }
            }
        }

        info!(
            "Appointment {} transitioned {} -> {}",
            appointment_id, appointment.status, target
        );

        Ok(updated)
    }

    async fn patch_status(
        &self,
        appointment_id: Uuid,
        status: AppointmentStatus,
        auth_token: &str,
    ) -> Result<Appointment, LifecycleError> {
        let update_data = json!({
            "status": status,
            "updated_at": Utc::now().to_rfc3339()
        });

        let path = format!("/rest/v1/appointments?id=eq.{}", appointment_id);
        let mut headers = reqwest::header::HeaderMap::new();
        headers.insert("Prefer", reqwest::header::HeaderValue::from_static("return=representation"));

        let result: Vec<Value> = self
            .store
            .request_with_headers(Method::PATCH, &path, Some(auth_token), Some(update_data), Some(headers))
            .await
            .map_err(|e| LifecycleError::Store(e.to_string()))?;

        let row = result
            .into_iter()
            .next()
            .ok_or(LifecycleError::AppointmentNotFound)?;

        serde_json::from_value(row).map_err(|e| LifecycleError::Store(e.to_string()))
    }

    async fn release_slot(&self, slot_id: Uuid, auth_token: &str) -> Result<(), LifecycleError> {
        let update_data = json!({ "status": "free" });

        let path = format!("/rest/v1/slots?id=eq.{}", slot_id);
        let mut headers = reqwest::header::HeaderMap::new();
        headers.insert("Prefer", reqwest::header::HeaderValue::from_static("return=representation"));

        let _: Vec<Value> = self
            .store
            .request_with_headers(Method::PATCH, &path, Some(auth_token), Some(update_data), Some(headers))
            .await
            .map_err(|e| LifecycleError::Store(e.to_string()))?;

        Ok(())
    }
}
