// libs/appointment-cell/src/services/encounter.rs
use chrono::Utc;
use reqwest::Method;
use serde_json::{json, Value};
use tracing::{debug, info};
use uuid::Uuid;

use shared_config::AppConfig;
use shared_database::store::StoreClient;

use crate::models::{
    AppointmentAction, Encounter, EncounterStatus, LifecycleError,
};
use crate::services::actions::{available_actions, state_label};
use crate::services::lifecycle::AppointmentService;

/// Drives the clinical-visit sub-state machine. An encounter exists only
/// while its owning appointment is active; creation requires the appointment
/// to have reached `arrived`.
pub struct EncounterService {
    store: StoreClient,
    appointments: AppointmentService,
}

impl EncounterService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            store: StoreClient::new(config),
            appointments: AppointmentService::new(config),
        }
    }

    /// `start-encounter` covers both steps on the way into the visit:
    /// with no encounter it creates the `planned` record; with a `planned`
    /// one it begins the visit and stamps the period start.
    pub async fn start_encounter(
        &self,
        appointment_id: Uuid,
        auth_token: &str,
    ) -> Result<Encounter, LifecycleError> {
        debug!("Starting encounter for appointment {}", appointment_id);

        let appointment = self
            .appointments
            .get_appointment(appointment_id, auth_token)
            .await?;
        let existing = self
            .appointments
            .get_encounter(appointment_id, auth_token)
            .await?;

        let allowed = available_actions(appointment.status, existing.as_ref().map(|e| e.status));
        if !allowed.contains(&AppointmentAction::StartEncounter) {
            return Err(LifecycleError::State {
                current: state_label(appointment.status, existing.as_ref().map(|e| e.status)),
                action: AppointmentAction::StartEncounter,
            });
        }

        match existing {
            None => {
                let encounter = self.create_planned(appointment_id, auth_token).await?;
                info!(
                    "Encounter {} created (planned) for appointment {}",
                    encounter.id, appointment_id
                );
                Ok(encounter)
            }
            Some(enc) => {
                let update_data = json!({
                    "status": EncounterStatus::InProgress,
                    "period_start": Utc::now().to_rfc3339(),
                    "updated_at": Utc::now().to_rfc3339()
                });
                let encounter = self.patch_encounter(enc.id, update_data, auth_token).await?;
                info!("Encounter {} is now in progress", encounter.id);
                Ok(encounter)
            }
        }
    }

    /// Clinician signals the visit is wrapping up. Informational: completion
    /// remains reachable whether or not this was ever called.
    pub async fn signal_near_completion(
        &self,
        appointment_id: Uuid,
        auth_token: &str,
    ) -> Result<Encounter, LifecycleError> {
        let appointment = self
            .appointments
            .get_appointment(appointment_id, auth_token)
            .await?;
        let existing = self
            .appointments
            .get_encounter(appointment_id, auth_token)
            .await?;

        let allowed = available_actions(appointment.status, existing.as_ref().map(|e| e.status));
        if !allowed.contains(&AppointmentAction::SignalNearCompletion) {
            return Err(LifecycleError::State {
                current: state_label(appointment.status, existing.as_ref().map(|e| e.status)),
                action: AppointmentAction::SignalNearCompletion,
            });
        }

        let encounter = existing.ok_or(LifecycleError::EncounterNotFound)?;

        let update_data = json!({
            "status": EncounterStatus::OnHold,
            "updated_at": Utc::now().to_rfc3339()
        });
        let encounter = self
            .patch_encounter(encounter.id, update_data, auth_token)
            .await?;

        info!("Encounter {} placed on hold (finishing soon)", encounter.id);
        Ok(encounter)
    }

    async fn create_planned(
        &self,
        appointment_id: Uuid,
        auth_token: &str,
    ) -> Result<Encounter, LifecycleError> {
        let encounter_data = json!({
            "appointment_id": appointment_id,
            "status": EncounterStatus::Planned,
            "created_at": Utc::now().to_rfc3339(),
            "updated_at": Utc::now().to_rfc3339()
        });

        let mut headers = reqwest::header::HeaderMap::new();
        headers.insert("Prefer", reqwest::header::HeaderValue::from_static("return=representation"));

        let result: Vec<Value> = self
            .store
            .request_with_headers(
                Method::POST,
                "/rest/v1/encounters",
                Some(auth_token),
                Some(encounter_data),
                Some(headers),
            )
            .await
            .map_err(|e| LifecycleError::Store(e.to_string()))?;

        let row = result
            .into_iter()
            .next()
            .ok_or_else(|| LifecycleError::Store("failed to create encounter".to_string()))?;

        serde_json::from_value(row).map_err(|e| LifecycleError::Store(e.to_string()))
    }

    async fn patch_encounter(
        &self,
        encounter_id: Uuid,
        update_data: Value,
        auth_token: &str,
    ) -> Result<Encounter, LifecycleError> {
        let path = format!("/rest/v1/encounters?id=eq.{}", encounter_id);
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
            .ok_or(LifecycleError::EncounterNotFound)?;

        serde_json::from_value(row).map_err(|e| LifecycleError::Store(e.to_string()))
    }
}
