// libs/appointment-cell/src/services/completion.rs
use chrono::Utc;
use reqwest::Method;
use serde_json::{json, Value};
use tracing::{debug, error, info};
use uuid::Uuid;

use shared_config::AppConfig;
use shared_database::store::StoreClient;

use crate::models::{
    Appointment, AppointmentAction, AppointmentStatus, CompletionOutcome, Encounter,
    EncounterStatus, LifecycleError,
};
use crate::services::actions::{available_actions, state_label};
use crate::services::lifecycle::AppointmentService;

/// Closes out a visit with the dual update: encounter to `finished` and
/// appointment to `fulfilled`. The two patches target independent resources
/// and run concurrently; there is no client-side transaction around them.
pub struct CompletionCoordinator {
    store: StoreClient,
    appointments: AppointmentService,
}

impl CompletionCoordinator {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            store: StoreClient::new(config),
            appointments: AppointmentService::new(config),
        }
    }

    /// Success requires BOTH updates to land. If exactly one does, the pair
    /// is inconsistent and the caller gets a PartialCompletionError naming
    /// the half that succeeded; nothing is retried or compensated here,
    /// since an automatic retry risks double-writing clinical records.
    pub async fn complete(
        &self,
        appointment_id: Uuid,
        auth_token: &str,
    ) -> Result<CompletionOutcome, LifecycleError> {
        debug!("Completing visit for appointment {}", appointment_id);

        let appointment = self
            .appointments
            .get_appointment(appointment_id, auth_token)
            .await?;
        let encounter = self
            .appointments
            .get_encounter(appointment_id, auth_token)
            .await?;

        let allowed = available_actions(appointment.status, encounter.as_ref().map(|e| e.status));
        if !allowed.contains(&AppointmentAction::CompleteEncounter) {
            return Err(LifecycleError::State {
                current: state_label(appointment.status, encounter.as_ref().map(|e| e.status)),
                action: AppointmentAction::CompleteEncounter,
            });
        }

        let encounter = encounter.ok_or(LifecycleError::EncounterNotFound)?;
        let now = Utc::now();

        let (encounter_result, appointment_result) = tokio::join!(
            self.finish_encounter(encounter.id, now, auth_token),
            self.fulfil_appointment(appointment.id, now, auth_token),
        );

        match (encounter_result, appointment_result) {
            (Ok(encounter), Ok(appointment)) => {
                info!(
                    "Visit completed: encounter {} finished, appointment {} fulfilled",
                    encounter.id, appointment.id
                );
                Ok(CompletionOutcome {
                    appointment,
                    encounter,
                })
            }
            (Ok(encounter), Err(e)) => {
                error!(
                    "Partial completion for appointment {}: encounter {} finished but appointment update failed: {}",
                    appointment_id, encounter.id, e
                );
                Err(LifecycleError::PartialCompletion {
                    encounter_finished: true,
                    appointment_fulfilled: false,
                    detail: e.to_string(),
                })
            }
            (Err(e), Ok(appointment)) => {
                error!(
                    "Partial completion for appointment {}: appointment fulfilled but encounter update failed: {}",
                    appointment.id, e
                );
                Err(LifecycleError::PartialCompletion {
                    encounter_finished: false,
                    appointment_fulfilled: true,
                    detail: e.to_string(),
                })
            }
            (Err(enc_err), Err(appt_err)) => Err(LifecycleError::Store(format!(
                "both completion updates failed: {}; {}",
                enc_err, appt_err
            ))),
        }
    }

    async fn finish_encounter(
        &self,
        encounter_id: Uuid,
        now: chrono::DateTime<Utc>,
        auth_token: &str,
    ) -> Result<Encounter, LifecycleError> {
        let update_data = json!({
            "status": EncounterStatus::Finished,
            "period_end": now.to_rfc3339(),
            "updated_at": now.to_rfc3339()
        });

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

    async fn fulfil_appointment(
        &self,
        appointment_id: Uuid,
        now: chrono::DateTime<Utc>,
        auth_token: &str,
    ) -> Result<Appointment, LifecycleError> {
        let update_data = json!({
            "status": AppointmentStatus::Fulfilled,
            "updated_at": now.to_rfc3339()
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
}
