// libs/appointment-cell/src/services/booking.rs
use chrono::Utc;
use reqwest::Method;
use serde_json::{json, Value};
use tracing::{debug, info};

use shared_config::AppConfig;
use shared_database::store::StoreClient;

use schedule_cell::models::{Slot, SlotStatus};

use crate::models::{Appointment, AppointmentStatus, BookAppointmentRequest, LifecycleError};

/// Turns a free slot into a pending appointment. The slot keeps its own
/// lifecycle; the appointment only holds a back-reference.
pub struct BookingService {
    store: StoreClient,
}

impl BookingService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            store: StoreClient::new(config),
        }
    }

    pub async fn book_appointment(
        &self,
        request: BookAppointmentRequest,
        auth_token: &str,
    ) -> Result<Appointment, LifecycleError> {
        debug!("Booking appointment against slot {}", request.slot_id);

        let path = format!("/rest/v1/slots?id=eq.{}", request.slot_id);
        let result: Vec<Value> = self
            .store
            .request(Method::GET, &path, Some(auth_token), None)
            .await
            .map_err(|e| LifecycleError::Store(e.to_string()))?;

        let row = result.into_iter().next().ok_or(LifecycleError::SlotNotFound)?;
        let slot: Slot =
            serde_json::from_value(row).map_err(|e| LifecycleError::Store(e.to_string()))?;

        if slot.status != SlotStatus::Free {
            return Err(LifecycleError::SlotUnavailable);
        }

        let appointment_data = json!({
            "status": AppointmentStatus::Pending,
            "slot_id": request.slot_id,
            "participants": request.participants,
            "created_at": Utc::now().to_rfc3339(),
            "updated_at": Utc::now().to_rfc3339()
        });

        let mut headers = reqwest::header::HeaderMap::new();
        headers.insert("Prefer", reqwest::header::HeaderValue::from_static("return=representation"));

        let result: Vec<Value> = self
            .store
            .request_with_headers(
                Method::POST,
                "/rest/v1/appointments",
                Some(auth_token),
                Some(appointment_data),
                Some(headers),
            )
            .await
            .map_err(|e| LifecycleError::Store(e.to_string()))?;

        let row = result
            .into_iter()
            .next()
            .ok_or_else(|| LifecycleError::Store("failed to create appointment".to_string()))?;

        let appointment: Appointment =
            serde_json::from_value(row).map_err(|e| LifecycleError::Store(e.to_string()))?;

        // Hold the slot for this booking
        let slot_update = json!({ "status": SlotStatus::Busy });
        let slot_path = format!("/rest/v1/slots?id=eq.{}", request.slot_id);
        let mut headers = reqwest::header::HeaderMap::new();
        headers.insert("Prefer", reqwest::header::HeaderValue::from_static("return=representation"));

        let _: Vec<Value> = self
            .store
            .request_with_headers(Method::PATCH, &slot_path, Some(auth_token), Some(slot_update), Some(headers))
            .await
            .map_err(|e| LifecycleError::Store(e.to_string()))?;

        info!(
            "Appointment {} booked (pending) against slot {}",
            appointment.id, request.slot_id
        );

        Ok(appointment)
    }
}
