// libs/appointment-cell/tests/booking_test.rs
use assert_matches::assert_matches;
use serde_json::json;
use uuid::Uuid;
use wiremock::{
    matchers::{method, path},
    Mock, MockServer, ResponseTemplate,
};

use appointment_cell::models::{
    AppointmentStatus, BookAppointmentRequest, LifecycleError, Participant, ParticipantRole,
};
use appointment_cell::services::booking::BookingService;
use shared_config::AppConfig;

fn test_config(mock_server: &MockServer) -> AppConfig {
    AppConfig {
        store_url: mock_server.uri(),
        store_api_key: "test-key".to_string(),
    }
}

fn slot_json(id: Uuid, status: &str) -> serde_json::Value {
    json!({
        "id": id,
        "schedule_id": Uuid::new_v4(),
        "start_time": "2030-06-03T09:00:00Z",
        "end_time": "2030-06-03T09:30:00Z",
        "status": status
    })
}

fn participants() -> Vec<Participant> {
    vec![
        Participant {
            actor_id: Uuid::new_v4(),
            role: ParticipantRole::Patient,
        },
        Participant {
            actor_id: Uuid::new_v4(),
            role: ParticipantRole::Practitioner,
        },
    ]
}

#[tokio::test]
async fn booking_a_free_slot_creates_pending_appointment_and_holds_slot() {
    let mock_server = MockServer::start().await;
    let slot_id = Uuid::new_v4();
    let appointment_id = Uuid::new_v4();

    Mock::given(method("GET"))
        .and(path("/rest/v1/slots"))
        .respond_with(ResponseTemplate::new(200).set_body_json(vec![slot_json(slot_id, "free")]))
        .mount(&mock_server)
        .await;
    Mock::given(method("POST"))
        .and(path("/rest/v1/appointments"))
        .respond_with(ResponseTemplate::new(201).set_body_json(vec![json!({
            "id": appointment_id,
            "status": "pending",
            "slot_id": slot_id,
            "participants": participants(),
            "created_at": "2030-06-01T08:00:00Z",
            "updated_at": "2030-06-01T08:00:00Z"
        })]))
        .expect(1)
        .mount(&mock_server)
        .await;
    Mock::given(method("PATCH"))
        .and(path("/rest/v1/slots"))
        .respond_with(ResponseTemplate::new(200).set_body_json(vec![slot_json(slot_id, "busy")]))
        .expect(1)
        .mount(&mock_server)
        .await;

    let service = BookingService::new(&test_config(&mock_server));
    let appointment = service
        .book_appointment(
            BookAppointmentRequest {
                slot_id,
                participants: participants(),
            },
            "test_token",
        )
        .await
        .unwrap();

    assert_eq!(appointment.status, AppointmentStatus::Pending);
    assert_eq!(appointment.slot_id, Some(slot_id));
}

#[tokio::test]
async fn booking_a_busy_slot_is_rejected() {
    let mock_server = MockServer::start().await;
    let slot_id = Uuid::new_v4();

    Mock::given(method("GET"))
        .and(path("/rest/v1/slots"))
        .respond_with(ResponseTemplate::new(200).set_body_json(vec![slot_json(slot_id, "busy")]))
        .mount(&mock_server)
        .await;
    Mock::given(method("POST"))
        .and(path("/rest/v1/appointments"))
        .respond_with(ResponseTemplate::new(201))
        .expect(0)
        .mount(&mock_server)
        .await;

    let service = BookingService::new(&test_config(&mock_server));
    let err = service
        .book_appointment(
            BookAppointmentRequest {
                slot_id,
                participants: participants(),
            },
            "test_token",
        )
        .await
        .unwrap_err();

    assert_matches!(err, LifecycleError::SlotUnavailable);
}

#[tokio::test]
async fn booking_an_unknown_slot_is_not_found() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/slots"))
        .respond_with(ResponseTemplate::new(200).set_body_json(Vec::<serde_json::Value>::new()))
        .mount(&mock_server)
        .await;

    let service = BookingService::new(&test_config(&mock_server));
    let err = service
        .book_appointment(
            BookAppointmentRequest {
                slot_id: Uuid::new_v4(),
                participants: participants(),
            },
            "test_token",
        )
        .await
        .unwrap_err();

    assert_matches!(err, LifecycleError::SlotNotFound);
}
