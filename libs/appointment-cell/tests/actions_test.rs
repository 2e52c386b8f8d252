// libs/appointment-cell/tests/actions_test.rs
use assert_matches::assert_matches;
use serde_json::json;
use uuid::Uuid;
use wiremock::{
    matchers::{method, path},
    Mock, MockServer, ResponseTemplate,
};

use appointment_cell::models::{
    AppointmentAction, AppointmentStatus, EncounterStatus, LifecycleError,
};
use appointment_cell::services::completion::CompletionCoordinator;
use appointment_cell::services::encounter::EncounterService;
use appointment_cell::services::lifecycle::AppointmentService;
use shared_config::AppConfig;

fn test_config(mock_server: &MockServer) -> AppConfig {
    AppConfig {
        store_url: mock_server.uri(),
        store_api_key: "test-key".to_string(),
    }
}

fn appointment_json(id: Uuid, status: &str) -> serde_json::Value {
    json!({
        "id": id,
        "status": status,
        "slot_id": null,
        "participants": [
            { "actor_id": Uuid::new_v4(), "role": "patient" },
            { "actor_id": Uuid::new_v4(), "role": "practitioner" }
        ],
        "created_at": "2030-06-03T08:00:00Z",
        "updated_at": "2030-06-03T08:00:00Z"
    })
}

fn encounter_json(id: Uuid, appointment_id: Uuid, status: &str) -> serde_json::Value {
    json!({
        "id": id,
        "appointment_id": appointment_id,
        "status": status,
        "period_start": (if status == "planned" { None } else { Some("2030-06-03T09:00:00Z") }),
        "period_end": (if status == "finished" { Some("2030-06-03T09:30:00Z") } else { None }),
        "created_at": "2030-06-03T08:55:00Z",
        "updated_at": "2030-06-03T08:55:00Z"
    })
}

async fn mount_appointment(mock_server: &MockServer, body: serde_json::Value) {
    Mock::given(method("GET"))
        .and(path("/rest/v1/appointments"))
        .respond_with(ResponseTemplate::new(200).set_body_json(vec![body]))
        .mount(mock_server)
        .await;
}

async fn mount_encounters(mock_server: &MockServer, rows: Vec<serde_json::Value>) {
    Mock::given(method("GET"))
        .and(path("/rest/v1/encounters"))
        .respond_with(ResponseTemplate::new(200).set_body_json(rows))
        .mount(mock_server)
        .await;
}

// ==============================================================================
// APPOINTMENT TRANSITIONS
// ==============================================================================

#[tokio::test]
async fn confirm_patches_pending_to_booked() {
    let mock_server = MockServer::start().await;
    let appointment_id = Uuid::new_v4();

    mount_appointment(&mock_server, appointment_json(appointment_id, "pending")).await;
    mount_encounters(&mock_server, vec![]).await;
    Mock::given(method("PATCH"))
        .and(path("/rest/v1/appointments"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(vec![appointment_json(appointment_id, "booked")]),
        )
        .expect(1)
        .mount(&mock_server)
        .await;

    let service = AppointmentService::new(&test_config(&mock_server));
    let updated = service
        .transition(appointment_id, AppointmentAction::Confirm, "test_token")
        .await
        .unwrap();

    assert_eq!(updated.status, AppointmentStatus::Booked);
}

#[tokio::test]
async fn stale_mark_arrived_is_rejected_against_fresh_state() {
    let mock_server = MockServer::start().await;
    let appointment_id = Uuid::new_v4();

    // The caller believes the appointment is booked; the store says pending
    mount_appointment(&mock_server, appointment_json(appointment_id, "pending")).await;
    mount_encounters(&mock_server, vec![]).await;
    Mock::given(method("PATCH"))
        .and(path("/rest/v1/appointments"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&mock_server)
        .await;

    let service = AppointmentService::new(&test_config(&mock_server));
    let err = service
        .transition(appointment_id, AppointmentAction::MarkArrived, "test_token")
        .await
        .unwrap_err();

    match err {
        LifecycleError::State { current, action } => {
            assert_eq!(current, "pending");
            assert_eq!(action, AppointmentAction::MarkArrived);
        }
        other => panic!("expected state error, got {:?}", other),
    }
}

#[tokio::test]
async fn transition_on_missing_appointment_is_not_found() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/appointments"))
        .respond_with(ResponseTemplate::new(200).set_body_json(Vec::<serde_json::Value>::new()))
        .mount(&mock_server)
        .await;

    let service = AppointmentService::new(&test_config(&mock_server));
    let err = service
        .transition(Uuid::new_v4(), AppointmentAction::Confirm, "test_token")
        .await
        .unwrap_err();

    assert_matches!(err, LifecycleError::AppointmentNotFound);
}

// ==============================================================================
// ENCOUNTER SUB-STATE MACHINE
// ==============================================================================

#[tokio::test]
async fn start_encounter_creates_planned_record_when_arrived() {
    let mock_server = MockServer::start().await;
    let appointment_id = Uuid::new_v4();
    let encounter_id = Uuid::new_v4();

    mount_appointment(&mock_server, appointment_json(appointment_id, "arrived")).await;
    mount_encounters(&mock_server, vec![]).await;
    Mock::given(method("POST"))
        .and(path("/rest/v1/encounters"))
        .respond_with(
            ResponseTemplate::new(201)
                .set_body_json(vec![encounter_json(encounter_id, appointment_id, "planned")]),
        )
        .expect(1)
        .mount(&mock_server)
        .await;

    let service = EncounterService::new(&test_config(&mock_server));
    let encounter = service
        .start_encounter(appointment_id, "test_token")
        .await
        .unwrap();

    assert_eq!(encounter.status, EncounterStatus::Planned);
    assert_eq!(encounter.appointment_id, appointment_id);
}

#[tokio::test]
async fn start_encounter_begins_a_planned_visit() {
    let mock_server = MockServer::start().await;
    let appointment_id = Uuid::new_v4();
    let encounter_id = Uuid::new_v4();

    mount_appointment(&mock_server, appointment_json(appointment_id, "arrived")).await;
    mount_encounters(
        &mock_server,
        vec![encounter_json(encounter_id, appointment_id, "planned")],
    )
    .await;
    Mock::given(method("PATCH"))
        .and(path("/rest/v1/encounters"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(vec![encounter_json(encounter_id, appointment_id, "in-progress")]),
        )
        .expect(1)
        .mount(&mock_server)
        .await;

    let service = EncounterService::new(&test_config(&mock_server));
    let encounter = service
        .start_encounter(appointment_id, "test_token")
        .await
        .unwrap();

    assert_eq!(encounter.status, EncounterStatus::InProgress);
    assert!(encounter.period_start.is_some());
}

#[tokio::test]
async fn start_encounter_is_rejected_before_arrival() {
    let mock_server = MockServer::start().await;
    let appointment_id = Uuid::new_v4();

    mount_appointment(&mock_server, appointment_json(appointment_id, "booked")).await;
    mount_encounters(&mock_server, vec![]).await;

    let service = EncounterService::new(&test_config(&mock_server));
    let err = service
        .start_encounter(appointment_id, "test_token")
        .await
        .unwrap_err();

    assert_matches!(
        err,
        LifecycleError::State {
            action: AppointmentAction::StartEncounter,
            ..
        }
    );
}

#[tokio::test]
async fn signal_near_completion_places_visit_on_hold() {
    let mock_server = MockServer::start().await;
    let appointment_id = Uuid::new_v4();
    let encounter_id = Uuid::new_v4();

    mount_appointment(&mock_server, appointment_json(appointment_id, "arrived")).await;
    mount_encounters(
        &mock_server,
        vec![encounter_json(encounter_id, appointment_id, "in-progress")],
    )
    .await;
    Mock::given(method("PATCH"))
        .and(path("/rest/v1/encounters"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(vec![encounter_json(encounter_id, appointment_id, "on-hold")]),
        )
        .mount(&mock_server)
        .await;

    let service = EncounterService::new(&test_config(&mock_server));
    let encounter = service
        .signal_near_completion(appointment_id, "test_token")
        .await
        .unwrap();

    assert_eq!(encounter.status, EncounterStatus::OnHold);
}

#[tokio::test]
async fn finished_encounter_accepts_no_further_action() {
    let mock_server = MockServer::start().await;
    let appointment_id = Uuid::new_v4();
    let encounter_id = Uuid::new_v4();

    mount_appointment(&mock_server, appointment_json(appointment_id, "arrived")).await;
    mount_encounters(
        &mock_server,
        vec![encounter_json(encounter_id, appointment_id, "finished")],
    )
    .await;

    let service = EncounterService::new(&test_config(&mock_server));
    let err = service
        .start_encounter(appointment_id, "test_token")
        .await
        .unwrap_err();
    assert_matches!(err, LifecycleError::State { .. });

    let err = service
        .signal_near_completion(appointment_id, "test_token")
        .await
        .unwrap_err();
    assert_matches!(err, LifecycleError::State { .. });
}

// ==============================================================================
// COMPLETION COORDINATOR
// ==============================================================================

#[tokio::test]
async fn completion_finishes_encounter_and_fulfils_appointment() {
    let mock_server = MockServer::start().await;
    let appointment_id = Uuid::new_v4();
    let encounter_id = Uuid::new_v4();

    mount_appointment(&mock_server, appointment_json(appointment_id, "arrived")).await;
    mount_encounters(
        &mock_server,
        vec![encounter_json(encounter_id, appointment_id, "in-progress")],
    )
    .await;
    Mock::given(method("PATCH"))
        .and(path("/rest/v1/encounters"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(vec![encounter_json(encounter_id, appointment_id, "finished")]),
        )
        .expect(1)
        .mount(&mock_server)
        .await;
    Mock::given(method("PATCH"))
        .and(path("/rest/v1/appointments"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(vec![appointment_json(appointment_id, "fulfilled")]),
        )
        .expect(1)
        .mount(&mock_server)
        .await;

    let coordinator = CompletionCoordinator::new(&test_config(&mock_server));
    let outcome = coordinator
        .complete(appointment_id, "test_token")
        .await
        .unwrap();

    assert_eq!(outcome.encounter.status, EncounterStatus::Finished);
    assert_eq!(outcome.appointment.status, AppointmentStatus::Fulfilled);
}

#[tokio::test]
async fn completion_from_on_hold_is_permitted() {
    let mock_server = MockServer::start().await;
    let appointment_id = Uuid::new_v4();
    let encounter_id = Uuid::new_v4();

    mount_appointment(&mock_server, appointment_json(appointment_id, "arrived")).await;
    mount_encounters(
        &mock_server,
        vec![encounter_json(encounter_id, appointment_id, "on-hold")],
    )
    .await;
    Mock::given(method("PATCH"))
        .and(path("/rest/v1/encounters"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(vec![encounter_json(encounter_id, appointment_id, "finished")]),
        )
        .mount(&mock_server)
        .await;
    Mock::given(method("PATCH"))
        .and(path("/rest/v1/appointments"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(vec![appointment_json(appointment_id, "fulfilled")]),
        )
        .mount(&mock_server)
        .await;

    let coordinator = CompletionCoordinator::new(&test_config(&mock_server));
    let outcome = coordinator
        .complete(appointment_id, "test_token")
        .await
        .unwrap();

    assert_eq!(outcome.encounter.status, EncounterStatus::Finished);
}

#[tokio::test]
async fn half_applied_completion_is_a_partial_completion_error() {
    let mock_server = MockServer::start().await;
    let appointment_id = Uuid::new_v4();
    let encounter_id = Uuid::new_v4();

    mount_appointment(&mock_server, appointment_json(appointment_id, "arrived")).await;
    mount_encounters(
        &mock_server,
        vec![encounter_json(encounter_id, appointment_id, "in-progress")],
    )
    .await;
    // Encounter update lands, appointment update dies
    Mock::given(method("PATCH"))
        .and(path("/rest/v1/encounters"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(vec![encounter_json(encounter_id, appointment_id, "finished")]),
        )
        .mount(&mock_server)
        .await;
    Mock::given(method("PATCH"))
        .and(path("/rest/v1/appointments"))
        .respond_with(ResponseTemplate::new(500).set_body_string("store unavailable"))
        .mount(&mock_server)
        .await;

    let coordinator = CompletionCoordinator::new(&test_config(&mock_server));
    let err = coordinator
        .complete(appointment_id, "test_token")
        .await
        .unwrap_err();

    match err {
        LifecycleError::PartialCompletion {
            encounter_finished,
            appointment_fulfilled,
            detail,
        } => {
            assert!(encounter_finished);
            assert!(!appointment_fulfilled);
            assert!(!detail.is_empty());
        }
        other => panic!("expected partial completion error, got {:?}", other),
    }
}

#[tokio::test]
async fn completion_requires_a_started_encounter() {
    let mock_server = MockServer::start().await;
    let appointment_id = Uuid::new_v4();
    let encounter_id = Uuid::new_v4();

    mount_appointment(&mock_server, appointment_json(appointment_id, "arrived")).await;
    mount_encounters(
        &mock_server,
        vec![encounter_json(encounter_id, appointment_id, "planned")],
    )
    .await;

    let coordinator = CompletionCoordinator::new(&test_config(&mock_server));
    let err = coordinator
        .complete(appointment_id, "test_token")
        .await
        .unwrap_err();

    assert_matches!(
        err,
        LifecycleError::State {
            action: AppointmentAction::CompleteEncounter,
            ..
        }
    );
}
