use std::sync::Arc;
use std::time::Duration;

use assert_matches::assert_matches;
use futures::future::join_all;
use serde_json::json;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use appointment_cell::{
    AppointmentBookingService, BookAppointmentRequest, ErrorKind, ReservationError, NOT_ATTEMPTED,
};
use notification_cell::{ChannelStatus, NotificationClients, NotificationFanout};
use shared_database::ClinicStore;
use shared_models::{AppointmentStatus, NewAppointment};
use shared_utils::test_utils::{ClinicFixture, TestConfig, REED_EMAIL};

const MARCH_10_9AM: &str = "2025-03-10 09:00:00";

fn silent_fanout(fixture: &ClinicFixture) -> Arc<NotificationFanout> {
    Arc::new(NotificationFanout::new(None, None, fixture.clock, Duration::from_secs(1)))
}

fn service(fixture: &ClinicFixture) -> AppointmentBookingService {
    AppointmentBookingService::new(fixture.store(), silent_fanout(fixture), fixture.clock, Duration::from_secs(5))
}

fn request(patient_email: &str, time: &str) -> BookAppointmentRequest {
    BookAppointmentRequest {
        patient_email: patient_email.to_string(),
        doctor_email: REED_EMAIL.to_string(),
        appointment_time_str: time.to_string(),
        reason: Some("Recurring migraines".to_string()),
    }
}

#[tokio::test]
async fn books_free_slot_then_rejects_identical_request() {
    let fixture = ClinicFixture::new().await;
    let slot = fixture.open_slot(&fixture.doctor, MARCH_10_9AM).await;
    let service = service(&fixture);

    let first = service.book(request("jane.doe@example.com", MARCH_10_9AM)).await;
    assert!(first.is_success());
    assert_eq!(first.status, "success");
    let appointment_id = first.appointment_id.expect("appointment id");

    let second = service.book(request("jane.doe@example.com", MARCH_10_9AM)).await;
    assert_eq!(second.status, "error");
    assert_eq!(second.error_kind, Some(ErrorKind::Conflict));
    assert_eq!(
        second.message,
        "The requested time slot 2025-03-10 09:00:00 is not available or already booked."
    );
    assert_eq!(second.email_status, NOT_ATTEMPTED);
    assert_eq!(second.calendar_status, NOT_ATTEMPTED);

    let appointments = fixture.store.appointments().await;
    assert_eq!(appointments.len(), 1);
    assert_eq!(appointments[0].id, appointment_id);
    assert_eq!(appointments[0].appointment_time, slot.start_time);
    assert_eq!(appointments[0].status, AppointmentStatus::Scheduled);
    assert!(fixture.store.slots().await[0].is_booked);
}

#[tokio::test]
async fn concurrent_requests_for_one_slot_have_one_winner() {
    let fixture = ClinicFixture::new().await;
    fixture.open_slot(&fixture.doctor, MARCH_10_9AM).await;
    let service = Arc::new(service(&fixture));

    let attempts = (0..8).map(|i| {
        let service = service.clone();
        tokio::spawn(async move {
            service
                .reserve(REED_EMAIL, MARCH_10_9AM, &format!("patient{}@example.com", i), None)
                .await
        })
    });
    let outcomes: Vec<_> = join_all(attempts).await.into_iter().map(|r| r.unwrap()).collect();

    assert_eq!(outcomes.iter().filter(|o| o.is_ok()).count(), 1);
    for outcome in outcomes.iter().filter(|o| o.is_err()) {
        assert_matches!(outcome, Err(ReservationError::SlotUnavailable { .. }));
    }
    assert_eq!(fixture.store.appointments().await.len(), 1);
}

#[tokio::test]
async fn missing_slot_creates_nothing() {
    let fixture = ClinicFixture::new().await;
    fixture.open_slot(&fixture.doctor, "2025-03-10 11:00:00").await;

    let outcome = service(&fixture)
        .reserve(REED_EMAIL, MARCH_10_9AM, "new.patient@example.com", None)
        .await;

    assert_matches!(outcome, Err(ReservationError::SlotUnavailable { .. }));
    assert!(fixture.store.appointments().await.is_empty());
    assert!(fixture.store.patients().await.is_empty());
    assert!(!fixture.store.slots().await[0].is_booked);
}

#[tokio::test]
async fn malformed_time_is_rejected_before_touching_the_store() {
    let fixture = ClinicFixture::new().await;
    fixture.open_slot(&fixture.doctor, MARCH_10_9AM).await;

    let result = service(&fixture).book(request("jane.doe@example.com", "2025-03-10T09:00")).await;

    assert_eq!(result.error_kind, Some(ErrorKind::Validation));
    assert!(fixture.store.appointments().await.is_empty());
    assert!(!fixture.store.slots().await[0].is_booked);
}

#[tokio::test]
async fn invalid_patient_email_is_a_validation_error() {
    let fixture = ClinicFixture::new().await;
    fixture.open_slot(&fixture.doctor, MARCH_10_9AM).await;

    let outcome = service(&fixture).reserve(REED_EMAIL, MARCH_10_9AM, "not-an-email", None).await;

    assert_matches!(outcome, Err(ReservationError::Validation(_)));
}

#[tokio::test]
async fn unknown_doctor_is_not_found() {
    let fixture = ClinicFixture::new().await;

    let outcome = service(&fixture)
        .reserve("nobody@clinic.com", MARCH_10_9AM, "jane.doe@example.com", None)
        .await;

    assert_matches!(&outcome, Err(ReservationError::DoctorNotFound { email }) if email == "nobody@clinic.com");
    assert_eq!(outcome.unwrap_err().kind(), ErrorKind::NotFound);
}

#[tokio::test]
async fn failed_commit_rolls_back_the_claim() {
    let fixture = ClinicFixture::new().await;
    fixture.open_slot(&fixture.doctor, MARCH_10_9AM).await;
    fixture.store.fail_commits(true);

    let outcome = service(&fixture)
        .reserve(REED_EMAIL, MARCH_10_9AM, "jane.doe@example.com", None)
        .await;

    assert_matches!(&outcome, Err(ReservationError::Persistence(_)));
    assert_eq!(outcome.unwrap_err().kind(), ErrorKind::Persistence);
    assert!(!fixture.store.slots().await[0].is_booked);
    assert!(fixture.store.appointments().await.is_empty());
    assert!(fixture.store.patients().await.is_empty());
}

#[tokio::test]
async fn slow_commit_is_not_reported_as_a_failure() {
    let fixture = ClinicFixture::new().await;
    fixture.open_slot(&fixture.doctor, MARCH_10_9AM).await;
    fixture.store.delay_commits(Duration::from_millis(300));
    let service = AppointmentBookingService::new(
        fixture.store(),
        silent_fanout(&fixture),
        fixture.clock,
        Duration::from_millis(100),
    );

    let result = service.book(request("jane.doe@example.com", MARCH_10_9AM)).await;

    assert!(result.is_success());
    let appointments = fixture.store.appointments().await;
    assert_eq!(appointments.len(), 1);
    assert_eq!(result.appointment_id, Some(appointments[0].id));
}

#[tokio::test]
async fn unknown_patient_is_created_from_email_local_part() {
    let fixture = ClinicFixture::new().await;
    fixture.open_slot(&fixture.doctor, MARCH_10_9AM).await;
    fixture.open_slot(&fixture.doctor, "2025-03-10 11:00:00").await;
    let service = service(&fixture);

    let first = service
        .reserve(REED_EMAIL, MARCH_10_9AM, "sam.lee@example.com", None)
        .await
        .unwrap();
    assert_eq!(first.patient.name, "sam.lee");

    let second = service
        .reserve(REED_EMAIL, "2025-03-10 11:00:00", "sam.lee@example.com", None)
        .await
        .unwrap();
    assert_eq!(second.patient.id, first.patient.id);
    assert_eq!(fixture.store.patients().await.len(), 1);
}

#[tokio::test]
async fn existing_scheduled_appointment_blocks_a_free_slot() {
    let fixture = ClinicFixture::new().await;
    let slot = fixture.open_slot(&fixture.doctor, MARCH_10_9AM).await;
    let patient = fixture.store.add_patient("Jane Doe", "jane.doe@example.com", None).await;

    let mut uow = fixture.store.begin().await.unwrap();
    uow.insert_appointment(NewAppointment {
        patient_id: patient.id,
        doctor_id: fixture.doctor.id,
        appointment_time: slot.start_time,
        reason: None,
    })
    .await
    .unwrap();
    uow.commit().await.unwrap();

    let outcome = service(&fixture)
        .reserve(REED_EMAIL, MARCH_10_9AM, "other@example.com", None)
        .await;

    assert_matches!(outcome, Err(ReservationError::DuplicateAppointment { .. }));
    assert!(!fixture.store.slots().await[0].is_booked);
    assert_eq!(fixture.store.appointments().await.len(), 1);
}

#[tokio::test]
async fn booking_succeeds_when_every_notification_fails() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/email/send"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/calendar/v3/calendars/primary/events"))
        .respond_with(ResponseTemplate::new(500).set_body_json(json!({ "error": "backend" })))
        .mount(&server)
        .await;

    let fixture = ClinicFixture::new().await;
    fixture.open_slot(&fixture.doctor, MARCH_10_9AM).await;
    let config = TestConfig::with_mock_server(&server.uri()).to_app_config();
    let fanout = Arc::new(NotificationFanout::from_clients(&NotificationClients::from_config(&config), &config));
    let service = AppointmentBookingService::new(fixture.store(), fanout, fixture.clock, Duration::from_secs(5));

    let result = service.book(request("jane.doe@example.com", MARCH_10_9AM)).await;

    assert!(result.is_success());
    assert!(result.appointment_id.is_some());
    let report = result.notifications.expect("notification report");
    assert_matches!(report.email, ChannelStatus::Failed(_));
    assert_matches!(report.calendar, ChannelStatus::Failed(_));
    assert!(result.email_status.starts_with("failed"));
    assert_eq!(fixture.store.appointments().await.len(), 1);
}
