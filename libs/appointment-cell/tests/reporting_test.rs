use std::sync::Arc;
use std::time::Duration;

use assert_matches::assert_matches;
use serde_json::json;
use wiremock::matchers::{body_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use appointment_cell::{AppointmentBookingService, ReportingError, ReportingService};
use notification_cell::{ChannelStatus, ChatNotifier, NotificationFanout, SlackWebhookNotifier};
use shared_utils::test_utils::{ClinicFixture, TestConfig, REED_EMAIL};

fn reporting(fixture: &ClinicFixture, chat: Option<Arc<dyn ChatNotifier>>) -> ReportingService {
    ReportingService::new(fixture.store(), chat, fixture.clock, Duration::from_secs(2))
}

async fn book(fixture: &ClinicFixture, patient_email: &str, time: &str, reason: Option<&str>) -> uuid::Uuid {
    fixture.open_slot(&fixture.doctor, time).await;
    let fanout = Arc::new(NotificationFanout::new(None, None, fixture.clock, Duration::from_secs(1)));
    AppointmentBookingService::new(fixture.store(), fanout, fixture.clock, Duration::from_secs(5))
        .reserve(REED_EMAIL, time, patient_email, reason.map(str::to_string))
        .await
        .unwrap()
        .appointment
        .id
}

#[tokio::test]
async fn summary_lists_the_day_in_clinic_time_and_posts_to_chat() {
    let fixture = ClinicFixture::new().await;
    let second = book(&fixture, "sam.lee@example.com", "2025-03-10 11:00:00", None).await;
    let first = book(&fixture, "jane.doe@example.com", "2025-03-10 09:00:00", Some("Migraine")).await;
    book(&fixture, "jane.doe@example.com", "2025-03-11 09:00:00", None).await;

    let expected = format!(
        "Daily Appointment Summary for Dr. Evelyn Reed (March 10, 2025):\n\
         1. Time: 09:00 IST, Patient: jane.doe (jane.doe@example.com), Reason: Migraine, ID: {}\n\
         2. Time: 11:00 IST, Patient: sam.lee (sam.lee@example.com), Reason: N/A, ID: {}",
        first, second
    );

    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/slack/webhook"))
        .and(body_json(json!({ "text": expected })))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;
    let config = TestConfig::with_mock_server(&server.uri()).to_app_config();
    let chat: Arc<dyn ChatNotifier> = Arc::new(SlackWebhookNotifier::new(&config).unwrap());

    let report = reporting(&fixture, Some(chat))
        .appointments_summary_for_doctor(REED_EMAIL, Some("2025-03-10"))
        .await
        .unwrap();

    assert_eq!(report.appointment_count, 2);
    assert_eq!(report.message, expected);
    assert!(report.chat_status.is_delivered());
}

#[tokio::test]
async fn empty_day_summary_without_chat() {
    let fixture = ClinicFixture::new().await;

    let report = reporting(&fixture, None)
        .appointments_summary_for_doctor(REED_EMAIL, Some("2025-03-10"))
        .await
        .unwrap();

    assert_eq!(report.appointment_count, 0);
    assert_eq!(
        report.message,
        "Dr. Evelyn Reed has no appointments scheduled for March 10, 2025."
    );
    assert_matches!(report.chat_status, ChannelStatus::Skipped(_));
}

#[tokio::test]
async fn chat_failure_does_not_fail_the_summary() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/slack/webhook"))
        .respond_with(ResponseTemplate::new(404).set_body_string("no_service"))
        .mount(&server)
        .await;
    let config = TestConfig::with_mock_server(&server.uri()).to_app_config();
    let chat: Arc<dyn ChatNotifier> = Arc::new(SlackWebhookNotifier::new(&config).unwrap());
    let fixture = ClinicFixture::new().await;

    let report = reporting(&fixture, Some(chat))
        .appointments_summary_for_doctor(REED_EMAIL, Some("2025-03-10"))
        .await
        .unwrap();

    assert_eq!(report.status, "success");
    assert_matches!(report.chat_status, ChannelStatus::Failed(reason) if reason.contains("no_service"));
}

#[tokio::test]
async fn summary_for_unknown_doctor_is_not_found() {
    let fixture = ClinicFixture::new().await;
    assert_matches!(
        reporting(&fixture, None)
            .appointments_summary_for_doctor("nobody@clinic.com", None)
            .await,
        Err(ReportingError::NotFound(_))
    );
}

#[tokio::test]
async fn counts_distinct_patients_per_clinic_day() {
    let fixture = ClinicFixture::new().await;
    book(&fixture, "jane.doe@example.com", "2025-03-10 09:00:00", None).await;
    book(&fixture, "jane.doe@example.com", "2025-03-10 14:00:00", None).await;
    book(&fixture, "sam.lee@example.com", "2025-03-10 16:00:00", None).await;
    // 00:30 IST on the 11th is still the 10th in UTC.
    book(&fixture, "late@example.com", "2025-03-11 00:30:00", None).await;

    let service = reporting(&fixture, None);
    let report = service.patient_count_by_date("2025-03-10").await.unwrap();

    assert_eq!(report.patient_count, 2);
    assert_eq!(report.message, "On 2025-03-10, there are 2 unique patients with appointments.");
    assert_eq!(service.patient_count_by_date("2025-03-11").await.unwrap().patient_count, 1);
    assert_matches!(
        service.patient_count_by_date("March 10").await,
        Err(ReportingError::Validation(_))
    );
    assert_matches!(service.patient_count_by_date("").await, Err(ReportingError::Validation(_)));
}

#[tokio::test]
async fn finds_patients_by_condition_fragment() {
    let fixture = ClinicFixture::new().await;
    fixture
        .store
        .add_patient("Jane Doe", "jane.doe@example.com", Some("Chronic Migraine"))
        .await;
    fixture.store.add_patient("Sam Lee", "sam.lee@example.com", Some("Epilepsy")).await;
    fixture.store.add_patient("No Condition", "nc@example.com", None).await;
    let service = reporting(&fixture, None);

    let found = service.patients_with_condition("migraine").await.unwrap();
    assert_eq!(found.message, "Found 1 patients.");
    assert_eq!(found.patients[0].patient_email, "jane.doe@example.com");

    let none = service.patients_with_condition("Asthma").await.unwrap();
    assert!(none.patients.is_empty());
    assert_eq!(none.message, "No patients found with condition 'Asthma'.");
}
