use std::sync::Arc;

use chrono::{Duration, NaiveDate, NaiveTime};
use chrono_tz::Tz;

use shared_config::AppConfig;
use shared_database::{ClinicStore, MemoryClinicStore};
use shared_models::{AvailabilitySlot, Doctor, NewDoctor, NewSlot};

use crate::time::ClinicClock;

pub const REED_NAME: &str = "Dr. Evelyn Reed";
pub const REED_EMAIL: &str = "e.reed.neuro@clinic.com";

pub struct TestConfig {
    pub mock_base_url: Option<String>,
    pub timezone: Tz,
    pub slot_start_hours: Vec<u32>,
    pub horizon_days: u32,
}

impl Default for TestConfig {
    fn default() -> Self {
        Self {
            mock_base_url: None,
            timezone: chrono_tz::Asia::Kolkata,
            slot_start_hours: vec![9, 11, 14, 16],
            horizon_days: 7,
        }
    }
}

impl TestConfig {
    /// Every outbound collaborator pointed at the same mock server.
    pub fn with_mock_server(base_url: &str) -> Self {
        Self {
            mock_base_url: Some(base_url.trim_end_matches('/').to_string()),
            ..Self::default()
        }
    }

    pub fn to_app_config(&self) -> AppConfig {
        let mut config = AppConfig {
            clinic_timezone: self.timezone,
            slot_start_hours: self.slot_start_hours.clone(),
            availability_horizon_days: self.horizon_days,
            notification_timeout_secs: 2,
            ..AppConfig::default()
        };

        if let Some(base) = &self.mock_base_url {
            config.email_api_url = format!("{}/email/send", base);
            config.email_api_key = "test-email-key".to_string();
            config.email_sender = "clinic@example.com".to_string();
            config.google_calendar_base_url = base.clone();
            config.google_calendar_access_token = "test-calendar-token".to_string();
            config.slack_webhook_url = format!("{}/slack/webhook", base);
            config.agent_url = format!("{}/agent", base);
        }

        config
    }

    pub fn to_arc(&self) -> Arc<AppConfig> {
        Arc::new(self.to_app_config())
    }

    pub fn clock(&self) -> ClinicClock {
        ClinicClock::new(self.timezone)
    }
}

/// In-memory store seeded with Dr. Evelyn Reed.
pub struct ClinicFixture {
    pub store: Arc<MemoryClinicStore>,
    pub clock: ClinicClock,
    pub doctor: Doctor,
}

impl ClinicFixture {
    pub async fn new() -> Self {
        Self::with_clock(TestConfig::default().clock()).await
    }

    pub async fn with_clock(clock: ClinicClock) -> Self {
        let store = Arc::new(MemoryClinicStore::new());
        let doctor = store
            .upsert_doctor(NewDoctor {
                name: REED_NAME.to_string(),
                specialty: "Neurology".to_string(),
                email: REED_EMAIL.to_string(),
                phone_number: Some("555-0101-2024".to_string()),
            })
            .await
            .expect("seed doctor");

        Self { store, clock, doctor }
    }

    pub fn store(&self) -> Arc<dyn ClinicStore> {
        self.store.clone()
    }

    pub async fn add_doctor(&self, name: &str, specialty: &str, email: &str) -> Doctor {
        self.store
            .upsert_doctor(NewDoctor {
                name: name.to_string(),
                specialty: specialty.to_string(),
                email: email.to_string(),
                phone_number: None,
            })
            .await
            .expect("insert doctor")
    }

    /// Opens a one-hour slot starting at the clinic-local `YYYY-MM-DD HH:MM:SS`.
    pub async fn open_slot(&self, doctor: &Doctor, local: &str) -> AvailabilitySlot {
        let start = self.clock.parse_local_datetime(local).expect("valid local time");
        self.store
            .add_slot(NewSlot {
                doctor_id: doctor.id,
                slot_date: self.clock.local_date(start),
                start_time: start,
                end_time: start + Duration::hours(1),
                is_booked: false,
            })
            .await
    }

    pub async fn open_day(&self, doctor: &Doctor, date: NaiveDate, hours: &[u32]) -> Vec<AvailabilitySlot> {
        let mut slots = Vec::with_capacity(hours.len());
        for hour in hours {
            let time = NaiveTime::from_hms_opt(*hour, 0, 0).expect("valid hour");
            let start = self.clock.at(date, time).expect("unambiguous local time");
            slots.push(
                self.store
                    .add_slot(NewSlot {
                        doctor_id: doctor.id,
                        slot_date: date,
                        start_time: start,
                        end_time: start + Duration::hours(1),
                        is_booked: false,
                    })
                    .await,
            );
        }
        slots
    }
}
