use std::sync::Arc;

use tracing::info;

use shared_database::ClinicStore;
use shared_models::NewDoctor;

use crate::models::{DoctorContact, DoctorError, SeedReport};
use crate::services::AvailabilityRefreshService;

struct RosterEntry {
    name: &'static str,
    specialty: &'static str,
    email: &'static str,
    phone_number: &'static str,
}

const ROSTER: &[RosterEntry] = &[RosterEntry {
    name: "Dr. Evelyn Reed",
    specialty: "Neurology",
    email: "e.reed.neuro@clinic.com",
    phone_number: "555-0101-2024",
}];

pub struct SeederService {
    store: Arc<dyn ClinicStore>,
    refresh: Arc<AvailabilityRefreshService>,
}

impl SeederService {
    pub fn new(store: Arc<dyn ClinicStore>, refresh: Arc<AvailabilityRefreshService>) -> Self {
        Self { store, refresh }
    }

    /// Ensures the predefined doctors exist, then regenerates availability.
    /// Existing rows are never modified.
    pub async fn seed_all(&self, horizon_days: u32) -> Result<SeedReport, DoctorError> {
        info!("Running seeder...");

        let mut doctors = Vec::with_capacity(ROSTER.len());
        for entry in ROSTER {
            let doctor = self
                .store
                .upsert_doctor(NewDoctor {
                    name: entry.name.to_string(),
                    specialty: entry.specialty.to_string(),
                    email: entry.email.to_string(),
                    phone_number: Some(entry.phone_number.to_string()),
                })
                .await?;
            doctors.push(DoctorContact { name: doctor.name, email: doctor.email });
        }

        let availability = self.refresh.refresh(horizon_days).await?;

        info!("Seeding complete: {} reference doctors present", doctors.len());

        Ok(SeedReport {
            status: "success".to_string(),
            doctors,
            availability,
        })
    }
}
