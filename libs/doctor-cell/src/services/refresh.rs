use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use chrono::NaiveTime;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use shared_config::AppConfig;
use shared_database::{BookedPair, ClinicStore};
use shared_models::NewSlot;
use shared_utils::ClinicClock;

use crate::models::{DoctorError, RefreshReport};

/// Regenerates the slot grid for the coming days without ever unbooking a
/// scheduled appointment.
pub struct AvailabilityRefreshService {
    store: Arc<dyn ClinicStore>,
    clock: ClinicClock,
    start_hours: Vec<u32>,
    slot_duration: chrono::Duration,
    timeout: Duration,
}

impl AvailabilityRefreshService {
    pub fn new(
        store: Arc<dyn ClinicStore>,
        clock: ClinicClock,
        start_hours: Vec<u32>,
        slot_duration: chrono::Duration,
        timeout: Duration,
    ) -> Self {
        Self { store, clock, start_hours, slot_duration, timeout }
    }

    pub fn from_config(store: Arc<dyn ClinicStore>, config: &AppConfig) -> Self {
        Self::new(
            store,
            ClinicClock::from_config(config),
            config.slot_start_hours.clone(),
            chrono::Duration::minutes(config.slot_duration_minutes),
            config.database_timeout(),
        )
    }

    pub async fn refresh(&self, horizon_days: u32) -> Result<RefreshReport, DoctorError> {
        if horizon_days == 0 {
            return Err(DoctorError::Validation("horizon_days must be at least 1".to_string()));
        }

        info!("Refreshing doctor availability schedule for {} days", horizon_days);

        tokio::time::timeout(self.timeout, self.refresh_in_unit_of_work(horizon_days))
            .await
            .map_err(|_| DoctorError::Timeout)?
    }

    async fn refresh_in_unit_of_work(&self, horizon_days: u32) -> Result<RefreshReport, DoctorError> {
        let mut uow = self.store.begin().await?;
        uow.lock_slot_grid().await?;

        let today = self.clock.today();
        let window_start = self.clock.start_of_day(today);

        // Must be read before any slot is deleted.
        let preserved = uow.booked_pairs_since(window_start).await?;

        let doctors = uow.list_doctors().await?;
        if doctors.is_empty() {
            warn!("No doctors found in the database to refresh availability for.");
            return Ok(RefreshReport::default());
        }

        let slots_removed = uow.delete_slots_from(window_start).await?;

        let mut slots = Vec::new();
        let mut produced: HashSet<BookedPair> = HashSet::new();
        for doctor in &doctors {
            for offset in 0..horizon_days {
                let Some(date) = today.checked_add_days(chrono::Days::new(u64::from(offset))) else {
                    continue;
                };
                for hour in &self.start_hours {
                    let Some(time) = NaiveTime::from_hms_opt(*hour, 0, 0) else {
                        warn!("Skipping invalid slot start hour {}", hour);
                        continue;
                    };
                    let start = match self.clock.at(date, time) {
                        Ok(start) => start,
                        Err(e) => {
                            warn!("Skipping slot for {} on {}: {}", doctor.email, date, e);
                            continue;
                        }
                    };

                    produced.insert((doctor.id, start));
                    slots.push(NewSlot {
                        doctor_id: doctor.id,
                        slot_date: date,
                        start_time: start,
                        end_time: start + self.slot_duration,
                        is_booked: preserved.contains(&(doctor.id, start)),
                    });
                }
            }
        }

        let mut orphaned: Vec<&BookedPair> = preserved.difference(&produced).collect();
        orphaned.sort();
        for (doctor_id, start) in orphaned {
            slots.push(NewSlot {
                doctor_id: *doctor_id,
                slot_date: self.clock.local_date(*start),
                start_time: *start,
                end_time: *start + self.slot_duration,
                is_booked: true,
            });
        }

        let slots_created = uow.insert_slots(&slots).await?;
        uow.commit().await?;

        let report = RefreshReport {
            doctors: doctors.len(),
            slots_removed,
            slots_created,
            preserved_bookings: preserved.len(),
        };

        info!(
            "Refreshed availability for {} doctors, preserving {} existing bookings.",
            report.doctors, report.preserved_bookings
        );

        Ok(report)
    }

    /// Runs the refresh on a fixed interval. The first run starts immediately.
    pub fn spawn_periodic(self: Arc<Self>, every: Duration, horizon_days: u32) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(every);
            loop {
                interval.tick().await;
                if let Err(e) = self.refresh(horizon_days).await {
                    error!("Scheduled availability refresh failed: {}", e);
                }
            }
        })
    }
}
