use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info, warn};

use notification_cell::CalendarService;
use shared_database::ClinicStore;
use shared_models::{AvailabilitySlot, Doctor};
use shared_utils::time::DATE_FORMAT;
use shared_utils::ClinicClock;

use crate::models::{AvailabilityListing, DoctorError};
use crate::services::DoctorDirectoryService;

pub struct AvailabilityService {
    store: Arc<dyn ClinicStore>,
    directory: Arc<DoctorDirectoryService>,
    calendar: Option<Arc<dyn CalendarService>>,
    clock: ClinicClock,
    calendar_timeout: Duration,
}

impl AvailabilityService {
    pub fn new(
        store: Arc<dyn ClinicStore>,
        directory: Arc<DoctorDirectoryService>,
        calendar: Option<Arc<dyn CalendarService>>,
        clock: ClinicClock,
        calendar_timeout: Duration,
    ) -> Self {
        Self { store, directory, calendar, clock, calendar_timeout }
    }

    pub async fn list_availability(
        &self,
        doctor_name_or_email: &str,
        target_date: Option<&str>,
    ) -> Result<AvailabilityListing, DoctorError> {
        let doctor = self.directory.resolve(doctor_name_or_email).await?;
        let date = self.clock.parse_date_or_today(target_date)?;
        let date_str = date.format(DATE_FORMAT).to_string();

        let free = self.store.free_slots(doctor.id, date).await?;
        if free.is_empty() {
            return Ok(self.empty_listing(
                &doctor,
                date,
                format!("Dr. {} has no scheduled availability on {}.", doctor.display_name(), date_str),
            ));
        }

        let open = self.filter_busy(&doctor, free).await;
        if open.is_empty() {
            return Ok(self.empty_listing(
                &doctor,
                date,
                format!(
                    "Dr. {} has no available slots on {} after checking the calendar.",
                    doctor.display_name(),
                    date_str
                ),
            ));
        }

        info!("Dr. {} has {} open slots on {}", doctor.display_name(), open.len(), date_str);

        Ok(AvailabilityListing {
            status: "success".to_string(),
            doctor_name: doctor.name.clone(),
            doctor_email: doctor.email.clone(),
            date,
            available_slots: open
                .iter()
                .map(|slot| self.clock.format_time_of_day(slot.start_time))
                .collect(),
            message: None,
        })
    }

    /// Drops slots overlapping a busy period on the doctor's calendar.
    /// Offers nothing when the calendar cannot be read.
    async fn filter_busy(&self, doctor: &Doctor, slots: Vec<AvailabilitySlot>) -> Vec<AvailabilitySlot> {
        let Some(calendar) = &self.calendar else {
            debug!("Calendar not configured, offering unfiltered slots for {}", doctor.email);
            return slots;
        };

        let (Some(from), Some(to)) = (
            slots.iter().map(|s| s.start_time).min(),
            slots.iter().map(|s| s.end_time).max(),
        ) else {
            return slots;
        };

        let busy = match tokio::time::timeout(self.calendar_timeout, calendar.busy_periods(&doctor.email, from, to)).await {
            Ok(Ok(busy)) => busy,
            Ok(Err(e)) => {
                warn!("Calendar lookup for {} failed, offering no slots: {}", doctor.email, e);
                return Vec::new();
            }
            Err(_) => {
                warn!("Calendar lookup for {} timed out, offering no slots", doctor.email);
                return Vec::new();
            }
        };

        slots
            .into_iter()
            .filter(|slot| !busy.iter().any(|period| slot.overlaps(period.start, period.end)))
            .collect()
    }

    fn empty_listing(&self, doctor: &Doctor, date: chrono::NaiveDate, message: String) -> AvailabilityListing {
        info!("{}", message);
        AvailabilityListing {
            status: "success".to_string(),
            doctor_name: doctor.name.clone(),
            doctor_email: doctor.email.clone(),
            date,
            available_slots: Vec::new(),
            message: Some(message),
        }
    }
}
