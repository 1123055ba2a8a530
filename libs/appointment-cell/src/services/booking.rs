use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tracing::{info, warn};

use notification_cell::{AppointmentSummary, NotificationFanout};
use shared_config::AppConfig;
use shared_database::{ClinicStore, StoreError, UnitOfWork};
use shared_models::NewAppointment;
use shared_utils::ClinicClock;

use crate::models::{BookAppointmentRequest, BookingResult, Reservation, ReservationError, ReservationOutcome};

pub struct AppointmentBookingService {
    store: Arc<dyn ClinicStore>,
    fanout: Arc<NotificationFanout>,
    clock: ClinicClock,
    timeout: Duration,
}

impl AppointmentBookingService {
    pub fn new(
        store: Arc<dyn ClinicStore>,
        fanout: Arc<NotificationFanout>,
        clock: ClinicClock,
        timeout: Duration,
    ) -> Self {
        Self { store, fanout, clock, timeout }
    }

    pub fn from_config(store: Arc<dyn ClinicStore>, fanout: Arc<NotificationFanout>, config: &AppConfig) -> Self {
        Self::new(store, fanout, ClinicClock::from_config(config), config.database_timeout())
    }

    /// Books the appointment, then notifies the patient and the calendar.
    pub async fn book(&self, request: BookAppointmentRequest) -> BookingResult {
        let outcome = self
            .reserve(
                &request.doctor_email,
                &request.appointment_time_str,
                &request.patient_email,
                request.reason.clone(),
            )
            .await;

        match outcome {
            Ok(reservation) => {
                let report = self.fanout.notify(&summary_of(&reservation)).await;
                BookingResult::booked(&reservation, report)
            }
            Err(e) => {
                warn!("Booking for {} with {} rejected: {}", request.patient_email, request.doctor_email, e);
                BookingResult::failed(&e)
            }
        }
    }

    /// Claims the doctor's free slot at the requested clinic-local time and
    /// writes a scheduled appointment for it, all in one unit of work.
    pub async fn reserve(
        &self,
        doctor_email: &str,
        requested_start_time: &str,
        patient_email: &str,
        reason: Option<String>,
    ) -> ReservationOutcome {
        let start = self
            .clock
            .parse_local_datetime(requested_start_time)
            .map_err(|e| ReservationError::Validation(e.to_string()))?;

        let doctor_email = doctor_email.trim();
        if doctor_email.is_empty() {
            return Err(ReservationError::Validation("Doctor email must be provided.".to_string()));
        }

        let patient_email = patient_email.trim();
        let parts = patient_email
            .split_once('@')
            .filter(|(local, domain)| !local.is_empty() && !domain.is_empty());
        let Some((local_part, _)) = parts else {
            return Err(ReservationError::Validation(format!(
                "'{}' is not a valid patient email.",
                patient_email
            )));
        };

        let reason = reason.map(|r| r.trim().to_string()).filter(|r| !r.is_empty());
        let requested = requested_start_time.trim();

        let staged = self.stage_reservation(doctor_email, start, requested, patient_email, local_part, reason);
        let (uow, reservation) = match tokio::time::timeout(self.timeout, staged).await {
            Ok(staged) => staged?,
            Err(_) => return Err(ReservationError::Persistence(StoreError::Timeout.to_string())),
        };

        // Outside the timeout; the store's statement timeout bounds the commit.
        uow.commit().await?;

        info!("Appointment created with ID: {}", reservation.appointment.id);

        Ok(reservation)
    }

    /// Everything up to the commit. Dropping the returned unit of work rolls it back.
    async fn stage_reservation(
        &self,
        doctor_email: &str,
        start: DateTime<Utc>,
        requested: &str,
        patient_email: &str,
        patient_name: &str,
        reason: Option<String>,
    ) -> Result<(Box<dyn UnitOfWork>, Reservation), ReservationError> {
        let mut uow = self.store.begin().await?;

        let doctor = uow
            .find_doctor_by_email(doctor_email)
            .await?
            .ok_or_else(|| ReservationError::DoctorNotFound { email: doctor_email.to_string() })?;

        let slot = uow
            .claim_slot(doctor.id, start)
            .await?
            .ok_or_else(|| ReservationError::SlotUnavailable { requested: requested.to_string() })?;

        if uow.scheduled_appointment_exists(doctor.id, start).await? {
            return Err(ReservationError::DuplicateAppointment { requested: requested.to_string() });
        }

        let patient = uow.find_or_create_patient(patient_email, patient_name).await?;

        let appointment = uow
            .insert_appointment(NewAppointment {
                patient_id: patient.id,
                doctor_id: doctor.id,
                appointment_time: start,
                reason,
            })
            .await
            .map_err(|e| match e {
                StoreError::Conflict(_) => ReservationError::DuplicateAppointment { requested: requested.to_string() },
                other => ReservationError::from(other),
            })?;

        Ok((uow, Reservation { appointment, slot, doctor, patient }))
    }
}

fn summary_of(reservation: &Reservation) -> AppointmentSummary {
    AppointmentSummary {
        appointment_id: reservation.appointment.id,
        patient_name: reservation.patient.name.clone(),
        patient_email: reservation.patient.email.clone(),
        doctor_name: reservation.doctor.name.clone(),
        doctor_email: reservation.doctor.email.clone(),
        start_time: reservation.slot.start_time,
        end_time: reservation.slot.end_time,
        reason: reservation.appointment.reason.clone(),
    }
}
