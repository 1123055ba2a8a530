use std::collections::HashSet;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use thiserror::Error;
use uuid::Uuid;

use shared_models::{
    Appointment, AppointmentWithPatient, AvailabilitySlot, Doctor, NewAppointment, NewDoctor,
    NewSlot, Patient,
};

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(String),

    #[error("Constraint violation: {0}")]
    Conflict(String),

    #[error("Database operation timed out")]
    Timeout,
}

pub type StoreResult<T> = Result<T, StoreError>;

/// A (doctor, start time) pair held by a scheduled appointment.
pub type BookedPair = (Uuid, DateTime<Utc>);

/// Persistence boundary for doctors, patients, availability slots and appointments.
///
/// Read paths live directly on the store. Every mutation goes through a
/// [`UnitOfWork`] obtained from [`ClinicStore::begin`], which is rolled back
/// when dropped without [`UnitOfWork::commit`].
#[async_trait]
pub trait ClinicStore: Send + Sync {
    async fn begin(&self) -> StoreResult<Box<dyn UnitOfWork>>;

    async fn list_doctors(&self) -> StoreResult<Vec<Doctor>>;

    async fn find_doctor_by_email(&self, email: &str) -> StoreResult<Option<Doctor>>;

    /// First doctor whose name contains `name_fragment` (case-insensitive) or
    /// whose email equals `email`.
    async fn search_doctor(&self, name_fragment: &str, email: &str) -> StoreResult<Option<Doctor>>;

    async fn doctors_by_specialty(&self, specialty_fragment: &str) -> StoreResult<Vec<Doctor>>;

    /// Inserts the doctor unless one with the same email exists; returns the stored row.
    async fn upsert_doctor(&self, doctor: NewDoctor) -> StoreResult<Doctor>;

    /// Unbooked slots for a doctor on a clinic-local date, ordered by start time.
    async fn free_slots(&self, doctor_id: Uuid, date: NaiveDate) -> StoreResult<Vec<AvailabilitySlot>>;

    /// Appointments for a doctor in `[from, to)`, ordered by time.
    async fn appointments_between(
        &self,
        doctor_id: Uuid,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> StoreResult<Vec<AppointmentWithPatient>>;

    /// Distinct patients holding appointments in `[from, to)`.
    async fn count_patients_between(&self, from: DateTime<Utc>, to: DateTime<Utc>) -> StoreResult<i64>;

    async fn patients_with_condition(&self, condition_fragment: &str) -> StoreResult<Vec<Patient>>;
}

/// A single database transaction.
#[async_trait]
pub trait UnitOfWork: Send {
    async fn find_doctor_by_email(&mut self, email: &str) -> StoreResult<Option<Doctor>>;

    /// Flips `is_booked` on the doctor's slot starting at `start_time` if and
    /// only if it exists and is free. Returns `None` otherwise. The claimed
    /// row stays locked until the unit of work ends.
    async fn claim_slot(
        &mut self,
        doctor_id: Uuid,
        start_time: DateTime<Utc>,
    ) -> StoreResult<Option<AvailabilitySlot>>;

    async fn scheduled_appointment_exists(
        &mut self,
        doctor_id: Uuid,
        appointment_time: DateTime<Utc>,
    ) -> StoreResult<bool>;

    async fn find_or_create_patient(&mut self, email: &str, display_name: &str) -> StoreResult<Patient>;

    async fn insert_appointment(&mut self, appointment: NewAppointment) -> StoreResult<Appointment>;

    /// Blocks slot claims until this unit of work ends.
    async fn lock_slot_grid(&mut self) -> StoreResult<()>;

    async fn list_doctors(&mut self) -> StoreResult<Vec<Doctor>>;

    /// Scheduled appointments at or after `since`.
    async fn booked_pairs_since(&mut self, since: DateTime<Utc>) -> StoreResult<HashSet<BookedPair>>;

    /// Deletes every slot starting at or after `from`; returns the number removed.
    async fn delete_slots_from(&mut self, from: DateTime<Utc>) -> StoreResult<u64>;

    async fn insert_slots(&mut self, slots: &[NewSlot]) -> StoreResult<u64>;

    async fn commit(self: Box<Self>) -> StoreResult<()>;
}
