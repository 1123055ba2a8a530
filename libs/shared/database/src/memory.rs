use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::warn;
use uuid::Uuid;

use shared_models::{
    Appointment, AppointmentStatus, AppointmentWithPatient, AvailabilitySlot, Doctor,
    NewAppointment, NewDoctor, NewSlot, Patient,
};

use crate::store::{BookedPair, ClinicStore, StoreError, StoreResult, UnitOfWork};

#[derive(Debug, Clone, Default)]
struct ClinicState {
    doctors: Vec<Doctor>,
    patients: Vec<Patient>,
    slots: Vec<AvailabilitySlot>,
    appointments: Vec<Appointment>,
}

/// Process-local store used when no database is configured and in tests.
///
/// A unit of work holds the store's mutex for its whole lifetime and works
/// on a copy of the state, which is written back only on commit. Units of
/// work are therefore serialised and dropping one discards its changes.
#[derive(Clone, Default)]
pub struct MemoryClinicStore {
    state: Arc<Mutex<ClinicState>>,
    fail_commits: Arc<AtomicBool>,
    commit_delay_ms: Arc<AtomicU64>,
}

impl MemoryClinicStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every subsequent commit fail, simulating a lost connection at commit time.
    pub fn fail_commits(&self, fail: bool) {
        self.fail_commits.store(fail, Ordering::SeqCst);
    }

    /// Makes every subsequent commit take at least `delay`, simulating a slow round trip.
    pub fn delay_commits(&self, delay: Duration) {
        self.commit_delay_ms.store(delay.as_millis() as u64, Ordering::SeqCst);
    }

    pub async fn add_slot(&self, slot: NewSlot) -> AvailabilitySlot {
        let mut state = self.state.lock().await;
        let slot = AvailabilitySlot {
            id: Uuid::new_v4(),
            doctor_id: slot.doctor_id,
            slot_date: slot.slot_date,
            start_time: slot.start_time,
            end_time: slot.end_time,
            is_booked: slot.is_booked,
        };
        state.slots.push(slot.clone());
        slot
    }

    pub async fn add_patient(&self, name: &str, email: &str, condition: Option<&str>) -> Patient {
        let mut state = self.state.lock().await;
        let patient = Patient {
            id: Uuid::new_v4(),
            name: name.to_string(),
            email: email.to_string(),
            phone_number: None,
            condition: condition.map(str::to_string),
        };
        state.patients.push(patient.clone());
        patient
    }

    pub async fn slots(&self) -> Vec<AvailabilitySlot> {
        let mut slots = self.state.lock().await.slots.clone();
        slots.sort_by_key(|s| (s.doctor_id, s.start_time));
        slots
    }

    pub async fn appointments(&self) -> Vec<Appointment> {
        self.state.lock().await.appointments.clone()
    }

    pub async fn patients(&self) -> Vec<Patient> {
        self.state.lock().await.patients.clone()
    }
}

#[async_trait]
impl ClinicStore for MemoryClinicStore {
    async fn begin(&self) -> StoreResult<Box<dyn UnitOfWork>> {
        let guard = Arc::clone(&self.state).lock_owned().await;
        let working = (*guard).clone();
        Ok(Box::new(MemoryUnitOfWork {
            guard,
            working,
            fail_commit: self.fail_commits.load(Ordering::SeqCst),
            commit_delay: Duration::from_millis(self.commit_delay_ms.load(Ordering::SeqCst)),
        }))
    }

    async fn list_doctors(&self) -> StoreResult<Vec<Doctor>> {
        Ok(sorted_doctors(&self.state.lock().await.doctors))
    }

    async fn find_doctor_by_email(&self, email: &str) -> StoreResult<Option<Doctor>> {
        let state = self.state.lock().await;
        Ok(state.doctors.iter().find(|d| d.email == email).cloned())
    }

    async fn search_doctor(&self, name_fragment: &str, email: &str) -> StoreResult<Option<Doctor>> {
        let state = self.state.lock().await;
        Ok(sorted_doctors(&state.doctors)
            .into_iter()
            .find(|d| contains_ignore_case(&d.name, name_fragment) || d.email == email))
    }

    async fn doctors_by_specialty(&self, specialty_fragment: &str) -> StoreResult<Vec<Doctor>> {
        let state = self.state.lock().await;
        Ok(sorted_doctors(&state.doctors)
            .into_iter()
            .filter(|d| contains_ignore_case(&d.specialty, specialty_fragment))
            .collect())
    }

    async fn upsert_doctor(&self, doctor: NewDoctor) -> StoreResult<Doctor> {
        let mut state = self.state.lock().await;
        if let Some(existing) = state.doctors.iter().find(|d| d.email == doctor.email) {
            return Ok(existing.clone());
        }
        let doctor = Doctor {
            id: Uuid::new_v4(),
            name: doctor.name,
            specialty: doctor.specialty,
            email: doctor.email,
            phone_number: doctor.phone_number,
        };
        state.doctors.push(doctor.clone());
        Ok(doctor)
    }

    async fn free_slots(&self, doctor_id: Uuid, date: NaiveDate) -> StoreResult<Vec<AvailabilitySlot>> {
        let state = self.state.lock().await;
        let mut slots: Vec<AvailabilitySlot> = state
            .slots
            .iter()
            .filter(|s| s.doctor_id == doctor_id && s.slot_date == date && !s.is_booked)
            .cloned()
            .collect();
        slots.sort_by_key(|s| s.start_time);
        Ok(slots)
    }

    async fn appointments_between(
        &self,
        doctor_id: Uuid,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> StoreResult<Vec<AppointmentWithPatient>> {
        let state = self.state.lock().await;
        let mut rows = Vec::new();
        for appointment in state.appointments.iter().filter(|a| {
            a.doctor_id == doctor_id && a.appointment_time >= from && a.appointment_time < to
        }) {
            let patient = state
                .patients
                .iter()
                .find(|p| p.id == appointment.patient_id)
                .ok_or_else(|| {
                    StoreError::Database(format!(
                        "appointment {} references missing patient {}",
                        appointment.id, appointment.patient_id
                    ))
                })?;
            rows.push(AppointmentWithPatient {
                appointment: appointment.clone(),
                patient_name: patient.name.clone(),
                patient_email: patient.email.clone(),
            });
        }
        rows.sort_by_key(|r| r.appointment.appointment_time);
        Ok(rows)
    }

    async fn count_patients_between(&self, from: DateTime<Utc>, to: DateTime<Utc>) -> StoreResult<i64> {
        let state = self.state.lock().await;
        let patients: HashSet<Uuid> = state
            .appointments
            .iter()
            .filter(|a| a.appointment_time >= from && a.appointment_time < to)
            .map(|a| a.patient_id)
            .collect();
        Ok(patients.len() as i64)
    }

    async fn patients_with_condition(&self, condition_fragment: &str) -> StoreResult<Vec<Patient>> {
        let state = self.state.lock().await;
        let mut patients: Vec<Patient> = state
            .patients
            .iter()
            .filter(|p| {
                p.condition
                    .as_deref()
                    .map(|c| contains_ignore_case(c, condition_fragment))
                    .unwrap_or(false)
            })
            .cloned()
            .collect();
        patients.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(patients)
    }
}

pub struct MemoryUnitOfWork {
    guard: OwnedMutexGuard<ClinicState>,
    working: ClinicState,
    fail_commit: bool,
    commit_delay: Duration,
}

#[async_trait]
impl UnitOfWork for MemoryUnitOfWork {
    async fn find_doctor_by_email(&mut self, email: &str) -> StoreResult<Option<Doctor>> {
        Ok(self.working.doctors.iter().find(|d| d.email == email).cloned())
    }

    async fn claim_slot(
        &mut self,
        doctor_id: Uuid,
        start_time: DateTime<Utc>,
    ) -> StoreResult<Option<AvailabilitySlot>> {
        let slot = self
            .working
            .slots
            .iter_mut()
            .find(|s| s.doctor_id == doctor_id && s.start_time == start_time && !s.is_booked);

        Ok(slot.map(|s| {
            s.is_booked = true;
            s.clone()
        }))
    }

    async fn scheduled_appointment_exists(
        &mut self,
        doctor_id: Uuid,
        appointment_time: DateTime<Utc>,
    ) -> StoreResult<bool> {
        Ok(self.working.appointments.iter().any(|a| {
            a.doctor_id == doctor_id
                && a.appointment_time == appointment_time
                && a.status == AppointmentStatus::Scheduled
        }))
    }

    async fn find_or_create_patient(&mut self, email: &str, display_name: &str) -> StoreResult<Patient> {
        if let Some(patient) = self.working.patients.iter().find(|p| p.email == email) {
            return Ok(patient.clone());
        }

        warn!("Patient with email {} not found. Creating a new patient.", email);
        let patient = Patient {
            id: Uuid::new_v4(),
            name: display_name.to_string(),
            email: email.to_string(),
            phone_number: None,
            condition: None,
        };
        self.working.patients.push(patient.clone());
        Ok(patient)
    }

    async fn insert_appointment(&mut self, appointment: NewAppointment) -> StoreResult<Appointment> {
        let taken = self.scheduled_appointment_exists(appointment.doctor_id, appointment.appointment_time).await?;
        if taken {
            return Err(StoreError::Conflict(format!(
                "scheduled appointment already exists for doctor {} at {}",
                appointment.doctor_id, appointment.appointment_time
            )));
        }

        let appointment = Appointment {
            id: Uuid::new_v4(),
            patient_id: appointment.patient_id,
            doctor_id: appointment.doctor_id,
            appointment_time: appointment.appointment_time,
            reason: appointment.reason,
            status: AppointmentStatus::Scheduled,
            created_at: Utc::now(),
        };
        self.working.appointments.push(appointment.clone());
        Ok(appointment)
    }

    async fn lock_slot_grid(&mut self) -> StoreResult<()> {
        // The unit of work already holds the store-wide lock.
        Ok(())
    }

    async fn list_doctors(&mut self) -> StoreResult<Vec<Doctor>> {
        Ok(sorted_doctors(&self.working.doctors))
    }

    async fn booked_pairs_since(&mut self, since: DateTime<Utc>) -> StoreResult<HashSet<BookedPair>> {
        Ok(self
            .working
            .appointments
            .iter()
            .filter(|a| a.status == AppointmentStatus::Scheduled && a.appointment_time >= since)
            .map(|a| (a.doctor_id, a.appointment_time))
            .collect())
    }

    async fn delete_slots_from(&mut self, from: DateTime<Utc>) -> StoreResult<u64> {
        let before = self.working.slots.len();
        self.working.slots.retain(|s| s.start_time < from);
        Ok((before - self.working.slots.len()) as u64)
    }

    async fn insert_slots(&mut self, slots: &[NewSlot]) -> StoreResult<u64> {
        for slot in slots {
            let duplicate = self
                .working
                .slots
                .iter()
                .any(|s| s.doctor_id == slot.doctor_id && s.start_time == slot.start_time);
            if duplicate {
                return Err(StoreError::Conflict(format!(
                    "slot already exists for doctor {} at {}",
                    slot.doctor_id, slot.start_time
                )));
            }
            self.working.slots.push(AvailabilitySlot {
                id: Uuid::new_v4(),
                doctor_id: slot.doctor_id,
                slot_date: slot.slot_date,
                start_time: slot.start_time,
                end_time: slot.end_time,
                is_booked: slot.is_booked,
            });
        }
        Ok(slots.len() as u64)
    }

    async fn commit(self: Box<Self>) -> StoreResult<()> {
        let MemoryUnitOfWork { mut guard, working, fail_commit, commit_delay } = *self;
        if !commit_delay.is_zero() {
            tokio::time::sleep(commit_delay).await;
        }
        if fail_commit {
            return Err(StoreError::Database("commit rejected by store".to_string()));
        }
        *guard = working;
        Ok(())
    }
}

fn contains_ignore_case(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(&needle.to_lowercase())
}

fn sorted_doctors(doctors: &[Doctor]) -> Vec<Doctor> {
    let mut doctors = doctors.to_vec();
    doctors.sort_by(|a, b| a.name.cmp(&b.name));
    doctors
}
