use std::collections::HashSet;
use std::str::FromStr;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use sqlx::postgres::{PgConnectOptions, PgPool, PgPoolOptions, PgRow};
use sqlx::{Postgres, Row, Transaction};
use tracing::{debug, info, warn};
use uuid::Uuid;

use shared_config::AppConfig;
use shared_models::{
    Appointment, AppointmentWithPatient, AvailabilitySlot, Doctor, NewAppointment, NewDoctor,
    NewSlot, Patient,
};

use crate::store::{BookedPair, ClinicStore, StoreError, StoreResult, UnitOfWork};

const DOCTOR_COLUMNS: &str = "id, name, specialty, email, phone_number";
const PATIENT_COLUMNS: &str = "id, name, email, phone_number, condition";
const SLOT_COLUMNS: &str = "id, doctor_id, slot_date, start_time, end_time, is_booked";
const APPOINTMENT_COLUMNS: &str = "id, patient_id, doctor_id, appointment_time, reason, status, created_at";

const UNIQUE_VIOLATION: &str = "23505";
const QUERY_CANCELED: &str = "57014";

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        match &err {
            sqlx::Error::Database(db) if db.code().as_deref() == Some(UNIQUE_VIOLATION) => {
                StoreError::Conflict(db.message().to_string())
            }
            sqlx::Error::Database(db) if db.code().as_deref() == Some(QUERY_CANCELED) => {
                StoreError::Timeout
            }
            sqlx::Error::PoolTimedOut => StoreError::Timeout,
            _ => StoreError::Database(err.to_string()),
        }
    }
}

/// PostgreSQL-backed store. Slot claims are conditional updates, so the row
/// lock taken by the update is what serialises concurrent reservations.
#[derive(Clone)]
pub struct PgClinicStore {
    pool: PgPool,
}

impl PgClinicStore {
    pub async fn connect(config: &AppConfig) -> StoreResult<Self> {
        let timeout = config.database_timeout();
        let options = PgConnectOptions::from_str(&config.database_url)?
            .options([("statement_timeout", timeout.as_millis().to_string())]);

        let pool = PgPoolOptions::new()
            .max_connections(config.database_max_connections)
            .acquire_timeout(timeout)
            .connect_with(options)
            .await?;

        info!(
            "Connected to PostgreSQL (max {} connections, {:?} timeout)",
            config.database_max_connections, timeout
        );
        Ok(Self { pool })
    }

    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    pub async fn migrate(&self) -> StoreResult<()> {
        info!("Running database migrations");
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(|e| StoreError::Database(format!("migration failed: {}", e)))?;
        info!("Database tables created or already exist");
        Ok(())
    }
}

#[async_trait]
impl ClinicStore for PgClinicStore {
    async fn begin(&self) -> StoreResult<Box<dyn UnitOfWork>> {
        let tx = self.pool.begin().await?;
        Ok(Box::new(PgUnitOfWork { tx }))
    }

    async fn list_doctors(&self) -> StoreResult<Vec<Doctor>> {
        let rows = sqlx::query(&format!("SELECT {} FROM doctors ORDER BY name", DOCTOR_COLUMNS))
            .fetch_all(&self.pool)
            .await?;
        collect_rows(&rows, doctor_from_row)
    }

    async fn find_doctor_by_email(&self, email: &str) -> StoreResult<Option<Doctor>> {
        let row = sqlx::query(&format!("SELECT {} FROM doctors WHERE email = $1", DOCTOR_COLUMNS))
            .bind(email)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.as_ref().map(doctor_from_row).transpose()?)
    }

    async fn search_doctor(&self, name_fragment: &str, email: &str) -> StoreResult<Option<Doctor>> {
        let row = sqlx::query(&format!(
            "SELECT {} FROM doctors WHERE name ILIKE $1 OR email = $2 ORDER BY name LIMIT 1",
            DOCTOR_COLUMNS
        ))
        .bind(contains_pattern(name_fragment))
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.as_ref().map(doctor_from_row).transpose()?)
    }

    async fn doctors_by_specialty(&self, specialty_fragment: &str) -> StoreResult<Vec<Doctor>> {
        let rows = sqlx::query(&format!(
            "SELECT {} FROM doctors WHERE specialty ILIKE $1 ORDER BY name",
            DOCTOR_COLUMNS
        ))
        .bind(contains_pattern(specialty_fragment))
        .fetch_all(&self.pool)
        .await?;
        collect_rows(&rows, doctor_from_row)
    }

    async fn upsert_doctor(&self, doctor: NewDoctor) -> StoreResult<Doctor> {
        // The no-op update makes RETURNING yield the existing row on conflict.
        let row = sqlx::query(&format!(
            r#"
            INSERT INTO doctors (name, specialty, email, phone_number)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (email) DO UPDATE SET email = EXCLUDED.email
            RETURNING {}
            "#,
            DOCTOR_COLUMNS
        ))
        .bind(&doctor.name)
        .bind(&doctor.specialty)
        .bind(&doctor.email)
        .bind(&doctor.phone_number)
        .fetch_one(&self.pool)
        .await?;
        Ok(doctor_from_row(&row)?)
    }

    async fn free_slots(&self, doctor_id: Uuid, date: NaiveDate) -> StoreResult<Vec<AvailabilitySlot>> {
        let rows = sqlx::query(&format!(
            r#"
            SELECT {} FROM availability_slots
            WHERE doctor_id = $1 AND slot_date = $2 AND is_booked = FALSE
            ORDER BY start_time
            "#,
            SLOT_COLUMNS
        ))
        .bind(doctor_id)
        .bind(date)
        .fetch_all(&self.pool)
        .await?;
        collect_rows(&rows, slot_from_row)
    }

    async fn appointments_between(
        &self,
        doctor_id: Uuid,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> StoreResult<Vec<AppointmentWithPatient>> {
        let rows = sqlx::query(
            r#"
            SELECT a.id, a.patient_id, a.doctor_id, a.appointment_time, a.reason, a.status,
                   a.created_at, p.name AS patient_name, p.email AS patient_email
            FROM appointments a
            JOIN patients p ON p.id = a.patient_id
            WHERE a.doctor_id = $1 AND a.appointment_time >= $2 AND a.appointment_time < $3
            ORDER BY a.appointment_time
            "#,
        )
        .bind(doctor_id)
        .bind(from)
        .bind(to)
        .fetch_all(&self.pool)
        .await?;

        collect_rows(&rows, |row| {
            Ok(AppointmentWithPatient {
                appointment: appointment_from_row(row)?,
                patient_name: row.try_get("patient_name")?,
                patient_email: row.try_get("patient_email")?,
            })
        })
    }

    async fn count_patients_between(&self, from: DateTime<Utc>, to: DateTime<Utc>) -> StoreResult<i64> {
        let row = sqlx::query(
            r#"
            SELECT COUNT(DISTINCT patient_id) AS patient_count
            FROM appointments
            WHERE appointment_time >= $1 AND appointment_time < $2
            "#,
        )
        .bind(from)
        .bind(to)
        .fetch_one(&self.pool)
        .await?;
        Ok(row.try_get("patient_count")?)
    }

    async fn patients_with_condition(&self, condition_fragment: &str) -> StoreResult<Vec<Patient>> {
        let rows = sqlx::query(&format!(
            "SELECT {} FROM patients WHERE condition ILIKE $1 ORDER BY name",
            PATIENT_COLUMNS
        ))
        .bind(contains_pattern(condition_fragment))
        .fetch_all(&self.pool)
        .await?;
        collect_rows(&rows, patient_from_row)
    }
}

pub struct PgUnitOfWork {
    tx: Transaction<'static, Postgres>,
}

#[async_trait]
impl UnitOfWork for PgUnitOfWork {
    async fn find_doctor_by_email(&mut self, email: &str) -> StoreResult<Option<Doctor>> {
        let row = sqlx::query(&format!("SELECT {} FROM doctors WHERE email = $1", DOCTOR_COLUMNS))
            .bind(email)
            .fetch_optional(&mut *self.tx)
            .await?;
        Ok(row.as_ref().map(doctor_from_row).transpose()?)
    }

    async fn claim_slot(
        &mut self,
        doctor_id: Uuid,
        start_time: DateTime<Utc>,
    ) -> StoreResult<Option<AvailabilitySlot>> {
        let row = sqlx::query(&format!(
            r#"
            UPDATE availability_slots
            SET is_booked = TRUE
            WHERE doctor_id = $1 AND start_time = $2 AND is_booked = FALSE
            RETURNING {}
            "#,
            SLOT_COLUMNS
        ))
        .bind(doctor_id)
        .bind(start_time)
        .fetch_optional(&mut *self.tx)
        .await?;
        Ok(row.as_ref().map(slot_from_row).transpose()?)
    }

    async fn scheduled_appointment_exists(
        &mut self,
        doctor_id: Uuid,
        appointment_time: DateTime<Utc>,
    ) -> StoreResult<bool> {
        let row = sqlx::query(
            r#"
            SELECT EXISTS (
                SELECT 1 FROM appointments
                WHERE doctor_id = $1 AND appointment_time = $2 AND status = 'scheduled'
            ) AS found
            "#,
        )
        .bind(doctor_id)
        .bind(appointment_time)
        .fetch_one(&mut *self.tx)
        .await?;
        Ok(row.try_get("found")?)
    }

    async fn find_or_create_patient(&mut self, email: &str, display_name: &str) -> StoreResult<Patient> {
        let existing = sqlx::query(&format!("SELECT {} FROM patients WHERE email = $1", PATIENT_COLUMNS))
            .bind(email)
            .fetch_optional(&mut *self.tx)
            .await?;
        if let Some(row) = existing {
            return Ok(patient_from_row(&row)?);
        }

        warn!("Patient with email {} not found. Creating a new patient.", email);
        let row = sqlx::query(&format!(
            r#"
            INSERT INTO patients (name, email)
            VALUES ($1, $2)
            ON CONFLICT (email) DO UPDATE SET email = EXCLUDED.email
            RETURNING {}
            "#,
            PATIENT_COLUMNS
        ))
        .bind(display_name)
        .bind(email)
        .fetch_one(&mut *self.tx)
        .await?;
        Ok(patient_from_row(&row)?)
    }

    async fn insert_appointment(&mut self, appointment: NewAppointment) -> StoreResult<Appointment> {
        let row = sqlx::query(&format!(
            r#"
            INSERT INTO appointments (patient_id, doctor_id, appointment_time, reason, status)
            VALUES ($1, $2, $3, $4, 'scheduled')
            RETURNING {}
            "#,
            APPOINTMENT_COLUMNS
        ))
        .bind(appointment.patient_id)
        .bind(appointment.doctor_id)
        .bind(appointment.appointment_time)
        .bind(&appointment.reason)
        .fetch_one(&mut *self.tx)
        .await?;
        Ok(appointment_from_row(&row)?)
    }

    async fn lock_slot_grid(&mut self) -> StoreResult<()> {
        // Conflicts with the ROW EXCLUSIVE lock taken by slot claims.
        sqlx::query("LOCK TABLE availability_slots IN SHARE ROW EXCLUSIVE MODE")
            .execute(&mut *self.tx)
            .await?;
        Ok(())
    }

    async fn list_doctors(&mut self) -> StoreResult<Vec<Doctor>> {
        let rows = sqlx::query(&format!("SELECT {} FROM doctors ORDER BY name", DOCTOR_COLUMNS))
            .fetch_all(&mut *self.tx)
            .await?;
        collect_rows(&rows, doctor_from_row)
    }

    async fn booked_pairs_since(&mut self, since: DateTime<Utc>) -> StoreResult<HashSet<BookedPair>> {
        let rows = sqlx::query(
            r#"
            SELECT doctor_id, appointment_time FROM appointments
            WHERE status = 'scheduled' AND appointment_time >= $1
            "#,
        )
        .bind(since)
        .fetch_all(&mut *self.tx)
        .await?;

        let pairs: Vec<BookedPair> = collect_rows(&rows, |row| {
            Ok((row.try_get("doctor_id")?, row.try_get("appointment_time")?))
        })?;
        Ok(pairs.into_iter().collect())
    }

    async fn delete_slots_from(&mut self, from: DateTime<Utc>) -> StoreResult<u64> {
        let result = sqlx::query("DELETE FROM availability_slots WHERE start_time >= $1")
            .bind(from)
            .execute(&mut *self.tx)
            .await?;
        Ok(result.rows_affected())
    }

    async fn insert_slots(&mut self, slots: &[NewSlot]) -> StoreResult<u64> {
        if slots.is_empty() {
            return Ok(0);
        }

        let doctor_ids: Vec<Uuid> = slots.iter().map(|s| s.doctor_id).collect();
        let dates: Vec<NaiveDate> = slots.iter().map(|s| s.slot_date).collect();
        let starts: Vec<DateTime<Utc>> = slots.iter().map(|s| s.start_time).collect();
        let ends: Vec<DateTime<Utc>> = slots.iter().map(|s| s.end_time).collect();
        let booked: Vec<bool> = slots.iter().map(|s| s.is_booked).collect();

        let result = sqlx::query(
            r#"
            INSERT INTO availability_slots (doctor_id, slot_date, start_time, end_time, is_booked)
            SELECT * FROM UNNEST($1::uuid[], $2::date[], $3::timestamptz[], $4::timestamptz[], $5::bool[])
            "#,
        )
        .bind(doctor_ids)
        .bind(dates)
        .bind(starts)
        .bind(ends)
        .bind(booked)
        .execute(&mut *self.tx)
        .await?;

        debug!("Inserted {} availability slots", result.rows_affected());
        Ok(result.rows_affected())
    }

    async fn commit(self: Box<Self>) -> StoreResult<()> {
        let PgUnitOfWork { tx } = *self;
        tx.commit().await?;
        Ok(())
    }
}

/// `%fragment%` for ILIKE, with LIKE metacharacters escaped.
fn contains_pattern(fragment: &str) -> String {
    let escaped = fragment
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    format!("%{}%", escaped)
}

fn collect_rows<T, F>(rows: &[PgRow], map: F) -> StoreResult<Vec<T>>
where
    F: Fn(&PgRow) -> Result<T, sqlx::Error>,
{
    rows.iter()
        .map(|row| map(row).map_err(StoreError::from))
        .collect()
}

fn doctor_from_row(row: &PgRow) -> Result<Doctor, sqlx::Error> {
    Ok(Doctor {
        id: row.try_get("id")?,
        name: row.try_get("name")?,
        specialty: row.try_get("specialty")?,
        email: row.try_get("email")?,
        phone_number: row.try_get("phone_number")?,
    })
}

fn patient_from_row(row: &PgRow) -> Result<Patient, sqlx::Error> {
    Ok(Patient {
        id: row.try_get("id")?,
        name: row.try_get("name")?,
        email: row.try_get("email")?,
        phone_number: row.try_get("phone_number")?,
        condition: row.try_get("condition")?,
    })
}

fn slot_from_row(row: &PgRow) -> Result<AvailabilitySlot, sqlx::Error> {
    Ok(AvailabilitySlot {
        id: row.try_get("id")?,
        doctor_id: row.try_get("doctor_id")?,
        slot_date: row.try_get("slot_date")?,
        start_time: row.try_get("start_time")?,
        end_time: row.try_get("end_time")?,
        is_booked: row.try_get("is_booked")?,
    })
}

fn appointment_from_row(row: &PgRow) -> Result<Appointment, sqlx::Error> {
    let status: String = row.try_get("status")?;
    Ok(Appointment {
        id: row.try_get("id")?,
        patient_id: row.try_get("patient_id")?,
        doctor_id: row.try_get("doctor_id")?,
        appointment_time: row.try_get("appointment_time")?,
        reason: row.try_get("reason")?,
        status: status.parse().map_err(|e: String| sqlx::Error::Decode(e.into()))?,
        created_at: row.try_get("created_at")?,
    })
}

#[cfg(test)]
mod tests {
    use super::contains_pattern;

    #[test]
    fn escapes_like_metacharacters() {
        assert_eq!(contains_pattern("neuro"), "%neuro%");
        assert_eq!(contains_pattern("50%_off"), "%50\\%\\_off%");
    }
}
