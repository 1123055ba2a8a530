use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ==============================================================================
// REFERENCE DATA
// ==============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Doctor {
    pub id: Uuid,
    pub name: String,
    pub specialty: String,
    pub email: String,
    pub phone_number: Option<String>,
}

impl Doctor {
    /// Name without a leading "Dr. " honorific, for templates that add their own.
    pub fn display_name(&self) -> &str {
        strip_honorific(&self.name)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewDoctor {
    pub name: String,
    pub specialty: String,
    pub email: String,
    pub phone_number: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Patient {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub phone_number: Option<String>,
    pub condition: Option<String>,
}

// ==============================================================================
// AVAILABILITY STORE
// ==============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AvailabilitySlot {
    pub id: Uuid,
    pub doctor_id: Uuid,
    /// Calendar date of the slot in clinic time.
    pub slot_date: NaiveDate,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub is_booked: bool,
}

impl AvailabilitySlot {
    pub fn overlaps(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> bool {
        self.start_time < end && start < self.end_time
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewSlot {
    pub doctor_id: Uuid,
    pub slot_date: NaiveDate,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub is_booked: bool,
}

// ==============================================================================
// APPOINTMENT LEDGER
// ==============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AppointmentStatus {
    Scheduled,
    Completed,
    Cancelled,
}

impl AppointmentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AppointmentStatus::Scheduled => "scheduled",
            AppointmentStatus::Completed => "completed",
            AppointmentStatus::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for AppointmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AppointmentStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "scheduled" => Ok(AppointmentStatus::Scheduled),
            "completed" => Ok(AppointmentStatus::Completed),
            "cancelled" => Ok(AppointmentStatus::Cancelled),
            other => Err(format!("unknown appointment status '{}'", other)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Appointment {
    pub id: Uuid,
    pub patient_id: Uuid,
    pub doctor_id: Uuid,
    pub appointment_time: DateTime<Utc>,
    pub reason: Option<String>,
    pub status: AppointmentStatus,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewAppointment {
    pub patient_id: Uuid,
    pub doctor_id: Uuid,
    pub appointment_time: DateTime<Utc>,
    pub reason: Option<String>,
}

/// Appointment joined with the patient it belongs to, for reporting.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppointmentWithPatient {
    pub appointment: Appointment,
    pub patient_name: String,
    pub patient_email: String,
}

pub fn strip_honorific(name: &str) -> &str {
    let trimmed = name.trim();
    trimmed.strip_prefix("Dr. ").unwrap_or(trimmed).trim()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn strips_leading_honorific_only() {
        assert_eq!(strip_honorific("Dr. Evelyn Reed"), "Evelyn Reed");
        assert_eq!(strip_honorific("  Evelyn Reed "), "Evelyn Reed");
        assert_eq!(strip_honorific("Evelyn Dr. Reed"), "Evelyn Dr. Reed");
    }

    #[test]
    fn status_round_trips_through_text() {
        assert_eq!("scheduled".parse::<AppointmentStatus>(), Ok(AppointmentStatus::Scheduled));
        assert!("rescheduled".parse::<AppointmentStatus>().is_err());
    }

    #[test]
    fn slot_overlap_is_half_open() {
        let start = Utc.with_ymd_and_hms(2025, 3, 10, 3, 30, 0).unwrap();
        let slot = AvailabilitySlot {
            id: Uuid::new_v4(),
            doctor_id: Uuid::new_v4(),
            slot_date: NaiveDate::from_ymd_opt(2025, 3, 10).unwrap(),
            start_time: start,
            end_time: start + chrono::Duration::hours(1),
            is_booked: false,
        };

        assert!(slot.overlaps(start + chrono::Duration::minutes(30), start + chrono::Duration::hours(2)));
        assert!(!slot.overlaps(start + chrono::Duration::hours(1), start + chrono::Duration::hours(2)));
    }
}
