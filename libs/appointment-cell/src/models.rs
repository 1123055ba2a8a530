use axum::http::StatusCode;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use notification_cell::{ChannelStatus, NotificationReport};
use shared_database::StoreError;
use shared_models::error::AppError;
use shared_models::{Appointment, AvailabilitySlot, Doctor, Patient};

pub const NOT_ATTEMPTED: &str = "not attempted";

// ==============================================================================
// BOOKING
// ==============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookAppointmentRequest {
    pub patient_email: String,
    pub doctor_email: String,
    /// Clinic-local `YYYY-MM-DD HH:MM:SS`.
    pub appointment_time_str: String,
    pub reason: Option<String>,
}

/// A committed reservation: the claimed slot and the appointment written for it.
#[derive(Debug, Clone, Serialize)]
pub struct Reservation {
    pub appointment: Appointment,
    pub slot: AvailabilitySlot,
    pub doctor: Doctor,
    pub patient: Patient,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Validation,
    NotFound,
    Conflict,
    Persistence,
}

impl ErrorKind {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ErrorKind::Validation => StatusCode::BAD_REQUEST,
            ErrorKind::NotFound => StatusCode::NOT_FOUND,
            ErrorKind::Conflict => StatusCode::CONFLICT,
            ErrorKind::Persistence => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ReservationError {
    #[error("{0}")]
    Validation(String),

    #[error("Doctor with email {email} not found.")]
    DoctorNotFound { email: String },

    #[error("The requested time slot {requested} is not available or already booked.")]
    SlotUnavailable { requested: String },

    #[error("An appointment already exists at {requested}.")]
    DuplicateAppointment { requested: String },

    #[error("Database error: {0}")]
    Persistence(String),
}

impl ReservationError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ReservationError::Validation(_) => ErrorKind::Validation,
            ReservationError::DoctorNotFound { .. } => ErrorKind::NotFound,
            ReservationError::SlotUnavailable { .. } | ReservationError::DuplicateAppointment { .. } => {
                ErrorKind::Conflict
            }
            ReservationError::Persistence(_) => ErrorKind::Persistence,
        }
    }
}

impl From<StoreError> for ReservationError {
    fn from(err: StoreError) -> Self {
        ReservationError::Persistence(err.to_string())
    }
}

pub type ReservationOutcome = Result<Reservation, ReservationError>;

/// What the caller of the booking tool receives. The ledger outcome and the
/// per-channel notification outcomes are reported independently.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookingResult {
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub appointment_id: Option<Uuid>,
    pub message: String,
    pub email_status: String,
    pub calendar_status: String,
    #[serde(skip)]
    pub error_kind: Option<ErrorKind>,
    #[serde(skip)]
    pub notifications: Option<NotificationReport>,
}

impl BookingResult {
    pub fn booked(reservation: &Reservation, report: NotificationReport) -> Self {
        let email_status = report.email.to_string();
        let calendar_status = report.calendar.to_string();
        Self {
            status: "success".to_string(),
            appointment_id: Some(reservation.appointment.id),
            message: format!(
                "Appointment created with ID {}. Email: {}. Calendar: {}",
                reservation.appointment.id, email_status, calendar_status
            ),
            email_status,
            calendar_status,
            error_kind: None,
            notifications: Some(report),
        }
    }

    pub fn failed(err: &ReservationError) -> Self {
        Self {
            status: "error".to_string(),
            appointment_id: None,
            message: err.to_string(),
            email_status: NOT_ATTEMPTED.to_string(),
            calendar_status: NOT_ATTEMPTED.to_string(),
            error_kind: Some(err.kind()),
            notifications: None,
        }
    }

    pub fn is_success(&self) -> bool {
        self.error_kind.is_none()
    }

    pub fn status_code(&self) -> StatusCode {
        self.error_kind.map(|k| k.status_code()).unwrap_or(StatusCode::OK)
    }
}

// ==============================================================================
// REPORTING
// ==============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppointmentSummaryReport {
    pub status: String,
    pub message: String,
    pub appointment_count: usize,
    pub chat_status: ChannelStatus,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PatientCountReport {
    pub status: String,
    pub message: String,
    pub date: NaiveDate,
    pub patient_count: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PatientConditionMatch {
    pub patient_name: String,
    pub patient_email: String,
    pub condition: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PatientsWithConditionReport {
    pub status: String,
    pub message: String,
    #[serde(default)]
    pub patients: Vec<PatientConditionMatch>,
}

#[derive(Error, Debug)]
pub enum ReportingError {
    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Validation(String),

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl From<ReportingError> for AppError {
    fn from(err: ReportingError) -> Self {
        match err {
            ReportingError::NotFound(msg) => AppError::NotFound(msg),
            ReportingError::Validation(msg) => AppError::ValidationError(msg),
            ReportingError::Store(e) => AppError::Database(e.to_string()),
        }
    }
}
