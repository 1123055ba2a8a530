use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use shared_database::StoreError;
use shared_models::error::AppError;
use shared_models::Doctor;
use shared_utils::TimeError;

// ==============================================================================
// DIRECTORY
// ==============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DoctorContact {
    pub name: String,
    pub email: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DoctorDetails {
    pub name: String,
    pub specialty: String,
    pub email: String,
}

impl From<&Doctor> for DoctorDetails {
    fn from(doctor: &Doctor) -> Self {
        Self {
            name: doctor.name.clone(),
            specialty: doctor.specialty.clone(),
            email: doctor.email.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpecialtySearch {
    pub status: String,
    pub specialty: String,
    #[serde(default)]
    pub doctors: Vec<DoctorContact>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DoctorDetailsLookup {
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub doctor_details: Option<DoctorDetails>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

// ==============================================================================
// AVAILABILITY
// ==============================================================================

/// Result of listing a doctor's open slots for one day.
///
/// An empty day is still a success; `message` then explains why no slot is
/// offered.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AvailabilityListing {
    pub status: String,
    pub doctor_name: String,
    pub doctor_email: String,
    pub date: NaiveDate,
    #[serde(default)]
    pub available_slots: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl AvailabilityListing {
    pub fn is_empty(&self) -> bool {
        self.available_slots.is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct RefreshReport {
    pub doctors: usize,
    pub slots_removed: u64,
    pub slots_created: u64,
    pub preserved_bookings: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SeedReport {
    pub status: String,
    pub doctors: Vec<DoctorContact>,
    pub availability: RefreshReport,
}

// ==============================================================================
// ERRORS
// ==============================================================================

#[derive(Error, Debug)]
pub enum DoctorError {
    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Validation(String),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("Availability refresh timed out")]
    Timeout,
}

impl From<TimeError> for DoctorError {
    fn from(err: TimeError) -> Self {
        DoctorError::Validation(err.to_string())
    }
}

impl From<DoctorError> for AppError {
    fn from(err: DoctorError) -> Self {
        match err {
            DoctorError::NotFound(msg) => AppError::NotFound(msg),
            DoctorError::Validation(msg) => AppError::ValidationError(msg),
            DoctorError::Store(e) => AppError::Database(e.to_string()),
            DoctorError::Timeout => AppError::Internal("Availability refresh timed out".to_string()),
        }
    }
}
