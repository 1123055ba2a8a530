use std::sync::Arc;

use tracing::{debug, info};

use shared_database::ClinicStore;
use shared_models::{strip_honorific, Doctor};

use crate::models::{DoctorContact, DoctorDetails, DoctorDetailsLookup, DoctorError, SpecialtySearch};

pub struct DoctorDirectoryService {
    store: Arc<dyn ClinicStore>,
}

impl DoctorDirectoryService {
    pub fn new(store: Arc<dyn ClinicStore>) -> Self {
        Self { store }
    }

    /// Case-insensitive specialty search. "Neurologist" finds "Neurology".
    pub async fn doctors_by_specialty(&self, specialty: &str) -> Result<SpecialtySearch, DoctorError> {
        let specialty = specialty.trim();
        if specialty.is_empty() {
            return Err(DoctorError::Validation("Specialty must be provided.".to_string()));
        }

        let term = specialty_stem(specialty);
        let doctors = self.store.doctors_by_specialty(term).await?;

        if doctors.is_empty() {
            return Ok(SpecialtySearch {
                status: "success".to_string(),
                specialty: specialty.to_string(),
                doctors: Vec::new(),
                message: Some(format!("No doctors found with the specialty '{}'.", specialty)),
            });
        }

        let doctors: Vec<DoctorContact> = doctors
            .into_iter()
            .map(|d| DoctorContact { name: d.name, email: d.email })
            .collect();

        info!("Found {} doctors with specialty '{}'", doctors.len(), specialty);

        Ok(SpecialtySearch {
            status: "success".to_string(),
            specialty: specialty.to_string(),
            doctors,
            message: None,
        })
    }

    pub async fn doctor_details_by_name(&self, doctor_name: &str) -> Result<DoctorDetailsLookup, DoctorError> {
        if doctor_name.trim().is_empty() {
            return Err(DoctorError::Validation("Doctor name must be provided.".to_string()));
        }

        let term = strip_honorific(doctor_name);
        let doctor = self.store.search_doctor(term, "").await?;

        Ok(match doctor {
            Some(doctor) => DoctorDetailsLookup {
                status: "success".to_string(),
                doctor_details: Some(DoctorDetails::from(&doctor)),
                message: None,
            },
            None => DoctorDetailsLookup {
                status: "success".to_string(),
                doctor_details: None,
                message: Some(format!("No doctor found with the name '{}'.", doctor_name)),
            },
        })
    }

    /// First doctor whose name contains the honorific-stripped term, or whose
    /// email equals the raw input.
    pub async fn resolve(&self, doctor_name_or_email: &str) -> Result<Doctor, DoctorError> {
        let raw = doctor_name_or_email.trim();
        if raw.is_empty() {
            return Err(DoctorError::Validation("Doctor name or email must be provided.".to_string()));
        }

        debug!("Resolving doctor '{}'", raw);

        self.store
            .search_doctor(strip_honorific(raw), raw)
            .await?
            .ok_or_else(|| DoctorError::NotFound(format!("Doctor '{}' not found.", raw)))
    }
}

fn specialty_stem(specialty: &str) -> &str {
    let len = specialty.len();
    if len >= 3 && specialty.is_char_boundary(len - 3) && specialty[len - 3..].eq_ignore_ascii_case("ist") {
        &specialty[..len - 3]
    } else {
        specialty
    }
}

#[cfg(test)]
mod tests {
    use super::specialty_stem;

    #[test]
    fn drops_trailing_ist() {
        assert_eq!(specialty_stem("Neurologist"), "Neurolog");
        assert_eq!(specialty_stem("DERMATOLOGIST"), "DERMATOLOG");
        assert_eq!(specialty_stem("Neurology"), "Neurology");
        assert_eq!(specialty_stem("is"), "is");
    }
}
