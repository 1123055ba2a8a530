use std::sync::Arc;

use axum::{
    extract::{Query, State},
    Json,
};
use serde::Deserialize;
use tracing::info;

use shared_models::error::AppError;

use crate::models::{AvailabilityListing, DoctorDetailsLookup, SeedReport, SpecialtySearch};
use crate::state::DoctorState;

#[derive(Debug, Deserialize)]
pub struct AvailabilityQuery {
    pub doctor_name_or_email: String,
    pub target_date_str: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct SpecialtyQuery {
    #[serde(default)]
    pub specialty: String,
}

#[derive(Debug, Deserialize)]
pub struct DoctorNameQuery {
    #[serde(default)]
    pub doctor_name: String,
}

#[axum::debug_handler]
pub async fn check_doctor_availability(
    State(state): State<Arc<DoctorState>>,
    Query(query): Query<AvailabilityQuery>,
) -> Result<Json<AvailabilityListing>, AppError> {
    let listing = state
        .availability
        .list_availability(&query.doctor_name_or_email, query.target_date_str.as_deref())
        .await?;

    Ok(Json(listing))
}

#[axum::debug_handler]
pub async fn get_doctors_by_specialty(
    State(state): State<Arc<DoctorState>>,
    Query(query): Query<SpecialtyQuery>,
) -> Result<Json<SpecialtySearch>, AppError> {
    Ok(Json(state.directory.doctors_by_specialty(&query.specialty).await?))
}

#[axum::debug_handler]
pub async fn get_doctor_details_by_name(
    State(state): State<Arc<DoctorState>>,
    Query(query): Query<DoctorNameQuery>,
) -> Result<Json<DoctorDetailsLookup>, AppError> {
    Ok(Json(state.directory.doctor_details_by_name(&query.doctor_name).await?))
}

#[axum::debug_handler]
pub async fn seed_database(State(state): State<Arc<DoctorState>>) -> Result<Json<SeedReport>, AppError> {
    let report = state.seeder.seed_all(state.horizon_days).await?;
    info!("Seed requested: {} slots created", report.availability.slots_created);
    Ok(Json(report))
}
