use std::sync::Arc;

use axum::{
    extract::{Query, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;

use shared_models::error::AppError;

use crate::models::{
    AppointmentSummaryReport, BookAppointmentRequest, BookingResult, PatientCountReport,
    PatientsWithConditionReport,
};
use crate::state::AppointmentState;

#[derive(Debug, Deserialize)]
pub struct SummaryQuery {
    pub doctor_email: String,
    pub target_date_str: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct PatientCountQuery {
    #[serde(default)]
    pub target_date_str: String,
}

#[derive(Debug, Deserialize)]
pub struct ConditionQuery {
    #[serde(default)]
    pub condition: String,
}

#[axum::debug_handler]
pub async fn book_appointment(
    State(state): State<Arc<AppointmentState>>,
    Json(request): Json<BookAppointmentRequest>,
) -> (StatusCode, Json<BookingResult>) {
    let result = state.booking.book(request).await;
    (result.status_code(), Json(result))
}

#[axum::debug_handler]
pub async fn get_appointments_summary_for_doctor(
    State(state): State<Arc<AppointmentState>>,
    Query(query): Query<SummaryQuery>,
) -> Result<Json<AppointmentSummaryReport>, AppError> {
    let report = state
        .reporting
        .appointments_summary_for_doctor(&query.doctor_email, query.target_date_str.as_deref())
        .await?;
    Ok(Json(report))
}

#[axum::debug_handler]
pub async fn get_patient_count_by_date(
    State(state): State<Arc<AppointmentState>>,
    Query(query): Query<PatientCountQuery>,
) -> Result<Json<PatientCountReport>, AppError> {
    Ok(Json(state.reporting.patient_count_by_date(&query.target_date_str).await?))
}

#[axum::debug_handler]
pub async fn get_patients_with_condition(
    State(state): State<Arc<AppointmentState>>,
    Query(query): Query<ConditionQuery>,
) -> Result<Json<PatientsWithConditionReport>, AppError> {
    Ok(Json(state.reporting.patients_with_condition(&query.condition).await?))
}
