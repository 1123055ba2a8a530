use std::sync::Arc;

use axum::{
    routing::{get, post},
    Router,
};

use crate::handlers;
use crate::state::AppointmentState;

pub fn appointment_routes(state: Arc<AppointmentState>) -> Router {
    Router::new()
        .route("/tools/book_appointment/", post(handlers::book_appointment))
        .route(
            "/tools/get_appointments_summary_for_doctor/",
            get(handlers::get_appointments_summary_for_doctor),
        )
        .route("/tools/get_patient_count_by_date/", get(handlers::get_patient_count_by_date))
        .route("/tools/get_patients_with_condition/", get(handlers::get_patients_with_condition))
        .with_state(state)
}
