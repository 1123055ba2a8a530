use std::sync::Arc;

use axum::{
    routing::{get, post},
    Router,
};

use crate::handlers;
use crate::state::DoctorState;

pub fn doctor_routes(state: Arc<DoctorState>) -> Router {
    Router::new()
        .route("/tools/check_doctor_availability/", get(handlers::check_doctor_availability))
        .route("/tools/get_doctors_by_specialty/", get(handlers::get_doctors_by_specialty))
        .route("/tools/get_doctor_details_by_name/", get(handlers::get_doctor_details_by_name))
        .route("/seed", post(handlers::seed_database))
        .with_state(state)
}
