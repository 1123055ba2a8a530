use std::sync::Arc;

use axum::{routing::get, Router};

use appointment_cell::{appointment_routes, AppointmentState};
use assistant_cell::{assistant_routes, AssistantState};
use doctor_cell::{doctor_routes, DoctorState};

pub struct Cells {
    pub doctor: Arc<DoctorState>,
    pub appointment: Arc<AppointmentState>,
    pub assistant: Arc<AssistantState>,
}

pub fn create_router(cells: &Cells) -> Router {
    Router::new()
        .route("/", get(|| async { "Clinic booking API is running!" }))
        .merge(doctor_routes(cells.doctor.clone()))
        .merge(appointment_routes(cells.appointment.clone()))
        .merge(assistant_routes(cells.assistant.clone()))
}

#[cfg(test)]
mod tests {
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use serde_json::Value;
    use tower::ServiceExt;

    use notification_cell::NotificationClients;
    use shared_utils::test_utils::{ClinicFixture, TestConfig};

    use super::*;

    async fn app() -> Router {
        let config = TestConfig::default().to_app_config();
        let fixture = ClinicFixture::new().await;
        let clients = NotificationClients::default();
        let cells = Cells {
            doctor: Arc::new(DoctorState::new(&config, fixture.store(), None)),
            appointment: Arc::new(AppointmentState::new(&config, fixture.store(), &clients)),
            assistant: Arc::new(AssistantState::new(&config)),
        };
        create_router(&cells)
    }

    #[tokio::test]
    async fn liveness_route_answers() {
        let response = app()
            .await
            .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn cell_routes_are_mounted() {
        let response = app()
            .await
            .oneshot(
                Request::builder()
                    .uri("/tools/get_doctors_by_specialty/?specialty=Neurology")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body: Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["doctors"][0]["email"], "e.reed.neuro@clinic.com");
    }
}
