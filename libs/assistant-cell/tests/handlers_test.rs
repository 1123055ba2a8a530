use std::sync::Arc;

use axum::{
    body::Body,
    http::{header, Request, StatusCode},
};
use serde_json::{json, Value};
use tower::ServiceExt;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use assistant_cell::{assistant_routes, AssistantState};
use shared_utils::test_utils::TestConfig;

#[tokio::test]
async fn chat_route_returns_reply_and_session() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/agent"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "response": "Hello there" })))
        .mount(&server)
        .await;

    let config = TestConfig::with_mock_server(&server.uri()).to_app_config();
    let app = assistant_routes(Arc::new(AssistantState::new(&config)));

    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/chat/")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(json!({ "prompt": "Hi" }).to_string()))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body: Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(body["response"], "Hello there");
    assert!(uuid::Uuid::parse_str(body["session_id"].as_str().unwrap()).is_ok());
}
