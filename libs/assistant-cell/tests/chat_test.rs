use std::sync::Arc;

use async_trait::async_trait;
use serde_json::json;
use wiremock::matchers::{body_partial_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use assistant_cell::{
    AgentBackend, AssistantError, AssistantState, ChatRequest, ChatRole, ChatTurn, Speaker,
    MAX_HISTORY_TURNS,
};
use shared_utils::test_utils::TestConfig;

fn request(prompt: &str, role: ChatRole, session_id: Option<String>) -> ChatRequest {
    ChatRequest { prompt: prompt.to_string(), role, session_id }
}

async fn state_for(server: &MockServer) -> AssistantState {
    AssistantState::new(&TestConfig::with_mock_server(&server.uri()).to_app_config())
}

#[tokio::test]
async fn first_prompt_starts_a_session() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/agent"))
        .and(body_partial_json(json!({ "role": "patient", "prompt": "Hello", "history": [] })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "response": "Hi, how can I help?" })))
        .expect(1)
        .mount(&server)
        .await;

    let state = state_for(&server).await;
    let reply = state.chat.chat(request("Hello", ChatRole::Patient, None)).await;

    assert_eq!(reply.response, "Hi, how can I help?");
    let session = state.chat.sessions().get(&reply.session_id).await.unwrap();
    assert_eq!(session.history.len(), 2);
    assert_eq!(session.history[0].speaker, Speaker::User);
    assert_eq!(session.history[1].content, "Hi, how can I help?");
}

#[tokio::test]
async fn follow_up_forwards_prior_turns() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/agent"))
        .and(body_partial_json(json!({
            "prompt": "Book me with Dr. Reed",
            "history": [
                { "speaker": "user", "content": "Hello" },
                { "speaker": "assistant", "content": "Hi" }
            ]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "response": "Which day?" })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/agent"))
        .and(body_partial_json(json!({ "prompt": "Hello" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "response": "Hi" })))
        .mount(&server)
        .await;

    let state = state_for(&server).await;
    let first = state.chat.chat(request("Hello", ChatRole::Patient, None)).await;
    let second = state
        .chat
        .chat(request("Book me with Dr. Reed", ChatRole::Patient, Some(first.session_id.to_string())))
        .await;

    assert_eq!(second.session_id, first.session_id);
    assert_eq!(second.response, "Which day?");
}

#[tokio::test]
async fn role_change_resets_history() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/agent"))
        .and(body_partial_json(json!({ "role": "doctor", "history": [] })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "response": "Summary ready" })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/agent"))
        .and(body_partial_json(json!({ "role": "patient" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "response": "Hi" })))
        .mount(&server)
        .await;

    let state = state_for(&server).await;
    let first = state.chat.chat(request("Hello", ChatRole::Patient, None)).await;
    let second = state
        .chat
        .chat(request("Show my day", ChatRole::Doctor, Some(first.session_id.to_string())))
        .await;

    assert_eq!(second.session_id, first.session_id);
    assert_eq!(second.response, "Summary ready");
    let session = state.chat.sessions().get(&first.session_id).await.unwrap();
    assert_eq!(session.role, ChatRole::Doctor);
    assert_eq!(session.history.len(), 2);
}

#[tokio::test]
async fn agent_failure_is_reported_in_the_response() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/agent"))
        .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
        .mount(&server)
        .await;

    let state = state_for(&server).await;
    let reply = state.chat.chat(request("Hello", ChatRole::Patient, None)).await;

    assert_eq!(reply.response, "An error occurred: agent returned 500: boom");
    let session = state.chat.sessions().get(&reply.session_id).await.unwrap();
    assert!(session.history.is_empty());
}

#[tokio::test]
async fn unconfigured_agent_is_reported_in_the_response() {
    let state = AssistantState::new(&TestConfig::default().to_app_config());

    let reply = state.chat.chat(request("Hello", ChatRole::Patient, None)).await;

    assert_eq!(reply.response, "An error occurred: agent service is not configured");
}

#[tokio::test]
async fn unknown_or_malformed_session_ids_get_a_new_session() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/agent"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "response": "Hi" })))
        .mount(&server)
        .await;

    let state = state_for(&server).await;
    let stale = uuid::Uuid::new_v4();

    let from_stale = state.chat.chat(request("Hello", ChatRole::Patient, Some(stale.to_string()))).await;
    let from_garbage = state.chat.chat(request("Hello", ChatRole::Patient, Some("not-a-uuid".to_string()))).await;

    assert_ne!(from_stale.session_id, stale);
    assert_ne!(from_garbage.session_id, from_stale.session_id);
    assert_eq!(state.chat.sessions().len().await, 2);
}

struct EchoAgent;

#[async_trait]
impl AgentBackend for EchoAgent {
    async fn respond(&self, _role: ChatRole, prompt: &str, _history: &[ChatTurn]) -> Result<String, AssistantError> {
        Ok(format!("echo: {}", prompt))
    }
}

#[tokio::test]
async fn history_is_capped() {
    let config = TestConfig::default().to_app_config();
    let state = AssistantState::with_agent(&config, Some(Arc::new(EchoAgent)));

    let first = state.chat.chat(request("turn 0", ChatRole::Patient, None)).await;
    for i in 1..30 {
        state
            .chat
            .chat(request(&format!("turn {}", i), ChatRole::Patient, Some(first.session_id.to_string())))
            .await;
    }

    let session = state.chat.sessions().get(&first.session_id).await.unwrap();
    assert_eq!(session.history.len(), MAX_HISTORY_TURNS);
    assert_eq!(session.history.last().unwrap().content, "echo: turn 29");
    assert_eq!(session.history[0].content, "turn 10");
}
