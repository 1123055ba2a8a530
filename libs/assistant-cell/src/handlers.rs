use std::sync::Arc;

use axum::{extract::State, Json};

use crate::models::{ChatRequest, ChatResponse};
use crate::state::AssistantState;

#[axum::debug_handler]
pub async fn chat_with_agent(
    State(state): State<Arc<AssistantState>>,
    Json(request): Json<ChatRequest>,
) -> Json<ChatResponse> {
    Json(state.chat.chat(request).await)
}
