use std::sync::Arc;

use axum::{routing::post, Router};

use crate::handlers;
use crate::state::AssistantState;

pub fn assistant_routes(state: Arc<AssistantState>) -> Router {
    Router::new()
        .route("/chat/", post(handlers::chat_with_agent))
        .with_state(state)
}
