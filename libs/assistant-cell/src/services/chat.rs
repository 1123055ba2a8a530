use std::sync::Arc;

use tracing::{info, warn};
use uuid::Uuid;

use shared_utils::SessionStore;

use crate::models::{AssistantError, ChatRequest, ChatResponse, ChatSession, ChatTurn, Speaker};
use crate::services::AgentBackend;

/// Turns kept per session; older turns are dropped first.
pub const MAX_HISTORY_TURNS: usize = 40;

pub struct ChatService {
    sessions: Arc<SessionStore<ChatSession>>,
    agent: Option<Arc<dyn AgentBackend>>,
}

impl ChatService {
    pub fn new(sessions: Arc<SessionStore<ChatSession>>, agent: Option<Arc<dyn AgentBackend>>) -> Self {
        Self { sessions, agent }
    }

    pub fn sessions(&self) -> Arc<SessionStore<ChatSession>> {
        self.sessions.clone()
    }

    pub async fn chat(&self, request: ChatRequest) -> ChatResponse {
        let (session_id, mut session) = self.resume_or_start(&request).await;

        if session.role != request.role {
            info!("Role changed for session {}. Starting a fresh conversation.", session_id);
            session = ChatSession::new(request.role);
        }

        let response = match self.ask_agent(&session, &request.prompt).await {
            Ok(reply) => {
                session.history.push(ChatTurn { speaker: Speaker::User, content: request.prompt.clone() });
                session.history.push(ChatTurn { speaker: Speaker::Assistant, content: reply.clone() });
                if session.history.len() > MAX_HISTORY_TURNS {
                    let excess = session.history.len() - MAX_HISTORY_TURNS;
                    session.history.drain(..excess);
                }
                reply
            }
            Err(e) => {
                warn!("Error processing chat request for session {}: {}", session_id, e);
                format!("An error occurred: {}", e)
            }
        };

        self.sessions.insert(session_id, session).await;

        ChatResponse { response, session_id }
    }

    async fn resume_or_start(&self, request: &ChatRequest) -> (Uuid, ChatSession) {
        let known = request
            .session_id
            .as_deref()
            .and_then(|raw| Uuid::parse_str(raw.trim()).ok());

        if let Some(id) = known {
            if let Some(session) = self.sessions.get(&id).await {
                return (id, session);
            }
        }

        let id = Uuid::new_v4();
        info!("Creating new chat session {} for role {}", id, request.role);
        (id, ChatSession::new(request.role))
    }

    async fn ask_agent(&self, session: &ChatSession, prompt: &str) -> Result<String, AssistantError> {
        let agent = self.agent.as_ref().ok_or(AssistantError::NotConfigured)?;
        agent.respond(session.role, prompt, &session.history).await
    }
}
