use std::sync::Arc;

use tracing::warn;

use shared_config::AppConfig;
use shared_utils::SessionStore;

use crate::models::AssistantError;
use crate::services::{AgentBackend, ChatService, HttpAgentBackend};

pub struct AssistantState {
    pub chat: ChatService,
}

impl AssistantState {
    pub fn new(config: &AppConfig) -> Self {
        let agent: Option<Arc<dyn AgentBackend>> = match HttpAgentBackend::new(config) {
            Ok(backend) => Some(Arc::new(backend)),
            Err(AssistantError::NotConfigured) => {
                warn!("AGENT_URL not set - chat requests will return an error message");
                None
            }
            Err(e) => {
                warn!("Could not build agent client: {}", e);
                None
            }
        };

        Self::with_agent(config, agent)
    }

    pub fn with_agent(config: &AppConfig, agent: Option<Arc<dyn AgentBackend>>) -> Self {
        let sessions = Arc::new(SessionStore::new(config.session_ttl(), config.session_max_entries));
        Self { chat: ChatService::new(sessions, agent) }
    }
}
