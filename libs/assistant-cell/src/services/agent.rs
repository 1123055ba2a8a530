use async_trait::async_trait;
use reqwest::Client;
use tracing::{debug, error};

use shared_config::AppConfig;

use crate::models::{AgentReply, AgentRequest, AssistantError, ChatRole, ChatTurn};

const AGENT_TIMEOUT_FACTOR: u32 = 6;

#[async_trait]
pub trait AgentBackend: Send + Sync {
    async fn respond(&self, role: ChatRole, prompt: &str, history: &[ChatTurn]) -> Result<String, AssistantError>;
}

pub struct HttpAgentBackend {
    client: Client,
    agent_url: String,
}

impl HttpAgentBackend {
    pub fn new(config: &AppConfig) -> Result<Self, AssistantError> {
        if !config.is_agent_configured() {
            return Err(AssistantError::NotConfigured);
        }

        let client = Client::builder()
            .timeout(config.notification_timeout() * AGENT_TIMEOUT_FACTOR)
            .build()?;

        Ok(Self { client, agent_url: config.agent_url.clone() })
    }
}

#[async_trait]
impl AgentBackend for HttpAgentBackend {
    async fn respond(&self, role: ChatRole, prompt: &str, history: &[ChatTurn]) -> Result<String, AssistantError> {
        debug!("Forwarding {} prompt to agent ({} prior turns)", role, history.len());

        let response = self
            .client
            .post(&self.agent_url)
            .json(&AgentRequest { role, prompt, history })
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            error!("Agent service returned {}: {}", status, body);
            return Err(AssistantError::Api { status: status.as_u16(), body });
        }

        let reply: AgentReply = response
            .json()
            .await
            .map_err(|e| AssistantError::InvalidResponse(e.to_string()))?;

        Ok(reply.response)
    }
}
