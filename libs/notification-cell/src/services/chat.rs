use async_trait::async_trait;
use reqwest::Client;
use tracing::error;

use shared_config::AppConfig;

use crate::models::{NotificationError, WebhookMessage};

#[async_trait]
pub trait ChatNotifier: Send + Sync {
    async fn post(&self, text: &str) -> Result<(), NotificationError>;
}

pub struct SlackWebhookNotifier {
    client: Client,
    webhook_url: String,
}

impl SlackWebhookNotifier {
    pub fn new(config: &AppConfig) -> Result<Self, NotificationError> {
        if !config.is_chat_configured() {
            return Err(NotificationError::NotConfigured { channel: "chat" });
        }

        Ok(Self {
            client: super::http_client(config.notification_timeout())?,
            webhook_url: config.slack_webhook_url.clone(),
        })
    }
}

#[async_trait]
impl ChatNotifier for SlackWebhookNotifier {
    async fn post(&self, text: &str) -> Result<(), NotificationError> {
        let response = self
            .client
            .post(&self.webhook_url)
            .json(&WebhookMessage { text })
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            error!("Chat webhook rejected message: {} - {}", status, body);
            return Err(NotificationError::Api { status: status.as_u16(), body });
        }

        Ok(())
    }
}
