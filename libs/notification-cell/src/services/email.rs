use async_trait::async_trait;
use reqwest::Client;
use tracing::{debug, error};

use shared_config::AppConfig;

use crate::models::{EmailMessage, NotificationError};

#[async_trait]
pub trait EmailSender: Send + Sync {
    async fn send(&self, to: &str, subject: &str, text: &str) -> Result<(), NotificationError>;
}

/// Transactional email over an HTTP API with bearer authentication.
pub struct HttpEmailSender {
    client: Client,
    api_url: String,
    api_key: String,
    sender: String,
}

impl HttpEmailSender {
    pub fn new(config: &AppConfig) -> Result<Self, NotificationError> {
        if !config.is_email_configured() {
            return Err(NotificationError::NotConfigured { channel: "email" });
        }

        Ok(Self {
            client: super::http_client(config.notification_timeout())?,
            api_url: config.email_api_url.clone(),
            api_key: config.email_api_key.clone(),
            sender: config.email_sender.clone(),
        })
    }
}

#[async_trait]
impl EmailSender for HttpEmailSender {
    async fn send(&self, to: &str, subject: &str, text: &str) -> Result<(), NotificationError> {
        let message = EmailMessage {
            from: self.sender.clone(),
            to: to.to_string(),
            subject: subject.to_string(),
            text: text.to_string(),
        };

        debug!("Sending email to {} via {}", to, self.api_url);

        let response = self
            .client
            .post(&self.api_url)
            .bearer_auth(&self.api_key)
            .json(&message)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            error!("Email API rejected message to {}: {} - {}", to, status, body);
            return Err(NotificationError::Api { status: status.as_u16(), body });
        }

        Ok(())
    }
}
