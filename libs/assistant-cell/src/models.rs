use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    #[default]
    Patient,
    Doctor,
}

impl fmt::Display for ChatRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChatRole::Patient => f.write_str("patient"),
            ChatRole::Doctor => f.write_str("doctor"),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChatRequest {
    pub prompt: String,
    #[serde(default)]
    pub role: ChatRole,
    pub session_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatResponse {
    pub response: String,
    pub session_id: Uuid,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Speaker {
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatTurn {
    pub speaker: Speaker,
    pub content: String,
}

/// Conversation state kept between requests of one session.
#[derive(Debug, Clone, Default)]
pub struct ChatSession {
    pub role: ChatRole,
    pub history: Vec<ChatTurn>,
}

impl ChatSession {
    pub fn new(role: ChatRole) -> Self {
        Self { role, history: Vec::new() }
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct AgentRequest<'a> {
    pub role: ChatRole,
    pub prompt: &'a str,
    pub history: &'a [ChatTurn],
}

#[derive(Debug, Deserialize)]
pub(crate) struct AgentReply {
    pub response: String,
}

#[derive(Error, Debug)]
pub enum AssistantError {
    #[error("agent service is not configured")]
    NotConfigured,

    #[error("agent request failed: {0}")]
    Http(String),

    #[error("agent returned {status}: {body}")]
    Api { status: u16, body: String },

    #[error("invalid agent response: {0}")]
    InvalidResponse(String),

    #[error("agent request timed out")]
    Timeout,
}

impl From<reqwest::Error> for AssistantError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            AssistantError::Timeout
        } else {
            AssistantError::Http(err.to_string())
        }
    }
}
