pub mod agent;
pub mod chat;

pub use agent::{AgentBackend, HttpAgentBackend};
pub use chat::{ChatService, MAX_HISTORY_TURNS};
