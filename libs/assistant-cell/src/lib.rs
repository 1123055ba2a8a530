//! Conversational front door. Keeps per-session history in a bounded,
//! expiring store and forwards each prompt to the external agent service.

pub mod handlers;
pub mod models;
pub mod router;
pub mod services;
pub mod state;

pub use models::*;
pub use services::*;

pub use router::assistant_routes;
pub use state::AssistantState;
