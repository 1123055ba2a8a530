//! Appointment booking and reporting.
//!
//! A booking is a single unit of work: claim the requested slot, guard
//! against a duplicate, resolve the patient, write the appointment and
//! commit. Notifications are sent only after the commit succeeds and can
//! never undo it.

pub mod handlers;
pub mod models;
pub mod router;
pub mod services;
pub mod state;

pub use models::*;
pub use services::*;

pub use router::appointment_routes;
pub use state::AppointmentState;
