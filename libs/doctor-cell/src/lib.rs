//! Doctors and their availability: directory lookups, the availability
//! listing with calendar filtering, the slot grid refresh job and seeding
//! of reference doctors.

pub mod handlers;
pub mod models;
pub mod router;
pub mod services;
pub mod state;

pub use models::*;
pub use services::*;

pub use router::doctor_routes;
pub use state::DoctorState;
