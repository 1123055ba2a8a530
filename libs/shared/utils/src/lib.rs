pub mod session;
pub mod test_utils;
pub mod time;

pub use session::SessionStore;
pub use time::{ClinicClock, TimeError};
