pub mod booking;
pub mod reporting;

pub use booking::AppointmentBookingService;
pub use reporting::ReportingService;
