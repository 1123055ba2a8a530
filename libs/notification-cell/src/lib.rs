//! Outbound collaborators of the clinic: confirmation email, Google Calendar
//! and the staff chat webhook.
//!
//! Every channel is best-effort. Failures are reported per channel as a
//! [`ChannelStatus`] and never invalidate the booking that triggered them.

pub mod models;
pub mod services;

pub use models::{
    AppointmentSummary, BusyPeriod, CalendarEvent, ChannelStatus, EmailMessage,
    NotificationError, NotificationReport,
};
pub use services::{
    CalendarService, ChatNotifier, EmailSender, GoogleCalendarClient, HttpEmailSender,
    NotificationClients, NotificationFanout, SlackWebhookNotifier,
};
