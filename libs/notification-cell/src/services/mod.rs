pub mod calendar;
pub mod chat;
pub mod email;
pub mod fanout;

pub use calendar::{CalendarService, GoogleCalendarClient};
pub use chat::{ChatNotifier, SlackWebhookNotifier};
pub use email::{EmailSender, HttpEmailSender};
pub use fanout::{NotificationClients, NotificationFanout};

use std::time::Duration;

use reqwest::Client;

use crate::models::NotificationError;

pub(crate) fn http_client(timeout: Duration) -> Result<Client, NotificationError> {
    Client::builder()
        .timeout(timeout)
        .build()
        .map_err(NotificationError::from)
}
