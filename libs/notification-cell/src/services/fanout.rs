use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info, warn};

use shared_config::AppConfig;
use shared_models::strip_honorific;
use shared_utils::ClinicClock;

use crate::models::{AppointmentSummary, CalendarEvent, ChannelStatus, NotificationError, NotificationReport};
use crate::services::{
    CalendarService, ChatNotifier, EmailSender, GoogleCalendarClient, HttpEmailSender,
    SlackWebhookNotifier,
};

pub const CONFIRMATION_SUBJECT: &str = "Your Appointment Confirmation";

/// The collaborators that are configured, built once at startup and shared by every cell.
#[derive(Clone, Default)]
pub struct NotificationClients {
    pub email: Option<Arc<dyn EmailSender>>,
    pub calendar: Option<Arc<dyn CalendarService>>,
    pub chat: Option<Arc<dyn ChatNotifier>>,
}

impl NotificationClients {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            email: build("email", HttpEmailSender::new(config)).map(|c| Arc::new(c) as Arc<dyn EmailSender>),
            calendar: build("calendar", GoogleCalendarClient::new(config))
                .map(|c| Arc::new(c) as Arc<dyn CalendarService>),
            chat: build("chat", SlackWebhookNotifier::new(config)).map(|c| Arc::new(c) as Arc<dyn ChatNotifier>),
        }
    }
}

fn build<T>(channel: &str, client: Result<T, NotificationError>) -> Option<T> {
    match client {
        Ok(client) => Some(client),
        Err(NotificationError::NotConfigured { .. }) => None,
        Err(e) => {
            warn!("Could not build {} client: {}", channel, e);
            None
        }
    }
}

/// Post-commit confirmation dispatch. Email and calendar run concurrently
/// and fail independently.
pub struct NotificationFanout {
    email: Option<Arc<dyn EmailSender>>,
    calendar: Option<Arc<dyn CalendarService>>,
    clock: ClinicClock,
    timeout: Duration,
}

impl NotificationFanout {
    pub fn new(
        email: Option<Arc<dyn EmailSender>>,
        calendar: Option<Arc<dyn CalendarService>>,
        clock: ClinicClock,
        timeout: Duration,
    ) -> Self {
        Self { email, calendar, clock, timeout }
    }

    pub fn from_clients(clients: &NotificationClients, config: &AppConfig) -> Self {
        Self::new(
            clients.email.clone(),
            clients.calendar.clone(),
            ClinicClock::from_config(config),
            config.notification_timeout(),
        )
    }

    pub async fn notify(&self, summary: &AppointmentSummary) -> NotificationReport {
        let (email, calendar) = tokio::join!(self.send_email(summary), self.create_event(summary));

        info!(
            "Notifications for appointment {}: email={}, calendar={}",
            summary.appointment_id, email, calendar
        );

        NotificationReport { email, calendar }
    }

    async fn send_email(&self, summary: &AppointmentSummary) -> ChannelStatus {
        let Some(sender) = &self.email else {
            debug!("Email not configured, skipping confirmation for {}", summary.appointment_id);
            return ChannelStatus::Skipped("email not configured".to_string());
        };

        let text = self.confirmation_text(summary);
        let outcome = self
            .bounded("email", sender.send(&summary.patient_email, CONFIRMATION_SUBJECT, &text))
            .await;

        match outcome {
            Ok(()) => ChannelStatus::Delivered("Email sent successfully.".to_string()),
            Err(reason) => ChannelStatus::Failed(reason),
        }
    }

    async fn create_event(&self, summary: &AppointmentSummary) -> ChannelStatus {
        let Some(calendar) = &self.calendar else {
            debug!("Calendar not configured, skipping event for {}", summary.appointment_id);
            return ChannelStatus::Skipped("calendar not configured".to_string());
        };

        let event = CalendarEvent {
            summary: format!(
                "Appointment: {} with Dr. {}",
                summary.patient_name,
                strip_honorific(&summary.doctor_name)
            ),
            description: format!(
                "Reason: {}\nAppointment ID: {}",
                summary.reason.as_deref().unwrap_or("N/A"),
                summary.appointment_id
            ),
            start: summary.start_time,
            end: summary.end_time,
            attendees: vec![summary.patient_email.clone(), summary.doctor_email.clone()],
        };

        match self.bounded("calendar", calendar.create_event(&event)).await {
            Ok(link) => ChannelStatus::Delivered(link),
            Err(reason) => ChannelStatus::Failed(reason),
        }
    }

    pub fn confirmation_text(&self, summary: &AppointmentSummary) -> String {
        let local = self.clock.to_local(summary.start_time);
        format!(
            "Dear {},\n\nYour appointment with Dr. {} on {} is confirmed.\n\nAppointment ID: {}",
            summary.patient_name,
            strip_honorific(&summary.doctor_name),
            local.format("%Y-%m-%d at %H:%M %Z"),
            summary.appointment_id
        )
    }

    async fn bounded<T, F>(&self, channel: &str, call: F) -> Result<T, String>
    where
        F: Future<Output = Result<T, NotificationError>>,
    {
        match tokio::time::timeout(self.timeout, call).await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(e)) => {
                warn!("{} notification failed: {}", channel, e);
                Err(e.to_string())
            }
            Err(_) => {
                warn!("{} notification timed out after {:?}", channel, self.timeout);
                Err(NotificationError::Timeout.to_string())
            }
        }
    }
}
