use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// Committed appointment data handed to the fan-out after the ledger write.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppointmentSummary {
    pub appointment_id: Uuid,
    pub patient_name: String,
    pub patient_email: String,
    pub doctor_name: String,
    pub doctor_email: String,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub reason: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", content = "detail", rename_all = "snake_case")]
pub enum ChannelStatus {
    Delivered(String),
    Failed(String),
    Skipped(String),
}

impl ChannelStatus {
    pub fn is_delivered(&self) -> bool {
        matches!(self, ChannelStatus::Delivered(_))
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, ChannelStatus::Failed(_))
    }
}

impl fmt::Display for ChannelStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChannelStatus::Delivered(detail) => write!(f, "{}", detail),
            ChannelStatus::Failed(reason) => write!(f, "failed: {}", reason),
            ChannelStatus::Skipped(reason) => write!(f, "skipped: {}", reason),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationReport {
    pub email: ChannelStatus,
    pub calendar: ChannelStatus,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmailMessage {
    pub from: String,
    pub to: String,
    pub subject: String,
    pub text: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BusyPeriod {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CalendarEvent {
    pub summary: String,
    pub description: String,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub attendees: Vec<String>,
}

// ==============================================================================
// GOOGLE CALENDAR WIRE TYPES
// ==============================================================================

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct FreeBusyRequest {
    pub time_min: String,
    pub time_max: String,
    pub time_zone: String,
    pub items: Vec<FreeBusyItem>,
}

#[derive(Debug, Serialize)]
pub(crate) struct FreeBusyItem {
    pub id: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct FreeBusyResponse {
    #[serde(default)]
    pub calendars: std::collections::HashMap<String, FreeBusyCalendar>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct FreeBusyCalendar {
    #[serde(default)]
    pub busy: Vec<BusyPeriod>,
    #[serde(default)]
    pub errors: Vec<FreeBusyCalendarError>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct FreeBusyCalendarError {
    #[serde(default)]
    pub reason: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct EventRequest {
    pub summary: String,
    pub description: String,
    pub start: EventDateTime,
    pub end: EventDateTime,
    pub attendees: Vec<EventAttendee>,
    pub reminders: EventReminders,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct EventDateTime {
    pub date_time: String,
    pub time_zone: String,
}

#[derive(Debug, Serialize)]
pub(crate) struct EventAttendee {
    pub email: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct EventReminders {
    pub use_default: bool,
    pub overrides: Vec<EventReminder>,
}

#[derive(Debug, Serialize)]
pub(crate) struct EventReminder {
    pub method: &'static str,
    pub minutes: u32,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct EventResponse {
    pub html_link: Option<String>,
    pub id: Option<String>,
}

#[derive(Debug, Serialize)]
pub(crate) struct WebhookMessage<'a> {
    pub text: &'a str,
}

// ==============================================================================
// ERRORS
// ==============================================================================

#[derive(Error, Debug)]
pub enum NotificationError {
    #[error("{channel} is not configured")]
    NotConfigured { channel: &'static str },

    #[error("HTTP error: {0}")]
    Http(String),

    #[error("API returned {status}: {body}")]
    Api { status: u16, body: String },

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Request timed out")]
    Timeout,
}

impl From<reqwest::Error> for NotificationError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            NotificationError::Timeout
        } else {
            NotificationError::Http(err.to_string())
        }
    }
}
