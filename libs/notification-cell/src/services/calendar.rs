use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::Client;
use tracing::{debug, error, info, warn};

use shared_config::AppConfig;
use shared_utils::ClinicClock;

use crate::models::{
    BusyPeriod, CalendarEvent, EventAttendee, EventDateTime, EventReminder, EventReminders,
    EventRequest, EventResponse, FreeBusyItem, FreeBusyRequest, FreeBusyResponse,
    NotificationError,
};

#[async_trait]
pub trait CalendarService: Send + Sync {
    /// Busy periods on `calendar_id` overlapping `[from, to)`.
    async fn busy_periods(
        &self,
        calendar_id: &str,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<BusyPeriod>, NotificationError>;

    /// Inserts the event and returns its link.
    async fn create_event(&self, event: &CalendarEvent) -> Result<String, NotificationError>;
}

/// Google Calendar v3 REST client.
/// Based on: https://developers.google.com/calendar/api/v3/reference
pub struct GoogleCalendarClient {
    client: Client,
    base_url: String,
    access_token: String,
    calendar_id: String,
    clock: ClinicClock,
}

impl GoogleCalendarClient {
    pub fn new(config: &AppConfig) -> Result<Self, NotificationError> {
        if !config.is_calendar_configured() {
            return Err(NotificationError::NotConfigured { channel: "calendar" });
        }

        Ok(Self {
            client: super::http_client(config.notification_timeout())?,
            base_url: config.google_calendar_base_url.trim_end_matches('/').to_string(),
            access_token: config.google_calendar_access_token.clone(),
            calendar_id: config.google_calendar_id.clone(),
            clock: ClinicClock::from_config(config),
        })
    }

    fn event_time(&self, instant: DateTime<Utc>) -> EventDateTime {
        EventDateTime {
            date_time: self.clock.to_local(instant).to_rfc3339(),
            time_zone: self.clock.timezone().name().to_string(),
        }
    }

    async fn read_error(response: reqwest::Response) -> NotificationError {
        let status = response.status().as_u16();
        let body = response.text().await.unwrap_or_default();
        NotificationError::Api { status, body }
    }
}

#[async_trait]
impl CalendarService for GoogleCalendarClient {
    /// POST /calendar/v3/freeBusy
    async fn busy_periods(
        &self,
        calendar_id: &str,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<BusyPeriod>, NotificationError> {
        let url = format!("{}/calendar/v3/freeBusy", self.base_url);
        let request = FreeBusyRequest {
            time_min: from.to_rfc3339(),
            time_max: to.to_rfc3339(),
            time_zone: self.clock.timezone().name().to_string(),
            items: vec![FreeBusyItem { id: calendar_id.to_string() }],
        };

        debug!("Querying freebusy for {} between {} and {}", calendar_id, from, to);

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.access_token)
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            let err = Self::read_error(response).await;
            error!("Freebusy query for {} failed: {}", calendar_id, err);
            return Err(err);
        }

        let body: FreeBusyResponse = response
            .json()
            .await
            .map_err(|e| NotificationError::InvalidResponse(e.to_string()))?;

        // A calendar Google cannot read reports no busy time.
        let calendar = body.calendars.into_iter().find(|(id, _)| id == calendar_id).map(|(_, c)| c);
        let Some(calendar) = calendar else {
            warn!("Freebusy response has no entry for {}, treating it as free", calendar_id);
            return Ok(Vec::new());
        };

        if let Some(first) = calendar.errors.first() {
            warn!("Freebusy lookup for {} reported {}, treating it as free", calendar_id, first.reason);
            return Ok(Vec::new());
        }

        Ok(calendar.busy)
    }

    /// POST /calendar/v3/calendars/{calendarId}/events?sendUpdates=all
    async fn create_event(&self, event: &CalendarEvent) -> Result<String, NotificationError> {
        let url = format!("{}/calendar/v3/calendars/{}/events", self.base_url, self.calendar_id);
        let request = EventRequest {
            summary: event.summary.clone(),
            description: event.description.clone(),
            start: self.event_time(event.start),
            end: self.event_time(event.end),
            attendees: event
                .attendees
                .iter()
                .map(|email| EventAttendee { email: email.clone() })
                .collect(),
            reminders: EventReminders {
                use_default: false,
                overrides: vec![
                    EventReminder { method: "email", minutes: 24 * 60 },
                    EventReminder { method: "popup", minutes: 10 },
                ],
            },
        };

        let response = self
            .client
            .post(&url)
            .query(&[("sendUpdates", "all")])
            .bearer_auth(&self.access_token)
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            let err = Self::read_error(response).await;
            error!("Calendar event creation failed: {}", err);
            return Err(err);
        }

        let created: EventResponse = response
            .json()
            .await
            .map_err(|e| NotificationError::InvalidResponse(e.to_string()))?;

        info!("Calendar event created: {:?}", created.id);
        created
            .html_link
            .ok_or_else(|| NotificationError::InvalidResponse("event response has no htmlLink".to_string()))
    }
}
