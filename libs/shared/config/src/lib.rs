use std::env;
use std::str::FromStr;
use std::time::Duration;

use chrono_tz::Tz;
use tracing::warn;

pub const DEFAULT_CLINIC_TIMEZONE: Tz = chrono_tz::Asia::Kolkata;
pub const DEFAULT_SLOT_START_HOURS: [u32; 4] = [9, 11, 14, 16];

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub database_max_connections: u32,
    pub database_timeout_secs: u64,

    pub clinic_timezone: Tz,
    pub slot_start_hours: Vec<u32>,
    pub slot_duration_minutes: i64,
    pub availability_horizon_days: u32,
    pub availability_refresh_interval_secs: u64,
    pub seed_on_startup: bool,

    pub email_api_url: String,
    pub email_api_key: String,
    pub email_sender: String,
    pub google_calendar_base_url: String,
    pub google_calendar_access_token: String,
    pub google_calendar_id: String,
    pub slack_webhook_url: String,
    pub notification_timeout_secs: u64,

    pub agent_url: String,
    pub session_ttl_secs: u64,
    pub session_max_entries: usize,

    pub port: u16,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            database_url: String::new(),
            database_max_connections: 10,
            database_timeout_secs: 5,
            clinic_timezone: DEFAULT_CLINIC_TIMEZONE,
            slot_start_hours: DEFAULT_SLOT_START_HOURS.to_vec(),
            slot_duration_minutes: 60,
            availability_horizon_days: 7,
            availability_refresh_interval_secs: 6 * 60 * 60,
            seed_on_startup: false,
            email_api_url: String::new(),
            email_api_key: String::new(),
            email_sender: String::new(),
            google_calendar_base_url: "https://www.googleapis.com".to_string(),
            google_calendar_access_token: String::new(),
            google_calendar_id: "primary".to_string(),
            slack_webhook_url: String::new(),
            notification_timeout_secs: 10,
            agent_url: String::new(),
            session_ttl_secs: 30 * 60,
            session_max_entries: 1000,
            port: 3000,
        }
    }
}

impl AppConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let config = Self {
            database_url: optional_var("DATABASE_URL"),
            database_max_connections: parse_var("DATABASE_MAX_CONNECTIONS", defaults.database_max_connections),
            database_timeout_secs: parse_var("DATABASE_TIMEOUT_SECS", defaults.database_timeout_secs),
            clinic_timezone: parse_var("CLINIC_TIMEZONE", defaults.clinic_timezone),
            slot_start_hours: env::var("SLOT_START_HOURS")
                .ok()
                .map(|raw| parse_hours(&raw))
                .unwrap_or(defaults.slot_start_hours),
            slot_duration_minutes: parse_var("SLOT_DURATION_MINUTES", defaults.slot_duration_minutes),
            availability_horizon_days: parse_var("AVAILABILITY_HORIZON_DAYS", defaults.availability_horizon_days),
            availability_refresh_interval_secs: parse_var(
                "AVAILABILITY_REFRESH_INTERVAL_SECS",
                defaults.availability_refresh_interval_secs,
            ),
            seed_on_startup: parse_var("SEED_ON_STARTUP", defaults.seed_on_startup),
            email_api_url: optional_var("EMAIL_API_URL"),
            email_api_key: optional_var("EMAIL_API_KEY"),
            email_sender: optional_var("EMAIL_SENDER"),
            google_calendar_base_url: env::var("GOOGLE_CALENDAR_BASE_URL")
                .unwrap_or(defaults.google_calendar_base_url),
            google_calendar_access_token: optional_var("GOOGLE_CALENDAR_ACCESS_TOKEN"),
            google_calendar_id: env::var("GOOGLE_CALENDAR_ID")
                .unwrap_or(defaults.google_calendar_id),
            slack_webhook_url: optional_var("SLACK_WEBHOOK_URL"),
            notification_timeout_secs: parse_var("NOTIFICATION_TIMEOUT_SECS", defaults.notification_timeout_secs),
            agent_url: optional_var("AGENT_URL"),
            session_ttl_secs: parse_var("SESSION_TTL_SECS", defaults.session_ttl_secs),
            session_max_entries: parse_var("SESSION_MAX_ENTRIES", defaults.session_max_entries),
            port: parse_var("PORT", defaults.port),
        };

        if !config.is_email_configured() {
            warn!("Email delivery not configured - confirmation emails will be skipped");
        }
        if !config.is_calendar_configured() {
            warn!("Google Calendar not configured - calendar events and freebusy checks are disabled");
        }

        config
    }

    pub fn has_database(&self) -> bool {
        !self.database_url.is_empty()
    }

    pub fn is_email_configured(&self) -> bool {
        !self.email_api_url.is_empty()
            && !self.email_api_key.is_empty()
            && !self.email_sender.is_empty()
    }

    pub fn is_calendar_configured(&self) -> bool {
        !self.google_calendar_base_url.is_empty()
            && !self.google_calendar_access_token.is_empty()
    }

    pub fn is_chat_configured(&self) -> bool {
        !self.slack_webhook_url.is_empty()
    }

    pub fn is_agent_configured(&self) -> bool {
        !self.agent_url.is_empty()
    }

    pub fn database_timeout(&self) -> Duration {
        Duration::from_secs(self.database_timeout_secs)
    }

    pub fn notification_timeout(&self) -> Duration {
        Duration::from_secs(self.notification_timeout_secs)
    }

    pub fn session_ttl(&self) -> Duration {
        Duration::from_secs(self.session_ttl_secs)
    }
}

fn optional_var(name: &str) -> String {
    env::var(name).unwrap_or_default()
}

fn parse_var<T>(name: &str, default: T) -> T
where
    T: FromStr + std::fmt::Debug,
{
    match env::var(name) {
        Ok(raw) => raw.trim().parse().unwrap_or_else(|_| {
            warn!("{} has an invalid value '{}', using default {:?}", name, raw, default);
            default
        }),
        Err(_) => default,
    }
}

/// Parses a comma separated list of start hours, e.g. `9,11,14,16`.
fn parse_hours(raw: &str) -> Vec<u32> {
    let mut hours: Vec<u32> = raw
        .split(',')
        .filter_map(|part| {
            let part = part.trim();
            match part.parse::<u32>() {
                Ok(hour) if hour < 24 => Some(hour),
                _ => {
                    warn!("Ignoring invalid slot start hour '{}'", part);
                    None
                }
            }
        })
        .collect();
    hours.sort_unstable();
    hours.dedup();

    if hours.is_empty() {
        warn!("SLOT_START_HOURS yielded no valid hours, using defaults");
        return DEFAULT_SLOT_START_HOURS.to_vec();
    }
    hours
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_and_sorts_hours() {
        assert_eq!(parse_hours("16, 9,11,9"), vec![9, 11, 16]);
    }

    #[test]
    fn falls_back_when_no_hour_is_valid() {
        assert_eq!(parse_hours("25,abc"), DEFAULT_SLOT_START_HOURS.to_vec());
    }

    #[test]
    fn default_config_is_clinic_local() {
        let config = AppConfig::default();
        assert_eq!(config.clinic_timezone, chrono_tz::Asia::Kolkata);
        assert!(!config.has_database());
        assert!(!config.is_calendar_configured());
    }
}
