use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Utc};
use chrono_tz::Tz;
use thiserror::Error;

use shared_config::AppConfig;

pub const LOCAL_DATETIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";
pub const DATE_FORMAT: &str = "%Y-%m-%d";
pub const TIME_OF_DAY_FORMAT: &str = "%H:%M:%S";

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TimeError {
    #[error("Invalid date/time '{input}', expected format {expected}")]
    InvalidFormat { input: String, expected: &'static str },

    #[error("{0} does not exist in the clinic timezone")]
    NonexistentLocalTime(String),

    #[error("{0} is ambiguous in the clinic timezone")]
    AmbiguousLocalTime(String),
}

/// Converts between clinic-local wall time and the UTC instants that are
/// stored. Every boundary crossing in the workspace goes through here.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClinicClock {
    tz: Tz,
}

impl ClinicClock {
    pub fn new(tz: Tz) -> Self {
        Self { tz }
    }

    pub fn from_config(config: &AppConfig) -> Self {
        Self::new(config.clinic_timezone)
    }

    pub fn timezone(&self) -> Tz {
        self.tz
    }

    pub fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }

    pub fn today(&self) -> NaiveDate {
        self.local_date(self.now())
    }

    /// Parses `YYYY-MM-DD HH:MM:SS` as clinic-local wall time.
    pub fn parse_local_datetime(&self, input: &str) -> Result<DateTime<Utc>, TimeError> {
        let naive = NaiveDateTime::parse_from_str(input.trim(), LOCAL_DATETIME_FORMAT).map_err(|_| {
            TimeError::InvalidFormat {
                input: input.to_string(),
                expected: "YYYY-MM-DD HH:MM:SS",
            }
        })?;
        self.localize(naive)
    }

    pub fn parse_date(&self, input: &str) -> Result<NaiveDate, TimeError> {
        NaiveDate::parse_from_str(input.trim(), DATE_FORMAT).map_err(|_| TimeError::InvalidFormat {
            input: input.to_string(),
            expected: "YYYY-MM-DD",
        })
    }

    /// `input` parsed as a date, or today in clinic time when absent or blank.
    pub fn parse_date_or_today(&self, input: Option<&str>) -> Result<NaiveDate, TimeError> {
        match input.map(str::trim).filter(|s| !s.is_empty()) {
            Some(raw) => self.parse_date(raw),
            None => Ok(self.today()),
        }
    }

    /// Rejects wall times skipped or repeated by a DST transition.
    pub fn localize(&self, naive: NaiveDateTime) -> Result<DateTime<Utc>, TimeError> {
        match self.tz.from_local_datetime(&naive) {
            chrono::LocalResult::Single(local) => Ok(local.with_timezone(&Utc)),
            chrono::LocalResult::Ambiguous(_, _) => {
                Err(TimeError::AmbiguousLocalTime(naive.format(LOCAL_DATETIME_FORMAT).to_string()))
            }
            chrono::LocalResult::None => {
                Err(TimeError::NonexistentLocalTime(naive.format(LOCAL_DATETIME_FORMAT).to_string()))
            }
        }
    }

    pub fn at(&self, date: NaiveDate, time: NaiveTime) -> Result<DateTime<Utc>, TimeError> {
        self.localize(date.and_time(time))
    }

    /// First instant of the clinic-local day.
    pub fn start_of_day(&self, date: NaiveDate) -> DateTime<Utc> {
        let mut candidate = date.and_time(NaiveTime::MIN);
        // Some zones skip midnight on DST days; walk forward to the first valid wall time.
        loop {
            if let Some(local) = self.tz.from_local_datetime(&candidate).earliest() {
                return local.with_timezone(&Utc);
            }
            candidate += Duration::minutes(30);
        }
    }

    /// `[start of day, start of next day)` in UTC.
    pub fn day_bounds(&self, date: NaiveDate) -> (DateTime<Utc>, DateTime<Utc>) {
        let next = date.succ_opt().unwrap_or(NaiveDate::MAX);
        (self.start_of_day(date), self.start_of_day(next))
    }

    pub fn to_local(&self, instant: DateTime<Utc>) -> DateTime<Tz> {
        instant.with_timezone(&self.tz)
    }

    pub fn local_date(&self, instant: DateTime<Utc>) -> NaiveDate {
        self.to_local(instant).date_naive()
    }

    pub fn format_time_of_day(&self, instant: DateTime<Utc>) -> String {
        self.to_local(instant).format(TIME_OF_DAY_FORMAT).to_string()
    }
}

impl Default for ClinicClock {
    fn default() -> Self {
        Self::new(shared_config::DEFAULT_CLINIC_TIMEZONE)
    }
}
