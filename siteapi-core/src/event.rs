//! Calendar events as read from the upstream ICS feed.

use std::fmt;

use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

/// A VEVENT from the upstream feed.
///
/// Only the properties the website shows are kept. Times keep the form they
/// had in the feed so recurrence expansion can follow the event's own zone.
#[derive(Debug, Clone, PartialEq)]
pub struct CalendarEvent {
    pub uid: String,
    pub summary: Option<String>,
    pub location: Option<String>,
    pub description: Option<String>,
    /// Raw STATUS value (CONFIRMED, TENTATIVE, CANCELLED, ...)
    pub status: Option<String>,
    pub start: EventTime,
    pub end: EventTime,
    pub recurrence: Option<Recurrence>,
}

/// RRULE plus its exception dates.
#[derive(Debug, Clone, PartialEq)]
pub struct Recurrence {
    pub rrule: String,
    pub exdates: Vec<EventTime>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum EventTime {
    Date(NaiveDate),
    DateTimeUtc(DateTime<Utc>),
    DateTimeFloating(NaiveDateTime),
    DateTimeZoned {
        datetime: NaiveDateTime,
        tzid: String,
    },
}

/// Whether an event is timed or all-day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DateType {
    #[serde(rename = "date-time")]
    DateTime,
    #[serde(rename = "date")]
    Date,
}

impl EventTime {
    /// Resolve to an absolute instant.
    ///
    /// All-day and floating values are read as UTC. A TZID that is not an
    /// IANA zone name also falls back to UTC.
    pub fn to_utc(&self) -> DateTime<Utc> {
        match self {
            EventTime::Date(d) => d.and_time(chrono::NaiveTime::MIN).and_utc(),
            EventTime::DateTimeUtc(dt) => *dt,
            EventTime::DateTimeFloating(dt) => dt.and_utc(),
            EventTime::DateTimeZoned { datetime, tzid } => match tzid.parse::<chrono_tz::Tz>() {
                Ok(tz) => tz
                    .from_local_datetime(datetime)
                    .earliest()
                    .map(|dt| dt.with_timezone(&Utc))
                    // Local time skipped by a DST jump
                    .unwrap_or_else(|| datetime.and_utc()),
                Err(_) => datetime.and_utc(),
            },
        }
    }

    pub fn date_type(&self) -> DateType {
        match self {
            EventTime::Date(_) => DateType::Date,
            _ => DateType::DateTime,
        }
    }

    /// Same instant shifted by `duration`, keeping the variant.
    pub fn shifted(&self, duration: Duration) -> EventTime {
        match self {
            EventTime::Date(d) => EventTime::Date(*d + Duration::days(duration.num_days())),
            EventTime::DateTimeUtc(dt) => EventTime::DateTimeUtc(*dt + duration),
            EventTime::DateTimeFloating(dt) => EventTime::DateTimeFloating(*dt + duration),
            EventTime::DateTimeZoned { datetime, tzid } => EventTime::DateTimeZoned {
                datetime: *datetime + duration,
                tzid: tzid.clone(),
            },
        }
    }
}

impl fmt::Display for EventTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EventTime::Date(d) => write!(f, "{}", d.format("%Y-%m-%d")),
            EventTime::DateTimeUtc(dt) => write!(f, "{}", dt.format("%Y-%m-%dT%H:%M:%SZ")),
            EventTime::DateTimeFloating(dt) => write!(f, "{}", dt.format("%Y-%m-%dT%H:%M:%S")),
            EventTime::DateTimeZoned { datetime, tzid } => {
                write!(f, "{} ({})", datetime.format("%Y-%m-%dT%H:%M:%S"), tzid)
            }
        }
    }
}

impl CalendarEvent {
    pub fn date_type(&self) -> DateType {
        self.start.date_type()
    }

    /// Length of the event, measured on absolute instants.
    pub fn duration(&self) -> Duration {
        self.end.to_utc() - self.start.to_utc()
    }
}
