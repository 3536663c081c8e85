//! ICS feed parsing using the icalendar crate's parser.

use chrono::Duration;
use icalendar::{
    DatePerhapsTime,
    parser::{Component, Property, read_calendar, unfold},
};
use tracing::debug;

use crate::error::{ApiError, ApiResult};
use crate::event::{CalendarEvent, EventTime, Recurrence};

/// Parse a whole feed into its VEVENTs.
///
/// Other component kinds are ignored, as are instance overrides carrying a
/// RECURRENCE-ID. VEVENTs without UID or DTSTART are dropped.
pub fn parse_calendar(content: &str) -> ApiResult<Vec<CalendarEvent>> {
    let unfolded = unfold(content);
    if !unfolded.contains("BEGIN:VCALENDAR") {
        return Err(ApiError::UpstreamParse("no VCALENDAR in feed".to_string()));
    }
    let calendar = read_calendar(&unfolded).map_err(ApiError::UpstreamParse)?;

    let mut vevents = Vec::new();
    collect_vevents(&calendar.components, &mut vevents);

    let events = vevents
        .into_iter()
        .filter(|c| c.find_prop("RECURRENCE-ID").is_none())
        .filter_map(|c| {
            let event = parse_vevent(c);
            if event.is_none() {
                debug!("skipping VEVENT without UID or DTSTART");
            }
            event
        })
        .collect();

    Ok(events)
}

fn collect_vevents<'a, 'c>(components: &'c [Component<'a>], out: &mut Vec<&'c Component<'a>>) {
    for component in components {
        match component.name.as_ref() {
            "VEVENT" => out.push(component),
            "VCALENDAR" => collect_vevents(&component.components, out),
            _ => {}
        }
    }
}

fn parse_vevent(vevent: &Component<'_>) -> Option<CalendarEvent> {
    let uid = vevent.find_prop("UID")?.val.to_string();
    let start = to_event_time(DatePerhapsTime::try_from(vevent.find_prop("DTSTART")?).ok()?);

    let end = vevent
        .find_prop("DTEND")
        .and_then(|p| DatePerhapsTime::try_from(p).ok())
        .map(to_event_time)
        .or_else(|| {
            vevent
                .find_prop("DURATION")
                .and_then(|p| parse_duration(p.val.as_ref()))
                .map(|d| start.shifted(d))
        })
        .unwrap_or_else(|| match start {
            // All-day events without an end cover their whole day
            EventTime::Date(_) => start.shifted(Duration::days(1)),
            _ => start.clone(),
        });

    let text = |name: &str| vevent.find_prop(name).map(|p| unescape_text(p.val.as_ref()));

    let rrule = vevent.find_prop("RRULE").map(|p| p.val.to_string());
    let recurrence = rrule.map(|rrule| Recurrence {
        rrule,
        exdates: vevent
            .properties
            .iter()
            .filter(|p| p.name == "EXDATE")
            .flat_map(parse_exdate_property)
            .collect(),
    });

    Some(CalendarEvent {
        uid,
        summary: text("SUMMARY"),
        location: text("LOCATION"),
        description: text("DESCRIPTION"),
        status: vevent.find_prop("STATUS").map(|p| p.val.to_string()),
        start,
        end,
        recurrence,
    })
}

/// Convert icalendar's DatePerhapsTime to our EventTime, preserving timezone info
fn to_event_time(dpt: DatePerhapsTime) -> EventTime {
    match dpt {
        DatePerhapsTime::Date(d) => EventTime::Date(d),
        DatePerhapsTime::DateTime(cal_dt) => match cal_dt {
            icalendar::CalendarDateTime::Utc(dt) => EventTime::DateTimeUtc(dt),
            icalendar::CalendarDateTime::Floating(naive) => EventTime::DateTimeFloating(naive),
            icalendar::CalendarDateTime::WithTimezone { date_time, tzid } => {
                EventTime::DateTimeZoned {
                    datetime: date_time,
                    tzid,
                }
            }
        },
    }
}

/// Parse an EXDATE property into a list of EventTime values.
///
/// Handles TZID and VALUE=DATE parameters, UTC and floating values, and
/// comma-separated lists.
fn parse_exdate_property(prop: &Property) -> Vec<EventTime> {
    let tzid = prop
        .params
        .iter()
        .find(|p| p.key == "TZID")
        .and_then(|p| p.val.as_ref().map(|v| v.to_string()));

    let is_date = prop
        .params
        .iter()
        .any(|p| p.key == "VALUE" && p.val.as_ref().map(|v| v.as_ref()) == Some("DATE"));

    prop.val
        .as_ref()
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .filter_map(|s| {
            if is_date {
                chrono::NaiveDate::parse_from_str(s, "%Y%m%d")
                    .ok()
                    .map(EventTime::Date)
            } else if let Some(tz) = &tzid {
                chrono::NaiveDateTime::parse_from_str(s, "%Y%m%dT%H%M%S")
                    .ok()
                    .map(|dt| EventTime::DateTimeZoned {
                        datetime: dt,
                        tzid: tz.clone(),
                    })
            } else if let Some(utc) = s.strip_suffix('Z') {
                chrono::NaiveDateTime::parse_from_str(utc, "%Y%m%dT%H%M%S")
                    .ok()
                    .map(|dt| EventTime::DateTimeUtc(dt.and_utc()))
            } else {
                chrono::NaiveDateTime::parse_from_str(s, "%Y%m%dT%H%M%S")
                    .ok()
                    .map(EventTime::DateTimeFloating)
            }
        })
        .collect()
}

/// Parse a DURATION value (P1D, PT1H30M, ...). Negative durations are rejected.
fn parse_duration(value: &str) -> Option<Duration> {
    if value.starts_with('-') {
        return None;
    }
    let duration = iso8601::duration(value.trim_start_matches('+')).ok()?;
    let std_duration: std::time::Duration = duration.into();
    Duration::from_std(std_duration).ok()
}

/// Undo RFC 5545 TEXT escaping.
fn unescape_text(value: &str) -> String {
    let mut result = String::with_capacity(value.len());
    let mut chars = value.chars();

    while let Some(c) = chars.next() {
        if c != '\\' {
            result.push(c);
            continue;
        }
        match chars.next() {
            Some('n') | Some('N') => result.push('\n'),
            Some(other) => result.push(other),
            None => result.push('\\'),
        }
    }

    result
}
