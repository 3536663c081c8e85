//! ICS export of served events.

use chrono::{DateTime, Utc};
use icalendar::{Calendar, Component, EventLike, Property, ValueType};

use crate::event::DateType;
use crate::output::OutputEvent;

/// PRODID written into exported calendars.
pub const EXPORT_PRODID: &str = "-//siteapi//Calendar Export//EN";

/// Serialize events into one VCALENDAR.
///
/// Each event carries its uid, start, end, summary, (cleaned) description
/// and location. `stamp` is written as DTSTAMP.
pub fn generate_export(events: &[OutputEvent], stamp: DateTime<Utc>) -> String {
    let mut cal = Calendar::new();
    let dtstamp = stamp.format("%Y%m%dT%H%M%SZ").to_string();

    for event in events {
        let mut ics_event = icalendar::Event::new();
        ics_event.uid(&event.id);
        ics_event.add_property("DTSTAMP", &dtstamp);

        add_instant_property(&mut ics_event, "DTSTART", event.start, event.datetype);
        add_instant_property(&mut ics_event, "DTEND", event.end, event.datetype);

        if let Some(summary) = &event.summary {
            ics_event.summary(summary);
        }
        if let Some(desc) = &event.description {
            ics_event.description(desc);
        }
        if let Some(loc) = &event.location {
            ics_event.location(loc);
        }

        cal.push(ics_event.done());
    }

    strip_ics_bloat(&cal.done().to_string())
}

/// Replace PRODID and drop CALSCALE:GREGORIAN (it's the default).
fn strip_ics_bloat(ics: &str) -> String {
    let mut result = String::with_capacity(ics.len());

    for line in ics.lines() {
        if line.starts_with("PRODID:") {
            result.push_str("PRODID:");
            result.push_str(EXPORT_PRODID);
            result.push_str("\r\n");
            continue;
        }
        if line == "CALSCALE:GREGORIAN" {
            continue;
        }
        result.push_str(line);
        result.push_str("\r\n");
    }

    result
}

/// All-day events are written as VALUE=DATE, everything else as UTC.
fn add_instant_property(
    ics_event: &mut icalendar::Event,
    name: &str,
    instant: DateTime<Utc>,
    datetype: DateType,
) {
    match datetype {
        DateType::Date => {
            let mut prop = Property::new(name, instant.format("%Y%m%d").to_string());
            prop.append_parameter(ValueType::Date);
            ics_event.append_property(prop);
        }
        DateType::DateTime => {
            ics_event.add_property(name, instant.format("%Y%m%dT%H%M%SZ").to_string());
        }
    }
}
