//! Expansion of feed events into concrete occurrences inside a time window.

use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, Utc};
use rrule::RRuleSet;

use crate::error::{ApiError, ApiResult};
use crate::event::{CalendarEvent, EventTime, Recurrence};
use crate::window::TimeWindow;

/// One materialization of an event at a concrete start/end pair.
#[derive(Debug, Clone, PartialEq)]
pub struct Occurrence<'a> {
    pub event: &'a CalendarEvent,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl Occurrence<'_> {
    /// True when `now` falls inside `[start, end]`.
    pub fn is_happening(&self, now: DateTime<Utc>) -> bool {
        self.start <= now && now <= self.end
    }
}

/// Expand an event into its occurrences within `window`.
///
/// A single event yields itself when its start or its end lies in the
/// window. A recurring event yields one occurrence per rule instance in the
/// window, each keeping the master's duration.
pub fn expand<'a>(event: &'a CalendarEvent, window: &TimeWindow) -> ApiResult<Vec<Occurrence<'a>>> {
    let start = event.start.to_utc();
    let end = event.end.to_utc();

    let Some(recurrence) = &event.recurrence else {
        if window.contains(start) || window.contains(end) {
            return Ok(vec![Occurrence { event, start, end }]);
        }
        return Ok(Vec::new());
    };

    let Some(rule) = normalize_until(&event.start, &recurrence.rrule) else {
        // Rule ends before it starts
        return Ok(Vec::new());
    };

    let rrule_str = build_rrule_string(&event.start, &rule, recurrence);
    let rrule_set: RRuleSet = rrule_str.parse().map_err(|e| {
        ApiError::UpstreamParse(format!(
            "Failed to parse RRULE for event '{}': {}",
            event.uid, e
        ))
    })?;

    // after/before are exclusive; widen by a second and filter exactly below.
    let tz: rrule::Tz = Utc.into();
    let rrule_set = rrule_set
        .after((window.start - Duration::seconds(1)).with_timezone(&tz))
        .before((window.end + Duration::seconds(1)).with_timezone(&tz));

    let duration = end - start;
    let mut occurrences = Vec::new();
    for instance in &rrule_set {
        let instant = instance.with_timezone(&Utc);
        if instant > window.end {
            break;
        }
        if window.contains(instant) {
            occurrences.push(Occurrence {
                event,
                start: instant,
                end: instant + duration,
            });
        }
    }

    Ok(occurrences)
}

/// Build an iCalendar-format rule set string for the rrule crate parser.
fn build_rrule_string(start: &EventTime, rule: &str, recurrence: &Recurrence) -> String {
    let mut lines = Vec::with_capacity(2 + recurrence.exdates.len());
    lines.push(format!("DTSTART{}", rrule_time_value(start)));
    lines.push(format!("RRULE:{rule}"));
    for exdate in &recurrence.exdates {
        lines.push(format!("EXDATE{}", rrule_time_value(exdate)));
    }
    lines.join("\n")
}

/// Parameter-and-value part of a DTSTART/EXDATE line.
///
/// The rrule crate needs datetimes, so all-day dates become midnight UTC,
/// floating times are read as UTC, and zones it cannot resolve are converted
/// to UTC up front.
fn rrule_time_value(time: &EventTime) -> String {
    match time {
        EventTime::Date(d) => format!(":{}T000000Z", d.format("%Y%m%d")),
        EventTime::DateTimeUtc(dt) => format!(":{}", dt.format("%Y%m%dT%H%M%SZ")),
        EventTime::DateTimeFloating(dt) => format!(":{}Z", dt.format("%Y%m%dT%H%M%S")),
        EventTime::DateTimeZoned { datetime, tzid } => {
            if tzid.parse::<chrono_tz::Tz>().is_ok() {
                format!(";TZID={}:{}", tzid, datetime.format("%Y%m%dT%H%M%S"))
            } else {
                format!(":{}", time.to_utc().format("%Y%m%dT%H%M%SZ"))
            }
        }
    }
}

/// Rewrite the rule's UNTIL as a UTC instant, the only form the rrule crate
/// accepts next to the DTSTART written by [`rrule_time_value`].
///
/// A DATE until covers its whole day. DATE and floating values are read in
/// the start's zone. Returns `None` when UNTIL lies before the start.
fn normalize_until(start: &EventTime, rule: &str) -> Option<String> {
    let start_utc = start.to_utc();
    let mut parts = Vec::new();

    for part in rule.split(';') {
        let until = part
            .split_once('=')
            .filter(|(key, _)| key.trim().eq_ignore_ascii_case("UNTIL"))
            .and_then(|(_, value)| until_instant(value.trim(), start));

        match until {
            Some(until) if until < start_utc => return None,
            Some(until) => parts.push(format!("UNTIL={}", until.format("%Y%m%dT%H%M%SZ"))),
            // Unparseable values are left for the rrule parser to reject
            None => parts.push(part.to_string()),
        }
    }

    Some(parts.join(";"))
}

fn until_instant(value: &str, start: &EventTime) -> Option<DateTime<Utc>> {
    if let Some(utc) = value.strip_suffix('Z') {
        return NaiveDateTime::parse_from_str(utc, "%Y%m%dT%H%M%S")
            .ok()
            .map(|dt| dt.and_utc());
    }

    let local = match NaiveDate::parse_from_str(value, "%Y%m%d") {
        Ok(date) => date.and_hms_opt(23, 59, 59)?,
        Err(_) => NaiveDateTime::parse_from_str(value, "%Y%m%dT%H%M%S").ok()?,
    };

    Some(match start {
        EventTime::DateTimeZoned { tzid, .. } => EventTime::DateTimeZoned {
            datetime: local,
            tzid: tzid.clone(),
        }
        .to_utc(),
        _ => local.and_utc(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, TimeZone};

    fn utc(y: i32, m: u32, d: u32, h: u32, min: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, h, min, 0).unwrap()
    }

    fn single(uid: &str, start: DateTime<Utc>, end: DateTime<Utc>) -> CalendarEvent {
        CalendarEvent {
            uid: uid.to_string(),
            summary: Some("Concert".to_string()),
            location: None,
            description: None,
            status: None,
            start: EventTime::DateTimeUtc(start),
            end: EventTime::DateTimeUtc(end),
            recurrence: None,
        }
    }

    fn recurring(start: EventTime, end: EventTime, rrule: &str) -> CalendarEvent {
        CalendarEvent {
            uid: "weekly".to_string(),
            summary: Some("Rehearsal".to_string()),
            location: Some("Hall".to_string()),
            description: None,
            status: None,
            start,
            end,
            recurrence: Some(Recurrence {
                rrule: rrule.to_string(),
                exdates: vec![],
            }),
        }
    }

    #[test]
    fn test_single_event_inside_window() {
        let window = TimeWindow::upcoming(utc(2024, 1, 1, 0, 0));
        let event = single("a", utc(2024, 2, 1, 10, 0), utc(2024, 2, 1, 12, 0));

        let occurrences = expand(&event, &window).unwrap();

        assert_eq!(occurrences.len(), 1);
        assert_eq!(occurrences[0].start, utc(2024, 2, 1, 10, 0));
        assert_eq!(occurrences[0].end, utc(2024, 2, 1, 12, 0));
    }

    #[test]
    fn test_single_event_with_only_end_in_window_qualifies() {
        let window = TimeWindow::upcoming(utc(2024, 1, 1, 12, 0));
        let event = single("running", utc(2023, 12, 31, 10, 0), utc(2024, 1, 2, 10, 0));

        assert_eq!(expand(&event, &window).unwrap().len(), 1);
    }

    #[test]
    fn test_single_event_outside_window_is_dropped() {
        let window = TimeWindow::upcoming(utc(2024, 1, 1, 12, 0));
        let past = single("past", utc(2023, 12, 1, 10, 0), utc(2023, 12, 1, 12, 0));
        let far = single("far", utc(2024, 6, 1, 10, 0), utc(2024, 6, 1, 12, 0));
        // Spans the whole window with neither endpoint inside
        let spanning = single("spanning", utc(2023, 1, 1, 0, 0), utc(2025, 1, 1, 0, 0));

        assert!(expand(&past, &window).unwrap().is_empty());
        assert!(expand(&far, &window).unwrap().is_empty());
        assert!(expand(&spanning, &window).unwrap().is_empty());
    }

    #[test]
    fn test_recurring_event_preserves_duration() {
        let window = TimeWindow::upcoming(utc(2024, 1, 1, 0, 0));
        let event = recurring(
            EventTime::DateTimeUtc(utc(2023, 12, 4, 18, 0)),
            EventTime::DateTimeUtc(utc(2023, 12, 4, 20, 30)),
            "FREQ=WEEKLY;BYDAY=MO;COUNT=8",
        );

        let occurrences = expand(&event, &window).unwrap();

        // Mondays from Dec 4: four in December, four inside the window
        assert_eq!(occurrences.len(), 4);
        assert_eq!(occurrences[0].start, utc(2024, 1, 1, 18, 0));
        for occ in &occurrences {
            assert_eq!(occ.end - occ.start, Duration::minutes(150));
            assert!(window.contains(occ.start));
            assert_eq!(occ.event.uid, "weekly");
        }
    }

    #[test]
    fn test_recurring_event_counts_instances_in_window() {
        let now = utc(2024, 1, 1, 0, 0);
        let window = TimeWindow::upcoming(now);
        let event = recurring(
            EventTime::DateTimeUtc(utc(2023, 1, 1, 9, 0)),
            EventTime::DateTimeUtc(utc(2023, 1, 1, 10, 0)),
            "FREQ=DAILY",
        );

        let occurrences = expand(&event, &window).unwrap();

        let expected = (0..)
            .map(|i| utc(2024, 1, 1, 9, 0) + Duration::days(i))
            .take_while(|t| *t <= window.end)
            .count();
        assert_eq!(occurrences.len(), expected);
        assert!(occurrences.windows(2).all(|w| w[0].start < w[1].start));
    }

    #[test]
    fn test_recurring_event_honours_exdates() {
        let window = TimeWindow::upcoming(utc(2024, 1, 1, 0, 0));
        let mut event = recurring(
            EventTime::DateTimeUtc(utc(2024, 1, 1, 18, 0)),
            EventTime::DateTimeUtc(utc(2024, 1, 1, 19, 0)),
            "FREQ=WEEKLY;COUNT=3",
        );
        event.recurrence.as_mut().unwrap().exdates =
            vec![EventTime::DateTimeUtc(utc(2024, 1, 8, 18, 0))];

        let starts: Vec<_> = expand(&event, &window)
            .unwrap()
            .into_iter()
            .map(|o| o.start)
            .collect();

        assert_eq!(starts, vec![utc(2024, 1, 1, 18, 0), utc(2024, 1, 15, 18, 0)]);
    }

    #[test]
    fn test_zoned_recurrence_follows_local_time_across_dst() {
        let window = TimeWindow::upcoming(utc(2024, 3, 1, 0, 0));
        let local = NaiveDate::from_ymd_opt(2024, 3, 30)
            .unwrap()
            .and_hms_opt(19, 0, 0)
            .unwrap();
        let event = recurring(
            EventTime::DateTimeZoned {
                datetime: local,
                tzid: "Europe/Berlin".to_string(),
            },
            EventTime::DateTimeZoned {
                datetime: local + Duration::hours(2),
                tzid: "Europe/Berlin".to_string(),
            },
            "FREQ=DAILY;COUNT=2",
        );

        let occurrences = expand(&event, &window).unwrap();

        // 19:00 CET on Mar 30, 19:00 CEST on Mar 31
        assert_eq!(occurrences.len(), 2);
        assert_eq!(occurrences[0].start, utc(2024, 3, 30, 18, 0));
        assert_eq!(occurrences[1].start, utc(2024, 3, 31, 17, 0));
        assert_eq!(occurrences[1].end, utc(2024, 3, 31, 19, 0));
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn starts(event: &CalendarEvent, window: &TimeWindow) -> Vec<DateTime<Utc>> {
        expand(event, window)
            .unwrap()
            .into_iter()
            .map(|o| o.start)
            .collect()
    }

    #[test]
    fn test_all_day_recurrence_with_date_until() {
        let window = TimeWindow::upcoming(utc(2024, 1, 1, 0, 0));
        let event = recurring(
            EventTime::Date(date(2023, 12, 4)),
            EventTime::Date(date(2023, 12, 5)),
            "FREQ=WEEKLY;UNTIL=20240301",
        );

        let occurrences = expand(&event, &window).unwrap();

        // Mondays Jan 1 .. Feb 26
        assert_eq!(occurrences.len(), 9);
        assert_eq!(occurrences[0].start, utc(2024, 1, 1, 0, 0));
        assert_eq!(occurrences[8].start, utc(2024, 2, 26, 0, 0));
        assert!(occurrences.iter().all(|o| o.end - o.start == Duration::days(1)));
    }

    #[test]
    fn test_date_until_includes_its_last_day() {
        let window = TimeWindow::upcoming(utc(2024, 1, 1, 0, 0));
        let event = recurring(
            EventTime::Date(date(2024, 1, 1)),
            EventTime::Date(date(2024, 1, 2)),
            "FREQ=DAILY;UNTIL=20240103",
        );

        assert_eq!(
            starts(&event, &window),
            vec![utc(2024, 1, 1, 0, 0), utc(2024, 1, 2, 0, 0), utc(2024, 1, 3, 0, 0)]
        );
    }

    #[test]
    fn test_floating_recurrence_with_floating_until() {
        let window = TimeWindow::upcoming(utc(2024, 1, 1, 0, 0));
        let local = date(2023, 12, 4).and_hms_opt(18, 0, 0).unwrap();
        let event = recurring(
            EventTime::DateTimeFloating(local),
            EventTime::DateTimeFloating(local + Duration::hours(1)),
            "FREQ=WEEKLY;UNTIL=20240115T180000",
        );

        assert_eq!(
            starts(&event, &window),
            vec![utc(2024, 1, 1, 18, 0), utc(2024, 1, 8, 18, 0), utc(2024, 1, 15, 18, 0)]
        );
    }

    #[test]
    fn test_utc_recurrence_with_date_until() {
        let window = TimeWindow::upcoming(utc(2024, 1, 1, 0, 0));
        let event = recurring(
            EventTime::DateTimeUtc(utc(2023, 12, 4, 18, 0)),
            EventTime::DateTimeUtc(utc(2023, 12, 4, 19, 0)),
            "FREQ=WEEKLY;UNTIL=20240115",
        );

        assert_eq!(starts(&event, &window).len(), 3);
    }

    #[test]
    fn test_zoned_recurrence_with_date_until_uses_local_day() {
        let window = TimeWindow::upcoming(utc(2024, 1, 1, 0, 0));
        let local = date(2023, 12, 4).and_hms_opt(19, 0, 0).unwrap();
        let event = recurring(
            EventTime::DateTimeZoned {
                datetime: local,
                tzid: "Europe/Berlin".to_string(),
            },
            EventTime::DateTimeZoned {
                datetime: local + Duration::hours(2),
                tzid: "Europe/Berlin".to_string(),
            },
            "FREQ=WEEKLY;UNTIL=20240101",
        );

        assert_eq!(starts(&event, &window), vec![utc(2024, 1, 1, 18, 0)]);
    }

    #[test]
    fn test_until_before_start_yields_nothing() {
        let window = TimeWindow::upcoming(utc(2024, 1, 1, 0, 0));
        let event = recurring(
            EventTime::DateTimeUtc(utc(2024, 2, 1, 18, 0)),
            EventTime::DateTimeUtc(utc(2024, 2, 1, 19, 0)),
            "FREQ=DAILY;UNTIL=20240101T000000Z",
        );

        assert!(expand(&event, &window).unwrap().is_empty());
    }

    #[test]
    fn test_high_frequency_rule_is_not_capped() {
        let window = TimeWindow::upcoming(utc(2024, 1, 1, 0, 0));
        let event = recurring(
            EventTime::DateTimeUtc(utc(2023, 12, 31, 0, 0)),
            EventTime::DateTimeUtc(utc(2023, 12, 31, 0, 15)),
            "FREQ=MINUTELY;INTERVAL=30",
        );

        let occurrences = expand(&event, &window).unwrap();

        let expected = (0..)
            .map(|i| utc(2024, 1, 1, 0, 0) + Duration::minutes(30 * i))
            .take_while(|t| *t <= window.end)
            .count();
        assert_eq!(expected, 4417);
        assert_eq!(occurrences.len(), expected);
        assert_eq!(occurrences.last().unwrap().start, window.end);
    }

    #[test]
    fn test_invalid_rrule_is_a_parse_failure() {
        let window = TimeWindow::upcoming(utc(2024, 1, 1, 0, 0));
        let event = recurring(
            EventTime::DateTimeUtc(utc(2024, 1, 1, 18, 0)),
            EventTime::DateTimeUtc(utc(2024, 1, 1, 19, 0)),
            "FREQ=SOMETIMES",
        );

        let err = expand(&event, &window).unwrap_err();

        assert!(matches!(err, ApiError::UpstreamParse(_)));
    }

    #[test]
    fn test_is_happening_is_closed_interval() {
        let event = single("a", utc(2024, 1, 1, 10, 0), utc(2024, 1, 1, 12, 0));
        let occ = Occurrence {
            event: &event,
            start: utc(2024, 1, 1, 10, 0),
            end: utc(2024, 1, 1, 12, 0),
        };

        assert!(occ.is_happening(utc(2024, 1, 1, 10, 0)));
        assert!(occ.is_happening(utc(2024, 1, 1, 12, 0)));
        assert!(!occ.is_happening(utc(2024, 1, 1, 9, 59)));
    }
}
