//! Forward-looking time window for calendar queries.

use chrono::{DateTime, Duration, Months, Utc};

/// Half-open window `[start, end)` of instants.
///
/// Expansion tests both bounds inclusively; the half-open form only
/// describes how the end is derived.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeWindow {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl TimeWindow {
    /// Window from `now` to three months and one day later.
    ///
    /// Month arithmetic clamps to the end of shorter months
    /// (Nov 30 + 3 months = Feb 28/29).
    pub fn upcoming(now: DateTime<Utc>) -> Self {
        let end = now
            .checked_add_months(Months::new(3))
            .unwrap_or(DateTime::<Utc>::MAX_UTC)
            .checked_add_signed(Duration::days(1))
            .unwrap_or(DateTime::<Utc>::MAX_UTC);

        TimeWindow { start: now, end }
    }

    /// Inclusive on both bounds.
    pub fn contains(&self, instant: DateTime<Utc>) -> bool {
        self.start <= instant && instant <= self.end
    }
}
