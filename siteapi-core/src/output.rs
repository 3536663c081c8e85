//! The event shape returned to website clients.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Serialize, Serializer};

use crate::directives::ExtractedFields;
use crate::event::DateType;
use crate::recurrence::Occurrence;

/// State reported for events whose feed entry has no STATUS.
pub const DEFAULT_STATE: &str = "TENTATIVE";

/// A calendar event as served to clients.
///
/// Optional values serialize as `null`, never as missing keys.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OutputEvent {
    pub id: String,
    #[serde(serialize_with = "serialize_instant")]
    pub start: DateTime<Utc>,
    #[serde(serialize_with = "serialize_instant")]
    pub end: DateTime<Utc>,
    pub now: bool,
    pub datetype: DateType,
    pub summary: Option<String>,
    pub location: Option<String>,
    pub description: Option<String>,
    pub state: String,
    #[serde(rename = "teaserImage")]
    pub teaser_image: TeaserImage,
    pub url: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TeaserImage {
    pub url: Option<String>,
    pub copyright: Copyright,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Copyright {
    pub text: Option<String>,
    pub url: Option<String>,
}

/// Build the client-facing record for one occurrence.
pub fn normalize(
    occurrence: &Occurrence<'_>,
    fields: ExtractedFields,
    now: DateTime<Utc>,
) -> OutputEvent {
    let event = occurrence.event;

    OutputEvent {
        id: event.uid.clone(),
        start: occurrence.start,
        end: occurrence.end,
        now: occurrence.is_happening(now),
        datetype: event.date_type(),
        summary: event.summary.clone(),
        location: event.location.clone(),
        description: fields.cleaned_description,
        state: event
            .status
            .clone()
            .unwrap_or_else(|| DEFAULT_STATE.to_string()),
        teaser_image: TeaserImage {
            url: fields.teaser_image_url,
            copyright: Copyright {
                text: fields.teaser_copyright_text,
                url: fields.teaser_copyright_url,
            },
        },
        url: fields.external_event_url,
    }
}

/// ISO-8601 in UTC with millisecond precision, e.g. `2024-05-01T18:00:00.000Z`.
fn serialize_instant<S: Serializer>(
    instant: &DateTime<Utc>,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&instant.to_rfc3339_opts(SecondsFormat::Millis, true))
}
