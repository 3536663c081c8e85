//! The calendar pipeline: fetch, expand, select, reshape.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tracing::{debug, info};

use crate::directives::FieldExtractor;
use crate::error::{ApiError, ApiResult, Resource};
use crate::event::CalendarEvent;
use crate::ics::{generate_export, parse_calendar};
use crate::output::{OutputEvent, normalize};
use crate::recurrence::{Occurrence, expand};
use crate::window::TimeWindow;

pub const DEFAULT_MAX_ITEMS: usize = 93;

/// Filename used when an export contains no events.
const EMPTY_EXPORT_FILENAME: &str = "calendar.ics";

/// Parameters of a calendar request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CalendarQuery {
    pub max_items: usize,
    /// `all` (the default) or `single`
    pub item_type: Option<String>,
    /// Event uid, required for `single`
    pub id: Option<String>,
    pub download: bool,
}

impl Default for CalendarQuery {
    fn default() -> Self {
        CalendarQuery {
            max_items: DEFAULT_MAX_ITEMS,
            item_type: None,
            id: None,
            download: false,
        }
    }
}

/// What the calendar pipeline produced.
#[derive(Debug, Clone, PartialEq)]
pub enum CalendarResponse {
    Events(Vec<OutputEvent>),
    Export { filename: String, body: String },
}

/// Where the raw ICS feed comes from.
#[async_trait]
pub trait CalendarSource: Send + Sync {
    async fn fetch(&self) -> ApiResult<String>;
}

/// Public ICS feed fetched over HTTP(S).
#[derive(Clone)]
pub struct WebcalSource {
    http: reqwest::Client,
    url: String,
}

impl WebcalSource {
    pub fn new(url: impl Into<String>, user_agent: &str) -> ApiResult<Self> {
        let http = reqwest::Client::builder()
            .user_agent(user_agent)
            .build()
            .map_err(|e| ApiError::Config(format!("Could not build HTTP client: {e}")))?;

        Ok(WebcalSource {
            http,
            url: url.into(),
        })
    }
}

#[async_trait]
impl CalendarSource for WebcalSource {
    async fn fetch(&self) -> ApiResult<String> {
        debug!(url = %self.url, "fetching calendar feed");

        let response = self
            .http
            .get(&self.url)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| ApiError::UpstreamFetch(e.to_string()))?;

        response
            .text()
            .await
            .map_err(|e| ApiError::UpstreamFetch(e.to_string()))
    }
}

/// Runs calendar requests against a feed.
#[derive(Clone)]
pub struct CalendarPipeline {
    source: Arc<dyn CalendarSource>,
    extractor: FieldExtractor,
}

impl CalendarPipeline {
    pub fn new(source: Arc<dyn CalendarSource>, extractor: FieldExtractor) -> Self {
        CalendarPipeline { source, extractor }
    }

    /// Answer one request. `now` fixes both the window and the
    /// happening-now flags.
    pub async fn run(
        &self,
        query: &CalendarQuery,
        now: DateTime<Utc>,
    ) -> ApiResult<CalendarResponse> {
        let feed = self.source.fetch().await?;
        let events = parse_calendar(&feed)?;
        info!(count = events.len(), "parsed calendar feed");

        let output = select_events(&events, query, now, &self.extractor)?;

        if !query.download {
            return Ok(CalendarResponse::Events(output));
        }

        let filename = output
            .last()
            .and_then(|e| export_filename(&e.id))
            .unwrap_or_else(|| EMPTY_EXPORT_FILENAME.to_string());
        let body = generate_export(&output, now);

        Ok(CalendarResponse::Export { filename, body })
    }
}

/// `<uid>.ics` with every character outside `[A-Za-z0-9._@-]` replaced by
/// `_`, so the name can sit in a quoted Content-Disposition value.
fn export_filename(uid: &str) -> Option<String> {
    if uid.is_empty() {
        return None;
    }
    let stem: String = uid
        .chars()
        .map(|c| match c {
            'A'..='Z' | 'a'..='z' | '0'..='9' | '.' | '_' | '@' | '-' => c,
            _ => '_',
        })
        .collect();
    Some(format!("{stem}.ics"))
}

/// Expand, sort, filter, truncate and normalize parsed events.
pub fn select_events(
    events: &[CalendarEvent],
    query: &CalendarQuery,
    now: DateTime<Utc>,
    extractor: &FieldExtractor,
) -> ApiResult<Vec<OutputEvent>> {
    let window = TimeWindow::upcoming(now);

    let mut occurrences: Vec<Occurrence<'_>> = Vec::new();
    for event in events {
        occurrences.extend(expand(event, &window)?);
    }
    occurrences.sort_by_key(|o| o.start);

    let mut occurrences = filter_item_type(occurrences, query)?;
    occurrences.truncate(query.max_items);

    Ok(occurrences
        .iter()
        .map(|occ| {
            let fields = extractor.extract(occ.event.description.as_deref());
            normalize(occ, fields, now)
        })
        .collect())
}

fn filter_item_type<'a>(
    occurrences: Vec<Occurrence<'a>>,
    query: &CalendarQuery,
) -> ApiResult<Vec<Occurrence<'a>>> {
    match query.item_type.as_deref().unwrap_or("all") {
        "all" => Ok(occurrences),
        "single" => {
            let id = query
                .id
                .as_deref()
                .filter(|id| !id.is_empty())
                .ok_or(ApiError::MissingParameter("id"))?;

            let matching: Vec<_> = occurrences
                .into_iter()
                .filter(|o| o.event.uid == id)
                .collect();

            if matching.is_empty() {
                return Err(ApiError::NotFound { id: id.to_string() });
            }
            Ok(matching)
        }
        other => Err(ApiError::InvalidItemType {
            resource: Resource::Calendar,
            value: Some(other.to_string()),
        }),
    }
}
