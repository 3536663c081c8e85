use std::sync::Arc;

use chrono::{DateTime, Utc};
use siteapi_core::{
    ApiResult, BlogPipeline, CalendarPipeline, CalendarSource, ContentRepository, FieldExtractor,
    PrismicRepository, Settings, WebcalSource,
};

type Clock = Arc<dyn Fn() -> DateTime<Utc> + Send + Sync>;

/// Shared application state
///
/// Nothing in here changes between requests; every request builds its
/// events from a fresh fetch.
#[derive(Clone)]
pub struct AppState {
    pub calendar: CalendarPipeline,
    pub blog: BlogPipeline,
    clock: Clock,
}

impl AppState {
    pub fn new(
        calendar_source: Arc<dyn CalendarSource>,
        repository: Arc<dyn ContentRepository>,
        extractor: FieldExtractor,
    ) -> Self {
        AppState {
            calendar: CalendarPipeline::new(calendar_source, extractor),
            blog: BlogPipeline::new(repository),
            clock: Arc::new(Utc::now),
        }
    }

    /// Wire up the real upstreams described by `settings`.
    pub fn from_settings(settings: &Settings) -> ApiResult<Self> {
        let source = WebcalSource::new(settings.calendar_url.clone(), &settings.user_agent)?;
        let repository = PrismicRepository::new(
            settings.prismic_endpoint.clone(),
            settings.blog_document_type.clone(),
        )?;

        Ok(AppState::new(
            Arc::new(source),
            Arc::new(repository),
            FieldExtractor::new(settings.teaser_preview_url.clone()),
        ))
    }

    /// Replace the wall clock, e.g. with a fixed instant in tests.
    pub fn with_clock(mut self, clock: impl Fn() -> DateTime<Utc> + Send + Sync + 'static) -> Self {
        self.clock = Arc::new(clock);
        self
    }

    pub fn now(&self) -> DateTime<Utc> {
        (self.clock)()
    }
}
