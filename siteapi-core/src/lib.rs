//! Core of the personal website API.
//!
//! Two pipelines live here:
//! - `calendar` reads a public ICS feed, expands recurring events into the
//!   upcoming window and reshapes them into [`OutputEvent`]s (or re-exports
//!   them as ICS)
//! - `blog` forwards listing and lookup requests to the headless CMS
//!
//! The HTTP layer only has to turn query parameters into an [`ApiRequest`]
//! and map [`ApiError`]s onto responses.

pub mod blog;
pub mod calendar;
pub mod directives;
pub mod error;
pub mod event;
pub mod ics;
pub mod output;
pub mod params;
pub mod recurrence;
pub mod settings;
pub mod window;

pub use blog::{BlogPipeline, BlogQuery, ContentRepository, PrismicRepository};
pub use calendar::{CalendarPipeline, CalendarQuery, CalendarResponse, CalendarSource, WebcalSource};
pub use directives::{ExtractedFields, FieldExtractor};
pub use error::{ApiError, ApiResult};
pub use event::{CalendarEvent, DateType, EventTime};
pub use output::OutputEvent;
pub use params::{ApiParams, ApiRequest};
pub use settings::Settings;
