//! Error types for the site API.

use serde_json::{Value, json};
use thiserror::Error;

/// Which pipeline rejected an item-type parameter.
///
/// The calendar treats an unknown item type as a client error, the blog
/// reports it as a server error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resource {
    Blog,
    Calendar,
}

/// Errors that can terminate an API request.
#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Invalid or missing Type parameter")]
    InvalidType(Option<String>),

    #[error("Invalid or missing ItemType parameter")]
    InvalidItemType {
        resource: Resource,
        value: Option<String>,
    },

    #[error("Missing required parameter: {0}")]
    MissingParameter(&'static str),

    #[error("Invalid maxitems parameter: {0}")]
    InvalidMaxItems(String),

    #[error("Wrong id for single event")]
    NotFound { id: String },

    #[error("Failed to fetch or parse ICS file")]
    UpstreamFetch(String),

    #[error("Failed to fetch or parse ICS file")]
    UpstreamParse(String),

    #[error("An error occured while querying the content repository")]
    ContentRepository(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl ApiError {
    /// HTTP status code this error is reported with.
    pub fn status(&self) -> u16 {
        match self {
            ApiError::InvalidItemType {
                resource: Resource::Calendar,
                ..
            } => 400,
            ApiError::InvalidMaxItems(_) => 400,
            ApiError::NotFound { .. } => 404,
            ApiError::InvalidType(_)
            | ApiError::InvalidItemType { .. }
            | ApiError::MissingParameter(_)
            | ApiError::UpstreamFetch(_)
            | ApiError::UpstreamParse(_)
            | ApiError::ContentRepository(_)
            | ApiError::Config(_) => 500,
        }
    }

    /// Diagnostic payload attached to the error body.
    ///
    /// Upstream calendar failures carry an empty object; their detail is only
    /// logged.
    pub fn debug(&self) -> Value {
        match self {
            ApiError::InvalidType(value) => json!({ "type": value }),
            ApiError::InvalidItemType {
                resource: Resource::Calendar,
                value,
            } => json!({ "ItemType": value }),
            ApiError::InvalidItemType {
                resource: Resource::Blog,
                value,
            } => json!({ "type": value }),
            ApiError::MissingParameter(name) => json!({ "parameter": name }),
            ApiError::InvalidMaxItems(value) => json!({ "maxitems": value }),
            ApiError::NotFound { id } => json!({ "uid": id }),
            ApiError::UpstreamFetch(_) | ApiError::UpstreamParse(_) => json!({}),
            ApiError::ContentRepository(detail) | ApiError::Config(detail) => {
                json!({ "error": detail })
            }
        }
    }

    /// Internal detail for logging, if the error carries more than its message.
    pub fn detail(&self) -> Option<&str> {
        match self {
            ApiError::UpstreamFetch(d)
            | ApiError::UpstreamParse(d)
            | ApiError::ContentRepository(d) => Some(d),
            _ => None,
        }
    }
}

/// Result type alias for API operations.
pub type ApiResult<T> = Result<T, ApiError>;
