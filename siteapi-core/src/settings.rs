//! Runtime configuration.
//!
//! Values are layered: built-in defaults, then an optional TOML file
//! (`siteapi.toml`, or the path in `SITEAPI_CONFIG`), then `SITEAPI_*`
//! environment variables.

use std::path::PathBuf;

use config::{Config, Environment, File, FileFormat};
use serde::Deserialize;

use crate::directives::DEFAULT_PREVIEW_URL;
use crate::error::{ApiError, ApiResult};

static DEFAULT_CONFIG_FILE: &str = "siteapi.toml";
static CONFIG_PATH_VAR: &str = "SITEAPI_CONFIG";
static ENV_PREFIX: &str = "SITEAPI";

const DEFAULT_BIND: &str = "127.0.0.1:3000";
const DEFAULT_CALENDAR_URL: &str =
    "https://cloud.jonasebert.de/remote.php/dav/public-calendars/bn8yfoyg8GEQ6TNN?export";
const DEFAULT_USER_AGENT: &str = "Jonas Ebert/1.0";
const DEFAULT_PRISMIC_ENDPOINT: &str = "https://jonasebert.cdn.prismic.io/api/v2";
const DEFAULT_DOCUMENT_TYPE: &str = "article";

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct Settings {
    /// Address the HTTP server listens on
    pub bind: String,
    /// Public ICS feed
    pub calendar_url: String,
    /// User-Agent sent when fetching the feed
    pub user_agent: String,
    /// Teaser preview URL; `{id}` is replaced with the image id
    pub teaser_preview_url: String,
    /// Prismic REST endpoint
    pub prismic_endpoint: String,
    /// Prismic custom type holding blog posts
    pub blog_document_type: String,
}

impl Settings {
    /// Load settings from the default file location and the environment.
    pub fn load() -> ApiResult<Self> {
        let path = std::env::var(CONFIG_PATH_VAR)
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from(DEFAULT_CONFIG_FILE));

        Self::builder()?
            .add_source(File::from(path).format(FileFormat::Toml).required(false))
            .add_source(Environment::with_prefix(ENV_PREFIX))
            .build()
            .map_err(|e| ApiError::Config(e.to_string()))?
            .try_deserialize()
            .map_err(|e| ApiError::Config(e.to_string()))
    }

    /// Settings from a TOML string layered over the defaults. The
    /// environment is not consulted.
    pub fn from_toml(contents: &str) -> ApiResult<Self> {
        Self::builder()?
            .add_source(File::from_str(contents, FileFormat::Toml))
            .build()
            .map_err(|e| ApiError::Config(e.to_string()))?
            .try_deserialize()
            .map_err(|e| ApiError::Config(e.to_string()))
    }

    fn builder() -> ApiResult<config::ConfigBuilder<config::builder::DefaultState>> {
        Config::builder()
            .set_default("bind", DEFAULT_BIND)
            .and_then(|b| b.set_default("calendar_url", DEFAULT_CALENDAR_URL))
            .and_then(|b| b.set_default("user_agent", DEFAULT_USER_AGENT))
            .and_then(|b| b.set_default("teaser_preview_url", DEFAULT_PREVIEW_URL))
            .and_then(|b| b.set_default("prismic_endpoint", DEFAULT_PRISMIC_ENDPOINT))
            .and_then(|b| b.set_default("blog_document_type", DEFAULT_DOCUMENT_TYPE))
            .map_err(|e| ApiError::Config(e.to_string()))
    }
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            bind: DEFAULT_BIND.to_string(),
            calendar_url: DEFAULT_CALENDAR_URL.to_string(),
            user_agent: DEFAULT_USER_AGENT.to_string(),
            teaser_preview_url: DEFAULT_PREVIEW_URL.to_string(),
            prismic_endpoint: DEFAULT_PRISMIC_ENDPOINT.to_string(),
            blog_document_type: DEFAULT_DOCUMENT_TYPE.to_string(),
        }
    }
}
