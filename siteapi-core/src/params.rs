//! Query parameters of the `/api` endpoint.

use crate::blog::{self, BlogQuery};
use crate::calendar::{self, CalendarQuery};
use crate::error::{ApiError, ApiResult};

/// Which data source a request targets.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApiRequest {
    Blog(BlogQuery),
    Calendar(CalendarQuery),
}

/// Raw `/api` query parameters. Blank values count as absent.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ApiParams {
    pub r#type: Option<String>,
    pub maxitems: Option<String>,
    pub itemtype: Option<String>,
    pub category: Option<String>,
    pub postid: Option<String>,
    pub id: Option<String>,
    pub download: Option<String>,
}

impl ApiParams {
    /// Collect parameters from decoded key/value pairs. For repeated keys the
    /// first value wins; unknown keys are ignored.
    pub fn from_pairs<K, V>(pairs: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: AsRef<str>,
        V: Into<String>,
    {
        let mut params = ApiParams::default();

        for (key, value) in pairs {
            let slot = match key.as_ref() {
                "type" => &mut params.r#type,
                "maxitems" => &mut params.maxitems,
                "itemtype" => &mut params.itemtype,
                "category" => &mut params.category,
                "postid" => &mut params.postid,
                "id" => &mut params.id,
                "download" => &mut params.download,
                _ => continue,
            };
            if slot.is_none() {
                let value = value.into();
                if !value.is_empty() {
                    *slot = Some(value);
                }
            }
        }

        params
    }

    /// Route to the blog or calendar pipeline and validate `maxitems`.
    pub fn into_request(self) -> ApiResult<ApiRequest> {
        match self.r#type.as_deref() {
            Some("blog") => Ok(ApiRequest::Blog(BlogQuery {
                max_items: parse_max_items(self.maxitems, blog::DEFAULT_MAX_ITEMS)?,
                item_type: self.itemtype,
                category: self.category,
                post_id: self.postid,
            })),
            Some("calendar") => Ok(ApiRequest::Calendar(CalendarQuery {
                max_items: parse_max_items(self.maxitems, calendar::DEFAULT_MAX_ITEMS)?,
                item_type: self.itemtype,
                id: self.id,
                download: self.download.as_deref() == Some("true"),
            })),
            _ => Err(ApiError::InvalidType(self.r#type)),
        }
    }
}

fn parse_max_items(raw: Option<String>, default: usize) -> ApiResult<usize> {
    match raw {
        None => Ok(default),
        Some(raw) => raw.trim().parse().map_err(|_| ApiError::InvalidMaxItems(raw)),
    }
}
