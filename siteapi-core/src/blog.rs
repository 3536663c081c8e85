//! Blog posts served from the headless CMS.

use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

use crate::error::{ApiError, ApiResult, Resource};

pub const DEFAULT_MAX_ITEMS: usize = 30;

/// Largest page the Prismic API hands out.
const PRISMIC_MAX_PAGE_SIZE: usize = 100;

/// Ordering for listings: newest first.
const NEWEST_FIRST: &str = "[document.first_publication_date desc]";

/// Parameters of a blog request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlogQuery {
    pub max_items: usize,
    /// `all`, `category` or `post`
    pub item_type: Option<String>,
    pub category: Option<String>,
    pub post_id: Option<String>,
}

impl Default for BlogQuery {
    fn default() -> Self {
        BlogQuery {
            max_items: DEFAULT_MAX_ITEMS,
            item_type: None,
            category: None,
            post_id: None,
        }
    }
}

/// Read access to the CMS. Documents are passed through untouched.
#[async_trait]
pub trait ContentRepository: Send + Sync {
    /// Posts ordered by first publication date, newest first.
    async fn list_all(&self, max_items: usize) -> ApiResult<Vec<Value>>;

    /// Posts tagged `tag`, same ordering.
    async fn list_by_tag(&self, tag: &str, max_items: usize) -> ApiResult<Vec<Value>>;

    /// One post by its uid.
    async fn get_by_uid(&self, uid: &str) -> ApiResult<Value>;
}

/// Runs blog requests against a repository.
#[derive(Clone)]
pub struct BlogPipeline {
    repository: Arc<dyn ContentRepository>,
}

impl BlogPipeline {
    pub fn new(repository: Arc<dyn ContentRepository>) -> Self {
        BlogPipeline { repository }
    }

    /// A list of posts for `all`/`category`, a single post object for `post`.
    pub async fn run(&self, query: &BlogQuery) -> ApiResult<Value> {
        match query.item_type.as_deref() {
            Some("all") => {
                let posts = self.repository.list_all(query.max_items).await?;
                Ok(Value::Array(posts))
            }
            Some("category") => {
                let category = required(query.category.as_deref(), "category")?;
                let posts = self
                    .repository
                    .list_by_tag(category, query.max_items)
                    .await?;
                Ok(Value::Array(posts))
            }
            Some("post") => {
                let uid = required(query.post_id.as_deref(), "postid")?;
                self.repository.get_by_uid(uid).await
            }
            other => Err(ApiError::InvalidItemType {
                resource: Resource::Blog,
                value: other.map(str::to_string),
            }),
        }
    }
}

fn required<'q>(value: Option<&'q str>, name: &'static str) -> ApiResult<&'q str> {
    value
        .filter(|v| !v.is_empty())
        .ok_or(ApiError::MissingParameter(name))
}

/// Prismic repository accessed through its REST API (v2).
#[derive(Clone)]
pub struct PrismicRepository {
    http: reqwest::Client,
    /// e.g. `https://<repo>.cdn.prismic.io/api/v2`
    endpoint: String,
    document_type: String,
}

#[derive(Deserialize)]
struct ApiInfo {
    refs: Vec<RefInfo>,
}

#[derive(Deserialize)]
struct RefInfo {
    #[serde(rename = "ref")]
    reference: String,
    #[serde(rename = "isMasterRef", default)]
    is_master_ref: bool,
}

#[derive(Deserialize)]
struct SearchResponse {
    results: Vec<Value>,
}

impl PrismicRepository {
    pub fn new(endpoint: impl Into<String>, document_type: impl Into<String>) -> ApiResult<Self> {
        let http = reqwest::Client::builder()
            .build()
            .map_err(|e| ApiError::Config(format!("Could not build HTTP client: {e}")))?;

        Ok(PrismicRepository {
            http,
            endpoint: endpoint.into().trim_end_matches('/').to_string(),
            document_type: document_type.into(),
        })
    }

    /// Every query is pinned to the current master ref.
    async fn master_ref(&self) -> ApiResult<String> {
        let info: ApiInfo = self
            .http
            .get(&self.endpoint)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(repository_error)?
            .json()
            .await
            .map_err(repository_error)?;

        info.refs
            .into_iter()
            .find(|r| r.is_master_ref)
            .map(|r| r.reference)
            .ok_or_else(|| ApiError::ContentRepository("Prismic API exposes no master ref".into()))
    }

    async fn search(
        &self,
        predicates: &[String],
        max_items: Option<usize>,
    ) -> ApiResult<Vec<Value>> {
        let reference = self.master_ref().await?;

        let mut params: Vec<(&str, String)> = vec![("ref", reference)];
        params.extend(predicates.iter().map(|q| ("q", q.clone())));
        if let Some(max_items) = max_items {
            params.push(("orderings", NEWEST_FIRST.to_string()));
            params.push((
                "pageSize",
                max_items.clamp(1, PRISMIC_MAX_PAGE_SIZE).to_string(),
            ));
        }

        let url = format!("{}/documents/search", self.endpoint);
        debug!(%url, ?predicates, "querying Prismic");

        let response: SearchResponse = self
            .http
            .get(&url)
            .query(&params)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(repository_error)?
            .json()
            .await
            .map_err(repository_error)?;

        let mut results = response.results;
        if let Some(max_items) = max_items {
            results.truncate(max_items);
        }
        Ok(results)
    }
}

#[async_trait]
impl ContentRepository for PrismicRepository {
    async fn list_all(&self, max_items: usize) -> ApiResult<Vec<Value>> {
        let predicates = [at("document.type", &quoted(&self.document_type))];
        self.search(&predicates, Some(max_items)).await
    }

    async fn list_by_tag(&self, tag: &str, max_items: usize) -> ApiResult<Vec<Value>> {
        let predicates = [at("document.tags", &format!("[{}]", quoted(tag)))];
        self.search(&predicates, Some(max_items)).await
    }

    async fn get_by_uid(&self, uid: &str) -> ApiResult<Value> {
        let predicates = [
            at("document.type", &quoted(&self.document_type)),
            at(&format!("my.{}.uid", self.document_type), &quoted(uid)),
        ];

        self.search(&predicates, None)
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| ApiError::ContentRepository(format!("No document with uid '{uid}'")))
    }
}

/// `[[at(<path>, <value>)]]` predicate; `value` is already quoted.
fn at(path: &str, value: &str) -> String {
    format!("[[at({path}, {value})]]")
}

/// JSON string literal, which is also what Prismic expects inside predicates.
fn quoted(value: &str) -> String {
    Value::String(value.to_string()).to_string()
}

fn repository_error(err: reqwest::Error) -> ApiError {
    ApiError::ContentRepository(err.to_string())
}
