//! The single `/api` endpoint; everything is routed by query parameters.

use axum::{
    Json, Router,
    extract::{Query, State},
    http::header::{CONTENT_DISPOSITION, CONTENT_TYPE},
    response::{IntoResponse, Response},
    routing::get,
};
use serde::Serialize;
use siteapi_core::{ApiParams, ApiRequest, CalendarResponse};
use tracing::info;

use crate::routes::AppError;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api", get(api).post(api).put(api).patch(api))
        .route("/api/", get(api).post(api).put(api).patch(api))
}

/// Success envelope
#[derive(Serialize)]
pub struct DataResponse<T> {
    pub data: T,
}

/// GET /api?type=blog|calendar&...
async fn api(
    State(state): State<AppState>,
    Query(pairs): Query<Vec<(String, String)>>,
) -> Result<Response, AppError> {
    match ApiParams::from_pairs(pairs).into_request()? {
        ApiRequest::Blog(query) => {
            info!(itemtype = ?query.item_type, "blog request");
            let data = state.blog.run(&query).await?;
            Ok(Json(DataResponse { data }).into_response())
        }
        ApiRequest::Calendar(query) => {
            info!(itemtype = ?query.item_type, download = query.download, "calendar request");
            match state.calendar.run(&query, state.now()).await? {
                CalendarResponse::Events(data) => Ok(Json(DataResponse { data }).into_response()),
                CalendarResponse::Export { filename, body } => Ok((
                    [
                        (CONTENT_TYPE, "text/calendar".to_string()),
                        (
                            CONTENT_DISPOSITION,
                            format!("attachment; filename=\"{filename}\""),
                        ),
                    ],
                    body,
                )
                    .into_response()),
            }
        }
    }
}
