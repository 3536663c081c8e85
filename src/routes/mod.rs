pub mod api;

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use serde_json::Value;
use siteapi_core::ApiError;
use tracing::error;

/// Standard API error response
#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub debug: Value,
}

/// Convert pipeline errors to HTTP responses
pub struct AppError(ApiError);

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status =
            StatusCode::from_u16(self.0.status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

        error!(
            status = status.as_u16(),
            error = %self.0,
            detail = %self.0.detail().unwrap_or_default(),
            "request failed"
        );

        let body = Json(ErrorResponse {
            error: self.0.to_string(),
            debug: self.0.debug(),
        });
        (status, body).into_response()
    }
}

impl From<ApiError> for AppError {
    fn from(err: ApiError) -> Self {
        Self(err)
    }
}
