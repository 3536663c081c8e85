//! HTTP layer of the site API: routing, CORS and error responses.

pub mod routes;
pub mod state;

use std::time::Duration;

use axum::{
    Router,
    http::{Method, header},
};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

pub use crate::state::AppState;

/// How long browsers may cache preflight answers.
const CORS_MAX_AGE: Duration = Duration::from_secs(600);

pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::OPTIONS])
        .allow_headers([header::UPGRADE_INSECURE_REQUESTS])
        .expose_headers([header::CONTENT_LENGTH])
        .max_age(CORS_MAX_AGE);

    Router::new()
        .merge(routes::api::router())
        .with_state(state)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}
