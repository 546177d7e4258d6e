//! HTTP surface: the JSON API plus health and media routes.

pub mod api;
pub mod auth;
mod middleware;

pub use api::{ApiState, build_api_router};
pub use auth::{CurrentUser, MaybeUser, TokenVerifier};
pub use middleware::RequestContext;

use std::sync::Arc;

use axum::{
    Router,
    extract::{DefaultBodyLimit, State},
    http::StatusCode,
    middleware as axum_middleware,
    response::{IntoResponse, Response},
    routing::get,
};
use sqlx::Error as SqlxError;

use crate::application::error::ErrorReport;

fn db_health_response(result: Result<(), SqlxError>) -> Response {
    match result {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(err) => {
            let mut response = StatusCode::SERVICE_UNAVAILABLE.into_response();
            ErrorReport::from_error(
                "infra::http::db_health",
                StatusCode::SERVICE_UNAVAILABLE,
                &err,
            )
            .attach(&mut response);
            response
        }
    }
}

async fn health(State(state): State<ApiState>) -> Response {
    db_health_response(state.db.health_check().await)
}

/// Full application router.
///
/// `max_request_bytes` bounds every request body, uploads included.
pub fn build_router(
    state: ApiState,
    verifier: Arc<TokenVerifier>,
    max_request_bytes: usize,
) -> Router {
    let health_routes = Router::new()
        .route("/health", get(health))
        .with_state(state.clone());

    Router::new()
        .merge(health_routes)
        .merge(build_api_router(state))
        .layer(DefaultBodyLimit::max(max_request_bytes))
        .layer(axum_middleware::from_fn_with_state(
            verifier,
            auth::attach_identity,
        ))
        .layer(axum_middleware::from_fn(middleware::log_responses))
        .layer(axum_middleware::from_fn(middleware::set_request_context))
}
