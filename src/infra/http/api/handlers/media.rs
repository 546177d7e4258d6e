//! Serves stored blobs below `/media`, for deployments without a CDN in front.

use axum::extract::{Path, State};
use axum::http::header;
use axum::response::IntoResponse;

use crate::application::error::HandlerError;
use crate::application::storage::Container;
use crate::infra::http::api::error::ApiError;
use crate::infra::http::api::state::ApiState;

pub async fn serve_media(
    State(state): State<ApiState>,
    Path((container, name)): Path<(String, String)>,
) -> Result<impl IntoResponse, ApiError> {
    let container =
        Container::parse(&container).ok_or_else(|| ApiError::not_found("unknown container"))?;
    let data = state
        .media
        .read(&container.key(&name))
        .await
        .map_err(HandlerError::from)?;

    let content_type = mime_guess::from_path(&name)
        .first_or_octet_stream()
        .essence_str()
        .to_string();

    Ok((
        [
            (header::CONTENT_TYPE, content_type),
            (header::CACHE_CONTROL, "public, max-age=86400".to_string()),
        ],
        data,
    ))
}
