//! Multipart audio upload

use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum_extra::extract::Multipart;
use futures::{StreamExt, TryStreamExt};

use crate::application::storage::StorageError;
use crate::domain::validation::ValidationErrors;
use crate::infra::http::api::error::ApiError;
use crate::infra::http::api::state::ApiState;
use crate::infra::http::auth::CurrentUser;

/// Streams the `file` field into storage; other fields are ignored.
pub async fn upload_audio(
    State(state): State<ApiState>,
    CurrentUser(identity): CurrentUser,
    mut multipart: Multipart,
) -> Result<impl IntoResponse, ApiError> {
    let limit = state.uploads.policy().audio_max_bytes;

    loop {
        let field = multipart.next_field().await.map_err(|err| {
            ApiError::new(err.status(), "invalid_multipart", "invalid multipart payload")
                .with_hint(err.to_string())
        })?;
        let Some(field) = field else {
            return Err(ApiError::validation(ValidationErrors::single(
                "file",
                "file is required",
            )));
        };
        if field.name() != Some("file") {
            continue;
        }

        let file_name = field
            .file_name()
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .map(str::to_string)
            .ok_or_else(|| ApiError::bad_request("file name is required"))?;

        let stream = field
            .map_err(move |err| {
                if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
                    StorageError::TooLarge { limit }
                } else {
                    StorageError::PayloadStream {
                        source: Box::new(err),
                    }
                }
            })
            .boxed();

        let uploaded = state
            .uploads
            .upload_audio(&identity, &file_name, stream)
            .await?;
        return Ok((StatusCode::CREATED, Json(uploaded)));
    }
}
