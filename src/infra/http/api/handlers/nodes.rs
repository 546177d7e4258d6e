use axum::Json;
use axum::extract::{Path, State};
use axum::response::IntoResponse;

use crate::infra::http::api::error::ApiError;
use crate::infra::http::api::publish::Publish;
use crate::infra::http::api::state::ApiState;
use crate::infra::http::auth::MaybeUser;

pub async fn get_node(
    State(state): State<ApiState>,
    viewer: MaybeUser,
    Path(global_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let node = state
        .nodes
        .resolve(&global_id, viewer.identity())
        .await?
        .publish(state.media.as_ref());
    Ok(Json(node))
}
