//! Audio handlers

use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;

use crate::application::pagination::AudioCursor;
use crate::infra::http::api::error::ApiError;
use crate::infra::http::api::models::*;
use crate::infra::http::api::publish::Publish;
use crate::infra::http::api::state::ApiState;
use crate::infra::http::auth::{CurrentUser, MaybeUser};

pub async fn list_audios(
    State(state): State<ApiState>,
    viewer: MaybeUser,
    Query(query): Query<CursorQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let request = query.into_request::<AudioCursor>(state.default_page_size)?;
    let page = state
        .audios
        .list_latest(viewer.identity(), request)
        .await?
        .publish(state.media.as_ref());
    Ok(Json(PageResponse::new(page, &request)))
}

pub async fn search_audios(
    State(state): State<ApiState>,
    viewer: MaybeUser,
    Query(query): Query<SearchQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let (search, window) = query.split();
    let request = window.into_request::<AudioCursor>(state.default_page_size)?;
    let page = state
        .audios
        .search(search, viewer.identity(), request)
        .await?
        .publish(state.media.as_ref());
    Ok(Json(PageResponse::new(page, &request)))
}

pub async fn create_audio(
    State(state): State<ApiState>,
    CurrentUser(identity): CurrentUser,
    Json(payload): Json<CreateAudioRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let audio = state
        .audios
        .create_audio(&identity, payload.into())
        .await?
        .publish(state.media.as_ref());
    Ok((StatusCode::CREATED, Json(audio)))
}

pub async fn get_audio(
    State(state): State<ApiState>,
    viewer: MaybeUser,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, ApiError> {
    let audio = state
        .audios
        .get_audio(id, viewer.identity())
        .await?
        .publish(state.media.as_ref());
    Ok(Json(audio))
}

pub async fn get_audio_url(
    State(state): State<ApiState>,
    viewer: MaybeUser,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(state.audios.get_audio_url(id, viewer.identity()).await?))
}

pub async fn update_audio(
    State(state): State<ApiState>,
    CurrentUser(identity): CurrentUser,
    Path(id): Path<i64>,
    Json(payload): Json<UpdateAudioRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let audio = state
        .audios
        .update_audio(&identity, id, payload.into())
        .await?
        .publish(state.media.as_ref());
    Ok(Json(audio))
}

pub async fn update_audio_picture(
    State(state): State<ApiState>,
    CurrentUser(identity): CurrentUser,
    Path(id): Path<i64>,
    Json(payload): Json<PictureRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let changed = state
        .audios
        .update_picture(&identity, id, &payload.data)
        .await?;
    Ok(Json(changed))
}

pub async fn remove_audio(
    State(state): State<ApiState>,
    CurrentUser(identity): CurrentUser,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, ApiError> {
    state.audios.remove_audio(&identity, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn favorite_audio(
    State(state): State<ApiState>,
    CurrentUser(identity): CurrentUser,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, ApiError> {
    let is_favorited = state.audios.favorite(&identity, id).await?;
    Ok(Json(FavoriteState { is_favorited }))
}

pub async fn unfavorite_audio(
    State(state): State<ApiState>,
    CurrentUser(identity): CurrentUser,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, ApiError> {
    let is_favorited = state.audios.unfavorite(&identity, id).await?;
    Ok(Json(FavoriteState { is_favorited }))
}
