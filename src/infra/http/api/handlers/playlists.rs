//! Playlist handlers

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

pub async fn create_playlist(
    State(state): State<ApiState>,
    CurrentUser(identity): CurrentUser,
    Json(payload): Json<CreatePlaylistRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let playlist = state
        .playlists
        .create_playlist(&identity, payload.into())
        .await?
        .publish(state.media.as_ref());
    Ok((StatusCode::CREATED, Json(playlist)))
}

pub async fn get_playlist(
    State(state): State<ApiState>,
    viewer: MaybeUser,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, ApiError> {
    let playlist = state
        .playlists
        .get_playlist(id, viewer.identity())
        .await?
        .publish(state.media.as_ref());
    Ok(Json(playlist))
}

pub async fn update_playlist(
    State(state): State<ApiState>,
    CurrentUser(identity): CurrentUser,
    Path(id): Path<i64>,
    Json(payload): Json<UpdatePlaylistRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let playlist = state
        .playlists
        .update_details(&identity, id, payload.into())
        .await?
        .publish(state.media.as_ref());
    Ok(Json(playlist))
}

pub async fn update_playlist_picture(
    State(state): State<ApiState>,
    CurrentUser(identity): CurrentUser,
    Path(id): Path<i64>,
    Json(payload): Json<PictureRequest>,
) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(
        state
            .playlists
            .update_picture(&identity, id, &payload.data)
            .await?,
    ))
}

pub async fn remove_playlist(
    State(state): State<ApiState>,
    CurrentUser(identity): CurrentUser,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, ApiError> {
    state.playlists.remove_playlist(&identity, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn playlist_audios(
    State(state): State<ApiState>,
    viewer: MaybeUser,
    Path(id): Path<i64>,
    Query(query): Query<PageQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let request = query.into_request::<AudioCursor>(state.default_page_size)?;
    let page = state
        .playlists
        .playlist_audios(id, viewer.identity(), request)
        .await?
        .publish(state.media.as_ref());
    Ok(Json(PageResponse::new(page, &request)))
}

pub async fn add_playlist_audios(
    State(state): State<ApiState>,
    CurrentUser(identity): CurrentUser,
    Path(id): Path<i64>,
    Json(payload): Json<PlaylistAudiosRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let changed = state
        .playlists
        .add_audios(&identity, id, &payload.audio_ids)
        .await?;
    Ok(Json(ChangedCount { changed }))
}

pub async fn remove_playlist_audios(
    State(state): State<ApiState>,
    CurrentUser(identity): CurrentUser,
    Path(id): Path<i64>,
    Json(payload): Json<PlaylistAudiosRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let changed = state
        .playlists
        .remove_audios(&identity, id, &payload.audio_ids)
        .await?;
    Ok(Json(ChangedCount { changed }))
}

pub async fn favorite_playlist(
    State(state): State<ApiState>,
    CurrentUser(identity): CurrentUser,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, ApiError> {
    let is_favorited = state.playlists.favorite(&identity, id).await?;
    Ok(Json(FavoriteState { is_favorited }))
}

pub async fn unfavorite_playlist(
    State(state): State<ApiState>,
    CurrentUser(identity): CurrentUser,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, ApiError> {
    let is_favorited = state.playlists.unfavorite(&identity, id).await?;
    Ok(Json(FavoriteState { is_favorited }))
}
