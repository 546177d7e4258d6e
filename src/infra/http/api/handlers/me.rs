//! Handlers for the caller's own account.

use axum::Json;
use axum::extract::{Path, Query, State};
use axum::response::IntoResponse;

use crate::application::pagination::AudioCursor;
use crate::infra::http::api::error::ApiError;
use crate::infra::http::api::models::*;
use crate::infra::http::api::publish::Publish;
use crate::infra::http::api::state::ApiState;
use crate::infra::http::auth::CurrentUser;

pub async fn current_user(
    State(state): State<ApiState>,
    CurrentUser(identity): CurrentUser,
) -> Result<impl IntoResponse, ApiError> {
    let account = state
        .users
        .current_user(&identity)
        .await?
        .publish(state.media.as_ref());
    Ok(Json(account))
}

pub async fn sync_me(
    State(state): State<ApiState>,
    CurrentUser(identity): CurrentUser,
) -> Result<impl IntoResponse, ApiError> {
    let account = state
        .users
        .sync_identity(&identity)
        .await?
        .publish(state.media.as_ref());
    Ok(Json(account))
}

pub async fn my_audios(
    State(state): State<ApiState>,
    CurrentUser(identity): CurrentUser,
    Query(query): Query<PageQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let request = query.into_request::<AudioCursor>(state.default_page_size)?;
    let page = state
        .audios
        .own_audios(&identity, request)
        .await?
        .publish(state.media.as_ref());
    Ok(Json(PageResponse::new(page, &request)))
}

pub async fn my_feed(
    State(state): State<ApiState>,
    CurrentUser(identity): CurrentUser,
    Query(query): Query<CursorQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let request = query.into_request::<AudioCursor>(state.default_page_size)?;
    let page = state
        .audios
        .feed(&identity, request)
        .await?
        .publish(state.media.as_ref());
    Ok(Json(PageResponse::new(page, &request)))
}

pub async fn update_username(
    State(state): State<ApiState>,
    CurrentUser(identity): CurrentUser,
    Json(payload): Json<UsernameRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let account = state
        .users
        .update_username(&identity, &payload.user_name)
        .await?
        .publish(state.media.as_ref());
    Ok(Json(account))
}

pub async fn update_email(
    State(state): State<ApiState>,
    CurrentUser(identity): CurrentUser,
    Json(payload): Json<EmailRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let account = state
        .users
        .update_email(&identity, &payload.email)
        .await?
        .publish(state.media.as_ref());
    Ok(Json(account))
}

pub async fn update_my_picture(
    State(state): State<ApiState>,
    CurrentUser(identity): CurrentUser,
    Json(payload): Json<PictureRequest>,
) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(
        state.users.update_picture(&identity, &payload.data).await?,
    ))
}

/// 200 when the caller has favorited the audio, 404 otherwise.
pub async fn check_favorite_audio(
    State(state): State<ApiState>,
    CurrentUser(identity): CurrentUser,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, ApiError> {
    if state.audios.is_favorited(&identity, id).await? {
        Ok(Json(FavoriteState { is_favorited: true }))
    } else {
        Err(ApiError::not_found("audio is not favorited"))
    }
}

/// 200 when the caller has favorited the playlist, 404 otherwise.
pub async fn check_favorite_playlist(
    State(state): State<ApiState>,
    CurrentUser(identity): CurrentUser,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, ApiError> {
    if state.playlists.is_favorited(&identity, id).await? {
        Ok(Json(FavoriteState { is_favorited: true }))
    } else {
        Err(ApiError::not_found("playlist is not favorited"))
    }
}

pub async fn check_following(
    State(state): State<ApiState>,
    CurrentUser(identity): CurrentUser,
    Path(user_name): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    if state.users.is_following(&identity, &user_name).await? {
        Ok(Json(FollowState { is_following: true }))
    } else {
        Err(ApiError::not_found("user is not followed"))
    }
}

pub async fn follow_user(
    State(state): State<ApiState>,
    CurrentUser(identity): CurrentUser,
    Path(user_name): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let is_following = state.users.follow(&identity, &user_name).await?;
    Ok(Json(FollowState { is_following }))
}

pub async fn unfollow_user(
    State(state): State<ApiState>,
    CurrentUser(identity): CurrentUser,
    Path(user_name): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let is_following = state.users.unfollow(&identity, &user_name).await?;
    Ok(Json(FollowState { is_following }))
}
