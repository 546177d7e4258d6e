//! Public profile handlers

use axum::Json;
use axum::extract::{Path, Query, State};
use axum::response::IntoResponse;

use crate::application::pagination::{AudioCursor, TimelineCursor};
use crate::infra::http::api::error::ApiError;
use crate::infra::http::api::models::*;
use crate::infra::http::api::publish::Publish;
use crate::infra::http::api::state::ApiState;
use crate::infra::http::auth::MaybeUser;

pub async fn get_profile(
    State(state): State<ApiState>,
    viewer: MaybeUser,
    Path(user_name): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let profile = state
        .users
        .profile(&user_name, viewer.identity())
        .await?
        .publish(state.media.as_ref());
    Ok(Json(profile))
}

pub async fn user_audios(
    State(state): State<ApiState>,
    viewer: MaybeUser,
    Path(user_name): Path<String>,
    Query(query): Query<PageQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let request = query.into_request::<AudioCursor>(state.default_page_size)?;
    let page = state
        .audios
        .user_audios(&user_name, viewer.identity(), request)
        .await?
        .publish(state.media.as_ref());
    Ok(Json(PageResponse::new(page, &request)))
}

pub async fn user_favorite_audios(
    State(state): State<ApiState>,
    viewer: MaybeUser,
    Path(user_name): Path<String>,
    Query(query): Query<PageQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let request = query.into_request::<AudioCursor>(state.default_page_size)?;
    let page = state
        .audios
        .user_favorite_audios(&user_name, viewer.identity(), request)
        .await?
        .publish(state.media.as_ref());
    Ok(Json(PageResponse::new(page, &request)))
}

pub async fn user_followers(
    State(state): State<ApiState>,
    Path(user_name): Path<String>,
    Query(query): Query<PageQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let request = query.into_request::<TimelineCursor>(state.default_page_size)?;
    let page = state
        .users
        .followers(&user_name, request)
        .await?
        .publish(state.media.as_ref());
    Ok(Json(PageResponse::new(page, &request)))
}

pub async fn user_followings(
    State(state): State<ApiState>,
    Path(user_name): Path<String>,
    Query(query): Query<PageQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let request = query.into_request::<TimelineCursor>(state.default_page_size)?;
    let page = state
        .users
        .followings(&user_name, request)
        .await?
        .publish(state.media.as_ref());
    Ok(Json(PageResponse::new(page, &request)))
}

pub async fn user_playlists(
    State(state): State<ApiState>,
    viewer: MaybeUser,
    Path(user_name): Path<String>,
    Query(query): Query<PageQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let request = query.into_request::<TimelineCursor>(state.default_page_size)?;
    let page = state
        .playlists
        .user_playlists(&user_name, viewer.identity(), request)
        .await?
        .publish(state.media.as_ref());
    Ok(Json(PageResponse::new(page, &request)))
}

pub async fn user_favorite_playlists(
    State(state): State<ApiState>,
    viewer: MaybeUser,
    Path(user_name): Path<String>,
    Query(query): Query<PageQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let request = query.into_request::<TimelineCursor>(state.default_page_size)?;
    let page = state
        .playlists
        .user_favorite_playlists(&user_name, viewer.identity(), request)
        .await?
        .publish(state.media.as_ref());
    Ok(Json(PageResponse::new(page, &request)))
}
