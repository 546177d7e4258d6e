//! Repository traits describing persistence adapters.
//!
//! Reads return projected views shaped for responses; writes take
//! [`Change`] values and run them through [`crate::application::changes::prepare`].

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use time::OffsetDateTime;

use crate::application::auth::Identity;
use crate::application::changes::Change;
use crate::application::pagination::{
    AudioCursor, Page, PageRequest, PaginationError, TimelineCursor,
};
use crate::domain::entities::{AudioRecord, PlaylistRecord, UserRecord};
use crate::domain::types::Visibility;

#[derive(Debug, Error)]
pub enum RepoError {
    #[error("persistence error: {0}")]
    Persistence(String),
    #[error("duplicate record violates unique constraint `{constraint}`")]
    Duplicate { constraint: String },
    #[error("resource not found")]
    NotFound,
    #[error("invalid input: {message}")]
    InvalidInput { message: String },
    #[error("integrity error: {message}")]
    Integrity { message: String },
    #[error("database timeout")]
    Timeout,
    #[error(transparent)]
    Pagination(#[from] PaginationError),
}

impl RepoError {
    pub fn from_persistence(err: impl std::fmt::Display) -> Self {
        Self::Persistence(err.to_string())
    }
}

/// Owner details embedded in audio and playlist views.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserSummary {
    pub id: i64,
    pub user_name: String,
    pub picture: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AudioView {
    pub id: i64,
    pub title: String,
    pub description: Option<String>,
    pub tags: Vec<String>,
    pub duration: i32,
    pub size: i64,
    pub file: String,
    pub picture: Option<String>,
    pub visibility: Visibility,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339::option")]
    pub updated_at: Option<OffsetDateTime>,
    pub user: UserSummary,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProfileView {
    pub id: i64,
    pub user_name: String,
    pub picture: Option<String>,
    /// Public audios only.
    pub audio_count: i64,
    pub follower_count: i64,
    pub following_count: i64,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

/// One side of a follow relationship, with when it started.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FollowView {
    #[serde(flatten)]
    pub user: UserSummary,
    #[serde(with = "time::serde::rfc3339")]
    pub followed_at: OffsetDateTime,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlaylistView {
    pub id: i64,
    pub title: String,
    pub description: Option<String>,
    pub tags: Vec<String>,
    pub picture: Option<String>,
    pub visibility: Visibility,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339::option")]
    pub updated_at: Option<OffsetDateTime>,
    pub user: UserSummary,
}

/// Which timestamp orders an audio listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AudioSort {
    Created,
    Favorited,
    AddedToPlaylist,
}

/// Query parameters for every audio listing.
///
/// Visibility is applied on top: public audios plus the viewer's own, or
/// public audios only when `public_only` is set.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AudioListFilter {
    pub owner: Option<i64>,
    pub favorited_by: Option<i64>,
    /// Audios uploaded by users this user follows.
    pub followed_by: Option<i64>,
    pub in_playlist: Option<i64>,
    /// Every listed tag must be present.
    pub tags: Vec<String>,
    pub search: Option<String>,
    pub public_only: bool,
}

impl AudioListFilter {
    pub fn sort(&self) -> AudioSort {
        if self.favorited_by.is_some() {
            AudioSort::Favorited
        } else if self.in_playlist.is_some() {
            AudioSort::AddedToPlaylist
        } else {
            AudioSort::Created
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PlaylistListFilter {
    pub owner: Option<i64>,
    pub favorited_by: Option<i64>,
}

#[async_trait]
pub trait AudiosRepo: Send + Sync {
    /// Live (not deleted) audio regardless of visibility.
    async fn find_audio(&self, id: i64) -> Result<Option<AudioView>, RepoError>;

    async fn find_audio_record(&self, id: i64) -> Result<Option<AudioRecord>, RepoError>;

    async fn list_audios(
        &self,
        filter: &AudioListFilter,
        viewer: Option<i64>,
        page: PageRequest<AudioCursor>,
    ) -> Result<Page<AudioView>, RepoError>;

    async fn is_favorited(&self, audio_id: i64, user_id: i64) -> Result<bool, RepoError>;

    async fn owned_audio_ids(&self, user_id: i64) -> Result<Vec<i64>, RepoError>;
}

#[async_trait]
pub trait AudiosWriteRepo: Send + Sync {
    /// Soft deletes also drop the audio's favorite and playlist rows.
    async fn save_audio(&self, change: Change<AudioRecord>) -> Result<AudioRecord, RepoError>;

    /// Returns `true` when a new favorite row was written.
    async fn favorite_audio(
        &self,
        user_id: i64,
        audio_id: i64,
        at: OffsetDateTime,
    ) -> Result<bool, RepoError>;

    /// Returns `true` when a favorite row was removed.
    async fn unfavorite_audio(&self, user_id: i64, audio_id: i64) -> Result<bool, RepoError>;
}

#[async_trait]
pub trait UsersRepo: Send + Sync {
    async fn find_by_id(&self, id: i64) -> Result<Option<UserRecord>, RepoError>;

    /// Case-insensitive lookup.
    async fn find_by_username(&self, user_name: &str) -> Result<Option<UserRecord>, RepoError>;

    async fn profile(&self, user_name: &str) -> Result<Option<ProfileView>, RepoError>;

    async fn list_followers(
        &self,
        user_id: i64,
        page: PageRequest<TimelineCursor>,
    ) -> Result<Page<FollowView>, RepoError>;

    async fn list_followings(
        &self,
        user_id: i64,
        page: PageRequest<TimelineCursor>,
    ) -> Result<Page<FollowView>, RepoError>;

    async fn is_following(&self, observer_id: i64, target_id: i64) -> Result<bool, RepoError>;

    async fn following_ids(&self, user_id: i64) -> Result<Vec<i64>, RepoError>;
}

#[async_trait]
pub trait UsersWriteRepo: Send + Sync {
    /// Insert the user named by the token if it does not exist yet; never updates.
    async fn ensure_user(&self, identity: &Identity) -> Result<UserRecord, RepoError>;

    async fn save_user(&self, change: Change<UserRecord>) -> Result<UserRecord, RepoError>;

    async fn follow(
        &self,
        observer_id: i64,
        target_id: i64,
        at: OffsetDateTime,
    ) -> Result<bool, RepoError>;

    async fn unfollow(&self, observer_id: i64, target_id: i64) -> Result<bool, RepoError>;
}

#[async_trait]
pub trait PlaylistsRepo: Send + Sync {
    async fn find_playlist(&self, id: i64) -> Result<Option<PlaylistView>, RepoError>;

    async fn find_playlist_record(&self, id: i64) -> Result<Option<PlaylistRecord>, RepoError>;

    async fn list_playlists(
        &self,
        filter: &PlaylistListFilter,
        viewer: Option<i64>,
        page: PageRequest<TimelineCursor>,
    ) -> Result<Page<PlaylistView>, RepoError>;

    async fn is_favorited(&self, playlist_id: i64, user_id: i64) -> Result<bool, RepoError>;

    async fn owned_playlist_ids(&self, user_id: i64) -> Result<Vec<i64>, RepoError>;
}

#[async_trait]
pub trait PlaylistsWriteRepo: Send + Sync {
    /// Soft deletes also drop the playlist's member and favorite rows.
    async fn save_playlist(
        &self,
        change: Change<PlaylistRecord>,
    ) -> Result<PlaylistRecord, RepoError>;

    /// Returns the number of audios newly added.
    async fn add_audios(
        &self,
        playlist_id: i64,
        audio_ids: &[i64],
        at: OffsetDateTime,
    ) -> Result<u64, RepoError>;

    async fn remove_audios(&self, playlist_id: i64, audio_ids: &[i64]) -> Result<u64, RepoError>;

    async fn favorite_playlist(
        &self,
        user_id: i64,
        playlist_id: i64,
        at: OffsetDateTime,
    ) -> Result<bool, RepoError>;

    async fn unfavorite_playlist(&self, user_id: i64, playlist_id: i64)
    -> Result<bool, RepoError>;
}

/// Every repository handle the services need, usually backed by one store.
#[derive(Clone)]
pub struct RepositorySet {
    pub audios: Arc<dyn AudiosRepo>,
    pub audios_write: Arc<dyn AudiosWriteRepo>,
    pub users: Arc<dyn UsersRepo>,
    pub users_write: Arc<dyn UsersWriteRepo>,
    pub playlists: Arc<dyn PlaylistsRepo>,
    pub playlists_write: Arc<dyn PlaylistsWriteRepo>,
}

impl RepositorySet {
    pub fn from_shared<R>(repos: Arc<R>) -> Self
    where
        R: AudiosRepo
            + AudiosWriteRepo
            + UsersRepo
            + UsersWriteRepo
            + PlaylistsRepo
            + PlaylistsWriteRepo
            + 'static,
    {
        Self {
            audios: repos.clone(),
            audios_write: repos.clone(),
            users: repos.clone(),
            users_write: repos.clone(),
            playlists: repos.clone(),
            playlists_write: repos,
        }
    }
}
