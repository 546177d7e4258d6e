use std::sync::Arc;

use tracing::warn;

use crate::application::auth::Identity;
use crate::application::error::HandlerError;
use crate::application::repos::RepositorySet;
use crate::application::storage::MediaStore;
use crate::cache::{CacheAside, CacheKey};
use crate::domain::entities::UserRecord;

#[derive(Clone)]
pub struct UserService {
    pub(crate) repos: RepositorySet,
    pub(crate) media: Arc<dyn MediaStore>,
    pub(crate) cache: CacheAside,
    pub(crate) picture_max_bytes: u64,
}

impl UserService {
    pub fn new(
        repos: RepositorySet,
        media: Arc<dyn MediaStore>,
        cache: CacheAside,
        picture_max_bytes: u64,
    ) -> Self {
        Self {
            repos,
            media,
            cache,
            picture_max_bytes,
        }
    }

    pub(crate) async fn require_user(&self, user_name: &str) -> Result<UserRecord, HandlerError> {
        self.repos
            .users
            .find_by_username(user_name)
            .await?
            .ok_or_else(|| HandlerError::not_found("user"))
    }

    /// The caller's stored row; callers that never synced get one created.
    pub(crate) async fn require_self(&self, identity: &Identity) -> Result<UserRecord, HandlerError> {
        match self.repos.users.find_by_id(identity.user_id).await? {
            Some(user) => Ok(user),
            None => Ok(self.repos.users_write.ensure_user(identity).await?),
        }
    }

    /// Drop every cached view that embeds this user's name or picture.
    pub(crate) async fn invalidate_user_views(&self, user_id: i64, user_names: &[&str]) {
        for user_name in user_names {
            self.cache.remove(&CacheKey::profile(user_name)).await;
        }
        match self.repos.audios.owned_audio_ids(user_id).await {
            Ok(ids) => {
                for id in ids {
                    self.cache.remove(&CacheKey::Audio(id)).await;
                }
            }
            Err(err) => warn!(user_id, error = %err, "could not list audios to invalidate"),
        }
        match self.repos.playlists.owned_playlist_ids(user_id).await {
            Ok(ids) => {
                for id in ids {
                    self.cache.remove(&CacheKey::Playlist(id)).await;
                }
            }
            Err(err) => warn!(user_id, error = %err, "could not list playlists to invalidate"),
        }
    }
}
