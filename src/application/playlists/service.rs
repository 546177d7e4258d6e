use std::sync::Arc;

use crate::application::auth::Identity;
use crate::application::error::HandlerError;
use crate::application::repos::RepositorySet;
use crate::application::storage::MediaStore;
use crate::cache::CacheAside;
use crate::domain::entities::PlaylistRecord;
use crate::domain::validation::ValidationErrors;

#[derive(Clone)]
pub struct PlaylistService {
    pub(crate) repos: RepositorySet,
    pub(crate) media: Arc<dyn MediaStore>,
    pub(crate) cache: CacheAside,
    pub(crate) picture_max_bytes: u64,
}

impl PlaylistService {
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

    pub(crate) async fn load_reachable(
        &self,
        id: i64,
        viewer: Option<i64>,
    ) -> Result<PlaylistRecord, HandlerError> {
        let record = self
            .repos
            .playlists
            .find_playlist_record(id)
            .await?
            .ok_or_else(|| HandlerError::not_found("playlist"))?;
        if !record.visibility.is_reachable_by(record.user_id, viewer) {
            return Err(HandlerError::not_found("playlist"));
        }
        Ok(record)
    }

    pub(crate) async fn load_owned(
        &self,
        identity: &Identity,
        id: i64,
    ) -> Result<PlaylistRecord, HandlerError> {
        let record = self.load_reachable(id, Some(identity.user_id)).await?;
        if record.user_id != identity.user_id {
            return Err(HandlerError::forbidden("playlist"));
        }
        Ok(record)
    }

    /// Deduplicated ids, each naming a live audio `user_id` may address.
    pub(crate) async fn visible_audio_ids(
        &self,
        user_id: i64,
        ids: &[i64],
    ) -> Result<Vec<i64>, HandlerError> {
        let mut unique: Vec<i64> = Vec::with_capacity(ids.len());
        for id in ids {
            if !unique.contains(id) {
                unique.push(*id);
            }
        }

        let mut errors = ValidationErrors::new();
        for id in &unique {
            let visible = self
                .repos
                .audios
                .find_audio_record(*id)
                .await?
                .is_some_and(|audio| {
                    audio
                        .visibility
                        .is_reachable_by(audio.user_id, Some(user_id))
                });
            if !visible {
                errors.add("audio_ids", format!("audio {id} was not found"));
            }
        }
        errors.into_result()?;
        Ok(unique)
    }
}
