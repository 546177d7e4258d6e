use std::sync::Arc;

use crate::application::auth::Identity;
use crate::application::error::HandlerError;
use crate::application::repos::RepositorySet;
use crate::application::storage::MediaStore;
use crate::application::uploads::UploadPolicy;
use crate::cache::CacheAside;
use crate::domain::entities::AudioRecord;

#[derive(Clone)]
pub struct AudioService {
    pub(crate) repos: RepositorySet,
    pub(crate) media: Arc<dyn MediaStore>,
    pub(crate) cache: CacheAside,
    pub(crate) policy: UploadPolicy,
}

impl AudioService {
    pub fn new(
        repos: RepositorySet,
        media: Arc<dyn MediaStore>,
        cache: CacheAside,
        policy: UploadPolicy,
    ) -> Self {
        Self {
            repos,
            media,
            cache,
            policy,
        }
    }

    /// Live audio the viewer is allowed to address by id.
    pub(crate) async fn load_reachable(
        &self,
        id: i64,
        viewer: Option<i64>,
    ) -> Result<AudioRecord, HandlerError> {
        let record = self
            .repos
            .audios
            .find_audio_record(id)
            .await?
            .ok_or_else(|| HandlerError::not_found("audio"))?;
        if !record.visibility.is_reachable_by(record.user_id, viewer) {
            return Err(HandlerError::not_found("audio"));
        }
        Ok(record)
    }

    /// Audio the caller owns; reachable audios of other users are forbidden.
    pub(crate) async fn load_owned(
        &self,
        identity: &Identity,
        id: i64,
    ) -> Result<AudioRecord, HandlerError> {
        let record = self.load_reachable(id, Some(identity.user_id)).await?;
        if record.user_id != identity.user_id {
            return Err(HandlerError::forbidden("audio"));
        }
        Ok(record)
    }
}
