use crate::application::auth::{Identity, viewer_id};
use crate::application::error::HandlerError;
use crate::application::pagination::{AudioCursor, Page, PageRequest};
use crate::application::repos::{AudioListFilter, AudioView};
use crate::cache::CacheKey;
use crate::domain::entities::UserRecord;
use crate::domain::validation::{ValidationErrors, normalize_tags};

use super::service::AudioService;
use super::types::{AudioDetail, AudioUrl, SearchAudiosQuery};

impl AudioService {
    pub async fn get_audio(
        &self,
        id: i64,
        viewer: Option<&Identity>,
    ) -> Result<AudioDetail, HandlerError> {
        let audios = self.repos.audios.clone();
        let audio = self
            .cache
            .fetch_optional(&CacheKey::Audio(id), || async move {
                audios.find_audio(id).await
            })
            .await?
            .ok_or_else(|| HandlerError::not_found("audio"))?;

        if !audio
            .visibility
            .is_reachable_by(audio.user.id, viewer_id(viewer))
        {
            return Err(HandlerError::not_found("audio"));
        }

        let is_favorited = match viewer {
            Some(identity) => Some(
                self.repos
                    .audios
                    .is_favorited(audio.id, identity.user_id)
                    .await?,
            ),
            None => None,
        };

        Ok(AudioDetail {
            audio,
            is_favorited,
        })
    }

    pub async fn get_audio_url(
        &self,
        id: i64,
        viewer: Option<&Identity>,
    ) -> Result<AudioUrl, HandlerError> {
        let detail = self.get_audio(id, viewer).await?;
        Ok(AudioUrl {
            url: self.media.public_url(&detail.audio.file),
        })
    }

    pub async fn list_latest(
        &self,
        viewer: Option<&Identity>,
        page: PageRequest<AudioCursor>,
    ) -> Result<Page<AudioView>, HandlerError> {
        let filter = AudioListFilter::default();
        self.list(&filter, viewer, page).await
    }

    /// Title search combined with an all-of tag filter.
    pub async fn search(
        &self,
        query: SearchAudiosQuery,
        viewer: Option<&Identity>,
        page: PageRequest<AudioCursor>,
    ) -> Result<Page<AudioView>, HandlerError> {
        // Unknown or malformed tags simply match nothing.
        let mut ignored = ValidationErrors::new();
        let filter = AudioListFilter {
            search: query
                .query
                .map(|q| q.trim().to_string())
                .filter(|q| !q.is_empty()),
            tags: normalize_tags(&mut ignored, "tags", &query.tags),
            ..AudioListFilter::default()
        };
        self.list(&filter, viewer, page).await
    }

    /// Public audios uploaded by the users `identity` follows.
    pub async fn feed(
        &self,
        identity: &Identity,
        page: PageRequest<AudioCursor>,
    ) -> Result<Page<AudioView>, HandlerError> {
        let filter = AudioListFilter {
            followed_by: Some(identity.user_id),
            public_only: true,
            ..AudioListFilter::default()
        };
        self.list(&filter, Some(identity), page).await
    }

    pub async fn user_audios(
        &self,
        user_name: &str,
        viewer: Option<&Identity>,
        page: PageRequest<AudioCursor>,
    ) -> Result<Page<AudioView>, HandlerError> {
        let user = self.require_user(user_name).await?;
        let filter = AudioListFilter {
            owner: Some(user.id),
            ..AudioListFilter::default()
        };
        self.list(&filter, viewer, page).await
    }

    /// The caller's own audios, whatever their visibility.
    pub async fn own_audios(
        &self,
        identity: &Identity,
        page: PageRequest<AudioCursor>,
    ) -> Result<Page<AudioView>, HandlerError> {
        let filter = AudioListFilter {
            owner: Some(identity.user_id),
            ..AudioListFilter::default()
        };
        self.list(&filter, Some(identity), page).await
    }

    pub async fn user_favorite_audios(
        &self,
        user_name: &str,
        viewer: Option<&Identity>,
        page: PageRequest<AudioCursor>,
    ) -> Result<Page<AudioView>, HandlerError> {
        let user = self.require_user(user_name).await?;
        let filter = AudioListFilter {
            favorited_by: Some(user.id),
            ..AudioListFilter::default()
        };
        self.list(&filter, viewer, page).await
    }

    pub async fn is_favorited(&self, identity: &Identity, id: i64) -> Result<bool, HandlerError> {
        let record = self.load_reachable(id, Some(identity.user_id)).await?;
        Ok(self
            .repos
            .audios
            .is_favorited(record.id, identity.user_id)
            .await?)
    }

    async fn list(
        &self,
        filter: &AudioListFilter,
        viewer: Option<&Identity>,
        page: PageRequest<AudioCursor>,
    ) -> Result<Page<AudioView>, HandlerError> {
        Ok(self
            .repos
            .audios
            .list_audios(filter, viewer_id(viewer), page)
            .await?)
    }

    async fn require_user(&self, user_name: &str) -> Result<UserRecord, HandlerError> {
        self.repos
            .users
            .find_by_username(user_name)
            .await?
            .ok_or_else(|| HandlerError::not_found("user"))
    }
}
