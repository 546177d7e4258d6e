use time::OffsetDateTime;
use tracing::info;

use crate::application::auth::Identity;
use crate::application::changes::Change;
use crate::application::error::HandlerError;
use crate::application::pictures::{PictureChanged, decode_picture, discard_blob, store_picture};
use crate::cache::CacheKey;
use crate::domain::entities::PlaylistRecord;
use crate::domain::validation::{
    ValidationErrors, check_description, check_title, normalize_tags,
};

use super::service::PlaylistService;
use super::types::{CreatePlaylistCommand, PlaylistDetail, UpdatePlaylistCommand};

impl PlaylistService {
    pub async fn create_playlist(
        &self,
        identity: &Identity,
        command: CreatePlaylistCommand,
    ) -> Result<PlaylistDetail, HandlerError> {
        let mut errors = ValidationErrors::new();
        let title = check_title(&mut errors, "title", &command.title);
        let description = check_description(
            &mut errors,
            "description",
            command.description.as_deref(),
        );
        let tags = normalize_tags(&mut errors, "tags", &command.tags);
        errors.into_result()?;

        let audio_ids = self
            .visible_audio_ids(identity.user_id, &command.audio_ids)
            .await?;
        self.repos.users_write.ensure_user(identity).await?;

        let now = OffsetDateTime::now_utc();
        let record = PlaylistRecord {
            id: 0,
            title,
            description,
            tags,
            picture: None,
            visibility: command.visibility,
            user_id: identity.user_id,
            created_at: now,
            updated_at: None,
            deleted_at: None,
        };
        let saved = self
            .repos
            .playlists_write
            .save_playlist(Change::Added(record))
            .await?;
        if !audio_ids.is_empty() {
            self.repos
                .playlists_write
                .add_audios(saved.id, &audio_ids, now)
                .await?;
        }

        info!(
            playlist_id = saved.id,
            user_id = identity.user_id,
            audios = audio_ids.len(),
            "playlist created"
        );
        self.get_playlist(saved.id, Some(identity)).await
    }

    pub async fn update_details(
        &self,
        identity: &Identity,
        id: i64,
        command: UpdatePlaylistCommand,
    ) -> Result<PlaylistDetail, HandlerError> {
        let mut record = self.load_owned(identity, id).await?;
        if command.is_empty() {
            return self.get_playlist(id, Some(identity)).await;
        }

        let mut errors = ValidationErrors::new();
        if let Some(title) = command.title.as_deref() {
            record.title = check_title(&mut errors, "title", title);
        }
        if let Some(description) = command.description.as_deref() {
            record.description = check_description(&mut errors, "description", Some(description));
        }
        if let Some(tags) = command.tags.as_deref() {
            record.tags = normalize_tags(&mut errors, "tags", tags);
        }
        if let Some(visibility) = command.visibility {
            record.visibility = visibility;
        }
        errors.into_result()?;

        self.repos
            .playlists_write
            .save_playlist(Change::Modified(record))
            .await?;
        self.cache.remove(&CacheKey::Playlist(id)).await;

        self.get_playlist(id, Some(identity)).await
    }

    pub async fn update_picture(
        &self,
        identity: &Identity,
        id: i64,
        data: &str,
    ) -> Result<PictureChanged, HandlerError> {
        let mut record = self.load_owned(identity, id).await?;
        let update = decode_picture(data, self.picture_max_bytes)?;

        let previous = record.picture.take();
        record.picture = store_picture(self.media.as_ref(), update).await?;
        let url = record.picture.as_deref().map(|key| self.media.public_url(key));

        self.repos
            .playlists_write
            .save_playlist(Change::Modified(record))
            .await?;
        discard_blob(self.media.as_ref(), previous.as_deref()).await;
        self.cache.remove(&CacheKey::Playlist(id)).await;

        Ok(PictureChanged { url })
    }

    pub async fn remove_playlist(&self, identity: &Identity, id: i64) -> Result<(), HandlerError> {
        let record = self.load_owned(identity, id).await?;
        let picture = record.picture.clone();

        self.repos
            .playlists_write
            .save_playlist(Change::Deleted(record))
            .await?;
        discard_blob(self.media.as_ref(), picture.as_deref()).await;
        self.cache.remove(&CacheKey::Playlist(id)).await;

        info!(playlist_id = id, user_id = identity.user_id, "playlist removed");
        Ok(())
    }

    /// Returns how many of `audio_ids` were newly added.
    pub async fn add_audios(
        &self,
        identity: &Identity,
        id: i64,
        audio_ids: &[i64],
    ) -> Result<u64, HandlerError> {
        let playlist = self.load_owned(identity, id).await?;
        if audio_ids.is_empty() {
            return Err(HandlerError::invalid("audio_ids", "at least one audio is required"));
        }
        let audio_ids = self.visible_audio_ids(identity.user_id, audio_ids).await?;

        let added = self
            .repos
            .playlists_write
            .add_audios(playlist.id, &audio_ids, OffsetDateTime::now_utc())
            .await?;
        self.cache.remove(&CacheKey::Playlist(id)).await;
        Ok(added)
    }

    /// Returns how many of `audio_ids` were removed.
    pub async fn remove_audios(
        &self,
        identity: &Identity,
        id: i64,
        audio_ids: &[i64],
    ) -> Result<u64, HandlerError> {
        let playlist = self.load_owned(identity, id).await?;
        if audio_ids.is_empty() {
            return Err(HandlerError::invalid("audio_ids", "at least one audio is required"));
        }

        let removed = self
            .repos
            .playlists_write
            .remove_audios(playlist.id, audio_ids)
            .await?;
        self.cache.remove(&CacheKey::Playlist(id)).await;
        Ok(removed)
    }

    pub async fn favorite(&self, identity: &Identity, id: i64) -> Result<bool, HandlerError> {
        let playlist = self.load_reachable(id, Some(identity.user_id)).await?;
        self.repos.users_write.ensure_user(identity).await?;
        self.repos
            .playlists_write
            .favorite_playlist(identity.user_id, playlist.id, OffsetDateTime::now_utc())
            .await?;
        Ok(true)
    }

    pub async fn unfavorite(&self, identity: &Identity, id: i64) -> Result<bool, HandlerError> {
        let playlist = self.load_reachable(id, Some(identity.user_id)).await?;
        self.repos
            .playlists_write
            .unfavorite_playlist(identity.user_id, playlist.id)
            .await?;
        Ok(false)
    }
}
