use std::path::Path;

use time::OffsetDateTime;
use tracing::{info, warn};

use crate::application::auth::Identity;
use crate::application::changes::Change;
use crate::application::repos::RepoError;
use crate::application::error::HandlerError;
use crate::application::pictures::{PictureChanged, decode_picture, discard_blob, store_picture};
use crate::application::storage::Container;
use crate::cache::CacheKey;
use crate::domain::entities::AudioRecord;
use crate::domain::ids::{is_object_name, object_owner};
use crate::domain::validation::{
    TITLE_MAX_CHARS, ValidationErrors, check_description, check_title, normalize_tags,
};

use super::service::AudioService;
use super::types::{AudioDetail, CreateAudioCommand, UpdateAudioCommand};

impl AudioService {
    /// Publish a file `identity` uploaded earlier. Each upload backs at most one audio.
    pub async fn create_audio(
        &self,
        identity: &Identity,
        command: CreateAudioCommand,
    ) -> Result<AudioDetail, HandlerError> {
        let mut errors = ValidationErrors::new();

        let upload_id = command.upload_id.trim();
        if !is_object_name(upload_id) {
            errors.add("upload_id", "upload id is malformed");
        }
        if let Err(extension_errors) = self.policy.audio_content_type(&command.file_name) {
            errors.merge(extension_errors);
        }

        let title = match command.title.as_deref().map(str::trim) {
            Some(title) if !title.is_empty() => title.to_string(),
            _ => default_title(&command.file_name),
        };
        let title = check_title(&mut errors, "title", &title);
        let description = check_description(
            &mut errors,
            "description",
            command.description.as_deref(),
        );
        let tags = normalize_tags(&mut errors, "tags", &command.tags);
        if command.duration < 0 {
            errors.add("duration", "duration cannot be negative");
        }
        errors.into_result()?;

        match object_owner(upload_id) {
            Some(owner) if owner == identity.user_id => {}
            Some(_) => return Err(HandlerError::Forbidden { entity: "upload" }),
            None => return Err(HandlerError::invalid("upload_id", "upload was not found")),
        }

        let file = Container::Audios.key(upload_id);
        let size = self
            .media
            .stat(&file)
            .await?
            .ok_or_else(|| HandlerError::invalid("upload_id", "upload was not found"))?;
        self.policy.check_audio_size(size)?;

        self.repos.users_write.ensure_user(identity).await?;

        let record = AudioRecord {
            id: 0,
            title,
            description,
            tags,
            duration: command.duration,
            file,
            size: i64::try_from(size).unwrap_or(i64::MAX),
            picture: None,
            visibility: command.visibility,
            user_id: identity.user_id,
            created_at: OffsetDateTime::now_utc(),
            updated_at: None,
            deleted_at: None,
        };
        let saved = self
            .repos
            .audios_write
            .save_audio(Change::Added(record))
            .await
            .map_err(|err| match err {
                RepoError::Duplicate { .. } => HandlerError::Conflict {
                    message: "upload is already published",
                },
                other => other.into(),
            })?;

        info!(
            audio_id = saved.id,
            user_id = identity.user_id,
            visibility = saved.visibility.as_str(),
            "audio created"
        );
        self.invalidate(saved.id, identity.user_id).await;

        self.get_audio(saved.id, Some(identity)).await
    }

    pub async fn update_audio(
        &self,
        identity: &Identity,
        id: i64,
        command: UpdateAudioCommand,
    ) -> Result<AudioDetail, HandlerError> {
        let mut record = self.load_owned(identity, id).await?;
        if command.is_empty() {
            return self.get_audio(id, Some(identity)).await;
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
            .audios_write
            .save_audio(Change::Modified(record))
            .await?;
        self.invalidate(id, identity.user_id).await;

        self.get_audio(id, Some(identity)).await
    }

    /// Replace the audio's picture; blank data removes it.
    pub async fn update_picture(
        &self,
        identity: &Identity,
        id: i64,
        data: &str,
    ) -> Result<PictureChanged, HandlerError> {
        let mut record = self.load_owned(identity, id).await?;
        let update = decode_picture(data, self.policy.picture_max_bytes)?;

        let previous = record.picture.take();
        record.picture = store_picture(self.media.as_ref(), update).await?;
        let url = record.picture.as_deref().map(|key| self.media.public_url(key));

        self.repos
            .audios_write
            .save_audio(Change::Modified(record))
            .await?;
        discard_blob(self.media.as_ref(), previous.as_deref()).await;
        self.cache.remove(&CacheKey::Audio(id)).await;

        Ok(PictureChanged { url })
    }

    /// Soft delete the audio and drop its blobs.
    pub async fn remove_audio(&self, identity: &Identity, id: i64) -> Result<(), HandlerError> {
        let record = self.load_owned(identity, id).await?;
        let file = record.file.clone();
        let picture = record.picture.clone();

        self.repos
            .audios_write
            .save_audio(Change::Deleted(record))
            .await?;
        discard_blob(self.media.as_ref(), Some(&file)).await;
        discard_blob(self.media.as_ref(), picture.as_deref()).await;
        self.invalidate(id, identity.user_id).await;

        info!(audio_id = id, user_id = identity.user_id, "audio removed");
        Ok(())
    }

    /// Returns whether the audio is favorited afterwards (always `true`).
    pub async fn favorite(&self, identity: &Identity, id: i64) -> Result<bool, HandlerError> {
        let record = self.load_reachable(id, Some(identity.user_id)).await?;
        self.repos.users_write.ensure_user(identity).await?;
        self.repos
            .audios_write
            .favorite_audio(identity.user_id, record.id, OffsetDateTime::now_utc())
            .await?;
        Ok(true)
    }

    /// Returns whether the audio is favorited afterwards (always `false`).
    pub async fn unfavorite(&self, identity: &Identity, id: i64) -> Result<bool, HandlerError> {
        let record = self.load_reachable(id, Some(identity.user_id)).await?;
        self.repos
            .audios_write
            .unfavorite_audio(identity.user_id, record.id)
            .await?;
        Ok(false)
    }

    /// Drop the audio entry and the owner's profile, whose audio count may have moved.
    async fn invalidate(&self, id: i64, owner_id: i64) {
        self.cache.remove(&CacheKey::Audio(id)).await;
        match self.repos.users.find_by_id(owner_id).await {
            Ok(Some(owner)) => self.cache.remove(&CacheKey::profile(&owner.user_name)).await,
            Ok(None) => {}
            Err(err) => {
                warn!(user_id = owner_id, error = %err, "could not resolve profile to invalidate")
            }
        }
    }
}

/// File stem, cut to the title limit.
fn default_title(file_name: &str) -> String {
    Path::new(file_name)
        .file_stem()
        .and_then(|stem| stem.to_str())
        .map(str::trim)
        .unwrap_or_default()
        .chars()
        .take(TITLE_MAX_CHARS)
        .collect()
}
