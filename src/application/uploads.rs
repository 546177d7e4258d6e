//! Audio file uploads and the limits shared with picture updates.

use std::path::Path;
use std::sync::Arc;

use metrics::counter;
use serde::Serialize;
use tracing::info;

use crate::application::auth::Identity;
use crate::application::error::HandlerError;
use crate::application::storage::{ByteStream, Container, MediaStore, StorageError};
use crate::domain::ids::owned_object_name;
use crate::domain::validation::ValidationErrors;

/// Accepted content types and size limits for uploaded media.
#[derive(Debug, Clone)]
pub struct UploadPolicy {
    pub audio_max_bytes: u64,
    pub audio_content_types: Vec<String>,
    pub picture_max_bytes: u64,
}

impl UploadPolicy {
    /// Content type implied by the file name's extension, if it is an accepted audio type.
    pub fn audio_content_type(&self, file_name: &str) -> Result<String, ValidationErrors> {
        let extension = audio_extension(file_name)
            .ok_or_else(|| ValidationErrors::single("file_name", "file name needs an extension"))?;
        let guessed = mime_guess::from_ext(&extension)
            .iter()
            .map(|mime| mime.essence_str().to_string())
            .find(|mime| self.accepts(mime));
        guessed.ok_or_else(|| {
            ValidationErrors::single(
                "file_name",
                format!("`.{extension}` files are not an accepted audio format"),
            )
        })
    }

    pub fn check_audio_size(&self, size: u64) -> Result<(), ValidationErrors> {
        if size > self.audio_max_bytes {
            return Err(ValidationErrors::single(
                "file",
                format!("audio must be at most {} bytes", self.audio_max_bytes),
            ));
        }
        Ok(())
    }

    fn accepts(&self, mime: &str) -> bool {
        self.audio_content_types
            .iter()
            .any(|accepted| accepted.eq_ignore_ascii_case(mime))
    }
}

impl From<&crate::config::UploadSettings> for UploadPolicy {
    fn from(settings: &crate::config::UploadSettings) -> Self {
        Self {
            audio_max_bytes: settings.audio_max_bytes.get(),
            audio_content_types: settings.audio_content_types.clone(),
            picture_max_bytes: settings.picture_max_bytes.get(),
        }
    }
}

/// Lowercase extension of `file_name`, without the dot.
pub fn audio_extension(file_name: &str) -> Option<String> {
    Path::new(file_name)
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.trim().to_ascii_lowercase())
        .filter(|ext| !ext.is_empty() && ext.bytes().all(|b| b.is_ascii_alphanumeric()))
}

/// Result of a successful upload; `upload_id` is passed back when creating the audio.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UploadedAudio {
    pub upload_id: String,
    pub file_name: String,
    pub content_type: String,
    pub size: u64,
}

#[derive(Clone)]
pub struct UploadService {
    media: Arc<dyn MediaStore>,
    policy: UploadPolicy,
}

impl UploadService {
    pub fn new(media: Arc<dyn MediaStore>, policy: UploadPolicy) -> Self {
        Self { media, policy }
    }

    pub fn policy(&self) -> &UploadPolicy {
        &self.policy
    }

    /// Stream an audio file into the `audios` container under a name that records its uploader.
    pub async fn upload_audio(
        &self,
        identity: &Identity,
        file_name: &str,
        stream: ByteStream,
    ) -> Result<UploadedAudio, HandlerError> {
        let content_type = self.policy.audio_content_type(file_name)?;
        let extension = audio_extension(file_name).unwrap_or_default();
        let upload_id = owned_object_name(identity.user_id, &extension);

        let stored = match self
            .media
            .put_stream(
                Container::Audios,
                &upload_id,
                stream,
                self.policy.audio_max_bytes,
            )
            .await
        {
            Ok(stored) => stored,
            Err(StorageError::TooLarge { limit }) => {
                return Err(HandlerError::invalid(
                    "file",
                    format!("audio must be at most {limit} bytes"),
                ));
            }
            Err(StorageError::EmptyPayload) => {
                return Err(HandlerError::invalid("file", "audio file is empty"));
            }
            Err(err) => return Err(err.into()),
        };

        counter!("audiochan_uploaded_bytes_total").increment(stored.size);
        info!(
            user_id = identity.user_id,
            upload_id = %upload_id,
            size = stored.size,
            content_type = %content_type,
            "audio uploaded"
        );

        Ok(UploadedAudio {
            upload_id,
            file_name: file_name.to_string(),
            content_type,
            size: stored.size,
        })
    }
}
