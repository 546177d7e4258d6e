use serde::Serialize;

use crate::application::repos::AudioView;
use crate::domain::types::Visibility;

/// Audio detail plus the viewer-specific favorite flag, which is never cached.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AudioDetail {
    #[serde(flatten)]
    pub audio: AudioView,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_favorited: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AudioUrl {
    pub url: String,
}

#[derive(Debug, Clone, Default)]
pub struct CreateAudioCommand {
    /// Object name returned by the upload endpoint.
    pub upload_id: String,
    /// Original file name; its stem is the default title.
    pub file_name: String,
    pub title: Option<String>,
    pub description: Option<String>,
    pub tags: Vec<String>,
    pub duration: i32,
    pub visibility: Visibility,
}

/// Partial update; `None` leaves a field untouched and a blank description clears it.
#[derive(Debug, Clone, Default)]
pub struct UpdateAudioCommand {
    pub title: Option<String>,
    pub description: Option<String>,
    pub tags: Option<Vec<String>>,
    pub visibility: Option<Visibility>,
}

impl UpdateAudioCommand {
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.description.is_none()
            && self.tags.is_none()
            && self.visibility.is_none()
    }
}

#[derive(Debug, Clone, Default)]
pub struct SearchAudiosQuery {
    pub query: Option<String>,
    pub tags: Vec<String>,
}
