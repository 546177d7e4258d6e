use serde::Serialize;

use crate::application::repos::PlaylistView;
use crate::domain::types::Visibility;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlaylistDetail {
    #[serde(flatten)]
    pub playlist: PlaylistView,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_favorited: Option<bool>,
}

#[derive(Debug, Clone, Default)]
pub struct CreatePlaylistCommand {
    pub title: String,
    pub description: Option<String>,
    pub tags: Vec<String>,
    pub visibility: Visibility,
    /// Audios added right away; each must be visible to the creator.
    pub audio_ids: Vec<i64>,
}

/// Partial update; `None` leaves a field untouched and a blank description clears it.
#[derive(Debug, Clone, Default)]
pub struct UpdatePlaylistCommand {
    pub title: Option<String>,
    pub description: Option<String>,
    pub tags: Option<Vec<String>>,
    pub visibility: Option<Visibility>,
}

impl UpdatePlaylistCommand {
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.description.is_none()
            && self.tags.is_none()
            && self.visibility.is_none()
    }
}
