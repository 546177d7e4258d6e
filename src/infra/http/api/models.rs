use serde::{Deserialize, Serialize};

use crate::application::audios::{CreateAudioCommand, SearchAudiosQuery, UpdateAudioCommand};
use crate::application::error::HandlerError;
use crate::application::pagination::{Page, PageCursor, PageRequest};
use crate::application::playlists::{CreatePlaylistCommand, UpdatePlaylistCommand};
use crate::domain::types::Visibility;

use super::error::ApiError;

/// `?offset=&size=` or `?cursor=&size=`; offset wins when both are given.
#[derive(Debug, Default, Deserialize)]
pub struct PageQuery {
    pub offset: Option<u32>,
    pub cursor: Option<String>,
    pub size: Option<u32>,
}

impl PageQuery {
    pub fn into_request<C: PageCursor>(self, default_size: u32) -> Result<PageRequest<C>, ApiError> {
        let size = self.size.unwrap_or(default_size);
        if let Some(offset) = self.offset {
            return Ok(PageRequest::offset(offset, size));
        }
        let cursor = self
            .cursor
            .as_deref()
            .map(str::trim)
            .filter(|raw| !raw.is_empty())
            .map(C::decode)
            .transpose()
            .map_err(HandlerError::from)?;
        Ok(PageRequest::cursor(cursor, size))
    }
}

/// Cursor-only listings ignore `offset`.
#[derive(Debug, Default, Deserialize)]
pub struct CursorQuery {
    pub cursor: Option<String>,
    pub size: Option<u32>,
}

impl CursorQuery {
    pub fn into_request<C: PageCursor>(self, default_size: u32) -> Result<PageRequest<C>, ApiError> {
        PageQuery {
            offset: None,
            cursor: self.cursor,
            size: self.size,
        }
        .into_request(default_size)
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct SearchQuery {
    pub q: Option<String>,
    /// Comma separated; every tag must match.
    pub tags: Option<String>,
    pub cursor: Option<String>,
    pub size: Option<u32>,
}

impl SearchQuery {
    pub fn split(self) -> (SearchAudiosQuery, CursorQuery) {
        let tags = self
            .tags
            .as_deref()
            .map(|raw| {
                raw.split(',')
                    .map(str::trim)
                    .filter(|tag| !tag.is_empty())
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default();
        (
            SearchAudiosQuery {
                query: self.q,
                tags,
            },
            CursorQuery {
                cursor: self.cursor,
                size: self.size,
            },
        )
    }
}

/// A page plus the window it was requested with.
#[derive(Debug, Serialize)]
pub struct PageResponse<T> {
    #[serde(flatten)]
    pub page: Page<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub offset: Option<u32>,
    pub size: u32,
}

impl<T> PageResponse<T> {
    pub fn new<C>(page: Page<T>, request: &PageRequest<C>) -> Self {
        let offset = match request {
            PageRequest::Offset { offset, .. } => Some(*offset),
            PageRequest::Cursor { .. } => None,
        };
        Self {
            page,
            offset,
            size: request.size(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct CreateAudioRequest {
    pub upload_id: String,
    pub file_name: String,
    pub title: Option<String>,
    pub description: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub duration: i32,
    #[serde(default)]
    pub visibility: Visibility,
}

impl From<CreateAudioRequest> for CreateAudioCommand {
    fn from(request: CreateAudioRequest) -> Self {
        Self {
            upload_id: request.upload_id,
            file_name: request.file_name,
            title: request.title,
            description: request.description,
            tags: request.tags,
            duration: request.duration,
            visibility: request.visibility,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct UpdateAudioRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    pub tags: Option<Vec<String>>,
    pub visibility: Option<Visibility>,
}

impl From<UpdateAudioRequest> for UpdateAudioCommand {
    fn from(request: UpdateAudioRequest) -> Self {
        Self {
            title: request.title,
            description: request.description,
            tags: request.tags,
            visibility: request.visibility,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct CreatePlaylistRequest {
    pub title: String,
    pub description: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub visibility: Visibility,
    #[serde(default)]
    pub audio_ids: Vec<i64>,
}

impl From<CreatePlaylistRequest> for CreatePlaylistCommand {
    fn from(request: CreatePlaylistRequest) -> Self {
        Self {
            title: request.title,
            description: request.description,
            tags: request.tags,
            visibility: request.visibility,
            audio_ids: request.audio_ids,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct UpdatePlaylistRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    pub tags: Option<Vec<String>>,
    pub visibility: Option<Visibility>,
}

impl From<UpdatePlaylistRequest> for UpdatePlaylistCommand {
    fn from(request: UpdatePlaylistRequest) -> Self {
        Self {
            title: request.title,
            description: request.description,
            tags: request.tags,
            visibility: request.visibility,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct PlaylistAudiosRequest {
    pub audio_ids: Vec<i64>,
}

/// Base64 image data, optionally a `data:` URL; blank removes the picture.
#[derive(Debug, Deserialize)]
pub struct PictureRequest {
    #[serde(default)]
    pub data: String,
}

#[derive(Debug, Deserialize)]
pub struct UsernameRequest {
    pub user_name: String,
}

#[derive(Debug, Deserialize)]
pub struct EmailRequest {
    pub email: String,
}

#[derive(Debug, Serialize)]
pub struct FavoriteState {
    pub is_favorited: bool,
}

#[derive(Debug, Serialize)]
pub struct FollowState {
    pub is_following: bool,
}

#[derive(Debug, Serialize)]
pub struct ChangedCount {
    pub changed: u64,
}
