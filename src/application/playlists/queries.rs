use crate::application::auth::{Identity, viewer_id};
use crate::application::error::HandlerError;
use crate::application::pagination::{AudioCursor, Page, PageRequest, TimelineCursor};
use crate::application::repos::{AudioListFilter, AudioView, PlaylistListFilter, PlaylistView};
use crate::cache::CacheKey;
use crate::domain::entities::UserRecord;

use super::service::PlaylistService;
use super::types::PlaylistDetail;

impl PlaylistService {
    pub async fn get_playlist(
        &self,
        id: i64,
        viewer: Option<&Identity>,
    ) -> Result<PlaylistDetail, HandlerError> {
        let playlists = self.repos.playlists.clone();
        let playlist = self
            .cache
            .fetch_optional(&CacheKey::Playlist(id), || async move {
                playlists.find_playlist(id).await
            })
            .await?
            .ok_or_else(|| HandlerError::not_found("playlist"))?;

        if !playlist
            .visibility
            .is_reachable_by(playlist.user.id, viewer_id(viewer))
        {
            return Err(HandlerError::not_found("playlist"));
        }

        let is_favorited = match viewer {
            Some(identity) => Some(
                self.repos
                    .playlists
                    .is_favorited(playlist.id, identity.user_id)
                    .await?,
            ),
            None => None,
        };

        Ok(PlaylistDetail {
            playlist,
            is_favorited,
        })
    }

    /// Audios in the playlist, most recently added first.
    pub async fn playlist_audios(
        &self,
        id: i64,
        viewer: Option<&Identity>,
        page: PageRequest<AudioCursor>,
    ) -> Result<Page<AudioView>, HandlerError> {
        let playlist = self.load_reachable(id, viewer_id(viewer)).await?;
        let filter = AudioListFilter {
            in_playlist: Some(playlist.id),
            ..AudioListFilter::default()
        };
        Ok(self
            .repos
            .audios
            .list_audios(&filter, viewer_id(viewer), page)
            .await?)
    }

    pub async fn user_playlists(
        &self,
        user_name: &str,
        viewer: Option<&Identity>,
        page: PageRequest<TimelineCursor>,
    ) -> Result<Page<PlaylistView>, HandlerError> {
        let user = self.require_user(user_name).await?;
        let filter = PlaylistListFilter {
            owner: Some(user.id),
            ..PlaylistListFilter::default()
        };
        Ok(self
            .repos
            .playlists
            .list_playlists(&filter, viewer_id(viewer), page)
            .await?)
    }

    pub async fn user_favorite_playlists(
        &self,
        user_name: &str,
        viewer: Option<&Identity>,
        page: PageRequest<TimelineCursor>,
    ) -> Result<Page<PlaylistView>, HandlerError> {
        let user = self.require_user(user_name).await?;
        let filter = PlaylistListFilter {
            favorited_by: Some(user.id),
            ..PlaylistListFilter::default()
        };
        Ok(self
            .repos
            .playlists
            .list_playlists(&filter, viewer_id(viewer), page)
            .await?)
    }

    pub async fn is_favorited(&self, identity: &Identity, id: i64) -> Result<bool, HandlerError> {
        let playlist = self.load_reachable(id, Some(identity.user_id)).await?;
        Ok(self
            .repos
            .playlists
            .is_favorited(playlist.id, identity.user_id)
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
