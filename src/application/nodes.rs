//! Lookup of any audio, user or playlist by its global id.

use serde::Serialize;

use crate::application::audios::{AudioDetail, AudioService};
use crate::application::auth::Identity;
use crate::application::error::HandlerError;
use crate::application::playlists::{PlaylistDetail, PlaylistService};
use crate::application::users::{ProfileDetail, UserService};
use crate::domain::nodes::{GlobalId, NodeKind};

/// A resolved node, tagged with its type name.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type")]
pub enum Node {
    Audio(AudioDetail),
    User(ProfileDetail),
    Playlist(PlaylistDetail),
}

#[derive(Clone)]
pub struct NodeService {
    audios: AudioService,
    users: UserService,
    playlists: PlaylistService,
}

impl NodeService {
    pub fn new(audios: AudioService, users: UserService, playlists: PlaylistService) -> Self {
        Self {
            audios,
            users,
            playlists,
        }
    }

    /// Resolve `global_id` with the same visibility and cache rules as the direct lookups.
    pub async fn resolve(
        &self,
        global_id: &str,
        viewer: Option<&Identity>,
    ) -> Result<Node, HandlerError> {
        let GlobalId { kind, id } = GlobalId::decode(global_id)?;
        match kind {
            NodeKind::Audio => Ok(Node::Audio(self.audios.get_audio(id, viewer).await?)),
            NodeKind::Playlist => Ok(Node::Playlist(
                self.playlists.get_playlist(id, viewer).await?,
            )),
            NodeKind::User => Ok(Node::User(self.users.profile_by_id(id, viewer).await?)),
        }
    }
}
