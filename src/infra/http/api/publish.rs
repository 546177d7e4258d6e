//! Rewrites stored object keys into public media URLs on the way out.
//!
//! Views and the cache keep keys, so a changed media base URL never leaves
//! stale links behind.

use crate::application::audios::AudioDetail;
use crate::application::nodes::Node;
use crate::application::pagination::Page;
use crate::application::playlists::PlaylistDetail;
use crate::application::repos::{AudioView, FollowView, PlaylistView, ProfileView, UserSummary};
use crate::application::storage::MediaStore;
use crate::application::users::{AccountView, ProfileDetail};

pub trait Publish: Sized {
    fn publish(self, media: &dyn MediaStore) -> Self;
}

fn link(media: &dyn MediaStore, key: Option<String>) -> Option<String> {
    key.map(|key| media.public_url(&key))
}

impl Publish for UserSummary {
    fn publish(mut self, media: &dyn MediaStore) -> Self {
        self.picture = link(media, self.picture);
        self
    }
}

impl Publish for AudioView {
    fn publish(mut self, media: &dyn MediaStore) -> Self {
        self.file = media.public_url(&self.file);
        self.picture = link(media, self.picture);
        self.user = self.user.publish(media);
        self
    }
}

impl Publish for PlaylistView {
    fn publish(mut self, media: &dyn MediaStore) -> Self {
        self.picture = link(media, self.picture);
        self.user = self.user.publish(media);
        self
    }
}

impl Publish for ProfileView {
    fn publish(mut self, media: &dyn MediaStore) -> Self {
        self.picture = link(media, self.picture);
        self
    }
}

impl Publish for FollowView {
    fn publish(mut self, media: &dyn MediaStore) -> Self {
        self.user = self.user.publish(media);
        self
    }
}

impl Publish for AccountView {
    fn publish(mut self, media: &dyn MediaStore) -> Self {
        self.picture = link(media, self.picture);
        self
    }
}

impl Publish for AudioDetail {
    fn publish(mut self, media: &dyn MediaStore) -> Self {
        self.audio = self.audio.publish(media);
        self
    }
}

impl Publish for PlaylistDetail {
    fn publish(mut self, media: &dyn MediaStore) -> Self {
        self.playlist = self.playlist.publish(media);
        self
    }
}

impl Publish for ProfileDetail {
    fn publish(mut self, media: &dyn MediaStore) -> Self {
        self.profile = self.profile.publish(media);
        self
    }
}

impl Publish for Node {
    fn publish(self, media: &dyn MediaStore) -> Self {
        match self {
            Node::Audio(audio) => Node::Audio(audio.publish(media)),
            Node::User(user) => Node::User(user.publish(media)),
            Node::Playlist(playlist) => Node::Playlist(playlist.publish(media)),
        }
    }
}

impl<T: Publish> Publish for Page<T> {
    fn publish(self, media: &dyn MediaStore) -> Self {
        self.map(|item| item.publish(media))
    }
}
