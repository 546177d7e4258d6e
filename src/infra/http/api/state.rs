use std::sync::Arc;

use crate::application::audios::AudioService;
use crate::application::nodes::NodeService;
use crate::application::playlists::PlaylistService;
use crate::application::storage::MediaStore;
use crate::application::uploads::UploadService;
use crate::application::users::UserService;
use crate::infra::db::PostgresRepositories;

#[derive(Clone)]
pub struct ApiState {
    pub audios: Arc<AudioService>,
    pub users: Arc<UserService>,
    pub playlists: Arc<PlaylistService>,
    pub uploads: Arc<UploadService>,
    pub nodes: Arc<NodeService>,
    pub media: Arc<dyn MediaStore>,
    pub db: Arc<PostgresRepositories>,
    pub default_page_size: u32,
}
