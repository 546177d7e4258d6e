//! API handlers organized by resource type.

mod audios;
mod me;
mod media;
mod nodes;
mod playlists;
mod uploads;
mod users;

pub use audios::*;
pub use me::*;
pub use media::*;
pub use nodes::*;
pub use playlists::*;
pub use uploads::*;
pub use users::*;
