//! Application services: request handling between the HTTP layer and repositories.

pub mod audios;
pub mod auth;
pub mod changes;
pub mod error;
pub mod nodes;
pub mod pagination;
pub mod pictures;
pub mod playlists;
pub mod repos;
pub mod storage;
pub mod uploads;
pub mod users;
