//! Cache key definitions.
//!
//! Read paths and the mutations that invalidate them derive keys from the
//! same [`CacheKey`] value, so both sides always agree on the string.

use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum CacheKey {
    /// Audio detail view by id.
    Audio(i64),
    /// Profile view by lowercase username.
    Profile(String),
    /// Playlist detail view by id.
    Playlist(i64),
}

impl CacheKey {
    pub fn profile(user_name: &str) -> Self {
        CacheKey::Profile(user_name.to_ascii_lowercase())
    }

    /// Feature scope, used as a metrics label.
    pub fn scope(&self) -> &'static str {
        match self {
            CacheKey::Audio(_) => "audio",
            CacheKey::Profile(_) => "profile",
            CacheKey::Playlist(_) => "playlist",
        }
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CacheKey::Audio(id) => write!(f, "audio:{id}"),
            CacheKey::Profile(user_name) => write!(f, "profile:{user_name}"),
            CacheKey::Playlist(id) => write!(f, "playlist:{id}"),
        }
    }
}
