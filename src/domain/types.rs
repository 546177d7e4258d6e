//! Shared domain enumerations aligned with persisted database enums.

use serde::{Deserialize, Serialize};

/// Who may see an audio or playlist.
///
/// `Unlisted` content is reachable by id but never shows up in listings
/// for anyone but its owner.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(type_name = "visibility", rename_all = "snake_case")]
pub enum Visibility {
    #[default]
    Public,
    Unlisted,
    Private,
}

impl Visibility {
    pub fn as_str(self) -> &'static str {
        match self {
            Visibility::Public => "public",
            Visibility::Unlisted => "unlisted",
            Visibility::Private => "private",
        }
    }

    /// Direct lookups reject private content for everyone but the owner.
    pub fn is_reachable_by(self, owner_id: i64, viewer: Option<i64>) -> bool {
        self != Visibility::Private || viewer == Some(owner_id)
    }

    /// Listings include public content plus whatever the viewer owns.
    pub fn is_listed_for(self, owner_id: i64, viewer: Option<i64>) -> bool {
        self == Visibility::Public || viewer == Some(owner_id)
    }
}
