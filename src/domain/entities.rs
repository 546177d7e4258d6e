//! Domain entities mirrored from persistent storage.
//!
//! Identifiers of records that have not been persisted yet are `0`; the
//! store assigns the real identity on insert.

use serde::Serialize;
use time::OffsetDateTime;

use crate::domain::types::Visibility;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UserRecord {
    pub id: i64,
    pub user_name: String,
    pub email: Option<String>,
    pub picture: Option<String>,
    pub created_at: OffsetDateTime,
    pub updated_at: Option<OffsetDateTime>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AudioRecord {
    pub id: i64,
    pub title: String,
    pub description: Option<String>,
    pub tags: Vec<String>,
    /// Length in whole seconds.
    pub duration: i32,
    /// Object key of the audio blob.
    pub file: String,
    /// Blob size in bytes.
    pub size: i64,
    pub picture: Option<String>,
    pub visibility: Visibility,
    pub user_id: i64,
    pub created_at: OffsetDateTime,
    pub updated_at: Option<OffsetDateTime>,
    pub deleted_at: Option<OffsetDateTime>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlaylistRecord {
    pub id: i64,
    pub title: String,
    pub description: Option<String>,
    pub tags: Vec<String>,
    pub picture: Option<String>,
    pub visibility: Visibility,
    pub user_id: i64,
    pub created_at: OffsetDateTime,
    pub updated_at: Option<OffsetDateTime>,
    pub deleted_at: Option<OffsetDateTime>,
}
