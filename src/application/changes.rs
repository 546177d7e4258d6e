//! Pre-commit pass applied to every entity change before it reaches storage.
//!
//! Write repositories receive [`Change`] values and run [`prepare`] on them:
//! additions get their creation stamp, modifications their update stamp, and
//! deletions of soft-deletable entities become updates that set `deleted_at`.

use time::OffsetDateTime;

use crate::domain::entities::{AudioRecord, PlaylistRecord, UserRecord};

#[derive(Debug, Clone, PartialEq)]
pub enum Change<T> {
    Added(T),
    Modified(T),
    Deleted(T),
}

/// What the store must do with a prepared change.
#[derive(Debug, Clone, PartialEq)]
pub enum Write<T> {
    Insert(T),
    Update(T),
    Remove(T),
}

impl<T> Write<T> {
    pub fn into_inner(self) -> T {
        match self {
            Write::Insert(value) | Write::Update(value) | Write::Remove(value) => value,
        }
    }
}

/// Audit and soft-delete hooks for persisted entities.
pub trait Tracked {
    fn mark_created(&mut self, at: OffsetDateTime);
    fn mark_modified(&mut self, at: OffsetDateTime);
    /// Returns `false` when the entity has no soft-delete column.
    fn mark_deleted(&mut self, _at: OffsetDateTime) -> bool {
        false
    }
}

pub fn prepare<T: Tracked>(change: Change<T>, now: OffsetDateTime) -> Write<T> {
    match change {
        Change::Added(mut entity) => {
            entity.mark_created(now);
            Write::Insert(entity)
        }
        Change::Modified(mut entity) => {
            entity.mark_modified(now);
            Write::Update(entity)
        }
        Change::Deleted(mut entity) => {
            if entity.mark_deleted(now) {
                entity.mark_modified(now);
                Write::Update(entity)
            } else {
                Write::Remove(entity)
            }
        }
    }
}

impl Tracked for AudioRecord {
    fn mark_created(&mut self, at: OffsetDateTime) {
        self.created_at = at;
        self.updated_at = None;
        self.deleted_at = None;
    }

    fn mark_modified(&mut self, at: OffsetDateTime) {
        self.updated_at = Some(at);
    }

    fn mark_deleted(&mut self, at: OffsetDateTime) -> bool {
        self.deleted_at = Some(at);
        true
    }
}

impl Tracked for PlaylistRecord {
    fn mark_created(&mut self, at: OffsetDateTime) {
        self.created_at = at;
        self.updated_at = None;
        self.deleted_at = None;
    }

    fn mark_modified(&mut self, at: OffsetDateTime) {
        self.updated_at = Some(at);
    }

    fn mark_deleted(&mut self, at: OffsetDateTime) -> bool {
        self.deleted_at = Some(at);
        true
    }
}

impl Tracked for UserRecord {
    fn mark_created(&mut self, at: OffsetDateTime) {
        self.created_at = at;
        self.updated_at = None;
    }

    fn mark_modified(&mut self, at: OffsetDateTime) {
        self.updated_at = Some(at);
    }
}
