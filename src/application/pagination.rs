//! Offset and cursor pagination shared by every listing.
//!
//! Listings are ordered by `(sort_key DESC, id DESC)`. Repositories fetch one
//! row more than the page size and hand the rows to [`Page::from_overfetch`],
//! which trims the probe row and derives the continuation token.

use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use thiserror::Error;
use time::OffsetDateTime;

pub const DEFAULT_PAGE_SIZE: u32 = 15;
pub const MAX_PAGE_SIZE: u32 = 100;

#[derive(Debug, Error)]
pub enum PaginationError {
    #[error("invalid cursor: {0}")]
    InvalidCursor(String),
}

/// Opaque continuation token for a `(timestamp, id)` ordered listing.
pub trait PageCursor: Sized {
    fn encode(&self) -> String;
    fn decode(cursor: &str) -> Result<Self, PaginationError>;
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
struct CursorPayload {
    at: OffsetDateTime,
    id: i64,
}

fn encode_payload(at: OffsetDateTime, id: i64) -> String {
    let serialized = serde_json::to_vec(&CursorPayload { at, id })
        .expect("serializing cursor payload should succeed");
    URL_SAFE_NO_PAD.encode(serialized)
}

fn decode_payload<T: DeserializeOwned>(cursor: &str) -> Result<T, PaginationError> {
    let bytes = URL_SAFE_NO_PAD
        .decode(cursor)
        .map_err(|err| PaginationError::InvalidCursor(err.to_string()))?;
    serde_json::from_slice(&bytes).map_err(|err| PaginationError::InvalidCursor(err.to_string()))
}

/// Cursor for audio listings. `sort_key` is the creation time, or the
/// favorited / added-to-playlist time for those listings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AudioCursor {
    sort_key: OffsetDateTime,
    id: i64,
}

impl AudioCursor {
    pub fn new(sort_key: OffsetDateTime, id: i64) -> Self {
        Self { sort_key, id }
    }

    pub fn sort_key(&self) -> OffsetDateTime {
        self.sort_key
    }

    pub fn id(&self) -> i64 {
        self.id
    }
}

impl PageCursor for AudioCursor {
    fn encode(&self) -> String {
        encode_payload(self.sort_key, self.id)
    }

    fn decode(cursor: &str) -> Result<Self, PaginationError> {
        let payload: CursorPayload = decode_payload(cursor)?;
        Ok(Self::new(payload.at, payload.id))
    }
}

/// Cursor for follower, following and playlist listings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimelineCursor {
    at: OffsetDateTime,
    id: i64,
}

impl TimelineCursor {
    pub fn new(at: OffsetDateTime, id: i64) -> Self {
        Self { at, id }
    }

    pub fn at(&self) -> OffsetDateTime {
        self.at
    }

    pub fn id(&self) -> i64 {
        self.id
    }
}

impl PageCursor for TimelineCursor {
    fn encode(&self) -> String {
        encode_payload(self.at, self.id)
    }

    fn decode(cursor: &str) -> Result<Self, PaginationError> {
        let payload: CursorPayload = decode_payload(cursor)?;
        Ok(Self::new(payload.at, payload.id))
    }
}

/// Offset-or-cursor page request. Sizes are clamped to `1..=MAX_PAGE_SIZE`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageRequest<C> {
    /// Zero-based page index; skips `offset * size` rows.
    Offset { offset: u32, size: u32 },
    /// Rows strictly after `cursor`, or the first page when absent.
    Cursor { cursor: Option<C>, size: u32 },
}

impl<C> PageRequest<C> {
    pub fn offset(offset: u32, size: u32) -> Self {
        Self::Offset {
            offset,
            size: clamp_size(size),
        }
    }

    pub fn cursor(cursor: Option<C>, size: u32) -> Self {
        Self::Cursor {
            cursor,
            size: clamp_size(size),
        }
    }

    pub fn first(size: u32) -> Self {
        Self::cursor(None, size)
    }

    pub fn size(&self) -> u32 {
        match self {
            Self::Offset { size, .. } | Self::Cursor { size, .. } => *size,
        }
    }

    /// Rows to fetch: one past the page to probe for a next page.
    pub fn fetch_limit(&self) -> i64 {
        i64::from(self.size()) + 1
    }

    /// Rows to skip before the page starts.
    pub fn skip(&self) -> i64 {
        match self {
            Self::Offset { offset, size } => i64::from(*offset) * i64::from(*size),
            Self::Cursor { .. } => 0,
        }
    }

    pub fn after(&self) -> Option<&C> {
        match self {
            Self::Cursor { cursor, .. } => cursor.as_ref(),
            Self::Offset { .. } => None,
        }
    }

    pub fn is_cursor(&self) -> bool {
        matches!(self, Self::Cursor { .. })
    }
}

impl<C> Default for PageRequest<C> {
    fn default() -> Self {
        Self::first(DEFAULT_PAGE_SIZE)
    }
}

fn clamp_size(size: u32) -> u32 {
    size.clamp(1, MAX_PAGE_SIZE)
}

/// One page of results plus continuation metadata.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub next_cursor: Option<String>,
    pub has_next: bool,
}

impl<T> Page<T> {
    pub fn empty() -> Self {
        Self {
            items: Vec::new(),
            next_cursor: None,
            has_next: false,
        }
    }

    /// Build a page from rows fetched with [`PageRequest::fetch_limit`].
    ///
    /// A next cursor is emitted only for cursor requests that have more rows.
    pub fn from_overfetch<C, F>(mut rows: Vec<T>, request: &PageRequest<C>, cursor_of: F) -> Self
    where
        C: PageCursor,
        F: Fn(&T) -> C,
    {
        let size = request.size() as usize;
        let has_next = rows.len() > size;
        rows.truncate(size);

        let next_cursor = if has_next && request.is_cursor() {
            rows.last().map(|row| cursor_of(row).encode())
        } else {
            None
        };

        Self {
            items: rows,
            next_cursor,
            has_next,
        }
    }

    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            items: self.items.into_iter().map(f).collect(),
            next_cursor: self.next_cursor,
            has_next: self.has_next,
        }
    }
}

#[cfg(test)]
mod tests {
    use time::macros::datetime;

    use super::*;

    #[test]
    fn audio_cursor_round_trip() {
        let at = datetime!(2024-03-01 12:30:00 UTC);
        let encoded = AudioCursor::new(at, 42).encode();
        let decoded = AudioCursor::decode(&encoded).expect("decoded cursor");
        assert_eq!(decoded.sort_key(), at);
        assert_eq!(decoded.id(), 42);
    }

    #[test]
    fn timeline_cursor_round_trip() {
        let at = datetime!(2023-11-20 08:00:00 UTC);
        let decoded =
            TimelineCursor::decode(&TimelineCursor::new(at, 7).encode()).expect("decoded cursor");
        assert_eq!(decoded.at(), at);
        assert_eq!(decoded.id(), 7);
    }

    #[test]
    fn decoding_invalid_cursor_reports_error() {
        for raw in ["not-base64!", "e30", ""] {
            let err = AudioCursor::decode(raw).expect_err("invalid cursor rejected");
            assert!(matches!(err, PaginationError::InvalidCursor(_)));
        }
    }

    #[test]
    fn sizes_are_clamped() {
        assert_eq!(PageRequest::<AudioCursor>::offset(0, 0).size(), 1);
        assert_eq!(PageRequest::<AudioCursor>::first(500).size(), MAX_PAGE_SIZE);
        assert_eq!(PageRequest::<AudioCursor>::default().size(), DEFAULT_PAGE_SIZE);
    }

    #[test]
    fn offset_skips_whole_pages() {
        let request = PageRequest::<AudioCursor>::offset(3, 10);
        assert_eq!(request.skip(), 30);
        assert_eq!(request.fetch_limit(), 11);
        assert!(request.after().is_none());
    }

    fn rows(ids: &[i64]) -> Vec<(OffsetDateTime, i64)> {
        let base = datetime!(2024-01-01 00:00:00 UTC);
        ids.iter()
            .map(|id| (base + time::Duration::minutes(*id), *id))
            .collect()
    }

    #[test]
    fn overfetch_sets_next_cursor_from_last_kept_row() {
        let request = PageRequest::<AudioCursor>::first(2);
        let page = Page::from_overfetch(rows(&[5, 4, 3]), &request, |(at, id)| {
            AudioCursor::new(*at, *id)
        });

        assert_eq!(page.items.len(), 2);
        assert!(page.has_next);
        let cursor = AudioCursor::decode(page.next_cursor.as_deref().expect("next cursor"))
            .expect("decodable");
        assert_eq!(cursor.id(), 4);
    }

    #[test]
    fn short_page_has_no_continuation() {
        let request = PageRequest::<AudioCursor>::first(5);
        let page = Page::from_overfetch(rows(&[2, 1]), &request, |(at, id)| {
            AudioCursor::new(*at, *id)
        });
        assert_eq!(page.items.len(), 2);
        assert!(!page.has_next);
        assert!(page.next_cursor.is_none());
    }

    #[test]
    fn empty_result_is_an_empty_page() {
        let request = PageRequest::<AudioCursor>::first(5);
        let page: Page<(OffsetDateTime, i64)> =
            Page::from_overfetch(Vec::new(), &request, |(at, id)| AudioCursor::new(*at, *id));
        assert_eq!(page, Page::empty());
    }

    #[test]
    fn offset_pages_report_more_without_cursor() {
        let request = PageRequest::<AudioCursor>::offset(0, 2);
        let page = Page::from_overfetch(rows(&[3, 2, 1]), &request, |(at, id)| {
            AudioCursor::new(*at, *id)
        });
        assert!(page.has_next);
        assert!(page.next_cursor.is_none());
    }
}
