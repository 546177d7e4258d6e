//! Object storage seam for audio files and pictures.

use std::error::Error as StdError;

use async_trait::async_trait;
use bytes::Bytes;
use futures::stream::BoxStream;
use thiserror::Error;

/// Top-level namespaces inside the object store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Container {
    Audios,
    Pictures,
}

impl Container {
    pub fn as_str(self) -> &'static str {
        match self {
            Container::Audios => "audios",
            Container::Pictures => "pictures",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "audios" => Some(Container::Audios),
            "pictures" => Some(Container::Pictures),
            _ => None,
        }
    }

    /// Object key (`container/name`) stored on entities.
    pub fn key(self, name: &str) -> String {
        format!("{}/{}", self.as_str(), name)
    }
}

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("invalid object key")]
    InvalidKey,
    #[error("object not found")]
    NotFound,
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error("payload exceeds the {limit} byte limit")]
    TooLarge { limit: u64 },
    #[error("payload stream failed")]
    PayloadStream {
        #[source]
        source: Box<dyn StdError + Send + Sync>,
    },
    #[error("payload is empty")]
    EmptyPayload,
}

/// Metadata describing a stored object.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredObject {
    pub key: String,
    pub size: u64,
    pub checksum: String,
}

pub type ByteStream = BoxStream<'static, Result<Bytes, StorageError>>;

#[async_trait]
pub trait MediaStore: Send + Sync {
    /// Stream a payload into `container/name`, aborting once it grows past `max_bytes`.
    async fn put_stream(
        &self,
        container: Container,
        name: &str,
        stream: ByteStream,
        max_bytes: u64,
    ) -> Result<StoredObject, StorageError>;

    async fn put(
        &self,
        container: Container,
        name: &str,
        data: Bytes,
    ) -> Result<StoredObject, StorageError>;

    /// Size of the object in bytes, or `None` when absent.
    async fn stat(&self, key: &str) -> Result<Option<u64>, StorageError>;

    async fn read(&self, key: &str) -> Result<Bytes, StorageError>;

    /// Missing objects are treated as already deleted.
    async fn delete(&self, key: &str) -> Result<(), StorageError>;

    fn public_url(&self, key: &str) -> String;
}
