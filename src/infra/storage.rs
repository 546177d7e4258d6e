//! Filesystem-backed media storage with `audios/` and `pictures/` containers.

use std::path::{Component, Path, PathBuf};

use async_trait::async_trait;
use bytes::Bytes;
use futures::{StreamExt, stream};
use sha2::{Digest, Sha256};
use tokio::{
    fs,
    io::{AsyncWrite, AsyncWriteExt},
};
use url::Url;

use crate::application::storage::{ByteStream, Container, MediaStore, StorageError, StoredObject};

/// Blobs stored under `root/{container}/{name}` and published below `base_url`.
#[derive(Debug)]
pub struct FileMediaStore {
    root: PathBuf,
    base_url: Url,
}

impl FileMediaStore {
    /// Initialise storage rooted at the provided directory, creating both containers.
    pub fn new(root: PathBuf, base_url: Url) -> Result<Self, std::io::Error> {
        for container in [Container::Audios, Container::Pictures] {
            std::fs::create_dir_all(root.join(container.as_str()))?;
        }
        Ok(Self { root, base_url })
    }

    /// Absolute path of an object key, rejecting keys that escape a container.
    fn resolve(&self, key: &str) -> Result<PathBuf, StorageError> {
        let relative = Path::new(key);
        let mut components = relative.components();
        let container_ok = matches!(
            components.next(),
            Some(Component::Normal(first)) if first.to_str().and_then(Container::parse).is_some()
        );
        let name_ok = matches!(components.next(), Some(Component::Normal(_)));
        if !container_ok || !name_ok || components.next().is_some() {
            return Err(StorageError::InvalidKey);
        }
        Ok(self.root.join(relative))
    }
}

/// Copy `stream` into `file`, returning the byte count and sha256 hex digest.
async fn write_limited<W>(
    file: &mut W,
    stream: &mut ByteStream,
    max_bytes: u64,
) -> Result<(u64, String), StorageError>
where
    W: AsyncWrite + Unpin,
{
    let mut hasher = Sha256::new();
    let mut total_bytes: u64 = 0;

    while let Some(chunk) = stream.next().await {
        let chunk = chunk?;
        if chunk.is_empty() {
            continue;
        }
        total_bytes = total_bytes.saturating_add(chunk.len() as u64);
        if total_bytes > max_bytes {
            return Err(StorageError::TooLarge { limit: max_bytes });
        }
        file.write_all(&chunk).await?;
        hasher.update(&chunk);
    }
    file.flush().await?;

    if total_bytes == 0 {
        return Err(StorageError::EmptyPayload);
    }
    Ok((total_bytes, hex::encode(hasher.finalize())))
}

#[async_trait]
impl MediaStore for FileMediaStore {
    async fn put_stream(
        &self,
        container: Container,
        name: &str,
        mut stream: ByteStream,
        max_bytes: u64,
    ) -> Result<StoredObject, StorageError> {
        let key = container.key(name);
        let absolute = self.resolve(&key)?;

        let mut file = fs::File::create(&absolute).await?;
        let written = write_limited(&mut file, &mut stream, max_bytes).await;
        drop(file);

        match written {
            Ok((size, checksum)) => Ok(StoredObject {
                key,
                size,
                checksum,
            }),
            Err(err) => {
                // Nothing partial is left behind, whatever went wrong.
                let _ = fs::remove_file(&absolute).await;
                Err(err)
            }
        }
    }

    async fn put(
        &self,
        container: Container,
        name: &str,
        data: Bytes,
    ) -> Result<StoredObject, StorageError> {
        let limit = data.len() as u64;
        let stream = stream::once(async move { Ok::<_, StorageError>(data) }).boxed();
        self.put_stream(container, name, stream, limit).await
    }

    async fn stat(&self, key: &str) -> Result<Option<u64>, StorageError> {
        let absolute = self.resolve(key)?;
        match fs::metadata(&absolute).await {
            Ok(metadata) if metadata.is_file() => Ok(Some(metadata.len())),
            Ok(_) => Ok(None),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(StorageError::Io(err)),
        }
    }

    async fn read(&self, key: &str) -> Result<Bytes, StorageError> {
        let absolute = self.resolve(key)?;
        match fs::read(absolute).await {
            Ok(data) => Ok(Bytes::from(data)),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Err(StorageError::NotFound),
            Err(err) => Err(StorageError::Io(err)),
        }
    }

    async fn delete(&self, key: &str) -> Result<(), StorageError> {
        let absolute = self.resolve(key)?;
        match fs::remove_file(&absolute).await {
            Ok(_) => Ok(()),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(StorageError::Io(err)),
        }
    }

    fn public_url(&self, key: &str) -> String {
        format!("{}/{}", self.base_url.as_str().trim_end_matches('/'), key)
    }
}
