//! Inline picture payloads (`base64` or `data:` URLs) used by picture updates.

use base64::{Engine as _, engine::general_purpose::STANDARD};
use bytes::Bytes;
use serde::Serialize;
use tracing::warn;

use crate::application::storage::{Container, MediaStore, StorageError};
use crate::domain::ids::{PICTURE_ID_LEN, random_object_id};
use crate::domain::validation::ValidationErrors;

/// What a picture update asks for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PictureUpdate {
    Remove,
    Replace(Bytes),
}

/// Decode a picture payload. Blank input removes the current picture.
pub fn decode_picture(data: &str, max_bytes: u64) -> Result<PictureUpdate, ValidationErrors> {
    let trimmed = data.trim();
    if trimmed.is_empty() {
        return Ok(PictureUpdate::Remove);
    }

    let encoded = match trimmed.strip_prefix("data:") {
        Some(rest) => match rest.split_once(";base64,") {
            Some((_, payload)) => payload,
            None => {
                return Err(ValidationErrors::single(
                    "data",
                    "data URL must be base64 encoded",
                ));
            }
        },
        None => trimmed,
    };

    let bytes = STANDARD
        .decode(encoded)
        .map_err(|_| ValidationErrors::single("data", "picture is not valid base64"))?;

    if bytes.len() as u64 > max_bytes {
        return Err(ValidationErrors::single(
            "data",
            format!("picture must be at most {max_bytes} bytes"),
        ));
    }
    if imagesize::blob_size(&bytes).is_err() {
        return Err(ValidationErrors::single(
            "data",
            "picture is not a recognised image",
        ));
    }

    Ok(PictureUpdate::Replace(Bytes::from(bytes)))
}

/// Public location of an entity's picture after an update.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PictureChanged {
    pub url: Option<String>,
}

/// Write the new picture blob, if any, and return its object key.
///
/// The previous blob is left in place; callers drop it with [`discard_blob`]
/// once the entity points at the new key.
pub async fn store_picture(
    media: &dyn MediaStore,
    update: PictureUpdate,
) -> Result<Option<String>, StorageError> {
    match update {
        PictureUpdate::Remove => Ok(None),
        PictureUpdate::Replace(bytes) => {
            let name = format!("{}.jpg", random_object_id(PICTURE_ID_LEN));
            let stored = media.put(Container::Pictures, &name, bytes).await?;
            Ok(Some(stored.key))
        }
    }
}

/// Best-effort removal of a blob nothing references anymore.
pub async fn discard_blob(media: &dyn MediaStore, key: Option<&str>) {
    let Some(key) = key else {
        return;
    };
    if let Err(err) = media.delete(key).await {
        warn!(key = %key, error = %err, "failed to delete orphaned blob");
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// Smallest valid GIF: 1x1 pixel.
    pub(crate) const PIXEL_GIF: &[u8] = &[
        0x47, 0x49, 0x46, 0x38, 0x39, 0x61, 0x01, 0x00, 0x01, 0x00, 0x80, 0x00, 0x00, 0xff, 0xff,
        0xff, 0x00, 0x00, 0x00, 0x21, 0xf9, 0x04, 0x01, 0x00, 0x00, 0x00, 0x00, 0x2c, 0x00, 0x00,
        0x00, 0x00, 0x01, 0x00, 0x01, 0x00, 0x00, 0x02, 0x02, 0x44, 0x01, 0x00, 0x3b,
    ];

    #[test]
    fn blank_payload_removes_picture() {
        assert_eq!(decode_picture("  ", 1024), Ok(PictureUpdate::Remove));
    }

    #[test]
    fn accepts_plain_and_data_url_payloads() {
        let encoded = STANDARD.encode(PIXEL_GIF);
        let plain = decode_picture(&encoded, 1024).expect("plain base64");
        let data_url =
            decode_picture(&format!("data:image/gif;base64,{encoded}"), 1024).expect("data url");
        assert_eq!(plain, PictureUpdate::Replace(Bytes::from_static(PIXEL_GIF)));
        assert_eq!(plain, data_url);
    }

    #[test]
    fn rejects_non_images_and_oversized_payloads() {
        let text = STANDARD.encode(b"definitely not an image");
        assert!(decode_picture(&text, 1024).is_err());
        assert!(decode_picture("***", 1024).is_err());

        let encoded = STANDARD.encode(PIXEL_GIF);
        assert!(decode_picture(&encoded, 8).is_err());
    }
}
