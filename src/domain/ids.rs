//! Short random identifiers for stored objects.

use rand::Rng;

/// URL-safe alphabet used for every generated object name.
pub const OBJECT_ID_ALPHABET: &[u8; 64] =
    b"_-0123456789abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ";

pub const DEFAULT_OBJECT_ID_LEN: usize = 21;
pub const PICTURE_ID_LEN: usize = 15;

/// Separates the owner id from the random part of an uploaded file's name.
const OWNER_SEPARATOR: char = '_';

/// Generate a random identifier of `len` characters drawn from [`OBJECT_ID_ALPHABET`].
pub fn random_object_id(len: usize) -> String {
    let mut rng = rand::thread_rng();
    (0..len)
        .map(|_| char::from(OBJECT_ID_ALPHABET[rng.gen_range(0..OBJECT_ID_ALPHABET.len())]))
        .collect()
}

/// Name for a file uploaded by `owner_id`: `{owner_id}_{random}.{extension}`.
pub fn owned_object_name(owner_id: i64, extension: &str) -> String {
    format!(
        "{owner_id}{OWNER_SEPARATOR}{}.{extension}",
        random_object_id(DEFAULT_OBJECT_ID_LEN)
    )
}

/// Owner encoded by [`owned_object_name`], if `name` has that shape.
pub fn object_owner(name: &str) -> Option<i64> {
    let (owner, rest) = name.split_once(OWNER_SEPARATOR)?;
    if owner.is_empty() || !owner.bytes().all(|b| b.is_ascii_digit()) || rest.is_empty() {
        return None;
    }
    owner.parse().ok()
}

/// Whether `value` looks like an identifier produced by [`random_object_id`],
/// optionally followed by a lowercase file extension.
pub fn is_object_name(value: &str) -> bool {
    let (stem, extension) = match value.rsplit_once('.') {
        Some((stem, ext)) => (stem, Some(ext)),
        None => (value, None),
    };
    let stem_ok = !stem.is_empty()
        && stem.len() <= 64
        && stem.bytes().all(|b| OBJECT_ID_ALPHABET.contains(&b));
    let extension_ok = extension.is_none_or(|ext| {
        !ext.is_empty() && ext.len() <= 8 && ext.bytes().all(|b| b.is_ascii_alphanumeric())
    });
    stem_ok && extension_ok
}
