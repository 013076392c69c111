//! Content-addressed identifiers.
//!
//! IDs are pure functions of the strings that identify an entity, so a
//! rescan of an unchanged tree rewrites the same keys instead of adding
//! new ones.

use sha2::{Digest, Sha256};

/// Track ID: hash of the absolute file path.
pub fn track_id(absolute_path: &str) -> String {
    hash_hex(&[absolute_path])
}

/// Album ID: hash of `artist ++ album`.
pub fn album_id(artist: &str, album: &str) -> String {
    hash_hex(&[artist, album])
}

/// Artist ID: hash of `album ++ artist`.
///
/// The reversed order relative to [`album_id`] keeps the two ID spaces
/// apart for the same tag pair.
pub fn artist_id(artist: &str, album: &str) -> String {
    hash_hex(&[album, artist])
}

/// SHA-256 over the concatenated parts as lowercase hex (64 characters).
fn hash_hex(parts: &[&str]) -> String {
    let mut hasher = Sha256::new();
    for part in parts {
        hasher.update(part.as_bytes());
    }
    format!("{:x}", hasher.finalize())
}
