//! Composite key layout.
//!
//! Every access path is a key prefix; ordered scans over a prefix give the
//! listing order. These strings are the persisted namespace and must not
//! change without migrating existing stores.

use crate::error::{Error, Result};

pub const TRACK_BY_ID: &str = "track:by-id:";
pub const TRACK_FOR_ALBUM_ID: &str = "track:for-album-id:";
pub const ALBUM_BY_NAME: &str = "album:by-name:";
pub const ALBUM_BY_ID: &str = "album:by-id:";
pub const ALBUM_FOR_ARTIST_ID: &str = "album:for-artist-id:";
pub const ARTIST_BY_NAME: &str = "artist:by-name:";
pub const ARTIST_BY_ID: &str = "artist:by-id:";

/// Digits in the padded track number segment.
pub const TRACK_NUMBER_WIDTH: usize = 6;
pub const MAX_TRACK_NUMBER: u32 = 999_999;

/// Zero-padded track number, so lexical key order matches numeric order.
pub fn padded_track_number(track_number: u32) -> Result<String> {
    if track_number > MAX_TRACK_NUMBER {
        return Err(Error::TrackNumberOutOfRange(track_number));
    }
    Ok(format!("{:0width$}", track_number, width = TRACK_NUMBER_WIDTH))
}

pub fn track_by_id(track_id: &str) -> String {
    format!("{TRACK_BY_ID}{track_id}")
}

pub fn track_for_album(album_id: &str, track_number: u32, track_id: &str) -> Result<String> {
    let padded = padded_track_number(track_number)?;
    Ok(format!("{TRACK_FOR_ALBUM_ID}{album_id}:{padded}:{track_id}"))
}

/// Prefix of all tracks of one album. The trailing separator keeps one
/// album ID from matching another that merely starts with it.
pub fn tracks_for_album_prefix(album_id: &str) -> String {
    format!("{TRACK_FOR_ALBUM_ID}{album_id}:")
}

pub fn album_by_name(name: &str) -> String {
    format!("{ALBUM_BY_NAME}{}", name.to_lowercase())
}

pub fn album_by_id(album_id: &str) -> String {
    format!("{ALBUM_BY_ID}{album_id}")
}

pub fn album_for_artist(artist_id: &str, album_id: &str) -> String {
    format!("{ALBUM_FOR_ARTIST_ID}{artist_id}:{album_id}")
}

pub fn albums_for_artist_prefix(artist_id: &str) -> String {
    format!("{ALBUM_FOR_ARTIST_ID}{artist_id}:")
}

pub fn artist_by_name(name: &str) -> String {
    format!("{ARTIST_BY_NAME}{}", name.to_lowercase())
}

pub fn artist_by_id(artist_id: &str) -> String {
    format!("{ARTIST_BY_ID}{artist_id}")
}
