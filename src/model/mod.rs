//! Core data models for the music library.
//!
//! Defines the primary entities: [`Track`], [`Artist`], and [`Album`].
//! They are stored as JSON values in the ordered store (see [`crate::index`]).
//!
//! Only the `Public*` views are meant to leave the process: a stored
//! [`Track`] carries the absolute path of its file, which is kept internal.

pub mod id;

use serde::{Deserialize, Serialize};

/// A track (audio file) in the music library.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Track {
    /// Hash of the absolute path
    pub id: String,
    /// Title tag
    pub name: String,
    /// Absolute file path (storage only)
    pub absolute_path: String,
    /// Track number on album, 0 when unknown
    pub track_number: u32,
    /// Lowercase extension without the dot
    pub extension: String,
}

impl Track {
    pub fn new(
        name: impl Into<String>,
        track_number: u32,
        absolute_path: impl Into<String>,
        extension: impl Into<String>,
    ) -> Self {
        let absolute_path = absolute_path.into();
        Self {
            id: id::track_id(&absolute_path),
            name: name.into(),
            absolute_path,
            track_number,
            extension: extension.into(),
        }
    }

    /// External view of this track, without the file path.
    pub fn public(&self) -> PublicTrack {
        PublicTrack {
            id: self.id.clone(),
            name: self.name.clone(),
            track_number: self.track_number,
            extension: self.extension.clone(),
        }
    }
}

/// An album in the music library.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Album {
    /// Hash of artist name ++ album name
    pub id: String,
    /// Album title, original casing
    pub name: String,
    /// Ordered tracks; only filled by a single-album fetch, never persisted
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tracks: Vec<Track>,
}

impl Album {
    pub fn new(album: impl Into<String>, artist: &str) -> Self {
        let name = album.into();
        Self {
            id: id::album_id(artist, &name),
            name,
            tracks: Vec::new(),
        }
    }

    pub fn public(&self) -> PublicAlbum {
        PublicAlbum {
            id: self.id.clone(),
            name: self.name.clone(),
            tracks: self.tracks.iter().map(Track::public).collect(),
        }
    }
}

/// An artist in the music library.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Artist {
    /// Hash of album name ++ artist name
    pub id: String,
    /// Artist name, original casing
    pub name: String,
}

impl Artist {
    pub fn new(artist: impl Into<String>, album: &str) -> Self {
        let name = artist.into();
        Self {
            id: id::artist_id(&name, album),
            name,
        }
    }
}

/// Track as exposed outside the store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicTrack {
    pub id: String,
    pub name: String,
    pub track_number: u32,
    pub extension: String,
}

/// Album as exposed outside the store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PublicAlbum {
    pub id: String,
    pub name: String,
    pub tracks: Vec<PublicTrack>,
}
