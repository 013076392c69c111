//! Secondary-index engine over the ordered store.
//!
//! One scanned track becomes several records, each under its own key prefix
//! (see [`keys`]), so every listing is a single ordered prefix scan and every
//! fetch a point lookup. There is no query planner; the index shapes are
//! fixed here.
//!
//! All records written for one [`IndexEngine::add_track`] call go into one
//! [`WriteBatch`], so readers see either all of them or none.

pub mod keys;

use serde::Serialize;
use serde::de::DeserializeOwned;
use std::sync::Arc;

use crate::db::{KvStore, WriteBatch};
use crate::error::{Error, Result};
use crate::model::{Album, Artist, Track};

/// Reads and writes the library's index records.
#[derive(Clone)]
pub struct IndexEngine {
    store: Arc<dyn KvStore>,
}

impl IndexEngine {
    pub fn new(store: Arc<dyn KvStore>) -> Self {
        Self { store }
    }

    /// Index one track together with its optional album and artist.
    ///
    /// Track number validation and encoding happen before anything is
    /// written; a failure leaves the store untouched.
    pub fn add_track(
        &self,
        album: Option<&Album>,
        artist: Option<&Artist>,
        track: &Track,
    ) -> Result<()> {
        let mut batch = WriteBatch::new();

        put(&mut batch, keys::track_by_id(&track.id), track)?;

        if let Some(album) = album {
            let key = keys::track_for_album(&album.id, track.track_number, &track.id)?;
            put(&mut batch, key, track)?;
            put(&mut batch, keys::album_by_name(&album.name), album)?;
            put(&mut batch, keys::album_by_id(&album.id), album)?;
        }

        if let Some(artist) = artist {
            if let Some(album) = album {
                put(&mut batch, keys::album_for_artist(&artist.id, &album.id), album)?;
            }
            put(&mut batch, keys::artist_by_name(&artist.name), artist)?;
            put(&mut batch, keys::artist_by_id(&artist.id), artist)?;
        }

        tracing::trace!(
            target: "index",
            track = %track.id,
            records = batch.len(),
            "Applying track batch"
        );
        self.store.apply(batch)
    }

    /// All albums, ascending by lowercased name. Tracks are left empty.
    pub fn get_albums(&self) -> Result<Vec<Album>> {
        self.scan_records(keys::ALBUM_BY_NAME)
    }

    /// One album with its tracks in ascending track number order, ties
    /// broken by track ID.
    pub fn get_album(&self, id: &str) -> Result<Album> {
        let mut album: Album = self.get_record(&keys::album_by_id(id))?;
        album.tracks = self.scan_records(&keys::tracks_for_album_prefix(&album.id))?;
        Ok(album)
    }

    /// Albums filed under an artist, ascending by album ID.
    pub fn get_artist_albums(&self, artist_id: &str) -> Result<Vec<Album>> {
        self.scan_records(&keys::albums_for_artist_prefix(artist_id))
    }

    /// All artists, ascending by lowercased name.
    pub fn get_artists(&self) -> Result<Vec<Artist>> {
        self.scan_records(keys::ARTIST_BY_NAME)
    }

    pub fn get_artist(&self, id: &str) -> Result<Artist> {
        self.get_record(&keys::artist_by_id(id))
    }

    pub fn get_track(&self, id: &str) -> Result<Track> {
        self.get_record(&keys::track_by_id(id))
    }

    fn get_record<T: DeserializeOwned>(&self, key: &str) -> Result<T> {
        let bytes = self
            .store
            .get(key.as_bytes())?
            .ok_or_else(|| Error::not_found(key))?;
        decode(key.as_bytes(), &bytes)
    }

    fn scan_records<T: DeserializeOwned>(&self, prefix: &str) -> Result<Vec<T>> {
        self.store
            .scan_prefix(prefix.as_bytes())?
            .iter()
            .map(|(key, value)| decode(key, value))
            .collect()
    }
}

fn put<T: Serialize>(batch: &mut WriteBatch, key: String, record: &T) -> Result<()> {
    let value = serde_json::to_vec(record).map_err(|e| Error::encoding(&key, e))?;
    batch.set(key, value);
    Ok(())
}

fn decode<T: DeserializeOwned>(key: &[u8], value: &[u8]) -> Result<T> {
    serde_json::from_slice(value)
        .map_err(|e| Error::encoding(String::from_utf8_lossy(key), e))
}
