//! Test utilities and fixtures for music-indexer tests.
//!
//! Real audio files are not needed to exercise the scan engine: fixture
//! "audio" files are small text files whose tags [`FixtureTagReader`] parses.
//!
//! # Example
//!
//! ```ignore
//! use crate::test_utils::{write_fixture, FixtureTagReader};
//!
//! let dir = tempfile::tempdir().unwrap();
//! write_fixture(dir.path(), "x/1.mp3", "Album", "Artist", "Title", 1);
//! ```

use async_trait::async_trait;
use parking_lot::Mutex;
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::db::RedbStore;
use crate::index::IndexEngine;
use crate::metadata::{TagError, TagReader, TrackTags};
use crate::search::{SearchBackend, SearchDocument, SearchError};

/// First line of every fixture file.
const FIXTURE_HEADER: &str = "#fixture-tags";

/// Index engine over a fresh in-memory store.
pub fn temp_index() -> IndexEngine {
    let store = RedbStore::in_memory().expect("Failed to create in-memory store");
    IndexEngine::new(Arc::new(store))
}

/// The scanner's default extension set.
pub fn default_extensions() -> Vec<String> {
    vec!["mp3".to_string(), "m4a".to_string()]
}

/// Write a fixture file at `root/relative`, creating parent directories.
pub fn write_fixture(
    root: &Path,
    relative: &str,
    album: &str,
    artist: &str,
    title: &str,
    track_number: u32,
) -> PathBuf {
    let contents = format!(
        "{FIXTURE_HEADER}\nalbum={album}\nartist={artist}\ntitle={title}\ntrack={track_number}\n"
    );
    write_raw(root, relative, &contents)
}

/// Write arbitrary contents at `root/relative`, creating parent directories.
pub fn write_raw(root: &Path, relative: &str, contents: &str) -> PathBuf {
    let path = root.join(relative);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).expect("Failed to create fixture directory");
    }
    std::fs::write(&path, contents).expect("Failed to write fixture");
    path
}

/// Parses files written by [`write_fixture`]; anything else is a tag error.
pub struct FixtureTagReader;

impl TagReader for FixtureTagReader {
    fn read(&self, mut file: File) -> Result<TrackTags, TagError> {
        let mut contents = String::new();
        file.read_to_string(&mut contents)?;

        let mut lines = contents.lines();
        if lines.next() != Some(FIXTURE_HEADER) {
            return Err(TagError::Read("not a fixture file".to_string()));
        }

        let mut tags = TrackTags::default();
        for line in lines {
            let Some((key, value)) = line.split_once('=') else {
                continue;
            };
            match key {
                "album" => tags.album = value.to_string(),
                "artist" => tags.artist = value.to_string(),
                "title" => tags.title = value.to_string(),
                "track" => {
                    tags.track_number = value
                        .parse()
                        .map_err(|_| TagError::Read(format!("bad track number {value}")))?
                }
                _ => {}
            }
        }
        Ok(tags)
    }
}

/// [`FixtureTagReader`] that blocks every read until the test releases it.
///
/// Used to hold a scan in the `Scanning` state.
pub struct GatedTagReader {
    gate: Mutex<std::sync::mpsc::Receiver<()>>,
    entered: AtomicUsize,
}

impl GatedTagReader {
    /// Returns the reader and the sender that releases one read per message.
    /// Dropping the sender releases every read.
    pub fn with_release() -> (Arc<Self>, std::sync::mpsc::Sender<()>) {
        let (tx, rx) = std::sync::mpsc::channel();
        let reader = Self {
            gate: Mutex::new(rx),
            entered: AtomicUsize::new(0),
        };
        (Arc::new(reader), tx)
    }

    /// Number of reads that have reached the gate.
    pub fn entered(&self) -> usize {
        self.entered.load(Ordering::SeqCst)
    }

    /// Yield until at least `count` reads have reached the gate.
    pub async fn wait_for_entered(&self, count: usize) {
        while self.entered() < count {
            tokio::task::yield_now().await;
        }
    }
}

impl TagReader for GatedTagReader {
    fn read(&self, file: File) -> Result<TrackTags, TagError> {
        self.entered.fetch_add(1, Ordering::SeqCst);
        // A dropped sender also releases the gate.
        let _ = self.gate.lock().recv();
        FixtureTagReader.read(file)
    }
}

/// Search backend that records calls and can be told to fail.
#[derive(Default)]
pub struct RecordingSearch {
    batches: Mutex<Vec<(String, Vec<SearchDocument>)>>,
    dropped: Mutex<Vec<String>>,
    fail: bool,
}

impl RecordingSearch {
    /// A backend whose every call fails.
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    pub fn batches(&self) -> Vec<(String, Vec<SearchDocument>)> {
        self.batches.lock().clone()
    }

    pub fn dropped(&self) -> Vec<String> {
        self.dropped.lock().clone()
    }

    /// Every document sent to `index`, across batches.
    pub fn documents(&self, index: &str) -> Vec<SearchDocument> {
        self.batches
            .lock()
            .iter()
            .filter(|(i, _)| i == index)
            .flat_map(|(_, docs)| docs.iter().cloned())
            .collect()
    }

    fn check(&self) -> Result<(), SearchError> {
        if self.fail {
            Err(SearchError::Network("connection refused".to_string()))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl SearchBackend for RecordingSearch {
    async fn add_documents(
        &self,
        index: &str,
        documents: &[SearchDocument],
    ) -> Result<(), SearchError> {
        self.check()?;
        self.batches
            .lock()
            .push((index.to_string(), documents.to_vec()));
        Ok(())
    }

    async fn drop_index(&self, index: &str) -> Result<(), SearchError> {
        self.check()?;
        self.dropped.lock().push(index.to_string());
        Ok(())
    }

    async fn search(&self, index: &str, query: &str) -> Result<serde_json::Value, SearchError> {
        self.check()?;
        Ok(serde_json::json!({ "index": index, "query": query, "hits": [] }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixture_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_fixture(dir.path(), "a/b/c.mp3", "X", "Y", "One", 2);

        let tags = FixtureTagReader.read(File::open(path).unwrap()).unwrap();
        assert_eq!(
            tags,
            TrackTags {
                album: "X".to_string(),
                artist: "Y".to_string(),
                title: "One".to_string(),
                track_number: 2,
            }
        );
    }

    #[test]
    fn test_non_fixture_is_tag_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_raw(dir.path(), "x.mp3", "ID3 garbage");
        assert!(FixtureTagReader.read(File::open(path).unwrap()).is_err());
    }

    #[test]
    fn test_temp_index_starts_empty() {
        let index = temp_index();
        assert!(index.get_albums().unwrap().is_empty());
    }
}
