//! Search mirror synchronisation.
//!
//! Scanned entities are mirrored into an external full-text search service
//! as `{ "Id", "Name" }` documents. Documents are buffered per index and sent
//! in batches: when a buffer reaches the batch size, and once more for the
//! remainders when a scan finishes.
//!
//! The mirror is advisory. The ordered store is authoritative, so a failed
//! batch is logged and dropped; nothing here fails a scan.

mod meilisearch;

pub use meilisearch::MeilisearchClient;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;

use crate::model::{Album, Artist, Track};

pub const TRACK_INDEX: &str = "track";
pub const ALBUM_INDEX: &str = "album";
pub const ARTIST_INDEX: &str = "artist";

/// Every index the mirror maintains.
pub const INDEXES: [&str; 3] = [TRACK_INDEX, ALBUM_INDEX, ARTIST_INDEX];

/// Documents buffered per index before a flush.
pub const DEFAULT_BATCH_SIZE: usize = 1000;

/// A document in one of the search indexes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct SearchDocument {
    pub id: String,
    pub name: String,
}

impl From<&Track> for SearchDocument {
    fn from(track: &Track) -> Self {
        Self {
            id: track.id.clone(),
            name: track.name.clone(),
        }
    }
}

impl From<&Album> for SearchDocument {
    fn from(album: &Album) -> Self {
        Self {
            id: album.id.clone(),
            name: album.name.clone(),
        }
    }
}

impl From<&Artist> for SearchDocument {
    fn from(artist: &Artist) -> Self {
        Self {
            id: artist.id.clone(),
            name: artist.name.clone(),
        }
    }
}

/// Errors talking to the search service.
#[derive(Debug, Clone, thiserror::Error)]
pub enum SearchError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("Search service returned HTTP {status}: {message}")]
    Api { status: u16, message: String },

    #[error("Failed to parse response: {0}")]
    Parse(String),
}

/// The external search service.
///
/// Implement this trait to create mock implementations for testing.
#[async_trait]
pub trait SearchBackend: Send + Sync {
    /// Upsert documents into an index.
    async fn add_documents(
        &self,
        index: &str,
        documents: &[SearchDocument],
    ) -> Result<(), SearchError>;

    /// Delete an index. Deleting an absent index succeeds.
    async fn drop_index(&self, index: &str) -> Result<(), SearchError>;

    /// Run a query against one index and return the raw response.
    async fn search(&self, index: &str, query: &str) -> Result<serde_json::Value, SearchError>;
}

/// Backend used when no search service is configured.
#[derive(Debug, Clone, Copy, Default)]
pub struct DisabledSearch;

#[async_trait]
impl SearchBackend for DisabledSearch {
    async fn add_documents(&self, _: &str, _: &[SearchDocument]) -> Result<(), SearchError> {
        Ok(())
    }

    async fn drop_index(&self, _: &str) -> Result<(), SearchError> {
        Ok(())
    }

    async fn search(&self, _: &str, _: &str) -> Result<serde_json::Value, SearchError> {
        Ok(serde_json::json!({ "hits": [] }))
    }
}

/// Batching front end to a [`SearchBackend`].
pub struct SearchSync {
    backend: Arc<dyn SearchBackend>,
    batches: Mutex<HashMap<String, Vec<SearchDocument>>>,
    batch_size: usize,
}

impl SearchSync {
    pub fn new(backend: Arc<dyn SearchBackend>, batch_size: usize) -> Self {
        Self {
            backend,
            batches: Mutex::new(HashMap::new()),
            batch_size: batch_size.max(1),
        }
    }

    /// Buffer a document; sends the index's batch once it is full.
    pub async fn add_document(
        &self,
        index: &str,
        document: SearchDocument,
    ) -> Result<(), SearchError> {
        // Take a full batch out under the lock, send it after releasing it.
        let full = {
            let mut batches = self.batches.lock();
            let batch = batches.entry(index.to_string()).or_default();
            batch.push(document);
            if batch.len() >= self.batch_size {
                Some(std::mem::take(batch))
            } else {
                None
            }
        };

        match full {
            Some(batch) => self.send(index, batch).await,
            None => Ok(()),
        }
    }

    /// Send every non-empty buffer regardless of size.
    ///
    /// All buffers are attempted; the first error is returned.
    pub async fn flush_batches(&self) -> Result<(), SearchError> {
        let pending: Vec<(String, Vec<SearchDocument>)> = {
            let mut batches = self.batches.lock();
            batches
                .iter_mut()
                .filter(|(_, batch)| !batch.is_empty())
                .map(|(index, batch)| (index.clone(), std::mem::take(batch)))
                .collect()
        };

        let mut first_error = None;
        for (index, batch) in pending {
            if let Err(e) = self.send(&index, batch).await {
                first_error.get_or_insert(e);
            }
        }

        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    /// Delete every destination index ahead of a full rebuild.
    ///
    /// Also discards anything still buffered from an earlier run.
    pub async fn drop_all(&self) {
        self.batches.lock().clear();

        for index in INDEXES {
            if let Err(e) = self.backend.drop_index(index).await {
                tracing::error!(target: "search", index, error = %e, "Failed to drop index");
            }
        }
    }

    /// Query all indexes concurrently.
    ///
    /// Indexes that fail are logged and left out of the result.
    pub async fn search(&self, query: &str) -> HashMap<String, serde_json::Value> {
        let lookups = INDEXES.iter().map(|index| async move {
            (*index, self.backend.search(index, query).await)
        });

        let mut results = HashMap::new();
        for (index, result) in futures::future::join_all(lookups).await {
            match result {
                Ok(response) => {
                    results.insert(index.to_string(), response);
                }
                Err(e) => {
                    tracing::error!(target: "search", index, error = %e, "Search failed");
                }
            }
        }
        results
    }

    /// Number of buffered documents for an index.
    #[cfg(test)]
    pub fn pending(&self, index: &str) -> usize {
        self.batches.lock().get(index).map_or(0, Vec::len)
    }

    async fn send(&self, index: &str, batch: Vec<SearchDocument>) -> Result<(), SearchError> {
        let count = batch.len();
        match self.backend.add_documents(index, &batch).await {
            Ok(()) => {
                tracing::debug!(target: "search", index, count, "Sent document batch");
                Ok(())
            }
            Err(e) => {
                tracing::error!(
                    target: "search",
                    index,
                    count,
                    error = %e,
                    "Failed to send document batch; documents dropped"
                );
                Err(e)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::RecordingSearch;

    fn doc(n: usize) -> SearchDocument {
        SearchDocument {
            id: format!("id-{n}"),
            name: format!("Name {n}"),
        }
    }

    #[test]
    fn test_document_json_shape() {
        let json = serde_json::to_value(doc(1)).unwrap();
        assert_eq!(json["Id"], "id-1");
        assert_eq!(json["Name"], "Name 1");
    }

    #[test]
    fn test_documents_from_entities() {
        let track = Track::new("One", 1, "/m/1.mp3", "mp3");
        let document = SearchDocument::from(&track);
        assert_eq!(document.id, track.id);
        assert_eq!(document.name, "One");
        assert!(!serde_json::to_string(&document).unwrap().contains("/m/1.mp3"));
    }

    #[tokio::test]
    async fn test_batch_flushes_at_threshold() {
        let backend = Arc::new(RecordingSearch::default());
        let sync = SearchSync::new(backend.clone(), 3);

        sync.add_document(TRACK_INDEX, doc(1)).await.unwrap();
        sync.add_document(TRACK_INDEX, doc(2)).await.unwrap();
        assert!(backend.batches().is_empty());
        assert_eq!(sync.pending(TRACK_INDEX), 2);

        sync.add_document(TRACK_INDEX, doc(3)).await.unwrap();
        let batches = backend.batches();
        assert_eq!(batches.len(), 1);
        assert_eq!(batches[0].0, TRACK_INDEX);
        assert_eq!(batches[0].1, vec![doc(1), doc(2), doc(3)]);
        assert_eq!(sync.pending(TRACK_INDEX), 0);
    }

    #[tokio::test]
    async fn test_buffers_are_per_index() {
        let backend = Arc::new(RecordingSearch::default());
        let sync = SearchSync::new(backend.clone(), 2);

        sync.add_document(TRACK_INDEX, doc(1)).await.unwrap();
        sync.add_document(ALBUM_INDEX, doc(2)).await.unwrap();
        assert!(backend.batches().is_empty());

        sync.add_document(ALBUM_INDEX, doc(3)).await.unwrap();
        let batches = backend.batches();
        assert_eq!(batches, vec![(ALBUM_INDEX.to_string(), vec![doc(2), doc(3)])]);
        assert_eq!(sync.pending(TRACK_INDEX), 1);
    }

    #[tokio::test]
    async fn test_flush_sends_remainders() {
        let backend = Arc::new(RecordingSearch::default());
        let sync = SearchSync::new(backend.clone(), DEFAULT_BATCH_SIZE);

        sync.add_document(TRACK_INDEX, doc(1)).await.unwrap();
        sync.add_document(ARTIST_INDEX, doc(2)).await.unwrap();
        sync.flush_batches().await.unwrap();

        let mut indexes: Vec<String> = backend.batches().into_iter().map(|(i, _)| i).collect();
        indexes.sort();
        assert_eq!(indexes, vec![ARTIST_INDEX, TRACK_INDEX]);

        // Nothing left, so a second flush sends nothing.
        sync.flush_batches().await.unwrap();
        assert_eq!(backend.batches().len(), 2);
    }

    #[tokio::test]
    async fn test_failed_batch_is_dropped_not_retried() {
        let backend = Arc::new(RecordingSearch::failing());
        let sync = SearchSync::new(backend.clone(), 2);

        sync.add_document(TRACK_INDEX, doc(1)).await.unwrap();
        assert!(sync.add_document(TRACK_INDEX, doc(2)).await.is_err());
        assert_eq!(sync.pending(TRACK_INDEX), 0);

        // The buffer keeps working after a failure.
        sync.add_document(TRACK_INDEX, doc(3)).await.unwrap();
        assert_eq!(sync.pending(TRACK_INDEX), 1);
        assert!(sync.flush_batches().await.is_err());
        assert_eq!(sync.pending(TRACK_INDEX), 0);
    }

    #[tokio::test]
    async fn test_drop_all_drops_every_index_and_clears_buffers() {
        let backend = Arc::new(RecordingSearch::default());
        let sync = SearchSync::new(backend.clone(), 10);
        sync.add_document(TRACK_INDEX, doc(1)).await.unwrap();

        sync.drop_all().await;

        let mut dropped = backend.dropped();
        dropped.sort();
        assert_eq!(dropped, vec![ALBUM_INDEX, ARTIST_INDEX, TRACK_INDEX]);
        assert_eq!(sync.pending(TRACK_INDEX), 0);
    }

    #[tokio::test]
    async fn test_drop_all_swallows_errors() {
        let backend = Arc::new(RecordingSearch::failing());
        let sync = SearchSync::new(backend, 10);
        sync.drop_all().await;
    }

    #[tokio::test]
    async fn test_search_collects_every_index() {
        let backend = Arc::new(RecordingSearch::default());
        let sync = SearchSync::new(backend, 10);

        let results = sync.search("queen").await;
        assert_eq!(results.len(), 3);
        assert_eq!(results[TRACK_INDEX]["query"], "queen");
    }

    #[tokio::test]
    async fn test_search_omits_failed_indexes() {
        let backend = Arc::new(RecordingSearch::failing());
        let sync = SearchSync::new(backend, 10);
        assert!(sync.search("queen").await.is_empty());
    }

    #[tokio::test]
    async fn test_disabled_backend_accepts_everything() {
        let sync = SearchSync::new(Arc::new(DisabledSearch), 1);
        sync.add_document(TRACK_INDEX, doc(1)).await.unwrap();
        sync.flush_batches().await.unwrap();
        sync.drop_all().await;
        assert_eq!(sync.search("x").await.len(), 3);
    }
}
