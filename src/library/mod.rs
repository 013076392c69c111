//! Scan orchestration.
//!
//! [`Library`] owns the single-flight scan lifecycle: at most one scan runs
//! at a time, a request during a scan is rejected rather than queued, and
//! the state always returns to idle however the scan ends.
//!
//! A scan resets the search indexes, walks the source tree on a blocking
//! thread writing each track to the index as it goes, and mirrors every
//! successfully written track into search from the async side. Reads go to
//! [`Library::index`] directly and may run while a scan is writing.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::ops::ControlFlow;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use crate::error::{Error, Result};
use crate::index::IndexEngine;
use crate::metadata::TagReader;
use crate::scanner::{self, ScanEvent};
use crate::search::{ALBUM_INDEX, ARTIST_INDEX, SearchDocument, SearchSync, TRACK_INDEX};

/// Events buffered between the walk and the search mirror.
const EVENT_CHANNEL_CAPACITY: usize = 100;

/// Orchestrator state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanState {
    Idle,
    Scanning,
}

/// Outcome of a scan request.
#[derive(Debug)]
pub enum ScanRequest {
    /// A new scan was spawned; the handle resolves when it finishes
    Started(JoinHandle<Result<ScanSummary>>),
    /// A scan was already running; nothing was started
    AlreadyInProgress,
}

impl ScanRequest {
    pub fn message(&self) -> &'static str {
        match self {
            ScanRequest::Started(_) => "starting scan...",
            ScanRequest::AlreadyInProgress => "already in progress",
        }
    }
}

/// What a completed scan did.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScanSummary {
    pub files_seen: usize,
    pub tracks_indexed: usize,
    pub files_skipped: usize,
    pub write_failures: usize,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

/// Holds the scanning flag; clears it when dropped.
struct ScanGuard {
    scanning: Arc<AtomicBool>,
}

impl Drop for ScanGuard {
    fn drop(&mut self) {
        self.scanning.store(false, Ordering::Release);
        info!(target: "library::scan", "Scan state reset to idle");
    }
}

/// The scan engine and its collaborators.
#[derive(Clone)]
pub struct Library {
    source_dir: PathBuf,
    extensions: Arc<Vec<String>>,
    index: IndexEngine,
    search: Arc<SearchSync>,
    reader: Arc<dyn TagReader>,
    scanning: Arc<AtomicBool>,
    walks_started: Arc<AtomicU64>,
}

impl Library {
    pub fn new(
        source_dir: PathBuf,
        extensions: Vec<String>,
        index: IndexEngine,
        search: Arc<SearchSync>,
        reader: Arc<dyn TagReader>,
    ) -> Self {
        Self {
            source_dir,
            extensions: Arc::new(extensions),
            index,
            search,
            reader,
            scanning: Arc::new(AtomicBool::new(false)),
            walks_started: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Read side of the library.
    pub fn index(&self) -> &IndexEngine {
        &self.index
    }

    pub fn search(&self) -> &SearchSync {
        &self.search
    }

    pub fn state(&self) -> ScanState {
        if self.scanning.load(Ordering::Acquire) {
            ScanState::Scanning
        } else {
            ScanState::Idle
        }
    }

    /// Number of directory walks started since construction.
    pub fn walks_started(&self) -> u64 {
        self.walks_started.load(Ordering::Relaxed)
    }

    /// Start a scan in the background unless one is already running.
    ///
    /// Must be called from within a tokio runtime.
    pub fn request_scan(&self) -> ScanRequest {
        let Some(guard) = self.try_begin() else {
            info!(target: "library::scan", "Scan requested while one is in progress");
            return ScanRequest::AlreadyInProgress;
        };

        let library = self.clone();
        ScanRequest::Started(tokio::spawn(async move { library.run(guard).await }))
    }

    /// Run a scan to completion.
    ///
    /// Returns `Ok(None)` if another scan was already running.
    pub async fn scan(&self) -> Result<Option<ScanSummary>> {
        match self.request_scan() {
            ScanRequest::Started(handle) => {
                let summary = handle
                    .await
                    .map_err(|e| Error::TaskJoin(e.to_string()))??;
                Ok(Some(summary))
            }
            ScanRequest::AlreadyInProgress => Ok(None),
        }
    }

    fn try_begin(&self) -> Option<ScanGuard> {
        self.scanning
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| ScanGuard {
                scanning: Arc::clone(&self.scanning),
            })
    }

    async fn run(&self, guard: ScanGuard) -> Result<ScanSummary> {
        // Shared with the blocking walk: the scan stays in progress until
        // both this task and the walk are done, even if this task is aborted.
        let guard = Arc::new(guard);
        let started_at = Utc::now();
        self.walks_started.fetch_add(1, Ordering::Relaxed);
        info!(target: "library::scan", root = %self.source_dir.display(), "Starting scan");

        self.search.drop_all().await;

        let (tx, mut rx) = mpsc::channel::<ScanEvent>(EVENT_CHANNEL_CAPACITY);
        let walker = {
            let root = self.source_dir.clone();
            let extensions = Arc::clone(&self.extensions);
            let reader = Arc::clone(&self.reader);
            let index = self.index.clone();
            let guard = Arc::clone(&guard);

            tokio::task::spawn_blocking(move || {
                let _guard = guard;
                let mut write_failures = 0usize;
                let stats = scanner::walk(&root, &extensions, reader.as_ref(), |event| {
                    let written =
                        index.add_track(event.album.as_ref(), event.artist.as_ref(), &event.track);
                    match written {
                        Ok(()) => {
                            if tx.blocking_send(event).is_err() {
                                // The scan task is gone; nobody is waiting for the rest.
                                warn!(target: "library::scan", "Scan task dropped, stopping walk");
                                return ControlFlow::Break(());
                            }
                        }
                        Err(e) => {
                            write_failures += 1;
                            warn!(
                                target: "library::scan",
                                path = %event.track.absolute_path,
                                error = %e,
                                "Error adding track to store"
                            );
                        }
                    }
                    ControlFlow::Continue(())
                })?;
                Ok::<_, Error>((stats, write_failures))
            })
        };

        // The channel closes when the walk returns, successful or not.
        while let Some(event) = rx.recv().await {
            self.mirror(&event).await;
        }

        let walked = walker
            .await
            .map_err(|e| Error::TaskJoin(e.to_string()))
            .and_then(|result| result);

        if let Err(e) = self.search.flush_batches().await {
            error!(target: "library::scan", error = %e, "Error flushing search batches");
        }

        let (stats, write_failures) = match walked {
            Ok(walked) => walked,
            Err(e) => {
                error!(target: "library::scan", error = %e, "Error scanning");
                return Err(e);
            }
        };

        let summary = ScanSummary {
            files_seen: stats.files_seen,
            tracks_indexed: stats.tracks_found - write_failures,
            files_skipped: stats.files_skipped,
            write_failures,
            started_at,
            finished_at: Utc::now(),
        };
        info!(
            target: "library::scan",
            files = summary.files_seen,
            indexed = summary.tracks_indexed,
            skipped = summary.files_skipped,
            failures = summary.write_failures,
            "Scan completed"
        );
        Ok(summary)
    }

    async fn mirror(&self, event: &ScanEvent) {
        let mut documents = Vec::with_capacity(3);
        if let Some(album) = &event.album {
            documents.push((ALBUM_INDEX, SearchDocument::from(album)));
        }
        if let Some(artist) = &event.artist {
            documents.push((ARTIST_INDEX, SearchDocument::from(artist)));
        }
        documents.push((TRACK_INDEX, SearchDocument::from(&event.track)));

        for (index, document) in documents {
            if let Err(e) = self.search.add_document(index, document).await {
                error!(target: "library::scan", index, error = %e, "Error adding document to search");
            }
        }
    }
}
