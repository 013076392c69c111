//! Directory walk that turns audio files into scan events.
//!
//! The walk is synchronous (walkdir, depth-first) and is meant to run on a
//! blocking thread; see [`crate::library`] for how it is driven.
//!
//! Only a root that cannot be listed stops the walk. Everything that goes
//! wrong with a single file (open, tag read, empty title) is logged and the
//! file is skipped.

use std::fs::File;
use std::ops::ControlFlow;
use std::path::Path;
use tracing::{debug, warn};
use walkdir::WalkDir;

use crate::error::{Error, Result};
use crate::metadata::{TagReader, TrackTags};
use crate::model::{Album, Artist, Track};

/// One valid track found by the walk, with the entities derived from it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanEvent {
    pub track: Track,
    /// Present when the album tag is non-empty
    pub album: Option<Album>,
    /// Present when the artist tag is non-empty
    pub artist: Option<Artist>,
}

impl ScanEvent {
    /// Build the entities for a file. Returns `None` when the title is empty.
    pub fn from_tags(tags: TrackTags, absolute_path: &str, extension: &str) -> Option<Self> {
        if tags.title.is_empty() {
            return None;
        }

        let album = (!tags.album.is_empty()).then(|| Album::new(tags.album.as_str(), &tags.artist));
        let artist =
            (!tags.artist.is_empty()).then(|| Artist::new(tags.artist.as_str(), &tags.album));
        let track = Track::new(tags.title, tags.track_number, absolute_path, extension);

        Some(Self {
            track,
            album,
            artist,
        })
    }
}

/// Counters for one walk.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WalkStats {
    /// Regular files with a supported extension
    pub files_seen: usize,
    /// Files that produced a scan event
    pub tracks_found: usize,
    /// Supported files skipped (unreadable, bad tags, empty title)
    pub files_skipped: usize,
}

/// Lowercase extension of `path` if it is one of `extensions`.
pub fn supported_extension(path: &Path, extensions: &[String]) -> Option<String> {
    let ext = path.extension()?.to_str()?.to_lowercase();
    extensions.iter().any(|e| *e == ext).then_some(ext)
}

/// Walk `root`, calling `on_event` for every file that yields a track.
///
/// `on_event` returning [`ControlFlow::Break`] ends the walk early. Fails
/// only if `root` itself cannot be listed.
pub fn walk<F>(
    root: &Path,
    extensions: &[String],
    reader: &dyn TagReader,
    mut on_event: F,
) -> Result<WalkStats>
where
    F: FnMut(ScanEvent) -> ControlFlow<()>,
{
    let unreadable = |source| Error::SourceUnreadable {
        path: root.to_path_buf(),
        source,
    };
    std::fs::read_dir(root).map_err(unreadable)?;
    let root = std::path::absolute(root).map_err(unreadable)?;

    let mut stats = WalkStats::default();

    for entry in WalkDir::new(&root) {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                warn!(target: "scanner", error = %e, "Skipping unreadable entry");
                continue;
            }
        };
        if !entry.file_type().is_file() {
            continue;
        }

        let path = entry.path();
        let Some(extension) = supported_extension(path, extensions) else {
            continue;
        };
        stats.files_seen += 1;

        match read_file(path, &extension, reader) {
            Some(event) => {
                stats.tracks_found += 1;
                if on_event(event).is_break() {
                    debug!(target: "scanner", "Walk stopped by caller");
                    break;
                }
            }
            None => stats.files_skipped += 1,
        }
    }

    debug!(
        target: "scanner",
        root = %root.display(),
        seen = stats.files_seen,
        found = stats.tracks_found,
        skipped = stats.files_skipped,
        "Walk finished"
    );
    Ok(stats)
}

fn read_file(path: &Path, extension: &str, reader: &dyn TagReader) -> Option<ScanEvent> {
    let Some(absolute_path) = path.to_str() else {
        warn!(target: "scanner", path = %path.display(), "Skipping non UTF-8 path");
        return None;
    };

    let file = match File::open(path) {
        Ok(file) => file,
        Err(e) => {
            warn!(target: "scanner", path = absolute_path, error = %e, "Error opening file");
            return None;
        }
    };

    let tags = match reader.read(file) {
        Ok(tags) => tags,
        Err(e) => {
            warn!(target: "scanner", path = absolute_path, error = %e, "Error reading tags");
            return None;
        }
    };

    let event = ScanEvent::from_tags(tags, absolute_path, extension);
    if event.is_none() {
        warn!(target: "scanner", path = absolute_path, "No track title");
    }
    event
}
