//! Audio file tag reading.
//!
//! The scanner only needs four fields from a file, so tag extraction sits
//! behind the [`TagReader`] trait. Production code uses [`LoftyTagReader`]
//! (format-independent access via the lofty crate); tests substitute readers
//! that parse plain-text fixture files.

use lofty::file::TaggedFileExt;
use lofty::probe::Probe;
use lofty::tag::Accessor;
use std::fs::File;
use std::io::BufReader;

/// Tags extracted from one audio file.
///
/// Missing tags are empty strings and a missing track number is 0, so the
/// scanner can apply its empty-title and empty-album rules uniformly.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TrackTags {
    pub album: String,
    pub artist: String,
    pub title: String,
    pub track_number: u32,
}

/// Tag extraction failure.
#[derive(Debug, thiserror::Error)]
pub enum TagError {
    #[error("Failed to probe file: {0}")]
    Probe(#[from] std::io::Error),

    #[error("Failed to read tags: {0}")]
    Read(String),
}

/// Reads tags from an opened audio file.
pub trait TagReader: Send + Sync {
    fn read(&self, file: File) -> Result<TrackTags, TagError>;
}

/// [`TagReader`] backed by lofty.
#[derive(Debug, Clone, Copy, Default)]
pub struct LoftyTagReader;

impl TagReader for LoftyTagReader {
    fn read(&self, file: File) -> Result<TrackTags, TagError> {
        let tagged_file = Probe::new(BufReader::new(file))
            .guess_file_type()?
            .read()
            .map_err(|e| TagError::Read(e.to_string()))?;

        // Get the primary tag, or fall back to the first available tag
        let Some(tag) = tagged_file
            .primary_tag()
            .or_else(|| tagged_file.first_tag())
        else {
            return Ok(TrackTags::default());
        };

        Ok(TrackTags {
            album: tag.album().map(|s| s.to_string()).unwrap_or_default(),
            artist: tag.artist().map(|s| s.to_string()).unwrap_or_default(),
            title: tag.title().map(|s| s.to_string()).unwrap_or_default(),
            track_number: tag.track().unwrap_or(0),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_read_non_audio_file_returns_error() {
        let mut file = NamedTempFile::new().expect("Failed to create temp file");
        writeln!(file, "This is just some text, not music.").expect("Failed to write to temp file");

        let handle = File::open(file.path()).unwrap();
        let result = LoftyTagReader.read(handle);

        assert!(result.is_err());
    }

    #[test]
    fn test_read_empty_file_returns_error() {
        let file = NamedTempFile::new().expect("Failed to create temp file");
        let handle = File::open(file.path()).unwrap();
        assert!(LoftyTagReader.read(handle).is_err());
    }

    #[test]
    fn test_default_tags_are_empty() {
        let tags = TrackTags::default();
        assert!(tags.title.is_empty());
        assert_eq!(tags.track_number, 0);
    }
}
