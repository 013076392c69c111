//! Configuration system using TOML files.
//!
//! Config is stored in the OS-standard config directory unless a path is
//! given on the command line:
//! - Windows: %APPDATA%\music-indexer\config.toml
//! - macOS: ~/Library/Application Support/music-indexer/config.toml
//! - Linux: ~/.config/music-indexer/config.toml
//!
//! Every section is optional; command-line flags and their environment
//! variables override whatever the file provides.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::search::DEFAULT_BATCH_SIZE;

/// Database filename inside the persistence directory.
pub const DB_FILE_NAME: &str = "library.redb";

/// Application configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Source tree and storage locations
    pub library: LibraryConfig,

    /// Search mirror settings
    pub search: SearchConfig,
}

/// Library settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LibraryConfig {
    /// Root of the audio tree to scan
    pub music_directory: Option<PathBuf>,

    /// Directory holding the ordered store
    pub persistence_directory: Option<PathBuf>,

    /// File extensions picked up by the scanner (lowercase, no dot)
    pub extensions: Vec<String>,
}

impl Default for LibraryConfig {
    fn default() -> Self {
        Self {
            music_directory: None,
            persistence_directory: None,
            extensions: vec!["mp3".to_string(), "m4a".to_string()],
        }
    }
}

impl LibraryConfig {
    /// Path of the store file, if a persistence directory is configured.
    pub fn db_path(&self) -> Option<PathBuf> {
        self.persistence_directory
            .as_ref()
            .map(|dir| dir.join(DB_FILE_NAME))
    }
}

/// Search mirror settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    /// Meilisearch base URL; the mirror is disabled when unset
    pub address: Option<String>,

    /// Bearer token for the search service
    pub api_key: Option<String>,

    /// Documents buffered per index before a flush
    pub batch_size: usize,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            address: None,
            api_key: None,
            batch_size: DEFAULT_BATCH_SIZE,
        }
    }
}

impl Config {
    /// Check that the configured directories exist and the batch size is usable.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let music = self
            .library
            .music_directory
            .as_deref()
            .ok_or(ConfigError::Missing("music_directory"))?;
        require_dir("music_directory", music)?;

        let persistence = self
            .library
            .persistence_directory
            .as_deref()
            .ok_or(ConfigError::Missing("persistence_directory"))?;
        require_dir("persistence_directory", persistence)?;

        if self.library.extensions.is_empty() {
            return Err(ConfigError::Invalid(
                "extensions",
                "at least one extension is required".to_string(),
            ));
        }

        if self.search.batch_size == 0 {
            return Err(ConfigError::Invalid(
                "batch_size",
                "must be greater than zero".to_string(),
            ));
        }

        Ok(())
    }

    /// Extensions normalised to lowercase without a leading dot.
    pub fn normalized_extensions(&self) -> Vec<String> {
        self.library
            .extensions
            .iter()
            .map(|ext| ext.trim_start_matches('.').to_lowercase())
            .collect()
    }
}

fn require_dir(field: &'static str, path: &Path) -> Result<(), ConfigError> {
    match std::fs::metadata(path) {
        Ok(meta) if meta.is_dir() => Ok(()),
        _ => Err(ConfigError::NotADirectory(field, path.to_path_buf())),
    }
}

// ============================================================================
// Config File Operations
// ============================================================================

/// Get the config directory path
pub fn config_dir() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("music-indexer"))
}

/// Get the full path to the default config file
pub fn config_path() -> Option<PathBuf> {
    config_dir().map(|d| d.join("config.toml"))
}

/// Load configuration from `path`, or from the default location.
///
/// A missing file yields the defaults. A file that exists but cannot be
/// read or parsed is an error, since silently ignoring it would scan the
/// wrong tree.
pub fn load(path: Option<&Path>) -> Result<Config, ConfigError> {
    let path = match path {
        Some(p) => p.to_path_buf(),
        None => match config_path() {
            Some(p) => p,
            None => {
                tracing::warn!("Could not determine config directory, using defaults");
                return Ok(Config::default());
            }
        },
    };

    if !path.exists() {
        tracing::info!("No config file found at {:?}, using defaults", path);
        return Ok(Config::default());
    }

    let contents =
        std::fs::read_to_string(&path).map_err(|e| ConfigError::Read(path.clone(), e))?;
    let config = toml::from_str(&contents).map_err(|e| ConfigError::Parse(path.clone(), e))?;
    tracing::info!("Loaded config from {:?}", path);
    Ok(config)
}

// ============================================================================
// Error Types
// ============================================================================

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {0}: {1}")]
    Read(PathBuf, std::io::Error),

    #[error("Failed to parse config file {0}: {1}")]
    Parse(PathBuf, toml::de::Error),

    #[error("{0} is not set")]
    Missing(&'static str),

    #[error("{0} must be an existing directory: {1}")]
    NotADirectory(&'static str, PathBuf),

    #[error("Invalid {0}: {1}")]
    Invalid(&'static str, String),
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_serializes() {
        let config = Config::default();
        let toml = toml::to_string_pretty(&config).unwrap();
        assert!(toml.contains("[library]"));
        assert!(toml.contains("[search]"));
    }

    #[test]
    fn test_partial_config_uses_defaults() {
        let toml = r#"
[search]
address = "http://127.0.0.1:7700"
"#;
        let config: Config = toml::from_str(toml).unwrap();

        assert_eq!(
            config.search.address.as_deref(),
            Some("http://127.0.0.1:7700")
        );
        assert_eq!(config.search.batch_size, DEFAULT_BATCH_SIZE);
        assert_eq!(config.library.extensions, vec!["mp3", "m4a"]);
        assert!(config.library.music_directory.is_none());
    }

    #[test]
    fn test_load_missing_file_returns_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = load(Some(&dir.path().join("absent.toml"))).unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_load_malformed_file_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[library\nmusic_directory = ").unwrap();
        assert!(matches!(load(Some(&path)), Err(ConfigError::Parse(..))));
    }

    #[test]
    fn test_validate_requires_directories() {
        let config = Config::default();
        assert!(matches!(
            config.validate(),
            Err(ConfigError::Missing("music_directory"))
        ));

        let dir = tempfile::tempdir().unwrap();
        let mut config = Config::default();
        config.library.music_directory = Some(dir.path().to_path_buf());
        config.library.persistence_directory = Some(dir.path().join("nope"));
        assert!(matches!(
            config.validate(),
            Err(ConfigError::NotADirectory("persistence_directory", _))
        ));

        config.library.persistence_directory = Some(dir.path().to_path_buf());
        assert!(config.validate().is_ok());
        assert_eq!(config.library.db_path(), Some(dir.path().join(DB_FILE_NAME)));
    }

    #[test]
    fn test_validate_rejects_zero_batch_size() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = Config::default();
        config.library.music_directory = Some(dir.path().to_path_buf());
        config.library.persistence_directory = Some(dir.path().to_path_buf());
        config.search.batch_size = 0;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::Invalid("batch_size", _))
        ));
    }

    #[test]
    fn test_normalized_extensions() {
        let mut config = Config::default();
        config.library.extensions = vec![".MP3".to_string(), "Flac".to_string()];
        assert_eq!(config.normalized_extensions(), vec!["mp3", "flac"]);
    }
}
