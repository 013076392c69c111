//! CLI command definitions and dispatch.
//!
//! Each group of subcommands lives in its own submodule:
//! - `scan`: Run a full library scan
//! - `browse`: Album, artist and track reads against the index
//! - `search`: Query the search mirror

mod browse;
mod scan;
mod search;

use anyhow::Context;
use clap::{Parser, Subcommand};
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::runtime::Runtime;

use crate::config::{self, Config};
use crate::db::RedbStore;
use crate::index::IndexEngine;
use crate::library::Library;
use crate::metadata::LoftyTagReader;
use crate::search::{DisabledSearch, MeilisearchClient, SearchBackend, SearchSync};

pub use browse::{cmd_album, cmd_albums, cmd_artist, cmd_artists, cmd_track};
pub use scan::cmd_scan;
pub use search::cmd_search;

/// Music library indexer
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Config file (default: <config dir>/music-indexer/config.toml)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Root of the music tree to scan
    #[arg(long, env = "MUSIC_DIRECTORY", global = true)]
    pub music_dir: Option<PathBuf>,

    /// Directory holding the index database
    #[arg(long, env = "PERSISTENCE_DIRECTORY", global = true)]
    pub data_dir: Option<PathBuf>,

    /// Meilisearch address; the search mirror is disabled without one
    #[arg(long, env = "MEILISEARCH_ADDRESS", global = true)]
    pub search_url: Option<String>,

    /// Meilisearch API key
    #[arg(long, env = "MEILISEARCH_API_KEY", global = true, hide_env_values = true)]
    pub search_key: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands
#[derive(Subcommand, Debug, PartialEq, Eq)]
pub enum Commands {
    /// Rebuild the index from the music directory
    Scan,
    /// List all albums
    Albums,
    /// Show one album with its tracks
    Album {
        /// Album id
        id: String,
    },
    /// List all artists
    Artists,
    /// Show one artist with its albums
    Artist {
        /// Artist id
        id: String,
    },
    /// Show one track
    Track {
        /// Track id
        id: String,
    },
    /// Search tracks, albums and artists
    Search {
        /// Query text
        query: String,
    },
}

/// Load the config file and apply command-line overrides.
pub fn resolve_config(cli: &Cli) -> anyhow::Result<Config> {
    let mut config = config::load(cli.config.as_deref())?;

    if let Some(dir) = &cli.music_dir {
        config.library.music_directory = Some(dir.clone());
    }
    if let Some(dir) = &cli.data_dir {
        config.library.persistence_directory = Some(dir.clone());
    }
    if let Some(url) = &cli.search_url {
        config.search.address = Some(url.clone());
    }
    if let Some(key) = &cli.search_key {
        config.search.api_key = Some(key.clone());
    }

    config.validate()?;
    Ok(config)
}

/// Wire the store, search mirror and tag reader into a [`Library`].
pub fn open_library(config: &Config) -> anyhow::Result<Library> {
    let source_dir = config
        .library
        .music_directory
        .clone()
        .context("music_directory is not set")?;
    let db_path = config
        .library
        .db_path()
        .context("persistence_directory is not set")?;

    let store = match RedbStore::open(&db_path) {
        Ok(store) => store,
        // Only one process can hold the index; that process is scanning.
        Err(e) if e.is_store_locked() => anyhow::bail!("scan in progress: {e}"),
        Err(e) => {
            return Err(e)
                .with_context(|| format!("Failed to open index at {}", db_path.display()));
        }
    };

    let backend: Arc<dyn SearchBackend> = match &config.search.address {
        Some(address) => Arc::new(MeilisearchClient::new(
            address.as_str(),
            config.search.api_key.clone(),
        )?),
        None => {
            tracing::info!(target: "search", "No search address configured, mirror disabled");
            Arc::new(DisabledSearch)
        }
    };

    Ok(Library::new(
        source_dir,
        config.normalized_extensions(),
        IndexEngine::new(Arc::new(store)),
        Arc::new(SearchSync::new(backend, config.search.batch_size)),
        Arc::new(LoftyTagReader),
    ))
}

/// Run the specified CLI command.
pub fn run_command(cli: &Cli) -> anyhow::Result<()> {
    let config = resolve_config(cli)?;
    let library = open_library(&config)?;

    match &cli.command {
        Commands::Scan => cmd_scan(&Runtime::new()?, &library),
        Commands::Albums => cmd_albums(&library),
        Commands::Album { id } => cmd_album(&library, id),
        Commands::Artists => cmd_artists(&library),
        Commands::Artist { id } => cmd_artist(&library, id),
        Commands::Track { id } => cmd_track(&library, id),
        Commands::Search { query } => cmd_search(&Runtime::new()?, &library, query),
    }
}

// ============================================================================
// Shared helper functions
// ============================================================================

/// Print a value to stdout as pretty JSON.
pub(crate) fn print_json<T: Serialize + ?Sized>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
