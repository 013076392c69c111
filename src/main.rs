//! Music Indexer - scans a music tree into an ordered key-value index.
//!
//! Each audio file becomes a track record plus album and artist records
//! under composite, prefix-structured keys, so every listing is an ordered
//! prefix scan. Derived documents are mirrored into Meilisearch in batches.
//! All operations are exposed as CLI subcommands.

pub mod cli;
pub mod config;
pub mod db;
pub mod error;
pub mod index;
pub mod library;
pub mod metadata;
pub mod model;
pub mod scanner;
pub mod search;
#[cfg(test)]
pub mod test_utils;

use clap::Parser;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

fn main() -> anyhow::Result<()> {
    let args = cli::Cli::parse();

    // Logs go to stderr so stdout stays valid JSON
    tracing_subscriber::registry()
        .with(fmt::layer().with_target(true).with_writer(std::io::stderr))
        .with(EnvFilter::from_default_env().add_directive("music_indexer=info".parse()?))
        .init();

    cli::run_command(&args)
}
