//! Command-line interface for music-indexer.
//!
//! Every engine operation is a subcommand. Results are printed to stdout as
//! JSON; logs go to stderr.

mod commands;

pub use commands::{Cli, Commands, open_library, resolve_config, run_command};
