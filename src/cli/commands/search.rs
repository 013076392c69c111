//! Search command.

use tokio::runtime::Runtime;

use super::print_json;
use crate::library::Library;

/// Query all three search indexes and print the raw responses by index.
pub fn cmd_search(rt: &Runtime, library: &Library, query: &str) -> anyhow::Result<()> {
    let results = rt.block_on(library.search().search(query));
    if results.is_empty() {
        tracing::warn!(target: "search", query, "No search index answered");
    }
    print_json(&results)
}
