//! Library scan command.

use tokio::runtime::Runtime;

use super::print_json;
use crate::error::Error;
use crate::library::{Library, ScanRequest};

/// Rebuild the index from the music directory and print the scan summary.
pub fn cmd_scan(rt: &Runtime, library: &Library) -> anyhow::Result<()> {
    // request_scan spawns onto the runtime, so it must run inside it.
    let request = rt.block_on(async { library.request_scan() });
    eprintln!("{}", request.message());

    if let ScanRequest::Started(handle) = request {
        let summary = rt
            .block_on(handle)
            .map_err(|e| Error::TaskJoin(e.to_string()))??;
        print_json(&summary)?;
    }
    Ok(())
}
