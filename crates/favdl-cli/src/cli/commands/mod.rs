//! CLI command handlers, one file per command.

mod cancel;
mod completions;
mod download;
mod info;

pub use cancel::run_cancel;
pub use completions::run_completions;
pub use download::{run_download, DownloadArgs};
pub use info::run_info;

use anyhow::Result;
use favdl_core::listing::{BilibiliClient, ListingDetail};

/// Fetch listing metadata and page 1 off the async runtime (curl is blocking).
pub(crate) async fn fetch_detail(client: BilibiliClient, listing_id: &str) -> Result<ListingDetail> {
    let id = listing_id.to_string();
    let detail = tokio::task::spawn_blocking(move || client.fetch_detail(&id)).await??;
    Ok(detail)
}
