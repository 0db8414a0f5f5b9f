//! Remote favorites listing: data model, page fetcher interface and the
//! HTTP implementation.
//!
//! The orchestrator only depends on [`PageFetcher`]; it does not know about
//! the remote service's JSON format.

mod bilibili;
mod error;
mod id;
mod parse;
mod types;

pub use bilibili::{BilibiliClient, DEFAULT_API_BASE};
pub use error::{FetchError, InvalidListingId};
pub use id::parse_listing_id;
pub use types::{ListingDetail, ListingPage, MediaRef};

/// Retrieves one page of a listing. Blocking; may perform network I/O.
pub trait PageFetcher: Send + Sync {
    fn fetch_page(&self, listing_id: &str, page_number: u32) -> Result<ListingPage, FetchError>;
}
