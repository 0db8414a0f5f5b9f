//! Sequential page cursor over a [`PageFetcher`].

use std::sync::Arc;

use crate::listing::{FetchError, ListingPage, PageFetcher};

/// Yields pages 2, 3, ... of a listing whose first page the caller already has.
pub(crate) struct PageCursor {
    pages: Arc<dyn PageFetcher>,
    listing_id: String,
    next_page: u32,
    expected_total: usize,
}

impl PageCursor {
    pub(crate) fn new(pages: Arc<dyn PageFetcher>, listing_id: &str, expected_total: usize) -> Self {
        Self {
            pages,
            listing_id: listing_id.to_string(),
            next_page: 2,
            expected_total,
        }
    }

    /// Fetch the next page on the blocking pool. The total observed on the
    /// first page stays authoritative; a different total is only logged.
    pub(crate) async fn next_page(&mut self) -> Result<ListingPage, FetchError> {
        let pages = Arc::clone(&self.pages);
        let listing_id = self.listing_id.clone();
        let page_number = self.next_page;
        let page = tokio::task::spawn_blocking(move || pages.fetch_page(&listing_id, page_number))
            .await
            .map_err(|e| FetchError::Task(e.to_string()))??;
        self.next_page += 1;

        if page.expected_total != self.expected_total {
            tracing::warn!(
                page = page_number,
                reported = page.expected_total,
                kept = self.expected_total,
                "listing total changed during run; keeping the first observed total"
            );
        }
        tracing::debug!(page = page_number, items = page.items.len(), "fetched listing page");
        Ok(page)
    }
}
