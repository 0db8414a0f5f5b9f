//! Scripted listing pages.

use std::collections::HashMap;
use std::sync::Mutex;

use favdl_core::listing::{FetchError, ListingPage, MediaRef, PageFetcher};

/// Serves pre-built pages by number. Pages not configured come back empty;
/// pages configured as failures return `FetchError::Malformed`.
pub struct FakePages {
    total: usize,
    pages: HashMap<u32, Result<Vec<&'static str>, String>>,
    calls: Mutex<Vec<u32>>,
}

impl FakePages {
    pub fn new(total: usize) -> Self {
        Self {
            total,
            pages: HashMap::new(),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn page(mut self, number: u32, ids: &[&'static str]) -> Self {
        self.pages.insert(number, Ok(ids.to_vec()));
        self
    }

    pub fn failing(mut self, number: u32, message: &str) -> Self {
        self.pages.insert(number, Err(message.to_string()));
        self
    }

    /// Page numbers requested so far, in order.
    pub fn calls(&self) -> Vec<u32> {
        self.calls.lock().unwrap().clone()
    }
}

impl PageFetcher for FakePages {
    fn fetch_page(&self, _listing_id: &str, page_number: u32) -> Result<ListingPage, FetchError> {
        self.calls.lock().unwrap().push(page_number);
        match self.pages.get(&page_number) {
            Some(Err(msg)) => Err(FetchError::Malformed(msg.clone())),
            Some(Ok(ids)) => Ok(ListingPage {
                items: ids.iter().map(|id| MediaRef::new(*id)).collect(),
                expected_total: self.total,
                page_number,
            }),
            None => Ok(ListingPage {
                items: Vec::new(),
                expected_total: self.total,
                page_number,
            }),
        }
    }
}

pub fn refs(ids: &[&str]) -> Vec<MediaRef> {
    ids.iter().map(|id| MediaRef::new(*id)).collect()
}
