//! Listing data model.

/// Reference to one downloadable item in a listing.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MediaRef {
    /// Opaque identifier used to build the downloader's target URL.
    pub id: String,
    /// Display title, if the listing provided one.
    pub title: Option<String>,
}

impl MediaRef {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: None,
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }
}

/// One page of a listing. Immutable once returned by a fetcher.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListingPage {
    pub items: Vec<MediaRef>,
    /// Total number of items in the listing as reported by the remote side.
    pub expected_total: usize,
    /// 1-based page number.
    pub page_number: u32,
}

/// Listing metadata plus its first page.
#[derive(Debug, Clone)]
pub struct ListingDetail {
    pub title: String,
    pub author: String,
    pub cover_url: String,
    pub media_count: usize,
    /// Creation time, seconds since the Unix epoch.
    pub created_at: i64,
    pub first_page: ListingPage,
}
