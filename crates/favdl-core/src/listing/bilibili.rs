//! HTTP client for the favorites listing endpoint.
//!
//! Blocking (libcurl easy handle). The orchestrator calls it from
//! `spawn_blocking`.

use std::time::Duration;

use super::error::FetchError;
use super::parse;
use super::types::{ListingDetail, ListingPage};
use super::PageFetcher;

pub const DEFAULT_API_BASE: &str =
    "https://api.bilibili.com/medialist/gateway/base/spaceDetail";

const USER_AGENT: &str =
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0 Safari/537.36";

#[derive(Debug, Clone)]
pub struct BilibiliClient {
    api_base: String,
    page_size: u32,
}

impl BilibiliClient {
    pub fn new(api_base: impl Into<String>, page_size: u32) -> Self {
        Self {
            api_base: api_base.into(),
            page_size: page_size.max(1),
        }
    }

    /// URL of one listing page.
    pub fn page_url(&self, listing_id: &str, page_number: u32) -> Result<String, FetchError> {
        let page = page_number.to_string();
        let size = self.page_size.to_string();
        let url = url::Url::parse_with_params(
            &self.api_base,
            &[
                ("media_id", listing_id),
                ("pn", page.as_str()),
                ("ps", size.as_str()),
                ("keyword", ""),
                ("order", "mtime"),
                ("type", "0"),
                ("tid", "0"),
                ("jsonp", "jsonp"),
            ],
        )
        .map_err(|e| FetchError::Malformed(format!("invalid api base {}: {}", self.api_base, e)))?;
        Ok(url.into())
    }

    /// Fetch listing metadata and the first page.
    pub fn fetch_detail(&self, listing_id: &str) -> Result<ListingDetail, FetchError> {
        let body = self.get(&self.page_url(listing_id, 1)?)?;
        parse::parse_detail(&body)
    }

    fn get(&self, url: &str) -> Result<Vec<u8>, FetchError> {
        let mut body = Vec::new();

        let mut easy = curl::easy::Easy::new();
        easy.url(url)?;
        easy.get(true)?;
        easy.follow_location(true)?;
        easy.useragent(USER_AGENT)?;
        easy.connect_timeout(Duration::from_secs(15))?;
        easy.timeout(Duration::from_secs(30))?;

        {
            let mut transfer = easy.transfer();
            transfer.write_function(|data| {
                body.extend_from_slice(data);
                Ok(data.len())
            })?;
            transfer.perform()?;
        }

        let code = easy.response_code()?;
        if !(200..300).contains(&code) {
            return Err(FetchError::Status(code));
        }
        tracing::debug!(url, bytes = body.len(), "listing page fetched");
        Ok(body)
    }
}

impl Default for BilibiliClient {
    fn default() -> Self {
        Self::new(DEFAULT_API_BASE, 20)
    }
}

impl PageFetcher for BilibiliClient {
    fn fetch_page(&self, listing_id: &str, page_number: u32) -> Result<ListingPage, FetchError> {
        let body = self.get(&self.page_url(listing_id, page_number)?)?;
        parse::parse_page(&body, page_number)
    }
}
