//! Parse the listing endpoint's JSON envelope.

use serde::Deserialize;

use super::error::FetchError;
use super::types::{ListingDetail, ListingPage, MediaRef};

#[derive(Debug, Deserialize)]
struct Envelope {
    code: i64,
    #[serde(default)]
    message: String,
    data: Option<Data>,
}

#[derive(Debug, Deserialize)]
struct Data {
    info: Option<Info>,
    #[serde(default)]
    medias: Option<Vec<Media>>,
}

#[derive(Debug, Deserialize)]
struct Info {
    #[serde(default)]
    title: String,
    #[serde(default)]
    cover: String,
    upper: Option<Upper>,
    media_count: usize,
    #[serde(default)]
    ctime: i64,
}

#[derive(Debug, Deserialize)]
struct Upper {
    #[serde(default)]
    name: String,
}

#[derive(Debug, Deserialize)]
struct Media {
    bvid: String,
    #[serde(default)]
    title: Option<String>,
}

fn parse_data(body: &[u8]) -> Result<Data, FetchError> {
    let envelope: Envelope = serde_json::from_slice(body)?;
    if envelope.code != 0 {
        return Err(FetchError::Api {
            code: envelope.code,
            message: envelope.message,
        });
    }
    envelope
        .data
        .ok_or_else(|| FetchError::Malformed("response has no data".to_string()))
}

fn media_refs(medias: Option<Vec<Media>>) -> Vec<MediaRef> {
    medias
        .unwrap_or_default()
        .into_iter()
        .map(|m| MediaRef {
            id: m.bvid,
            title: m.title,
        })
        .collect()
}

/// Parse one page of the listing. `medias: null` is an empty page.
pub(crate) fn parse_page(body: &[u8], page_number: u32) -> Result<ListingPage, FetchError> {
    let data = parse_data(body)?;
    let info = data
        .info
        .ok_or_else(|| FetchError::Malformed("response has no info".to_string()))?;
    Ok(ListingPage {
        items: media_refs(data.medias),
        expected_total: info.media_count,
        page_number,
    })
}

/// Parse the first page together with the listing's metadata.
pub(crate) fn parse_detail(body: &[u8]) -> Result<ListingDetail, FetchError> {
    let data = parse_data(body)?;
    let info = data
        .info
        .ok_or_else(|| FetchError::Malformed("response has no info".to_string()))?;
    let first_page = ListingPage {
        items: media_refs(data.medias),
        expected_total: info.media_count,
        page_number: 1,
    };
    Ok(ListingDetail {
        title: info.title,
        author: info.upper.map(|u| u.name).unwrap_or_default(),
        cover_url: info.cover,
        media_count: info.media_count,
        created_at: info.ctime,
        first_page,
    })
}
