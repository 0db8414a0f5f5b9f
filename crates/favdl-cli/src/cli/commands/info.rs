//! `favdl info <id>` – print listing metadata and its first page.

use anyhow::Result;
use chrono::{DateTime, Local, TimeZone};
use favdl_core::config::FavdlConfig;
use std::fmt::Display;

use super::fetch_detail;

pub async fn run_info(cfg: &FavdlConfig, listing_id: &str) -> Result<()> {
    let detail = fetch_detail(cfg.listing_client(), listing_id).await?;
    println!("Title:   {}", detail.title);
    println!("Author:  {}", detail.author);
    println!("Items:   {}", detail.media_count);
    println!("Created: {}", format_created(detail.created_at, &Local));
    if !detail.cover_url.is_empty() {
        println!("Cover:   {}", detail.cover_url);
    }
    if detail.first_page.items.is_empty() {
        println!("No items on the first page.");
        return Ok(());
    }
    println!();
    println!("{:<14} {}", "ID", "TITLE");
    for item in &detail.first_page.items {
        println!("{:<14} {}", item.id, item.title.as_deref().unwrap_or("-"));
    }
    Ok(())
}

/// `%Y-%m-%d %H:%M:%S` in `tz`; the raw seconds if out of range.
fn format_created<Tz>(secs: i64, tz: &Tz) -> String
where
    Tz: TimeZone,
    Tz::Offset: Display,
{
    match DateTime::from_timestamp(secs, 0) {
        Some(utc) => utc
            .with_timezone(tz)
            .format("%Y-%m-%d %H:%M:%S")
            .to_string(),
        None => secs.to_string(),
    }
}
