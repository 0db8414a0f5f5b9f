use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use crate::listing::{BilibiliClient, DEFAULT_API_BASE};
use crate::media_job::{
    default_downloader_args, ExternalDownloader, DEFAULT_DOWNLOADER, DEFAULT_MEDIA_URL_TEMPLATE,
};
use crate::orchestrator::{RunSettings, ScheduleMode};

/// Global configuration loaded from `~/.config/favdl/config.toml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FavdlConfig {
    /// External downloader executable (looked up on PATH).
    pub downloader: String,
    /// Downloader arguments; `{output_dir}` and `{url}` are substituted per item.
    pub downloader_args: Vec<String>,
    /// Item URL handed to the downloader; `{id}` is the media id.
    pub media_url_template: String,
    /// Listing endpoint.
    pub api_base: String,
    /// Items per listing page.
    pub page_size: u32,
    /// Scheduling mode: "sequential" or "concurrent" (default).
    #[serde(default)]
    pub mode: ScheduleMode,
    /// Maximum downloads running at once in concurrent mode (missing or 0 = unbounded).
    #[serde(default)]
    pub max_concurrent_jobs: Option<usize>,
    /// Per-item timeout in seconds (missing = none). Expired items count as failed.
    #[serde(default)]
    pub job_timeout_secs: Option<u64>,
    /// Default output directory (missing = `./videos`).
    #[serde(default)]
    pub output_dir: Option<PathBuf>,
}

impl Default for FavdlConfig {
    fn default() -> Self {
        Self {
            downloader: DEFAULT_DOWNLOADER.to_string(),
            downloader_args: default_downloader_args(),
            media_url_template: DEFAULT_MEDIA_URL_TEMPLATE.to_string(),
            api_base: DEFAULT_API_BASE.to_string(),
            page_size: 20,
            mode: ScheduleMode::Concurrent,
            max_concurrent_jobs: Some(4),
            job_timeout_secs: None,
            output_dir: None,
        }
    }
}

impl FavdlConfig {
    pub fn run_settings(&self) -> RunSettings {
        RunSettings {
            max_concurrent_jobs: self.max_concurrent_jobs.filter(|n| *n > 0),
            job_timeout: self.job_timeout_secs.map(Duration::from_secs),
        }
    }

    pub fn downloader(&self) -> ExternalDownloader {
        ExternalDownloader::new(
            self.downloader.clone(),
            self.downloader_args.clone(),
            self.media_url_template.clone(),
        )
    }

    pub fn listing_client(&self) -> BilibiliClient {
        BilibiliClient::new(self.api_base.clone(), self.page_size)
    }

    /// Configured output directory, or `videos` under the current directory.
    pub fn output_dir_or_default(&self) -> Result<PathBuf> {
        match &self.output_dir {
            Some(dir) => Ok(dir.clone()),
            None => Ok(std::env::current_dir()?.join("videos")),
        }
    }
}

pub fn config_path() -> Result<PathBuf> {
    let xdg_dirs = xdg::BaseDirectories::with_prefix("favdl")?;
    Ok(xdg_dirs.place_config_file("config.toml")?)
}

/// Load configuration from disk, creating a default file if none exists.
pub fn load_or_init() -> Result<FavdlConfig> {
    let path = config_path()?;
    if !path.exists() {
        let default_cfg = FavdlConfig::default();
        let toml = toml::to_string_pretty(&default_cfg)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, toml)?;
        tracing::info!("created default config at {}", path.display());
        return Ok(default_cfg);
    }

    let data = fs::read_to_string(&path)?;
    let cfg: FavdlConfig = toml::from_str(&data)?;
    Ok(cfg)
}
