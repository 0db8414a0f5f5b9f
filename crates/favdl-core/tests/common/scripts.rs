//! Downloader stand-in: runs a shell snippet per media id inside the output dir.

use std::collections::HashMap;
use std::path::Path;

use favdl_core::listing::MediaRef;
use favdl_core::media_job::MediaFetcher;

pub struct Scripts {
    by_id: HashMap<String, String>,
    fallback: String,
}

impl Scripts {
    pub fn new() -> Self {
        Self {
            by_id: HashMap::new(),
            fallback: "exit 0".to_string(),
        }
    }

    pub fn with(mut self, id: &str, script: &str) -> Self {
        self.by_id.insert(id.to_string(), script.to_string());
        self
    }

    /// Script for ids without an explicit entry. `$ID` is set for every script.
    pub fn fallback(mut self, script: &str) -> Self {
        self.fallback = script.to_string();
        self
    }
}

impl MediaFetcher for Scripts {
    fn command(&self, media: &MediaRef, output_dir: &Path) -> std::process::Command {
        let script = self.by_id.get(&media.id).unwrap_or(&self.fallback);
        let mut cmd = std::process::Command::new("sh");
        cmd.arg("-c")
            .arg(script)
            .env("ID", &media.id)
            .current_dir(output_dir);
        cmd
    }
}
