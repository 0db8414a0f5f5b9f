//! How a media item is turned into a downloader invocation.

use std::ffi::OsStr;
use std::path::Path;
use std::process::Command;

use crate::listing::MediaRef;

pub const DEFAULT_DOWNLOADER: &str = "annie";
pub const DEFAULT_MEDIA_URL_TEMPLATE: &str = "https://www.bilibili.com/video/{id}";

pub fn default_downloader_args() -> Vec<String> {
    vec!["-o".to_string(), "{output_dir}".to_string(), "{url}".to_string()]
}

/// Builds the external command that downloads one item into `output_dir`.
///
/// Stdio, process group and kill-on-drop are configured by the job, not here.
pub trait MediaFetcher: Send + Sync {
    fn command(&self, media: &MediaRef, output_dir: &Path) -> Command;
}

/// Runs a configurable external downloader (`annie` by default).
///
/// `args` may contain `{output_dir}` and `{url}` placeholders; the URL is
/// `url_template` with `{id}` replaced by the media id.
#[derive(Debug, Clone)]
pub struct ExternalDownloader {
    pub program: String,
    pub args: Vec<String>,
    pub url_template: String,
}

impl ExternalDownloader {
    pub fn new(program: impl Into<String>, args: Vec<String>, url_template: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args,
            url_template: url_template.into(),
        }
    }

    pub fn target_url(&self, media: &MediaRef) -> String {
        self.url_template.replace("{id}", &media.id)
    }

    /// Expanded argument list for one item.
    pub fn expand_args(&self, media: &MediaRef, output_dir: &Path) -> Vec<String> {
        let url = self.target_url(media);
        let dir = output_dir.to_string_lossy();
        self.args
            .iter()
            .map(|a| a.replace("{output_dir}", &dir).replace("{url}", &url))
            .collect()
    }
}

impl Default for ExternalDownloader {
    fn default() -> Self {
        Self::new(
            DEFAULT_DOWNLOADER,
            default_downloader_args(),
            DEFAULT_MEDIA_URL_TEMPLATE,
        )
    }
}

impl MediaFetcher for ExternalDownloader {
    fn command(&self, media: &MediaRef, output_dir: &Path) -> Command {
        let mut cmd = background_command(&self.program);
        cmd.args(self.expand_args(media, output_dir));
        cmd
    }
}

/// `Command` that does not pop up a console window on Windows.
pub fn background_command(program: impl AsRef<OsStr>) -> Command {
    let mut cmd = Command::new(program);
    configure_for_background(&mut cmd);
    cmd
}

#[cfg(windows)]
fn configure_for_background(cmd: &mut Command) {
    use std::os::windows::process::CommandExt;

    const CREATE_NO_WINDOW: u32 = 0x0800_0000;
    cmd.creation_flags(CREATE_NO_WINDOW);
}

#[cfg(not(windows))]
fn configure_for_background(_cmd: &mut Command) {}
