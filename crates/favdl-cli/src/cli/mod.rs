//! CLI for favdl, the favorites listing downloader.

mod commands;
#[cfg(unix)]
mod control_socket;

use anyhow::Result;
use clap::{Parser, Subcommand, ValueEnum};
use clap_complete::Shell;
use favdl_core::config;
use favdl_core::listing::parse_listing_id;
use favdl_core::orchestrator::ScheduleMode;
use std::path::PathBuf;

use commands::{run_cancel, run_completions, run_download, run_info, DownloadArgs};

/// Top-level CLI for favdl.
#[derive(Debug, Parser)]
#[command(name = "favdl")]
#[command(about = "favdl: download every item of a favorites listing", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: CliCommand,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ModeArg {
    /// One item at a time, with per-item progress.
    Sequential,
    /// Several items at once; progress advances per finished item.
    Concurrent,
}

impl From<ModeArg> for ScheduleMode {
    fn from(mode: ModeArg) -> Self {
        match mode {
            ModeArg::Sequential => ScheduleMode::Sequential,
            ModeArg::Concurrent => ScheduleMode::Concurrent,
        }
    }
}

#[derive(Debug, Subcommand)]
pub enum CliCommand {
    /// Show listing metadata and the items of its first page.
    Info {
        /// Listing (favorites folder) ID or favorites URL containing `fid=`.
        id: String,
    },

    /// Download every item of a listing.
    Download {
        /// Listing (favorites folder) ID or favorites URL containing `fid=`.
        id: String,
        /// Directory for downloaded files (default: config `output_dir`, else ./videos).
        #[arg(long, value_name = "DIR")]
        output_dir: Option<PathBuf>,
        /// Scheduling mode (default from config).
        #[arg(long, value_enum)]
        mode: Option<ModeArg>,
        /// Concurrent mode: run at most N downloads at once (0 = unbounded).
        #[arg(long, value_name = "N")]
        jobs: Option<usize>,
        /// Kill and fail an item after SECS seconds.
        #[arg(long, value_name = "SECS")]
        timeout: Option<u64>,
        /// Exit non-zero if any item failed.
        #[arg(long)]
        strict: bool,
    },

    /// Cancel the download running in another favdl process.
    Cancel,

    /// Print shell completions to stdout.
    Completions {
        #[arg(value_enum)]
        shell: Shell,
    },
}

impl CliCommand {
    pub async fn run_from_args() -> Result<()> {
        let cli = Cli::parse();

        match cli.command {
            CliCommand::Completions { shell } => run_completions(shell),
            CliCommand::Cancel => run_cancel().await?,
            CliCommand::Info { id } => {
                let id = parse_listing_id(&id)?;
                let cfg = config::load_or_init()?;
                run_info(&cfg, &id).await?;
            }
            CliCommand::Download {
                id,
                output_dir,
                mode,
                jobs,
                timeout,
                strict,
            } => {
                let id = parse_listing_id(&id)?;
                let mut cfg = config::load_or_init()?;
                tracing::debug!("loaded config: {:?}", cfg);
                if let Some(jobs) = jobs {
                    cfg.max_concurrent_jobs = Some(jobs);
                }
                if timeout.is_some() {
                    cfg.job_timeout_secs = timeout;
                }
                if let Some(dir) = output_dir {
                    cfg.output_dir = Some(dir);
                }
                let args = DownloadArgs {
                    listing_id: id,
                    mode: mode.map(ScheduleMode::from).unwrap_or(cfg.mode),
                    strict,
                };
                run_download(&cfg, args).await?;
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests;
