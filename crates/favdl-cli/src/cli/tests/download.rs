//! Tests for the download subcommand.

use super::parse;
use crate::cli::{Cli, CliCommand, ModeArg};
use clap::Parser;
use favdl_core::orchestrator::ScheduleMode;

#[test]
fn cli_parse_download_defaults() {
    match parse(&["favdl", "download", "123456"]) {
        CliCommand::Download {
            id,
            output_dir,
            mode,
            jobs,
            timeout,
            strict,
        } => {
            assert_eq!(id, "123456");
            assert!(output_dir.is_none());
            assert!(mode.is_none());
            assert!(jobs.is_none());
            assert!(timeout.is_none());
            assert!(!strict);
        }
        _ => panic!("expected Download"),
    }
}

#[test]
fn cli_parse_download_all_flags() {
    match parse(&[
        "favdl",
        "download",
        "42",
        "--output-dir",
        "/tmp/v",
        "--mode",
        "sequential",
        "--jobs",
        "3",
        "--timeout",
        "600",
        "--strict",
    ]) {
        CliCommand::Download {
            id,
            output_dir,
            mode,
            jobs,
            timeout,
            strict,
        } => {
            assert_eq!(id, "42");
            assert_eq!(output_dir.as_deref(), Some(std::path::Path::new("/tmp/v")));
            assert_eq!(mode, Some(ModeArg::Sequential));
            assert_eq!(jobs, Some(3));
            assert_eq!(timeout, Some(600));
            assert!(strict);
        }
        _ => panic!("expected Download with flags"),
    }
}

#[test]
fn cli_parse_download_rejects_unknown_mode() {
    assert!(Cli::try_parse_from(["favdl", "download", "1", "--mode", "parallel"]).is_err());
}

#[test]
fn cli_parse_download_requires_id() {
    assert!(Cli::try_parse_from(["favdl", "download"]).is_err());
}

#[test]
fn mode_arg_maps_to_schedule_mode() {
    assert_eq!(ScheduleMode::from(ModeArg::Sequential), ScheduleMode::Sequential);
    assert_eq!(ScheduleMode::from(ModeArg::Concurrent), ScheduleMode::Concurrent);
}
