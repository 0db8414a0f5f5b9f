pub mod config;
pub mod control;
pub mod listing;
pub mod logging;
pub mod media_job;
pub mod orchestrator;
pub mod progress_line;
