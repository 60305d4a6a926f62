//! CLI argument definitions and shared statics.

use clap::{ArgAction, Parser, Subcommand};
use std::path::PathBuf;
use std::sync::OnceLock;

pub static FILE_GUARD: OnceLock<tracing_appender::non_blocking::WorkerGuard> = OnceLock::new();
/// Whether the user asked for JSON output (controls structured error output).
pub static JSON_MODE: OnceLock<bool> = OnceLock::new();

#[derive(Parser, Debug)]
#[command(name = "radar", version, about = "Sweeping ultrasonic radar controller")]
pub struct Cli {
    /// Path to config TOML (typed)
    #[arg(long, value_name = "FILE", default_value = "etc/radar_config.toml")]
    pub config: PathBuf,

    /// Log as JSON lines instead of pretty
    #[arg(long, action = ArgAction::SetTrue)]
    pub json: bool,

    /// Console log level (error|warn|info|debug|trace)
    #[arg(long = "log-level", value_name = "LEVEL", default_value = "info")]
    pub log_level: String,

    /// Command to execute
    #[command(subcommand)]
    pub cmd: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Sweep and stream telemetry to one TCP consumer until interrupted
    Run {
        /// Listen host (overrides config and RADAR_TCP_HOST)
        #[arg(long, value_name = "HOST")]
        host: Option<String>,
        /// Listen port (overrides config and RADAR_TCP_PORT)
        #[arg(long, value_name = "PORT")]
        port: Option<u16>,
        /// Give up if no consumer connects within this many ms
        #[arg(long, value_name = "MS")]
        accept_timeout_ms: Option<u64>,
    },
    /// Quick health check: centre the servo, take one reading, release
    SelfCheck,
}
