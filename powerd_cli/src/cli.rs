//! CLI argument definitions and shared statics.

use clap::{ArgAction, Parser, Subcommand};
use std::path::PathBuf;
use std::sync::OnceLock;

pub static FILE_GUARD: OnceLock<tracing_appender::non_blocking::WorkerGuard> = OnceLock::new();
/// Whether the user asked for JSON output (controls structured error output).
pub static JSON_MODE: OnceLock<bool> = OnceLock::new();

#[derive(Parser, Debug)]
#[command(name = "powerd", version, about = "Power-state sequencer for home-theater gear")]
pub struct Cli {
    /// Path to config TOML (typed)
    #[arg(long, value_name = "FILE", default_value = "etc/powerd.toml", global = true)]
    pub config: PathBuf,

    /// Log and report as JSON lines instead of pretty text
    #[arg(long, action = ArgAction::SetTrue, global = true)]
    pub json: bool,

    /// Console log level (error|warn|info|debug|trace)
    #[arg(long = "log-level", value_name = "LEVEL", default_value = "info", global = true)]
    pub log_level: String,

    /// Command to execute
    #[command(subcommand)]
    pub cmd: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Poll the signal source and drive the on/off sequences until Ctrl-C
    Run {
        /// Stop after this many polls
        #[arg(long, value_name = "N")]
        max_ticks: Option<u64>,
    },
    /// Print the persisted power state
    Status,
    /// Fire one configured command once
    Send {
        /// Name of a `[commands.<name>]` entry
        name: String,
    },
    /// Sample the signal source once
    SelfCheck,
}
