//! CLI argument definitions using clap.

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// csi-rx - cycle-stepped model of a MIPI CSI-2 receive pipeline
#[derive(Parser, Debug)]
#[command(
    name = "csi-rx",
    author,
    version,
    about = "Cycle-stepped MIPI CSI-2 receive pipeline",
    long_about = "Deskews multi-lane CSI-2 samples, captures the head of each packet and a \n\
                  decimated image, and hands snapshots of both buffers to the configured sinks.\n\n\
                  Samples come from the built-in frame generator or a recorded lane trace."
)]
pub struct Cli {
    /// Increase logging verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true, env = "CSI_RX_VERBOSE")]
    pub verbose: u8,

    /// Suppress all output except warnings and errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Log output format
    #[arg(
        long,
        value_enum,
        default_value = "pretty",
        global = true,
        env = "CSI_RX_LOG_FORMAT"
    )]
    pub log_format: LogFormat,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Step the receiver over the configured source
    Run(RunArgs),

    /// Validate configuration file without running
    Validate(ValidateArgs),

    /// Display receiver geometry, latency and buffer sizes
    Info(InfoArgs),

    /// Write the configured source to a lane trace file
    Record(RecordArgs),
}

/// Arguments for the `run` command
#[derive(Parser, Debug, Clone)]
pub struct RunArgs {
    /// Path to configuration file (TOML or JSON)
    #[arg(
        short,
        long,
        default_value = "receiver.toml",
        env = "CSI_RX_CONFIG"
    )]
    pub config: PathBuf,

    /// Replay this lane trace instead of the configured source
    #[arg(long, env = "CSI_RX_TRACE")]
    pub trace: Option<PathBuf>,

    /// Maximum number of cycles to step (0 = until the source ends)
    #[arg(long, default_value = "0", env = "CSI_RX_MAX_CYCLES")]
    pub max_cycles: u64,

    /// Take a snapshot every N cycles (0 = only at the end)
    #[arg(long, default_value = "0", env = "CSI_RX_SNAPSHOT_EVERY")]
    pub snapshot_every: u64,

    /// Validate configuration and exit without running
    #[arg(long)]
    pub dry_run: bool,

    /// Snapshot channel capacity between receiver and dispatcher
    #[arg(long, default_value = "16", env = "CSI_RX_BUFFER_SIZE")]
    pub buffer_size: usize,

    /// Metrics server port (0 = disabled)
    #[arg(long, default_value = "0", env = "CSI_RX_METRICS_PORT")]
    pub metrics_port: u16,
}

/// Arguments for the `validate` command
#[derive(Parser, Debug)]
pub struct ValidateArgs {
    /// Path to configuration file to validate
    #[arg(short, long, default_value = "receiver.toml")]
    pub config: PathBuf,

    /// Output validation result as JSON
    #[arg(long)]
    pub json: bool,
}

/// Arguments for the `info` command
#[derive(Parser, Debug)]
pub struct InfoArgs {
    /// Path to configuration file
    #[arg(short, long, default_value = "receiver.toml")]
    pub config: PathBuf,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

/// Arguments for the `record` command
#[derive(Parser, Debug)]
pub struct RecordArgs {
    /// Path to configuration file
    #[arg(short, long, default_value = "receiver.toml")]
    pub config: PathBuf,

    /// Trace file to write
    #[arg(short, long)]
    pub output: PathBuf,

    /// Maximum number of samples to write (0 = whole source)
    #[arg(long, default_value = "0")]
    pub max_cycles: u64,
}

/// Log output format
#[derive(ValueEnum, Clone, Debug, Default)]
pub enum LogFormat {
    /// JSON structured logging
    Json,
    /// Human-readable pretty format
    #[default]
    Pretty,
    /// Compact single-line format
    Compact,
}
