//! CLI command definitions
//!
//! Defines the clap commands for the latency driver CLI.

use clap::{Args, Subcommand};
use std::path::PathBuf;

/// Options shared by every command
#[derive(Args, Debug, Default)]
pub struct GlobalArgs {
    /// Configuration file (default: platform config dir)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Environment variable holding the benchmark executable
    #[arg(long, global = true, value_name = "VAR")]
    pub bin_env: Option<String>,

    /// Debug-level logging
    #[arg(long, short, global = true)]
    pub verbose: bool,

    /// Also write logs to this file
    #[arg(long, global = true)]
    pub log_file: Option<PathBuf>,
}

/// Which scenarios to run and how the built-in matrix is shaped
#[derive(Args, Debug, Default)]
pub struct MatrixArgs {
    /// YAML scenario matrix instead of the built-in best-effort/reliable pair
    #[arg(long)]
    pub matrix: Option<PathBuf>,

    /// Only run the scenario with this label (repeatable)
    #[arg(long = "only", value_name = "LABEL")]
    pub only: Vec<String>,

    /// Run identifier passed as --seed (default: driver PID)
    #[arg(long)]
    pub seed: Option<u32>,

    /// Do not pass --hostname
    #[arg(long)]
    pub no_hostname: bool,

    /// Do not pass --export_csv to publishers
    #[arg(long)]
    pub no_export_csv: bool,

    /// Number of samples per run
    #[arg(long, short = 's')]
    pub samples: Option<u32>,

    /// Number of subscribers the publisher waits for
    #[arg(long, short = 'n')]
    pub subscribers: Option<u32>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the scenario matrix
    Run {
        #[command(flatten)]
        matrix: MatrixArgs,

        /// Per-scenario timeout in seconds, 0 disables it
        #[arg(long, value_name = "SECS")]
        timeout: Option<u64>,

        /// Pause between subscriber and publisher launch
        #[arg(long, value_name = "MILLIS")]
        startup_delay_ms: Option<u64>,

        /// Print the report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show scenarios and the command lines they would launch
    List {
        #[command(flatten)]
        matrix: MatrixArgs,

        /// Print as JSON
        #[arg(long)]
        json: bool,
    },

    /// Validate configuration and resolve the benchmark executable
    Check,
}
