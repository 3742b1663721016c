//! Latency benchmark driver
//!
//! Runs the external latency test executable (named by `LATENCY_TEST_BIN`)
//! as subscriber/publisher pairs over a scenario matrix and reports the
//! outcome through its exit code.

use clap::Parser;
use latency_driver::cli;
use latency_driver::commands::{Commands, GlobalArgs};
use latency_driver::common::logging;

/// Exit code for failures of the driver itself
const DRIVER_ERROR_EXIT_CODE: i32 = 125;

#[derive(Parser)]
#[command(name = "latency-driver", about = "Subscriber/publisher latency benchmark driver")]
#[command(version, long_about = None)]
struct Cli {
    #[command(flatten)]
    global: GlobalArgs,

    #[command(subcommand)]
    command: Commands,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let log_guard = match logging::init_cli(cli.global.verbose, cli.global.log_file.as_deref()) {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("Error: could not open log file: {e}");
            std::process::exit(DRIVER_ERROR_EXIT_CODE);
        }
    };

    let code = match cli::dispatch(&cli.global, cli.command).await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {e}");
            DRIVER_ERROR_EXIT_CODE
        }
    };

    // Flush file logs before exiting
    drop(log_guard);
    std::process::exit(code);
}
