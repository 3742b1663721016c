//! Mock latency benchmark for integration testing
//!
//! Accepts the command line of the real benchmark
//! (`subscriber|publisher [-r mode] [-s n] [-n n] [-e bool] --seed <n> [--hostname] [--export_csv]`)
//! plus a few `--mock-*` flags that script its behavior.

use clap::{Parser, ValueEnum};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Clone, Copy, Debug, ValueEnum)]
enum Role {
    Subscriber,
    Publisher,
}

#[derive(Parser, Debug)]
#[command(name = "mock-latency")]
struct MockArgs {
    role: Role,

    #[arg(short = 'r', long = "reliability", value_parser = ["reliable", "besteffort"])]
    reliability: Option<String>,

    #[arg(short = 's', long)]
    samples: Option<u32>,

    #[arg(short = 'n', long)]
    subscribers: Option<u32>,

    #[arg(short = 'e', long, value_parser = ["true", "false"])]
    echo: Option<String>,

    #[arg(long)]
    seed: Option<u32>,

    #[arg(long)]
    hostname: bool,

    #[arg(long = "export_csv")]
    export_csv: bool,

    /// Exit with this code
    #[arg(long, default_value_t = 0)]
    mock_exit: i32,

    /// Sleep before exiting
    #[arg(long)]
    mock_sleep_ms: Option<u64>,

    /// Never exit on its own
    #[arg(long)]
    mock_hang: bool,

    /// While hanging, append a line to this file every 50 ms
    #[arg(long)]
    mock_heartbeat: Option<PathBuf>,

    /// Append the received arguments to this file
    #[arg(long)]
    mock_record: Option<PathBuf>,
}

fn main() {
    let args = MockArgs::parse();

    if let Some(path) = &args.mock_record {
        let line: Vec<String> = std::env::args().skip(1).collect();
        append_line(path, &line.join(" "));
    }

    if args.export_csv && matches!(args.role, Role::Subscriber) {
        eprintln!("mock-latency: --export_csv is a publisher option");
        std::process::exit(2);
    }

    eprintln!(
        "mock-latency: {:?} seed={:?} reliable={} hostname={}",
        args.role,
        args.seed,
        args.reliability.as_deref() == Some("reliable"),
        args.hostname
    );

    if args.mock_hang {
        loop {
            if let Some(path) = &args.mock_heartbeat {
                append_line(path, "beat");
            }
            std::thread::sleep(Duration::from_millis(50));
        }
    }

    if let Some(ms) = args.mock_sleep_ms {
        std::thread::sleep(Duration::from_millis(ms));
    }

    std::process::exit(args.mock_exit);
}

fn append_line(path: &Path, line: &str) {
    if let Ok(mut file) = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
    {
        writeln!(file, "{line}").ok();
    }
}
