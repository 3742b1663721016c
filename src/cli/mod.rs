//! CLI command handling
//!
//! Turns parsed commands into driver calls and formats the output.

use std::time::Duration;

use colored::Colorize;
use serde_json::json;

use crate::commands::{Commands, GlobalArgs, MatrixArgs};
use crate::common::config::{Config, DriverConfig};
use crate::common::Result;
use crate::driver::{
    cancellation, Driver, MatrixOptions, MatrixReport, Role, ScenarioMatrix, Verdict,
};

/// Dispatch a CLI command, returning the process exit code
pub async fn dispatch(global: &GlobalArgs, command: Commands) -> Result<i32> {
    let config = load_config(global)?;

    match command {
        Commands::Run {
            matrix,
            timeout,
            startup_delay_ms,
            json,
        } => {
            let scenarios = build_matrix(&config, &matrix)?;

            let mut driver_config = DriverConfig::from_config(&config)?;
            if let Some(seed) = matrix.seed {
                driver_config = driver_config.with_seed(seed);
            }
            if let Some(secs) = timeout {
                driver_config =
                    driver_config.with_timeout((secs > 0).then(|| Duration::from_secs(secs)));
            }
            if let Some(millis) = startup_delay_ms {
                driver_config = driver_config
                    .with_startup_delay((millis > 0).then(|| Duration::from_millis(millis)));
            }

            if !json {
                println!(
                    "{} {} scenario(s) against {} (seed {})",
                    "Running".blue().bold(),
                    scenarios.scenarios.len(),
                    driver_config.executable().display().to_string().white().bold(),
                    driver_config.seed
                );
            }

            let driver = Driver::new(driver_config);
            let (handle, token) = cancellation();
            let interrupt = tokio::spawn(async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    tracing::warn!("Interrupted, stopping benchmark processes");
                    handle.cancel();
                }
            });

            let report = driver.run_matrix_until(&scenarios.scenarios, &token).await;
            interrupt.abort();
            let report = report?;

            if json {
                println!("{}", serde_json::to_string_pretty(&report.to_json())?);
            } else {
                print_summary(&report);
            }

            Ok(report.exit_code())
        }

        Commands::List { matrix, json } => {
            let scenarios = build_matrix(&config, &matrix)?;
            let seed = matrix.seed.unwrap_or_else(std::process::id);
            let program = match DriverConfig::from_config(&config) {
                Ok(driver_config) => driver_config.executable().display().to_string(),
                Err(_) => format!("${}", config.executable.env_var),
            };

            if json {
                let listing: Vec<_> = scenarios
                    .scenarios
                    .iter()
                    .map(|s| {
                        json!({
                            "label": s.label,
                            "subscriber": s.command_args(Role::Subscriber, seed),
                            "publisher": s.command_args(Role::Publisher, seed),
                        })
                    })
                    .collect();
                println!(
                    "{}",
                    serde_json::to_string_pretty(&json!({
                        "program": program,
                        "seed": seed,
                        "scenarios": listing,
                    }))?
                );
                return Ok(0);
            }

            if let Some(name) = &scenarios.name {
                println!("Matrix: {}", name.bold());
            }
            for scenario in &scenarios.scenarios {
                println!("\n{}", scenario.label.cyan().bold());
                for role in [Role::Subscriber, Role::Publisher] {
                    println!(
                        "  {} {}",
                        program.dimmed(),
                        scenario.command_args(role, seed).join(" ")
                    );
                }
            }
            Ok(0)
        }

        Commands::Check => {
            let driver_config = DriverConfig::from_config(&config)?;
            println!("Environment: {}", config.executable.env_var);
            println!("Executable:  {}", driver_config.executable().display());
            match driver_config.timeout {
                Some(timeout) => println!("Timeout:     {}s", timeout.as_secs()),
                None => println!("Timeout:     none"),
            }
            if let Some(delay) = driver_config.startup_delay {
                println!("Startup delay: {}ms", delay.as_millis());
            }
            println!("{} Configuration OK", "✓".green());
            Ok(0)
        }
    }
}

fn load_config(global: &GlobalArgs) -> Result<Config> {
    let mut config = match &global.config {
        Some(path) => Config::load_from(path)?,
        None => Config::load()?,
    };
    if let Some(var) = &global.bin_env {
        config.executable.env_var = var.clone();
    }
    Ok(config)
}

fn build_matrix(config: &Config, args: &MatrixArgs) -> Result<ScenarioMatrix> {
    let matrix = match &args.matrix {
        Some(path) => ScenarioMatrix::load(path)?,
        None => ScenarioMatrix::builtin(&MatrixOptions {
            hostname: config.launch.hostname && !args.no_hostname,
            export_csv: config.launch.export_csv && !args.no_export_csv,
            samples: args.samples,
            subscribers: args.subscribers,
        }),
    };
    matrix.select(&args.only)
}

fn print_summary(report: &MatrixReport) {
    println!("\n{}", "Summary:".cyan());

    let width = report
        .scenarios
        .iter()
        .map(|s| s.label.len())
        .max()
        .unwrap_or(0);

    for scenario in &report.scenarios {
        let label = format!("{:width$}", scenario.label, width = width);
        match (&scenario.outcome, scenario.verdict()) {
            (Ok(result), verdict) => {
                let mark = if verdict == Verdict::Passed {
                    "✓".green()
                } else {
                    "✗".red()
                };
                println!(
                    "  {} {}  subscriber={} publisher={}  {:.2}s",
                    mark,
                    label,
                    result.subscriber_exit_code,
                    result.publisher_exit_code,
                    result.elapsed.as_secs_f64()
                );
            }
            (Err(e), _) => {
                println!("  {} {}  could not run: {}", "!".yellow(), label, e);
            }
        }
    }

    let failed = report.failed_count();
    let not_run = report.not_run_count();
    let mut line = format!("{} passed, {} failed", report.passed_count(), failed);
    if not_run > 0 {
        line.push_str(&format!(" ({} could not run)", not_run));
    }
    if report.cancelled {
        line.push_str(", cancelled");
    }

    if report.all_passed() {
        println!("\n{}\n", line.green().bold());
    } else {
        println!("\n{}\n", line.red().bold());
    }
}
