//! Latency benchmark driver
//!
//! Drives an external subscriber/publisher latency benchmark through a fixed
//! matrix of configurations and collects per-scenario results.

pub mod cli;
pub mod commands;
pub mod common;
pub mod driver;

// Re-export commonly used types for tests
pub use common::config::DriverConfig;
pub use common::{Error, Result};
pub use driver::{Driver, MatrixReport, RunResult, Scenario, ScenarioMatrix};
