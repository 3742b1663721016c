//! Benchmark test driver
//!
//! Runs an external latency benchmark as a subscriber/publisher pair for each
//! scenario of a fixed matrix and collects the exit codes.

pub mod process;
mod report;
mod runner;
mod scenario;

pub use process::{Spawner, SystemSpawner};
pub use report::*;
pub use runner::{cancellation, CancelHandle, CancelToken, Driver};
pub use scenario::*;
