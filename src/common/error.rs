//! Error types for the latency driver
//!
//! Messages are meant to be read by whoever wired the driver into a test
//! suite, so configuration problems carry a hint on how to fix them.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

use crate::driver::Role;

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for the latency driver
#[derive(Error, Debug)]
pub enum Error {
    // === Configuration Errors ===
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Invalid configuration file: {0}")]
    ConfigParse(String),

    // === Scenario Errors ===
    #[error("Failed to launch {role} '{}': {source}", .program.display())]
    Launch {
        role: Role,
        program: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("{role} did not terminate within {timeout_ms} ms and was killed")]
    IncompleteRun { role: Role, timeout_ms: u64 },

    #[error("{role} exited with code {code}")]
    NonZeroExit { role: Role, code: i32 },

    #[error("Run cancelled before the scenario completed")]
    Cancelled,

    // === IO Errors ===
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("Failed to read file '{path}': {error}")]
    FileRead { path: String, error: String },

    // === Serialization Errors ===
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Create a configuration error for an unset environment variable
    pub fn env_var_unset(var: &str) -> Self {
        Self::Configuration(format!(
            "environment variable {var} is not set. Point it at the latency test executable"
        ))
    }

    /// Create a launch error
    pub fn launch(role: Role, program: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Launch {
            role,
            program: program.into(),
            source,
        }
    }

    /// Whether the driver itself could not run the scenario, as opposed to
    /// the benchmark binary reporting a failure
    pub fn is_driver_fault(&self) -> bool {
        !matches!(self, Error::NonZeroExit { .. })
    }

    /// Whether the error aborts the whole matrix instead of a single scenario
    ///
    /// An I/O error while waiting on a child only fails that scenario.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Error::Configuration(_) | Error::ConfigParse(_) | Error::FileRead { .. }
        )
    }

    /// Short machine-readable code, used in JSON reports
    pub fn code(&self) -> &'static str {
        match self {
            Error::Configuration(_) | Error::ConfigParse(_) => "CONFIGURATION",
            Error::Launch { .. } => "LAUNCH",
            Error::IncompleteRun { .. } => "INCOMPLETE_RUN",
            Error::NonZeroExit { .. } => "NON_ZERO_EXIT",
            Error::Cancelled => "CANCELLED",
            Error::Io(_) | Error::FileRead { .. } => "IO",
            Error::Json(_) => "INTERNAL_ERROR",
        }
    }
}
