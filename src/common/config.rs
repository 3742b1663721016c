//! Configuration handling
//!
//! Two layers: [`Config`] is the optional TOML file, [`DriverConfig`] is the
//! validated value a [`crate::driver::Driver`] is built from.

use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

use super::paths::config_path;
use super::{Error, Result};

/// Environment variable naming the benchmark executable
pub const DEFAULT_BIN_ENV: &str = "LATENCY_TEST_BIN";

/// Main configuration structure
#[derive(Debug, Deserialize, Default)]
pub struct Config {
    /// Where the benchmark executable comes from
    #[serde(default)]
    pub executable: ExecutableConfig,

    /// Timeout settings
    #[serde(default)]
    pub timeouts: Timeouts,

    /// Process launch settings
    #[serde(default)]
    pub launch: LaunchConfig,
}

/// Executable settings
#[derive(Debug, Deserialize)]
pub struct ExecutableConfig {
    /// Name of the environment variable holding the executable path
    #[serde(default = "default_env_var")]
    pub env_var: String,
}

impl Default for ExecutableConfig {
    fn default() -> Self {
        Self {
            env_var: default_env_var(),
        }
    }
}

fn default_env_var() -> String {
    DEFAULT_BIN_ENV.to_string()
}

/// Timeout settings
#[derive(Debug, Deserialize)]
pub struct Timeouts {
    /// Upper bound for one scenario, 0 disables it
    #[serde(default = "default_run_secs")]
    pub run_secs: u64,

    /// How long a process gets to exit after SIGTERM before it is killed
    #[serde(default = "default_kill_grace")]
    pub kill_grace_millis: u64,
}

impl Default for Timeouts {
    fn default() -> Self {
        Self {
            run_secs: default_run_secs(),
            kill_grace_millis: default_kill_grace(),
        }
    }
}

fn default_run_secs() -> u64 {
    600
}
fn default_kill_grace() -> u64 {
    2000
}

/// Launch settings
#[derive(Debug, Deserialize)]
pub struct LaunchConfig {
    /// Pause between subscriber and publisher launch, 0 means none
    #[serde(default)]
    pub startup_delay_millis: u64,

    /// Pass `--hostname` in the built-in matrix
    #[serde(default = "default_true")]
    pub hostname: bool,

    /// Pass `--export_csv` to publishers in the built-in matrix
    #[serde(default = "default_true")]
    pub export_csv: bool,
}

impl Default for LaunchConfig {
    fn default() -> Self {
        Self {
            startup_delay_millis: 0,
            hostname: true,
            export_csv: true,
        }
    }
}

fn default_true() -> bool {
    true
}

impl Config {
    /// Load configuration from the default config file
    ///
    /// Returns default configuration if file doesn't exist
    pub fn load() -> Result<Self> {
        match config_path() {
            Some(path) if path.exists() => Self::load_from(&path),
            _ => Ok(Self::default()),
        }
    }

    /// Load configuration from an explicit path, which must exist
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| Error::FileRead {
            path: path.display().to_string(),
            error: e.to_string(),
        })?;
        Self::parse(&content)
    }

    /// Parse configuration from TOML text
    pub fn parse(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| Error::ConfigParse(e.to_string()))
    }

    /// Run timeout, `None` when disabled
    pub fn run_timeout(&self) -> Option<Duration> {
        (self.timeouts.run_secs > 0).then(|| Duration::from_secs(self.timeouts.run_secs))
    }

    /// Startup delay, `None` when disabled
    pub fn startup_delay(&self) -> Option<Duration> {
        (self.launch.startup_delay_millis > 0)
            .then(|| Duration::from_millis(self.launch.startup_delay_millis))
    }
}

/// Validated driver configuration
///
/// The executable is checked when this value is built, so a driver never
/// starts a matrix against a path that was wrong from the outset.
#[derive(Debug, Clone)]
pub struct DriverConfig {
    executable: PathBuf,
    /// Run identifier handed to both processes of every scenario
    pub seed: u32,
    /// Upper bound for one scenario
    pub timeout: Option<Duration>,
    /// Grace period between SIGTERM and a forced kill
    pub kill_grace: Duration,
    /// Optional pause between subscriber and publisher launch
    pub startup_delay: Option<Duration>,
}

impl DriverConfig {
    /// Build from a path or a bare command name, validating it
    ///
    /// Defaults: seed is the driver's own PID, no timeout, no startup delay.
    pub fn new(executable: impl AsRef<Path>) -> Result<Self> {
        Ok(Self {
            executable: resolve_executable(executable.as_ref())?,
            seed: std::process::id(),
            timeout: None,
            kill_grace: Duration::from_millis(default_kill_grace()),
            startup_delay: None,
        })
    }

    /// Build from the executable named by an environment variable
    pub fn from_env(var: &str) -> Result<Self> {
        match std::env::var_os(var) {
            Some(value) if !value.is_empty() => Self::new(PathBuf::from(value)),
            _ => Err(Error::env_var_unset(var)),
        }
    }

    /// Build from the environment using the settings of a config file
    pub fn from_config(config: &Config) -> Result<Self> {
        Ok(Self::from_env(&config.executable.env_var)?
            .with_timeout(config.run_timeout())
            .with_kill_grace(Duration::from_millis(config.timeouts.kill_grace_millis))
            .with_startup_delay(config.startup_delay()))
    }

    pub fn with_seed(mut self, seed: u32) -> Self {
        self.seed = seed;
        self
    }

    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_kill_grace(mut self, grace: Duration) -> Self {
        self.kill_grace = grace;
        self
    }

    pub fn with_startup_delay(mut self, delay: Option<Duration>) -> Self {
        self.startup_delay = delay;
        self
    }

    /// Resolved path of the benchmark executable
    pub fn executable(&self) -> &Path {
        &self.executable
    }

    /// Re-check the executable, it may have disappeared since construction
    pub fn revalidate(&self) -> Result<()> {
        check_executable(&self.executable)
    }
}

/// Resolve a path or bare command name to an executable file
///
/// Bare names (no path separator) are looked up in PATH.
pub fn resolve_executable(raw: &Path) -> Result<PathBuf> {
    if raw.as_os_str().is_empty() {
        return Err(Error::Configuration(
            "executable path is empty".to_string(),
        ));
    }

    let is_bare_name = raw.components().count() == 1 && raw.parent() == Some(Path::new(""));
    if is_bare_name {
        return which::which(raw).map_err(|e| {
            Error::Configuration(format!(
                "executable '{}' not found in PATH: {}",
                raw.display(),
                e
            ))
        });
    }

    check_executable(raw)?;
    Ok(raw.to_path_buf())
}

fn check_executable(path: &Path) -> Result<()> {
    let metadata = std::fs::metadata(path).map_err(|e| {
        Error::Configuration(format!(
            "executable '{}' does not exist: {}",
            path.display(),
            e
        ))
    })?;

    if !metadata.is_file() {
        return Err(Error::Configuration(format!(
            "'{}' is not a file",
            path.display()
        )));
    }

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        if metadata.permissions().mode() & 0o111 == 0 {
            return Err(Error::Configuration(format!(
                "'{}' is not executable",
                path.display()
            )));
        }
    }

    Ok(())
}
