//! Scenario execution
//!
//! A scenario launches the subscriber, then the publisher, then joins them
//! in the same order. Launch order is best effort: nothing waits for the
//! subscriber to be ready before the publisher starts. Scenarios in a matrix
//! never overlap.

use std::process::ExitStatus;
use std::sync::Arc;
use std::time::Instant;

use tokio::process::Child;
use tokio::sync::watch;

use crate::common::config::DriverConfig;
use crate::common::{Error, Result};

use super::process::{self, Spawner, SystemSpawner};
use super::report::{MatrixReport, RunResult, ScenarioReport};
use super::scenario::{Role, Scenario};

/// Create a linked cancellation handle and token
pub fn cancellation() -> (CancelHandle, CancelToken) {
    let (tx, rx) = watch::channel(false);
    (CancelHandle { tx }, CancelToken { rx })
}

/// Requests cancellation of a running matrix
#[derive(Debug, Clone)]
pub struct CancelHandle {
    tx: watch::Sender<bool>,
}

impl CancelHandle {
    pub fn cancel(&self) {
        self.tx.send_replace(true);
    }
}

/// Observed by the driver to stop early
#[derive(Debug, Clone)]
pub struct CancelToken {
    rx: watch::Receiver<bool>,
}

impl CancelToken {
    /// A token that is never cancelled
    pub fn never() -> Self {
        let (_, token) = cancellation();
        token
    }

    pub fn is_cancelled(&self) -> bool {
        *self.rx.borrow()
    }

    /// Resolves once cancellation is requested
    pub async fn cancelled(&self) {
        let mut rx = self.rx.clone();
        loop {
            if *rx.borrow_and_update() {
                return;
            }
            if rx.changed().await.is_err() {
                // Handle dropped without cancelling
                std::future::pending::<()>().await;
            }
        }
    }
}

/// Why waiting on a child stopped
enum WaitError {
    TimedOut,
    Cancelled,
    Io(std::io::Error),
}

/// Drives the benchmark executable through scenarios
pub struct Driver {
    config: DriverConfig,
    spawner: Arc<dyn Spawner>,
}

impl Driver {
    pub fn new(config: DriverConfig) -> Self {
        Self::with_spawner(config, SystemSpawner)
    }

    pub fn with_spawner(config: DriverConfig, spawner: impl Spawner + 'static) -> Self {
        Self {
            config,
            spawner: Arc::new(spawner),
        }
    }

    /// Run one scenario to completion
    pub async fn run(&self, scenario: &Scenario) -> Result<RunResult> {
        self.run_until(scenario, &CancelToken::never()).await
    }

    /// Run one scenario, stopping its processes if `cancel` fires
    ///
    /// The executable is checked again first, so a binary that vanished
    /// since the config was built is a configuration error.
    pub async fn run_until(&self, scenario: &Scenario, cancel: &CancelToken) -> Result<RunResult> {
        self.config.revalidate()?;
        self.run_scenario(scenario, cancel).await
    }

    async fn run_scenario(&self, scenario: &Scenario, cancel: &CancelToken) -> Result<RunResult> {
        if cancel.is_cancelled() {
            return Err(Error::Cancelled);
        }

        let seed = self.config.seed;
        let deadline = self
            .config
            .timeout
            .map(|t| tokio::time::Instant::now() + t);
        let started = Instant::now();

        tracing::info!(label = %scenario.label, seed, "Starting scenario");

        let mut subscriber =
            self.launch(Role::Subscriber, &scenario.command_args(Role::Subscriber, seed))?;

        if let Some(delay) = self.config.startup_delay {
            tokio::select! {
                _ = tokio::time::sleep(delay) => {}
                _ = cancel.cancelled() => {
                    self.shutdown(Role::Subscriber, &mut subscriber).await;
                    return Err(Error::Cancelled);
                }
            }
        }

        let mut publisher =
            match self.launch(Role::Publisher, &scenario.command_args(Role::Publisher, seed)) {
                Ok(child) => child,
                Err(e) => {
                    self.shutdown(Role::Subscriber, &mut subscriber).await;
                    return Err(e);
                }
            };

        let subscriber_code = match wait(&mut subscriber, deadline, cancel).await {
            Ok(status) => exited(Role::Subscriber, status),
            Err(e) => {
                self.shutdown(Role::Subscriber, &mut subscriber).await;
                self.shutdown(Role::Publisher, &mut publisher).await;
                return Err(self.wait_error(Role::Subscriber, e));
            }
        };

        let publisher_code = match wait(&mut publisher, deadline, cancel).await {
            Ok(status) => exited(Role::Publisher, status),
            Err(e) => {
                self.shutdown(Role::Publisher, &mut publisher).await;
                return Err(self.wait_error(Role::Publisher, e));
            }
        };

        let result = RunResult {
            label: scenario.label.clone(),
            subscriber_exit_code: subscriber_code,
            publisher_exit_code: publisher_code,
            elapsed: started.elapsed(),
        };

        tracing::info!(
            label = %result.label,
            subscriber_code = result.subscriber_exit_code,
            publisher_code = result.publisher_exit_code,
            elapsed_ms = result.elapsed.as_millis() as u64,
            "Scenario finished"
        );

        Ok(result)
    }

    /// Run every scenario in order, one at a time
    pub async fn run_matrix(&self, scenarios: &[Scenario]) -> Result<MatrixReport> {
        self.run_matrix_until(scenarios, &CancelToken::never()).await
    }

    /// Run every scenario in order until done or cancelled
    ///
    /// A failing scenario does not stop the matrix. Only configuration
    /// errors abort it; they are returned as `Err` instead of a report.
    /// The executable is checked once up front. If it disappears mid-matrix
    /// the affected scenarios fail to launch and are reported as such.
    pub async fn run_matrix_until(
        &self,
        scenarios: &[Scenario],
        cancel: &CancelToken,
    ) -> Result<MatrixReport> {
        self.config.revalidate()?;

        let mut report = MatrixReport {
            scenarios: Vec::with_capacity(scenarios.len()),
            cancelled: false,
        };

        for scenario in scenarios {
            if report.cancelled || cancel.is_cancelled() {
                report.cancelled = true;
                report
                    .scenarios
                    .push(ScenarioReport::new(scenario.label.clone(), Err(Error::Cancelled)));
                continue;
            }

            let outcome = match self.run_scenario(scenario, cancel).await {
                Err(e) if e.is_fatal() => return Err(e),
                other => other,
            };

            match &outcome {
                Ok(result) if !result.passed() => {
                    for failure in result.failures() {
                        tracing::warn!(label = %scenario.label, "{failure}");
                    }
                }
                Ok(_) => {}
                Err(Error::Cancelled) => {
                    tracing::warn!(label = %scenario.label, "Scenario cancelled");
                    report.cancelled = true;
                }
                Err(e) => tracing::error!(label = %scenario.label, "Could not run scenario: {e}"),
            }

            report
                .scenarios
                .push(ScenarioReport::new(scenario.label.clone(), outcome));
        }

        Ok(report)
    }

    fn launch(&self, role: Role, args: &[String]) -> Result<Child> {
        let program = self.config.executable();
        let child = self
            .spawner
            .spawn(role, program, args)
            .map_err(|e| Error::launch(role, program, e))?;
        tracing::debug!(%role, pid = ?child.id(), ?args, "Spawned");
        Ok(child)
    }

    async fn shutdown(&self, role: Role, child: &mut Child) {
        let pid = child.id();
        if let Err(e) = process::terminate(child, self.config.kill_grace).await {
            tracing::warn!(%role, ?pid, "Failed to terminate: {e}");
        } else {
            tracing::debug!(%role, ?pid, "Terminated");
        }
    }

    fn wait_error(&self, role: Role, error: WaitError) -> Error {
        match error {
            WaitError::TimedOut => {
                let timeout_ms = self
                    .config
                    .timeout
                    .map(|t| t.as_millis() as u64)
                    .unwrap_or_default();
                tracing::warn!(%role, timeout_ms, "Timed out, processes killed");
                Error::IncompleteRun { role, timeout_ms }
            }
            WaitError::Cancelled => Error::Cancelled,
            WaitError::Io(e) => Error::Io(e),
        }
    }
}

fn exited(role: Role, status: ExitStatus) -> i32 {
    let code = process::exit_code(status);
    tracing::debug!(%role, code, "Exited");
    code
}

/// Join a child, bounded by the scenario deadline and cancellation
async fn wait(
    child: &mut Child,
    deadline: Option<tokio::time::Instant>,
    cancel: &CancelToken,
) -> std::result::Result<ExitStatus, WaitError> {
    let timeout = async {
        match deadline {
            Some(deadline) => tokio::time::sleep_until(deadline).await,
            None => std::future::pending().await,
        }
    };

    tokio::select! {
        biased;
        status = child.wait() => status.map_err(WaitError::Io),
        _ = cancel.cancelled() => Err(WaitError::Cancelled),
        _ = timeout => Err(WaitError::TimedOut),
    }
}
