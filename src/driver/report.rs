//! Run results and matrix reports

use serde::Serialize;
use std::time::Duration;

use crate::common::Error;

use super::scenario::Role;

/// Exit code used when the matrix was interrupted
pub const CANCELLED_EXIT_CODE: i32 = 130;

const MAX_FAILURE_EXIT_CODE: usize = 100;

/// Outcome of one scenario whose processes both ran to completion
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunResult {
    pub label: String,
    pub subscriber_exit_code: i32,
    pub publisher_exit_code: i32,
    pub elapsed: Duration,
}

impl RunResult {
    pub fn passed(&self) -> bool {
        self.subscriber_exit_code == 0 && self.publisher_exit_code == 0
    }

    /// Exit code for a role
    pub fn exit_code(&self, role: Role) -> i32 {
        match role {
            Role::Subscriber => self.subscriber_exit_code,
            Role::Publisher => self.publisher_exit_code,
        }
    }

    /// Non-zero exits, subscriber first
    pub fn failures(&self) -> Vec<Error> {
        [Role::Subscriber, Role::Publisher]
            .into_iter()
            .filter(|role| self.exit_code(*role) != 0)
            .map(|role| Error::NonZeroExit {
                role,
                code: self.exit_code(role),
            })
            .collect()
    }
}

/// How a scenario ended, from the summary's point of view
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Verdict {
    /// Both processes exited with 0
    Passed,
    /// The scenario ran but the binary reported failure
    Failed,
    /// The driver could not run the scenario
    NotRun,
}

/// Report entry for one scenario
#[derive(Debug)]
pub struct ScenarioReport {
    pub label: String,
    pub outcome: Result<RunResult, Error>,
}

impl ScenarioReport {
    pub fn new(label: impl Into<String>, outcome: Result<RunResult, Error>) -> Self {
        Self {
            label: label.into(),
            outcome,
        }
    }

    pub fn verdict(&self) -> Verdict {
        match &self.outcome {
            Ok(result) if result.passed() => Verdict::Passed,
            Ok(_) => Verdict::Failed,
            Err(_) => Verdict::NotRun,
        }
    }

    pub fn result(&self) -> Option<&RunResult> {
        self.outcome.as_ref().ok()
    }
}

/// Aggregate outcome of a matrix run, one entry per input scenario
#[derive(Debug, Default)]
pub struct MatrixReport {
    pub scenarios: Vec<ScenarioReport>,
    /// The run was interrupted; unfinished scenarios are reported as cancelled
    pub cancelled: bool,
}

impl MatrixReport {
    pub fn len(&self) -> usize {
        self.scenarios.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scenarios.is_empty()
    }

    fn count(&self, verdict: Verdict) -> usize {
        self.scenarios
            .iter()
            .filter(|s| s.verdict() == verdict)
            .count()
    }

    pub fn passed_count(&self) -> usize {
        self.count(Verdict::Passed)
    }

    /// Scenarios that did not pass, whatever the reason
    pub fn failed_count(&self) -> usize {
        self.len() - self.passed_count()
    }

    pub fn not_run_count(&self) -> usize {
        self.count(Verdict::NotRun)
    }

    pub fn all_passed(&self) -> bool {
        !self.cancelled && self.failed_count() == 0
    }

    /// Process exit code for the driver CLI
    ///
    /// 0 when everything passed, otherwise the number of failed scenarios
    /// (capped at 100), or 130 when the run was cancelled.
    pub fn exit_code(&self) -> i32 {
        if self.cancelled {
            return CANCELLED_EXIT_CODE;
        }
        self.failed_count().min(MAX_FAILURE_EXIT_CODE) as i32
    }

    /// Serializable view of the report
    pub fn to_json(&self) -> ReportJson<'_> {
        ReportJson {
            passed: self.passed_count(),
            failed: self.failed_count(),
            cancelled: self.cancelled,
            scenarios: self.scenarios.iter().map(ScenarioJson::from).collect(),
        }
    }
}

/// JSON form of a [`MatrixReport`]
#[derive(Debug, Serialize)]
pub struct ReportJson<'a> {
    pub passed: usize,
    pub failed: usize,
    pub cancelled: bool,
    pub scenarios: Vec<ScenarioJson<'a>>,
}

/// JSON form of a [`ScenarioReport`]
#[derive(Debug, Serialize)]
pub struct ScenarioJson<'a> {
    pub label: &'a str,
    pub verdict: Verdict,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subscriber_exit_code: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub publisher_exit_code: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub elapsed_ms: Option<u128>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorJson>,
}

/// JSON form of a driver error
#[derive(Debug, Serialize)]
pub struct ErrorJson {
    pub code: &'static str,
    pub message: String,
}

impl<'a> From<&'a ScenarioReport> for ScenarioJson<'a> {
    fn from(report: &'a ScenarioReport) -> Self {
        let result = report.result();
        Self {
            label: &report.label,
            verdict: report.verdict(),
            subscriber_exit_code: result.map(|r| r.subscriber_exit_code),
            publisher_exit_code: result.map(|r| r.publisher_exit_code),
            elapsed_ms: result.map(|r| r.elapsed.as_millis()),
            error: report.outcome.as_ref().err().map(|e| ErrorJson {
                code: e.code(),
                message: e.to_string(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ran(label: &str, sub: i32, publ: i32) -> ScenarioReport {
        ScenarioReport::new(
            label,
            Ok(RunResult {
                label: label.to_string(),
                subscriber_exit_code: sub,
                publisher_exit_code: publ,
                elapsed: Duration::from_millis(12),
            }),
        )
    }

    #[test]
    fn test_verdicts_distinguish_driver_and_binary_failures() {
        assert_eq!(ran("a", 0, 0).verdict(), Verdict::Passed);
        assert_eq!(ran("a", 0, 1).verdict(), Verdict::Failed);
        assert_eq!(
            ScenarioReport::new(
                "a",
                Err(Error::IncompleteRun {
                    role: Role::Subscriber,
                    timeout_ms: 10
                })
            )
            .verdict(),
            Verdict::NotRun
        );
    }

    #[test]
    fn test_failures_list_each_role() {
        let report = ran("a", 2, 1);
        let failures = report.result().unwrap().failures();
        assert_eq!(failures.len(), 2);
        assert!(matches!(
            failures[0],
            Error::NonZeroExit {
                role: Role::Subscriber,
                code: 2
            }
        ));
        assert!(matches!(
            failures[1],
            Error::NonZeroExit {
                role: Role::Publisher,
                code: 1
            }
        ));
    }

    #[test]
    fn test_exit_code_counts_failed_scenarios() {
        let report = MatrixReport {
            scenarios: vec![
                ran("best-effort", 0, 1),
                ran("reliable", 0, 0),
                ScenarioReport::new("extra", Err(Error::Cancelled)),
            ],
            cancelled: false,
        };
        assert_eq!(report.failed_count(), 2);
        assert_eq!(report.not_run_count(), 1);
        assert_eq!(report.exit_code(), 2);
        assert!(!report.all_passed());

        let all_good = MatrixReport {
            scenarios: vec![ran("best-effort", 0, 0)],
            cancelled: false,
        };
        assert_eq!(all_good.exit_code(), 0);
        assert!(all_good.all_passed());
    }

    #[test]
    fn test_cancelled_exit_code() {
        let report = MatrixReport {
            scenarios: vec![ScenarioReport::new("a", Err(Error::Cancelled))],
            cancelled: true,
        };
        assert_eq!(report.exit_code(), CANCELLED_EXIT_CODE);
    }

    #[test]
    fn test_json_shape() {
        let report = MatrixReport {
            scenarios: vec![
                ran("best-effort", 0, 1),
                ScenarioReport::new("reliable", Err(Error::Cancelled)),
            ],
            cancelled: true,
        };
        let value = serde_json::to_value(report.to_json()).unwrap();
        assert_eq!(value["failed"], 2);
        assert_eq!(value["cancelled"], true);
        assert_eq!(value["scenarios"][0]["verdict"], "failed");
        assert_eq!(value["scenarios"][0]["publisher_exit_code"], 1);
        assert_eq!(value["scenarios"][0]["elapsed_ms"], 12);
        assert_eq!(value["scenarios"][1]["verdict"], "not_run");
        assert_eq!(value["scenarios"][1]["error"]["code"], "CANCELLED");
        assert!(value["scenarios"][1].get("subscriber_exit_code").is_none());
    }
}
