//! Scenario definitions
//!
//! A scenario pairs the argument lists for one subscriber/publisher run.
//! Matrices come either from the built-in latency matrix or from a YAML file:
//!
//! ```yaml
//! name: latency
//! scenarios:
//!   - label: best-effort
//!     subscriber: [subscriber, --seed, "{seed}", --hostname]
//!     publisher: [publisher, --seed, "{seed}", --hostname, --export_csv]
//! ```

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::path::Path;

use crate::common::{Error, Result};

/// Argument replaced by the run seed
pub const SEED_PLACEHOLDER: &str = "{seed}";

const SEED_FLAG: &str = "--seed";

/// Which side of the benchmark a process plays
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Subscriber,
    Publisher,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Subscriber => "subscriber",
            Role::Publisher => "publisher",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One benchmark configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Scenario {
    /// Human-readable name, e.g. "best-effort"
    pub label: String,
    /// Arguments for the subscriber process
    #[serde(rename = "subscriber")]
    pub subscriber_args: Vec<String>,
    /// Arguments for the publisher process
    #[serde(rename = "publisher")]
    pub publisher_args: Vec<String>,
}

impl Scenario {
    pub fn new<S, P>(label: impl Into<String>, subscriber_args: S, publisher_args: P) -> Self
    where
        S: IntoIterator,
        S::Item: Into<String>,
        P: IntoIterator,
        P::Item: Into<String>,
    {
        Self {
            label: label.into(),
            subscriber_args: subscriber_args.into_iter().map(Into::into).collect(),
            publisher_args: publisher_args.into_iter().map(Into::into).collect(),
        }
    }

    /// Raw arguments for a role, before the seed is applied
    pub fn args(&self, role: Role) -> &[String] {
        match role {
            Role::Subscriber => &self.subscriber_args,
            Role::Publisher => &self.publisher_args,
        }
    }

    /// Final argument list for a role with the seed applied
    pub fn command_args(&self, role: Role, seed: u32) -> Vec<String> {
        apply_seed(self.args(role), seed)
    }

    fn validate(&self) -> Result<()> {
        if self.label.trim().is_empty() {
            return Err(Error::Configuration(
                "scenario label must not be empty".to_string(),
            ));
        }

        for role in [Role::Subscriber, Role::Publisher] {
            match self.args(role).first() {
                None => {
                    return Err(Error::Configuration(format!(
                        "scenario '{}' has no {} arguments",
                        self.label, role
                    )))
                }
                Some(first) if first != role.as_str() => {
                    return Err(Error::Configuration(format!(
                        "scenario '{}': {} arguments must start with '{}', found '{}'",
                        self.label, role, role, first
                    )))
                }
                Some(_) => {}
            }
        }
        Ok(())
    }
}

/// Place the seed into an argument list
///
/// `{seed}` arguments are substituted. Without a placeholder, a list that
/// already carries `--seed` is left alone, anything else gets `--seed <seed>`
/// appended.
pub fn apply_seed(args: &[String], seed: u32) -> Vec<String> {
    let seed = seed.to_string();

    if args.iter().any(|a| a == SEED_PLACEHOLDER) {
        return args
            .iter()
            .map(|a| {
                if a == SEED_PLACEHOLDER {
                    seed.clone()
                } else {
                    a.clone()
                }
            })
            .collect();
    }

    let mut out = args.to_vec();
    if !args.iter().any(|a| a == SEED_FLAG) {
        out.push(SEED_FLAG.to_string());
        out.push(seed);
    }
    out
}

/// Options for the built-in latency matrix
#[derive(Debug, Clone)]
pub struct MatrixOptions {
    /// Pass `--hostname` to both roles
    pub hostname: bool,
    /// Pass `--export_csv` to the publisher
    pub export_csv: bool,
    /// Number of samples (`-s`), both roles
    pub samples: Option<u32>,
    /// Number of subscribers the publisher expects (`-n`)
    pub subscribers: Option<u32>,
}

impl Default for MatrixOptions {
    fn default() -> Self {
        Self {
            hostname: true,
            export_csv: true,
            samples: None,
            subscribers: None,
        }
    }
}

/// An ordered, fixed list of scenarios
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScenarioMatrix {
    /// Optional name of the matrix
    #[serde(default)]
    pub name: Option<String>,
    /// Scenarios, run in this order
    pub scenarios: Vec<Scenario>,
}

impl ScenarioMatrix {
    /// The best-effort then reliable latency matrix
    pub fn builtin(options: &MatrixOptions) -> Self {
        let scenarios = [("best-effort", None), ("reliable", Some("reliable"))]
            .into_iter()
            .map(|(label, reliability)| {
                Scenario::new(
                    label,
                    role_args(Role::Subscriber, reliability, options),
                    role_args(Role::Publisher, reliability, options),
                )
            })
            .collect();

        Self {
            name: Some("latency".to_string()),
            scenarios,
        }
    }

    /// Load and validate a matrix from a YAML file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::Configuration(format!(
                "Failed to read scenario matrix '{}': {}",
                path.display(),
                e
            ))
        })?;
        Self::from_yaml(&content)
    }

    /// Parse and validate a matrix from YAML text
    pub fn from_yaml(content: &str) -> Result<Self> {
        let matrix: Self = serde_yaml::from_str(content)
            .map_err(|e| Error::Configuration(format!("Failed to parse scenario matrix: {}", e)))?;
        matrix.validate()?;
        Ok(matrix)
    }

    pub fn validate(&self) -> Result<()> {
        if self.scenarios.is_empty() {
            return Err(Error::Configuration(
                "scenario matrix contains no scenarios".to_string(),
            ));
        }

        let mut seen = HashSet::new();
        for scenario in &self.scenarios {
            scenario.validate()?;
            if !seen.insert(scenario.label.as_str()) {
                return Err(Error::Configuration(format!(
                    "duplicate scenario label '{}'",
                    scenario.label
                )));
            }
        }
        Ok(())
    }

    /// Keep only the named scenarios, preserving matrix order
    ///
    /// An empty selection keeps everything.
    pub fn select(self, labels: &[String]) -> Result<Self> {
        if labels.is_empty() {
            return Ok(self);
        }

        if let Some(unknown) = labels
            .iter()
            .find(|l| !self.scenarios.iter().any(|s| &s.label == *l))
        {
            let known: Vec<_> = self.scenarios.iter().map(|s| s.label.as_str()).collect();
            return Err(Error::Configuration(format!(
                "unknown scenario '{}'. Available: {}",
                unknown,
                known.join(", ")
            )));
        }

        Ok(Self {
            name: self.name,
            scenarios: self
                .scenarios
                .into_iter()
                .filter(|s| labels.contains(&s.label))
                .collect(),
        })
    }
}

fn role_args(role: Role, reliability: Option<&str>, options: &MatrixOptions) -> Vec<String> {
    let mut args = vec![role.as_str().to_string()];

    if let Some(mode) = reliability {
        args.extend(["-r".to_string(), mode.to_string()]);
    }
    if let Some(samples) = options.samples {
        args.extend(["-s".to_string(), samples.to_string()]);
    }
    if role == Role::Publisher {
        if let Some(n) = options.subscribers {
            args.extend(["-n".to_string(), n.to_string()]);
        }
    }

    args.extend([SEED_FLAG.to_string(), SEED_PLACEHOLDER.to_string()]);

    if options.hostname {
        args.push("--hostname".to_string());
    }
    if role == Role::Publisher && options.export_csv {
        args.push("--export_csv".to_string());
    }
    args
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strings(args: &[&str]) -> Vec<String> {
        args.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_builtin_matrix_matches_benchmark_grammar() {
        let matrix = ScenarioMatrix::builtin(&MatrixOptions::default());
        assert_eq!(matrix.scenarios.len(), 2);

        let best_effort = &matrix.scenarios[0];
        assert_eq!(best_effort.label, "best-effort");
        assert_eq!(
            best_effort.command_args(Role::Subscriber, 4242),
            strings(&["subscriber", "--seed", "4242", "--hostname"])
        );
        assert_eq!(
            best_effort.command_args(Role::Publisher, 4242),
            strings(&["publisher", "--seed", "4242", "--hostname", "--export_csv"])
        );

        let reliable = &matrix.scenarios[1];
        assert_eq!(reliable.label, "reliable");
        assert_eq!(
            reliable.command_args(Role::Subscriber, 7),
            strings(&["subscriber", "-r", "reliable", "--seed", "7", "--hostname"])
        );
        assert_eq!(
            reliable.command_args(Role::Publisher, 7),
            strings(&[
                "publisher",
                "-r",
                "reliable",
                "--seed",
                "7",
                "--hostname",
                "--export_csv"
            ])
        );
        matrix.validate().unwrap();
    }

    #[test]
    fn test_builtin_matrix_options() {
        let options = MatrixOptions {
            hostname: false,
            export_csv: false,
            samples: Some(500),
            subscribers: Some(3),
        };
        let matrix = ScenarioMatrix::builtin(&options);
        assert_eq!(
            matrix.scenarios[0].command_args(Role::Subscriber, 1),
            strings(&["subscriber", "-s", "500", "--seed", "1"])
        );
        assert_eq!(
            matrix.scenarios[1].command_args(Role::Publisher, 1),
            strings(&["publisher", "-r", "reliable", "-s", "500", "-n", "3", "--seed", "1"])
        );
    }

    #[test]
    fn test_seed_appended_when_absent() {
        let args = apply_seed(&strings(&["subscriber", "--hostname"]), 9);
        assert_eq!(args, strings(&["subscriber", "--hostname", "--seed", "9"]));
    }

    #[test]
    fn test_explicit_seed_left_alone() {
        let args = apply_seed(&strings(&["publisher", "--seed", "1", "--hostname"]), 9);
        assert_eq!(args, strings(&["publisher", "--seed", "1", "--hostname"]));
    }

    #[test]
    fn test_matrix_from_yaml() {
        let matrix = ScenarioMatrix::from_yaml(
            r#"
name: custom
scenarios:
  - label: small
    subscriber: [subscriber, -s, "10"]
    publisher: [publisher, -s, "10", --export_csv]
"#,
        )
        .unwrap();
        assert_eq!(matrix.name.as_deref(), Some("custom"));
        assert_eq!(matrix.scenarios[0].label, "small");
        assert_eq!(
            matrix.scenarios[0].command_args(Role::Publisher, 5),
            strings(&["publisher", "-s", "10", "--export_csv", "--seed", "5"])
        );
    }

    #[test]
    fn test_matrix_rejects_swapped_roles() {
        let err = ScenarioMatrix::from_yaml(
            r#"
scenarios:
  - label: swapped
    subscriber: [publisher]
    publisher: [subscriber]
"#,
        )
        .unwrap_err();
        assert!(err.to_string().contains("must start with 'subscriber'"));
    }

    #[test]
    fn test_matrix_rejects_duplicates_and_empty() {
        let err = ScenarioMatrix::from_yaml("scenarios: []").unwrap_err();
        assert!(matches!(err, Error::Configuration(_)));

        let err = ScenarioMatrix::from_yaml(
            r#"
scenarios:
  - { label: a, subscriber: [subscriber], publisher: [publisher] }
  - { label: a, subscriber: [subscriber], publisher: [publisher] }
"#,
        )
        .unwrap_err();
        assert!(err.to_string().contains("duplicate"));
    }

    #[test]
    fn test_select_preserves_matrix_order() {
        let matrix = ScenarioMatrix::builtin(&MatrixOptions::default());
        let selected = matrix
            .clone()
            .select(&strings(&["reliable", "best-effort"]))
            .unwrap();
        let labels: Vec<_> = selected.scenarios.iter().map(|s| s.label.as_str()).collect();
        assert_eq!(labels, ["best-effort", "reliable"]);

        let err = matrix.select(&strings(&["nope"])).unwrap_err();
        assert!(err.to_string().contains("Available: best-effort, reliable"));
    }
}
