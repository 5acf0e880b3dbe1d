//! Smoke check results and the aggregated run report.

use std::time::Duration;

use serde::Serialize;
use tabled::builder::Builder;
use tabled::settings::Style;

use crate::SmokeError;

/// Group a check belongs to, in run order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Health,
    Auth,
    Clients,
    Therapists,
    Appointments,
    Import,
    Cleanup,
}

impl Phase {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Health => "health",
            Self::Auth => "auth",
            Self::Clients => "clients",
            Self::Therapists => "therapists",
            Self::Appointments => "appointments",
            Self::Import => "import",
            Self::Cleanup => "cleanup",
        }
    }
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    Passed,
    Failed,
    Skipped,
}

impl Outcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Passed => "passed",
            Self::Failed => "FAILED",
            Self::Skipped => "skipped",
        }
    }
}

/// What a check reports when it does not fail.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Check {
    Passed(String),
    Skipped(String),
}

pub type CheckResult = Result<Check, SmokeError>;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TestResult {
    pub name: String,
    pub phase: Phase,
    pub outcome: Outcome,
    #[serde(rename = "duration_ms", serialize_with = "as_millis")]
    pub duration: Duration,
    pub message: String,
}

impl TestResult {
    pub fn from_check(phase: Phase, name: &str, duration: Duration, result: CheckResult) -> Self {
        let (outcome, message) = match result {
            Ok(Check::Passed(message)) => (Outcome::Passed, message),
            Ok(Check::Skipped(reason)) => (Outcome::Skipped, reason),
            Err(e) => (Outcome::Failed, e.to_string()),
        };
        Self {
            name: name.to_string(),
            phase,
            outcome,
            duration,
            message,
        }
    }
}

fn as_millis<S: serde::Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_u64(d.as_millis() as u64)
}

/// Every result of one run, in execution order.
#[derive(Debug, Clone, Default, Serialize)]
pub struct SmokeReport {
    pub results: Vec<TestResult>,
}

impl SmokeReport {
    pub fn push(&mut self, result: TestResult) {
        match result.outcome {
            Outcome::Passed => {
                tracing::info!(phase = %result.phase, test = %result.name, "Check passed");
            }
            Outcome::Skipped => {
                tracing::info!(
                    phase = %result.phase,
                    test = %result.name,
                    reason = %result.message,
                    "Check skipped",
                );
            }
            Outcome::Failed => {
                tracing::error!(
                    phase = %result.phase,
                    test = %result.name,
                    error = %result.message,
                    "Check failed",
                );
            }
        }
        self.results.push(result);
    }

    pub fn count(&self, outcome: Outcome) -> usize {
        self.results.iter().filter(|r| r.outcome == outcome).count()
    }

    pub fn passed(&self) -> usize {
        self.count(Outcome::Passed)
    }

    pub fn failed(&self) -> usize {
        self.count(Outcome::Failed)
    }

    pub fn skipped(&self) -> usize {
        self.count(Outcome::Skipped)
    }

    /// No check failed. Skipped checks do not count against the run.
    pub fn is_success(&self) -> bool {
        self.failed() == 0
    }

    pub fn result(&self, name: &str) -> Option<&TestResult> {
        self.results.iter().find(|r| r.name == name)
    }

    pub fn total_duration(&self) -> Duration {
        self.results.iter().map(|r| r.duration).sum()
    }

    /// Table of all results followed by a one-line summary.
    pub fn render(&self) -> String {
        let mut table = Builder::default();
        table.push_record(["Phase", "Test", "Result", "Time", "Message"]);
        for r in &self.results {
            table.push_record([
                r.phase.to_string(),
                r.name.clone(),
                r.outcome.as_str().to_string(),
                format!("{} ms", r.duration.as_millis()),
                r.message.clone(),
            ]);
        }

        let mut output = table.build().with(Style::modern()).to_string();
        output.push_str(&format!(
            "\n{} passed, {} failed, {} skipped in {:.1}s\n",
            self.passed(),
            self.failed(),
            self.skipped(),
            self.total_duration().as_secs_f64()
        ));
        output
    }
}
