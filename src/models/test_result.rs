//! Test case and result models
//!
//! Defines the registered e2e test cases, their results and run summaries.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

const SIG: &str = "[sig-openshift-controller-manager]";

/// All e2e test cases
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TestCase {
    OperatorStatus,
    TlsProfilePropagation,
}

impl TestCase {
    /// Describe block the case belongs to
    pub fn describe(&self) -> &'static str {
        match self {
            TestCase::OperatorStatus => "Operator Status",
            TestCase::TlsProfilePropagation => "TLS Security Profile",
        }
    }

    /// Case title including its bracketed labels
    pub fn title(&self) -> &'static str {
        match self {
            TestCase::OperatorStatus => {
                "[Operator] should report core ClusterOperator conditions"
            }
            TestCase::TlsProfilePropagation => {
                "[Operator][TLS][Serial] should propagate Modern TLS profile from APIServer to OpenShift Controller Manager"
            }
        }
    }

    /// Full registered test name
    pub fn name(&self) -> String {
        format!("{SIG} {} {}", self.describe(), self.title())
    }

    /// Get all test cases
    pub fn all() -> Vec<TestCase> {
        vec![TestCase::OperatorStatus, TestCase::TlsProfilePropagation]
    }
}

impl fmt::Display for TestCase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Test execution status
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum TestStatus {
    #[serde(rename = "passed")]
    Pass,
    #[serde(rename = "failed")]
    Fail,
    #[serde(rename = "skipped")]
    Skip,
    #[serde(rename = "error")]
    Error,
}

impl TestStatus {
    pub fn symbol(&self) -> &'static str {
        match self {
            TestStatus::Pass => "✓",
            TestStatus::Fail => "✗",
            TestStatus::Skip => "○",
            TestStatus::Error => "!",
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, TestStatus::Pass)
    }
}

impl fmt::Display for TestStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TestStatus::Pass => write!(f, "PASS"),
            TestStatus::Fail => write!(f, "FAIL"),
            TestStatus::Skip => write!(f, "SKIP"),
            TestStatus::Error => write!(f, "ERROR"),
        }
    }
}

/// Result of a single test execution
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TestResult {
    pub name: String,
    #[serde(rename = "result")]
    pub status: TestStatus,
    /// Duration in milliseconds
    #[serde(rename = "duration")]
    pub duration_ms: u64,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl TestResult {
    fn finished(
        test_case: TestCase,
        status: TestStatus,
        start_time: DateTime<Utc>,
        duration: Duration,
        error: Option<String>,
    ) -> Self {
        let end_time = start_time
            + chrono::Duration::from_std(duration).unwrap_or_else(|_| chrono::Duration::zero());
        Self {
            name: test_case.name(),
            status,
            duration_ms: duration.as_millis() as u64,
            start_time,
            end_time,
            error,
        }
    }

    pub fn pass(test_case: TestCase, start_time: DateTime<Utc>, duration: Duration) -> Self {
        Self::finished(test_case, TestStatus::Pass, start_time, duration, None)
    }

    pub fn fail(
        test_case: TestCase,
        start_time: DateTime<Utc>,
        duration: Duration,
        message: impl Into<String>,
    ) -> Self {
        Self::finished(
            test_case,
            TestStatus::Fail,
            start_time,
            duration,
            Some(message.into()),
        )
    }

    pub fn error(test_case: TestCase, error: impl Into<String>) -> Self {
        Self::finished(
            test_case,
            TestStatus::Error,
            Utc::now(),
            Duration::ZERO,
            Some(error.into()),
        )
    }
}

impl fmt::Display for TestResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} [{}ms]",
            self.status.symbol(),
            self.name,
            self.duration_ms
        )?;
        if let Some(err) = &self.error {
            write!(f, " - {err}")?;
        }
        Ok(())
    }
}

/// Summary of one run-test or run-suite invocation
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RunSummary {
    pub suite: Option<String>,
    pub total: usize,
    pub passed: usize,
    pub failed: usize,
    pub skipped: usize,
    pub errors: usize,
    pub total_duration_ms: u64,
    pub results: Vec<TestResult>,
}

impl RunSummary {
    pub fn new(suite: Option<String>, results: Vec<TestResult>) -> Self {
        let count = |status: TestStatus| results.iter().filter(|r| r.status == status).count();

        Self {
            suite,
            total: results.len(),
            passed: count(TestStatus::Pass),
            failed: count(TestStatus::Fail),
            skipped: count(TestStatus::Skip),
            errors: count(TestStatus::Error),
            total_duration_ms: results.iter().map(|r| r.duration_ms).sum(),
            results,
        }
    }

    pub fn pass_rate(&self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            (self.passed as f64 / self.total as f64) * 100.0
        }
    }

    /// Every test passed or was skipped
    pub fn is_success(&self) -> bool {
        self.failed == 0 && self.errors == 0
    }
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(suite) = &self.suite {
            writeln!(f, "Suite {suite}")?;
        }
        writeln!(f, "━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━")?;
        for result in &self.results {
            writeln!(f, "  {result}")?;
        }
        writeln!(f, "━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━")?;
        writeln!(
            f,
            "Total: {} | Pass: {} | Fail: {} | Skip: {} | Error: {}",
            self.total, self.passed, self.failed, self.skipped, self.errors
        )?;
        writeln!(
            f,
            "Pass Rate: {:.1}% | Duration: {}ms",
            self.pass_rate(),
            self.total_duration_ms
        )
    }
}
