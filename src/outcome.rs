//! Types for evaluation results.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Why an evaluation could not reach the test run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FailureReason {
    /// Navigation to the page failed (DNS, TCP, TLS, timeout)
    #[serde(rename = "Origin Is Unreachable")]
    OriginUnreachable,

    /// An injected library or the named spec could not be loaded
    #[serde(rename = "Page Not Found")]
    ResourceNotFound,
}

impl FailureReason {
    /// Human-readable reason, as reported to consumers
    pub fn as_str(self) -> &'static str {
        match self {
            FailureReason::OriginUnreachable => "Origin Is Unreachable",
            FailureReason::ResourceNotFound => "Page Not Found",
        }
    }

    /// HTTP-style status code conventionally paired with the reason
    pub fn status_code(self) -> u16 {
        match self {
            FailureReason::OriginUnreachable => 523,
            FailureReason::ResourceNotFound => 404,
        }
    }
}

impl fmt::Display for FailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Raised when `details` presence disagrees with the failure count
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("failure details must be present exactly when failures > 0 (failures: {failures}, details present: {details_present})")]
pub struct InvalidOutcome {
    /// Failure count that was supplied
    pub failures: u32,
    /// Whether a details list was supplied
    pub details_present: bool,
}

/// Parsed summary of a completed suite run.
///
/// `details` is present exactly when `failures > 0`. It may be empty when the
/// report lists failures but none of them matched the detail pattern.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawTestOutcome")]
pub struct TestOutcome {
    url: String,
    passes: u32,
    failures: u32,
    duration: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<Vec<String>>,
}

#[derive(Deserialize)]
struct RawTestOutcome {
    url: String,
    passes: u32,
    failures: u32,
    duration: String,
    #[serde(default)]
    details: Option<Vec<String>>,
}

impl TryFrom<RawTestOutcome> for TestOutcome {
    type Error = InvalidOutcome;

    fn try_from(raw: RawTestOutcome) -> Result<Self, Self::Error> {
        TestOutcome::new(raw.url, raw.passes, raw.failures, raw.duration, raw.details)
    }
}

impl TestOutcome {
    /// Build an outcome, checking the failures/details invariant
    pub fn new(
        url: impl Into<String>,
        passes: u32,
        failures: u32,
        duration: impl Into<String>,
        details: Option<Vec<String>>,
    ) -> Result<Self, InvalidOutcome> {
        if details.is_some() != (failures > 0) {
            return Err(InvalidOutcome {
                failures,
                details_present: details.is_some(),
            });
        }
        Ok(Self {
            url: url.into(),
            passes,
            failures,
            duration: duration.into(),
            details,
        })
    }

    /// Outcome of a suite with no failures
    pub fn passed(url: impl Into<String>, passes: u32, duration: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            passes,
            failures: 0,
            duration: duration.into(),
            details: None,
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn passes(&self) -> u32 {
        self.passes
    }

    pub fn failures(&self) -> u32 {
        self.failures
    }

    /// Elapsed time as formatted by the test framework
    pub fn duration(&self) -> &str {
        &self.duration
    }

    /// Failed assertion descriptions, in report order
    pub fn details(&self) -> Option<&[String]> {
        self.details.as_deref()
    }

    /// True when every test passed
    pub fn is_success(&self) -> bool {
        self.failures == 0
    }
}

/// Evaluation that stopped before the suite ran
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EvaluationFailure {
    /// Page that was being evaluated
    pub url: String,

    /// Classified reason
    pub error: FailureReason,
}

impl EvaluationFailure {
    pub fn new(url: impl Into<String>, error: FailureReason) -> Self {
        Self {
            url: url.into(),
            error,
        }
    }
}

/// Result of one evaluation: either a parsed outcome or a classified failure
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum EvaluationResult {
    /// The suite ran and its report was parsed
    Outcome(TestOutcome),

    /// Navigation or injection failed
    Failure(EvaluationFailure),
}

impl EvaluationResult {
    /// Page the result belongs to
    pub fn url(&self) -> &str {
        match self {
            EvaluationResult::Outcome(outcome) => outcome.url(),
            EvaluationResult::Failure(failure) => &failure.url,
        }
    }
}

impl From<TestOutcome> for EvaluationResult {
    fn from(outcome: TestOutcome) -> Self {
        EvaluationResult::Outcome(outcome)
    }
}

impl From<EvaluationFailure> for EvaluationResult {
    fn from(failure: EvaluationFailure) -> Self {
        EvaluationResult::Failure(failure)
    }
}

/// One line of a batch run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvaluationRecord {
    /// Page that was evaluated
    pub url: String,

    /// Parsed result; `None` with no `fatal` means the report was unparseable
    pub result: Option<EvaluationResult>,

    /// Error that aborted the evaluation (timeout, script error, launch failure)
    pub fatal: Option<String>,
}

/// Result of grading a batch of pages against one spec
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchReport {
    /// Spec the pages were graded against
    pub spec: String,

    /// When the batch finished
    pub evaluated_at: DateTime<Utc>,

    /// One record per requested URL, in request order
    pub results: Vec<EvaluationRecord>,
}
