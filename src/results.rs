//! Test outcomes, in tree and flattened form.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// The outcome of one leaf test, or of a synthetic entry standing in for a suite.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Outcome {
    /// The skip reason, if the entry was skipped.
    pub skipped: Option<String>,
    /// The failure message, `None` when the entry passed or was skipped.
    pub error: Option<String>,
}

impl Outcome {
    pub fn passed() -> Self {
        Self {
            skipped: None,
            error: None,
        }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            skipped: None,
            error: Some(error.into()),
        }
    }

    pub fn skipped(reason: impl Into<String>) -> Self {
        Self {
            skipped: Some(reason.into()),
            error: None,
        }
    }

    pub fn status(&self) -> TestStatus {
        if self.error.is_some() {
            TestStatus::Failed
        } else if self.skipped.is_some() {
            TestStatus::Skipped
        } else {
            TestStatus::Passed
        }
    }
}

/// Final status of a flattened test result.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TestStatus {
    Passed,
    Failed,
    Skipped,
}

impl fmt::Display for TestStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            TestStatus::Passed => "passed",
            TestStatus::Failed => "failed",
            TestStatus::Skipped => "skipped",
        })
    }
}

/// One test's outcome with its full path from the root.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct TestResult {
    pub name: String,
    /// Suite names from the root down to and including `name`.
    pub path: Vec<String>,
    pub status: TestStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub skip_reason: Option<String>,
    #[serde(serialize_with = "serialize_duration_ms")]
    pub duration: Duration,
}

impl TestResult {
    pub fn from_outcome(path: &[String], outcome: &Outcome, duration: Duration) -> Self {
        Self {
            name: path.last().cloned().unwrap_or_default(),
            path: path.to_vec(),
            status: outcome.status(),
            error: outcome.error.clone(),
            skip_reason: outcome.skipped.clone(),
            duration,
        }
    }

    /// The path joined for display, e.g. `G > b`.
    pub fn full_name(&self) -> String {
        self.path.join(" > ")
    }

    /// The enclosing suites' path, without the test name.
    pub fn parents(&self) -> &[String] {
        &self.path[..self.path.len().saturating_sub(1)]
    }
}

pub(crate) fn serialize_duration_ms<S>(
    duration: &Duration,
    serializer: S,
) -> Result<S::Ok, S::Error>
where
    S: serde::Serializer,
{
    serializer.serialize_f64(duration.as_secs_f64() * 1000.0)
}

/// The content of one node in the result tree.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum StructureContent {
    Outcome(Outcome),
    Children(Vec<TestStructure>),
    /// A bare name with no result attached. The walker never produces one; failure
    /// collection skips it.
    Placeholder,
}

/// A named node of the result tree, in declaration order.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TestStructure {
    pub name: String,
    pub content: StructureContent,
}

impl TestStructure {
    pub fn outcome(name: impl Into<String>, outcome: Outcome) -> Self {
        Self {
            name: name.into(),
            content: StructureContent::Outcome(outcome),
        }
    }

    pub fn children(name: impl Into<String>, children: Vec<TestStructure>) -> Self {
        Self {
            name: name.into(),
            content: StructureContent::Children(children),
        }
    }
}

/// A failure found in the result tree.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct FailedTest {
    pub path: Vec<String>,
    pub error: String,
}

/// Collect every failing outcome in the tree, in pre-order.
pub fn collect_failures(structure: &[TestStructure]) -> Vec<FailedTest> {
    let mut failures = Vec::new();
    collect_failures_into(structure, &mut Vec::new(), &mut failures);
    failures
}

fn collect_failures_into(
    structure: &[TestStructure],
    path: &mut Vec<String>,
    failures: &mut Vec<FailedTest>,
) {
    for node in structure {
        path.push(node.name.clone());
        match &node.content {
            StructureContent::Outcome(outcome) => {
                if let Some(error) = &outcome.error {
                    failures.push(FailedTest {
                        path: path.clone(),
                        error: error.clone(),
                    });
                }
            }
            StructureContent::Children(children) => collect_failures_into(children, path, failures),
            StructureContent::Placeholder => {}
        }
        path.pop();
    }
}

/// Counts and records for a whole run.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct RunSummary {
    pub total: usize,
    pub passed: usize,
    pub failed: usize,
    pub skipped: usize,
    pub failed_tests: Vec<FailedTest>,
    pub results: Vec<TestResult>,
}

impl RunSummary {
    pub fn new(results: Vec<TestResult>, failed_tests: Vec<FailedTest>) -> Self {
        let count = |status| results.iter().filter(|r| r.status == status).count();
        Self {
            total: results.len(),
            passed: count(TestStatus::Passed),
            failed: count(TestStatus::Failed),
            skipped: count(TestStatus::Skipped),
            failed_tests,
            results,
        }
    }

    pub fn has_failures(&self) -> bool {
        self.failed > 0 || !self.failed_tests.is_empty()
    }
}
