use super::Reporter;
use crate::results::{TestResult, TestStatus};
use serde::Serialize;

/// Machine-readable JSON output.
#[derive(Debug, Default)]
pub struct JsonReporter {
    label: String,
    results: Vec<TestResult>,
}

#[derive(Serialize)]
struct JsonReport<'a> {
    label: &'a str,
    total: usize,
    passed: usize,
    failed: usize,
    skipped: usize,
    results: &'a [TestResult],
}

impl Reporter for JsonReporter {
    fn on_suite_complete(&mut self, results: &[TestResult], run_label: &str) {
        self.label = run_label.to_owned();
        self.results = results.to_vec();
    }

    fn generate_output(&self) -> String {
        let count = |status| self.results.iter().filter(|r| r.status == status).count();
        let report = JsonReport {
            label: &self.label,
            total: self.results.len(),
            passed: count(TestStatus::Passed),
            failed: count(TestStatus::Failed),
            skipped: count(TestStatus::Skipped),
            results: &self.results,
        };
        // Serializing plain strings, numbers and sequences cannot fail.
        serde_json::to_string_pretty(&report).unwrap_or_default()
    }
}
