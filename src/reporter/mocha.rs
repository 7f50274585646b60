use super::{Reporter, TestStart};
use crate::results::{TestResult, TestStatus};
use chrono::{DateTime, SecondsFormat, Utc};
use serde::Serialize;
use serde_json::{Value, json};
use std::collections::HashSet;

/// Output in the shape of Mocha's `json` reporter.
#[derive(Debug, Default)]
pub struct MochaJsonReporter {
    label: String,
    results: Vec<TestResult>,
    start: Option<DateTime<Utc>>,
    end: Option<DateTime<Utc>>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct MochaStats {
    suites: usize,
    tests: usize,
    passes: usize,
    pending: usize,
    failures: usize,
    start: String,
    end: String,
    duration: i64,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct MochaTest<'a> {
    title: &'a str,
    full_title: String,
    file: &'a str,
    duration: u64,
    current_retry: u32,
    err: Value,
}

impl MochaJsonReporter {
    fn test<'a>(&'a self, result: &'a TestResult) -> MochaTest<'a> {
        let err = match &result.error {
            Some(message) => json!({ "message": message }),
            None => json!({}),
        };
        MochaTest {
            title: &result.name,
            full_title: result.path.join(" "),
            file: &self.label,
            duration: u64::try_from(result.duration.as_millis()).unwrap_or(u64::MAX),
            current_retry: 0,
            err,
        }
    }

    fn with_status(&self, status: TestStatus) -> Vec<MochaTest<'_>> {
        self.results
            .iter()
            .filter(|r| r.status == status)
            .map(|r| self.test(r))
            .collect()
    }
}

impl Reporter for MochaJsonReporter {
    fn on_test_start(&mut self, start: &TestStart) {
        self.start.get_or_insert(start.start_time);
    }

    fn on_suite_complete(&mut self, results: &[TestResult], run_label: &str) {
        self.label = run_label.to_owned();
        self.results = results.to_vec();
        let end = Utc::now();
        self.start.get_or_insert(end);
        self.end = Some(end);
    }

    fn generate_output(&self) -> String {
        let end = self.end.unwrap_or_else(Utc::now);
        let start = self.start.unwrap_or(end);
        let suites: HashSet<&[String]> = self.results.iter().map(|r| r.parents()).collect();

        let stats = MochaStats {
            suites: suites.len(),
            tests: self.results.len(),
            passes: self.with_status(TestStatus::Passed).len(),
            pending: self.with_status(TestStatus::Skipped).len(),
            failures: self.with_status(TestStatus::Failed).len(),
            start: start.to_rfc3339_opts(SecondsFormat::Millis, true),
            end: end.to_rfc3339_opts(SecondsFormat::Millis, true),
            duration: (end - start).num_milliseconds(),
        };

        let report = json!({
            "stats": stats,
            "tests": self.results.iter().map(|r| self.test(r)).collect::<Vec<_>>(),
            "pending": self.with_status(TestStatus::Skipped),
            "failures": self.with_status(TestStatus::Failed),
            "passes": self.with_status(TestStatus::Passed),
        });
        serde_json::to_string_pretty(&report).unwrap_or_default()
    }
}
