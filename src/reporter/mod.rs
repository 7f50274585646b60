//! Reporters consuming flattened test results.
//!
//! A reporter sees each test as it starts and finishes, then the complete ordered result list
//! once the run is over, and finally renders its report as a string.

mod console;
mod json;
mod junit;
mod mocha;
mod tap;

pub use console::ConsoleReporter;
pub use json::JsonReporter;
pub use junit::JunitReporter;
pub use mocha::MochaJsonReporter;
pub use tap::TapReporter;

use crate::config::ReporterKind;
use crate::results::TestResult;
use chrono::{DateTime, Utc};

/// Emitted right before a leaf test is evaluated.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TestStart {
    pub name: String,
    pub path: Vec<String>,
    pub start_time: DateTime<Utc>,
}

/// A consumer of test results.
pub trait Reporter: Send {
    /// Called before a leaf runs or is skipped.
    ///
    /// A leaf cut short by its enclosing suite's timeout gets no result of its own. The suite's
    /// timeout failure is reported through [`on_test_result`](Self::on_test_result) instead.
    fn on_test_start(&mut self, _start: &TestStart) {}

    fn on_test_result(&mut self, _result: &TestResult) {}

    /// Called exactly once per run with every result in execution order.
    fn on_suite_complete(&mut self, results: &[TestResult], run_label: &str);

    /// Render the report. Called after [`on_suite_complete`](Self::on_suite_complete).
    fn generate_output(&self) -> String;
}

/// Create the reporter for `kind`.
pub fn for_kind(kind: ReporterKind) -> Box<dyn Reporter> {
    match kind {
        ReporterKind::Console => Box::new(ConsoleReporter::default()),
        ReporterKind::Junit => Box::new(JunitReporter::default()),
        ReporterKind::Tap => Box::new(TapReporter::default()),
        ReporterKind::Json => Box::new(JsonReporter::default()),
        ReporterKind::MochaJson => Box::new(MochaJsonReporter::default()),
    }
}

/// Reporter that discards everything.
#[derive(Clone, Copy, Debug, Default)]
pub struct NullReporter;

impl Reporter for NullReporter {
    fn on_suite_complete(&mut self, _results: &[TestResult], _run_label: &str) {}

    fn generate_output(&self) -> String {
        String::new()
    }
}
