use super::Reporter;
use crate::results::{TestResult, TestStatus};
use std::fmt::Write as _;

/// Test Anything Protocol, version 13.
#[derive(Debug, Default)]
pub struct TapReporter {
    label: String,
    results: Vec<TestResult>,
}

impl Reporter for TapReporter {
    fn on_suite_complete(&mut self, results: &[TestResult], run_label: &str) {
        self.label = run_label.to_owned();
        self.results = results.to_vec();
    }

    fn generate_output(&self) -> String {
        let mut out = String::from("TAP version 13\n");
        let _ = writeln!(out, "# {}", self.label);
        let _ = writeln!(out, "1..{}", self.results.len());

        for (i, result) in self.results.iter().enumerate() {
            let number = i + 1;
            let name = result.full_name();
            match result.status {
                TestStatus::Passed => {
                    let _ = writeln!(out, "ok {number} - {name}");
                }
                TestStatus::Skipped => {
                    let reason = result.skip_reason.as_deref().unwrap_or_default();
                    let _ = writeln!(out, "ok {number} - {name} # SKIP {reason}");
                }
                TestStatus::Failed => {
                    let _ = writeln!(out, "not ok {number} - {name}");
                    out.push_str("  ---\n");
                    let message = result.error.as_deref().unwrap_or_default();
                    if message.contains('\n') {
                        out.push_str("  message: |\n");
                        for line in message.lines() {
                            let _ = writeln!(out, "    {line}");
                        }
                    } else {
                        let _ = writeln!(out, "  message: {}", yaml_quote(message));
                    }
                    let _ = writeln!(out, "  duration_ms: {}", result.duration.as_millis());
                    out.push_str("  ...\n");
                }
            }
        }
        out
    }
}

fn yaml_quote(s: &str) -> String {
    format!("\"{}\"", s.replace('\\', "\\\\").replace('"', "\\\""))
}
