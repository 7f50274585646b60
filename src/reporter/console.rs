use super::Reporter;
use crate::results::{TestResult, TestStatus};
use std::fmt::Write as _;

/// Human-readable output: an indented tree with checkmarks, then a summary.
#[derive(Debug, Default)]
pub struct ConsoleReporter {
    label: String,
    results: Vec<TestResult>,
}

impl Reporter for ConsoleReporter {
    fn on_suite_complete(&mut self, results: &[TestResult], run_label: &str) {
        self.label = run_label.to_owned();
        self.results = results.to_vec();
    }

    fn generate_output(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "\n{}", self.label);

        let mut open: &[String] = &[];
        for result in &self.results {
            let parents = result.parents();
            // Print headers only for suites not already open from the previous result.
            let common = open
                .iter()
                .zip(parents)
                .take_while(|(a, b)| a == b)
                .count();
            for (depth, name) in parents.iter().enumerate().skip(common) {
                let _ = writeln!(out, "{}{name}", "  ".repeat(depth + 1));
            }
            open = parents;

            let indent = "  ".repeat(parents.len() + 1);
            match result.status {
                TestStatus::Passed => {
                    let _ = writeln!(out, "{indent}✓ {} ({:.2?})", result.name, result.duration);
                }
                TestStatus::Failed => {
                    let _ = writeln!(out, "{indent}✗ {} ({:.2?})", result.name, result.duration);
                    if let Some(error) = &result.error {
                        for line in error.lines() {
                            let _ = writeln!(out, "{indent}    {line}");
                        }
                    }
                }
                TestStatus::Skipped => {
                    let reason = result.skip_reason.as_deref().unwrap_or("skipped");
                    let _ = writeln!(out, "{indent}- {} ({reason})", result.name);
                }
            }
        }

        let count = |status| self.results.iter().filter(|r| r.status == status).count();
        let failed = count(TestStatus::Failed);
        let _ = writeln!(
            out,
            "\n{} passed, {failed} failed, {} skipped",
            count(TestStatus::Passed),
            count(TestStatus::Skipped)
        );

        if failed > 0 {
            out.push_str("\nFailures:\n");
            let failures = self
                .results
                .iter()
                .filter(|r| r.status == TestStatus::Failed);
            for (i, result) in failures.enumerate() {
                let _ = writeln!(
                    out,
                    "  {}. {}: {}",
                    i + 1,
                    result.full_name(),
                    result.error.as_deref().unwrap_or_default()
                );
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reporter::test_helpers::{result, sample};
    use crate::results::Outcome;

    #[test]
    fn renders_tree_and_summary() {
        let mut reporter = ConsoleReporter::default();
        reporter.on_suite_complete(&sample(), "suite.yaml");
        let output = reporter.generate_output();

        let expected_lines = [
            "suite.yaml",
            "  G",
            "    ✓ a (2.00ms)",
            "    ✗ b (5.00ms)",
            "        expected <1> & got \"2\"",
            "  H",
            "    - c (upstream flaky)",
            "1 passed, 1 failed, 1 skipped",
            "  1. G > b: expected <1> & got \"2\"",
        ];
        for line in expected_lines {
            assert!(
                output.lines().any(|l| l == line),
                "missing {line:?} in:\n{output}"
            );
        }
    }

    #[test]
    fn shared_prefix_is_printed_once() {
        let results = vec![
            result(&["G", "H", "a"], Outcome::passed(), 1),
            result(&["G", "H", "b"], Outcome::passed(), 1),
            result(&["G", "c"], Outcome::passed(), 1),
            result(&["top"], Outcome::passed(), 1),
        ];
        let mut reporter = ConsoleReporter::default();
        reporter.on_suite_complete(&results, "run");
        let output = reporter.generate_output();

        assert_eq!(output.lines().filter(|l| *l == "  G").count(), 1);
        assert_eq!(output.lines().filter(|l| *l == "    H").count(), 1);
        assert!(output.lines().any(|l| l == "    ✓ c (1.00ms)"), "{output}");
        assert!(output.lines().any(|l| l == "  ✓ top (1.00ms)"), "{output}");
        assert!(!output.contains("Failures:"));
    }
}
