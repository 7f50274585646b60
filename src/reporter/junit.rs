use super::Reporter;
use crate::results::{TestResult, TestStatus};
use indexmap::IndexMap;
use std::fmt::Write as _;
use std::time::Duration;

/// JUnit XML for CI systems.
///
/// Each distinct parent path becomes a `<testsuite>`, in order of first appearance. Tests at the
/// root of the run are grouped under the run label.
#[derive(Debug, Default)]
pub struct JunitReporter {
    label: String,
    results: Vec<TestResult>,
}

impl Reporter for JunitReporter {
    fn on_suite_complete(&mut self, results: &[TestResult], run_label: &str) {
        self.label = run_label.to_owned();
        self.results = results.to_vec();
    }

    fn generate_output(&self) -> String {
        let mut suites: IndexMap<String, Vec<&TestResult>> = IndexMap::new();
        for result in &self.results {
            let suite = if result.parents().is_empty() {
                self.label.clone()
            } else {
                result.parents().join(" > ")
            };
            suites.entry(suite).or_default().push(result);
        }

        let mut xml = String::new();
        xml.push_str("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n");

        let all: Vec<&TestResult> = self.results.iter().collect();
        let _ = writeln!(
            xml,
            "<testsuites name=\"{}\" tests=\"{}\" failures=\"{}\" skipped=\"{}\" time=\"{:.3}\">",
            escape_xml(&self.label),
            all.len(),
            count(&all, TestStatus::Failed),
            count(&all, TestStatus::Skipped),
            total_time(&all).as_secs_f64()
        );

        for (name, tests) in &suites {
            let _ = writeln!(
                xml,
                "  <testsuite name=\"{}\" tests=\"{}\" \
                 failures=\"{}\" skipped=\"{}\" time=\"{:.3}\">",
                escape_xml(name),
                tests.len(),
                count(tests, TestStatus::Failed),
                count(tests, TestStatus::Skipped),
                total_time(tests).as_secs_f64()
            );

            for test in tests {
                let _ = writeln!(
                    xml,
                    "    <testcase name=\"{}\" classname=\"{}\" time=\"{:.3}\">",
                    escape_xml(&test.name),
                    escape_xml(name),
                    test.duration.as_secs_f64()
                );

                match test.status {
                    TestStatus::Failed => {
                        let message = test.error.as_deref().unwrap_or("Test failed");
                        let first_line = message.lines().next().unwrap_or(message);
                        let _ = writeln!(
                            xml,
                            "      <failure message=\"{}\">{}</failure>",
                            escape_xml(first_line),
                            escape_xml(message)
                        );
                    }
                    TestStatus::Skipped => {
                        let _ = writeln!(
                            xml,
                            "      <skipped message=\"{}\"/>",
                            escape_xml(test.skip_reason.as_deref().unwrap_or_default())
                        );
                    }
                    TestStatus::Passed => {}
                }

                xml.push_str("    </testcase>\n");
            }

            xml.push_str("  </testsuite>\n");
        }

        xml.push_str("</testsuites>\n");
        xml
    }
}

fn count(tests: &[&TestResult], status: TestStatus) -> usize {
    tests.iter().filter(|t| t.status == status).count()
}

fn total_time(tests: &[&TestResult]) -> Duration {
    tests.iter().map(|t| t.duration).sum()
}

/// Escape special XML characters.
fn escape_xml(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reporter::test_helpers::{result, sample};
    use crate::results::Outcome;

    #[test]
    fn groups_by_parent_path() {
        let mut reporter = JunitReporter::default();
        reporter.on_suite_complete(&sample(), "suite.yaml");
        let xml = reporter.generate_output();

        assert!(xml.starts_with("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n"));
        assert!(xml.contains(
            "<testsuites name=\"suite.yaml\" tests=\"3\" \
             failures=\"1\" skipped=\"1\" time=\"0.007\">"
        ));
        assert!(xml.contains(
            "<testsuite name=\"G\" tests=\"2\" failures=\"1\" skipped=\"0\" time=\"0.007\">"
        ));
        assert!(xml.contains("<testcase name=\"a\" classname=\"G\" time=\"0.002\">"));
        assert!(xml.contains("<skipped message=\"upstream flaky\"/>"));
        assert!(xml.ends_with("</testsuites>\n"));
    }

    #[test]
    fn escapes_failure_messages() {
        let mut reporter = JunitReporter::default();
        reporter.on_suite_complete(&sample(), "suite.yaml");
        let xml = reporter.generate_output();

        assert!(xml.contains(
            "<failure message=\"expected &lt;1&gt; &amp; got &quot;2&quot;\">"
        ));
        assert!(!xml.contains("<1>"));
    }

    #[test]
    fn root_level_tests_use_run_label() {
        let results = vec![result(&["solo"], Outcome::passed(), 1)];
        let mut reporter = JunitReporter::default();
        reporter.on_suite_complete(&results, "root.yaml");
        let xml = reporter.generate_output();

        assert!(xml.contains("<testsuite name=\"root.yaml\" tests=\"1\""));
        assert!(xml.contains("<testcase name=\"solo\" classname=\"root.yaml\""));
    }

    #[test]
    fn escape_xml_all_entities() {
        assert_eq!(escape_xml("<a href='x'>&\""), "&lt;a href=&apos;x&apos;&gt;&amp;&quot;");
    }
}
