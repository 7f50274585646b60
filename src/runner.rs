//! Top-level invocation.
//!
//! A [`Runner`] walks one root suite, feeds every result to a reporter, and packages the outcome
//! as a [`RunReport`]. Failures escaping the root node are caught here and never propagate to
//! the caller.

use crate::ci;
use crate::config::RunConfig;
use crate::context::Context;
use crate::description::Suite;
use crate::errors::{RunError, WalkError};
use crate::helpers::panic_message;
use crate::reporter::{self, Reporter};
use crate::results::{
    FailedTest, RunSummary, TestResult, TestStatus, TestStructure, collect_failures,
};
use crate::walker::{Frame, Recorder, TEARDOWN_ENTRY, walk};
use futures::FutureExt;
use std::panic::AssertUnwindSafe;
use std::path::Path;
use std::sync::Arc;
use tracing::{error, info};

/// Runs root suites under one label and configuration.
#[derive(Clone, Debug)]
pub struct Runner {
    label: String,
    config: RunConfig,
    context: Context,
}

/// Everything a top-level run produced.
#[derive(Debug)]
pub struct RunReport {
    pub label: String,
    /// Nested outcomes mirroring the suite tree.
    pub structure: Vec<TestStructure>,
    pub summary: RunSummary,
    /// Failure that escaped the root node, or a report that could not be written.
    pub fatal: Option<RunError>,
    /// The reporter's rendered output.
    pub output: String,
    /// CI annotation lines, one per failed test.
    pub annotations: Vec<String>,
}

impl RunReport {
    pub fn is_success(&self) -> bool {
        self.fatal.is_none() && !self.summary.has_failures()
    }

    /// Process exit status for this run: 0 on success, 1 otherwise.
    pub fn exit_status(&self) -> i32 {
        if self.is_success() { 0 } else { 1 }
    }
}

impl Runner {
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            config: RunConfig::default(),
            context: Context::new(),
        }
    }

    pub fn with_config(mut self, config: RunConfig) -> Self {
        self.config = config;
        self
    }

    /// Seed the root context. Its `timeout` key sets the initial timeout override.
    pub fn with_context(mut self, context: Context) -> Self {
        self.context = context;
        self
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn config(&self) -> &RunConfig {
        &self.config
    }

    /// Run `suite` with the reporter selected by the configuration.
    pub async fn run(&self, suite: &Suite) -> RunReport {
        let mut reporter = reporter::for_kind(self.config.reporter);
        self.run_with_reporter(suite, reporter.as_mut()).await
    }

    /// Run `suite`, streaming results to `reporter`.
    pub async fn run_with_reporter(&self, suite: &Suite, reporter: &mut dyn Reporter) -> RunReport {
        info!(label = %self.label, tests = suite.test_count(), "starting run");

        if let Err(e) = suite.validate() {
            error!(label = %self.label, error = %e, "invalid suite description");
            return self.finish(reporter, Vec::new(), Vec::new(), Some(RunError::from(e)));
        }

        let mut recorder = Recorder::new(reporter);
        let frame = Frame::root(Arc::new(self.context.clone()));
        let walked = AssertUnwindSafe(walk(suite, frame, &mut recorder))
            .catch_unwind()
            .await
            .unwrap_or_else(|panic| Err(WalkError::Group(panic_message(&*panic))));

        let (structure, fatal) = match walked {
            Ok(structure) => (structure, None),
            Err(e) => {
                error!(label = %self.label, error = %e, "run aborted");
                let entry = recorder.synthetic_failure(&[], TEARDOWN_ENTRY, e.to_string());
                (vec![entry], Some(RunError::from(e)))
            }
        };

        let (results, reporter) = recorder.into_parts();
        self.finish(reporter, structure, results, fatal)
    }

    /// Run `suite` to completion on a fresh current-thread runtime.
    pub fn run_blocking(&self, suite: &Suite) -> Result<RunReport, RunError> {
        let rt = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(RunError::Runtime)?;
        Ok(rt.block_on(self.run(suite)))
    }

    fn finish(
        &self,
        reporter: &mut dyn Reporter,
        structure: Vec<TestStructure>,
        results: Vec<TestResult>,
        mut fatal: Option<RunError>,
    ) -> RunReport {
        // The structure is lost when the root fails, so fall back to the flattened results.
        let failed_tests = if fatal.is_some() {
            failures_from_results(&results)
        } else {
            collect_failures(&structure)
        };

        reporter.on_suite_complete(&results, &self.label);
        let output = reporter.generate_output();
        let summary = RunSummary::new(results, failed_tests);

        if let Some(path) = &self.config.output_file
            && let Err(source) = write_output(path, &output)
        {
            error!(path = %path.display(), error = %source, "failed to write report");
            fatal.get_or_insert(RunError::WriteOutput {
                path: path.clone(),
                source,
            });
        }

        let annotations = self
            .config
            .ci
            .map(|kind| ci::annotations(kind, &summary.failed_tests))
            .unwrap_or_default();

        info!(
            label = %self.label,
            passed = summary.passed,
            failed = summary.failed,
            skipped = summary.skipped,
            "run finished"
        );

        RunReport {
            label: self.label.clone(),
            structure,
            summary,
            fatal,
            output,
            annotations,
        }
    }
}

fn failures_from_results(results: &[TestResult]) -> Vec<FailedTest> {
    results
        .iter()
        .filter(|r| r.status == TestStatus::Failed)
        .map(|r| FailedTest {
            path: r.path.clone(),
            error: r.error.clone().unwrap_or_default(),
        })
        .collect()
}

fn write_output(path: &Path, output: &str) -> std::io::Result<()> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, output)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{CiKind, ReporterKind};
    use crate::reporter::NullReporter;
    use crate::results::{Outcome, StructureContent};

    fn sample_suite() -> Suite {
        Suite::new()
            .test_sync("a", |_| ())
            .suite("G", Suite::new().test_sync("b", |_| "boom"))
    }

    #[tokio::test]
    async fn report_collects_summary_and_failures() {
        let report = Runner::new("sample")
            .run_with_reporter(&sample_suite(), &mut NullReporter)
            .await;

        assert_eq!(report.label, "sample");
        assert_eq!(report.summary.total, 2);
        assert_eq!(report.summary.passed, 1);
        assert_eq!(report.summary.failed, 1);
        assert_eq!(
            report.summary.failed_tests,
            [FailedTest {
                path: vec!["G".to_string(), "b".to_string()],
                error: "boom".to_string(),
            }]
        );
        assert!(report.fatal.is_none());
        assert_eq!(report.exit_status(), 1);
        assert!(report.annotations.is_empty());
    }

    #[tokio::test]
    async fn passing_run_exits_zero() {
        let report = Runner::new("ok")
            .run(&Suite::new().test_sync("a", |_| ()))
            .await;
        assert!(report.is_success());
        assert_eq!(report.exit_status(), 0);
        assert!(report.output.contains("1 passed, 0 failed, 0 skipped"));
    }

    #[tokio::test]
    async fn root_teardown_failure_is_fatal() {
        let suite = Suite::new()
            .teardown_sync(|_| Err::<(), _>("socket closed"))
            .test_sync("a", |_| ());
        let report = Runner::new("root")
            .run_with_reporter(&suite, &mut NullReporter)
            .await;

        assert!(matches!(
            report.fatal,
            Some(RunError::Walk(WalkError::Teardown(ref msg))) if msg == "socket closed"
        ));
        assert_eq!(
            report.structure,
            [TestStructure::outcome(
                TEARDOWN_ENTRY,
                Outcome::failed("Teardown failed with: 'socket closed'")
            )]
        );
        // The leaf ran before the teardown and is still reported.
        assert_eq!(report.summary.total, 2);
        assert_eq!(report.summary.passed, 1);
        assert_eq!(report.summary.failed_tests.len(), 1);
        assert_eq!(report.summary.failed_tests[0].path, [TEARDOWN_ENTRY]);
        assert_eq!(report.exit_status(), 1);
    }

    #[tokio::test]
    async fn invalid_description_is_fatal_without_running() {
        let suite = Suite::new().test_sync("setup", |_| ());
        let report = Runner::new("bad")
            .run_with_reporter(&suite, &mut NullReporter)
            .await;
        assert!(matches!(report.fatal, Some(RunError::Description(_))));
        assert_eq!(report.summary.total, 0);
        assert_eq!(report.exit_status(), 1);
    }

    #[tokio::test]
    async fn initial_context_reaches_tests() {
        let suite = Suite::new().test_sync("reads", |ctx: crate::context::SharedContext| {
            (ctx.get_str("db") != Some("memory")).then_some("missing db")
        });
        let report = Runner::new("ctx")
            .with_context(Context::new().with("db", "memory"))
            .run_with_reporter(&suite, &mut NullReporter)
            .await;
        assert!(report.is_success(), "{:?}", report.summary.results);
    }

    #[tokio::test]
    async fn writes_output_file_and_annotations() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("reports").join("junit.xml");
        let config = RunConfig {
            reporter: ReporterKind::Junit,
            output_file: Some(path.clone()),
            ci: Some(CiKind::Github),
        };

        let report = Runner::new("ci run")
            .with_config(config)
            .run(&sample_suite())
            .await;

        let written = std::fs::read_to_string(&path).unwrap();
        assert_eq!(written, report.output);
        assert!(written.starts_with("<?xml"));
        assert_eq!(report.annotations, ["::error title=G > b::boom"]);
    }

    #[tokio::test]
    async fn unwritable_output_file_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("file");
        std::fs::write(&blocker, "").unwrap();
        let config = RunConfig {
            output_file: Some(blocker.join("report.txt")),
            ..Default::default()
        };

        let report = Runner::new("io")
            .with_config(config)
            .run(&Suite::new().test_sync("a", |_| ()))
            .await;
        assert!(matches!(report.fatal, Some(RunError::WriteOutput { .. })));
        assert_eq!(report.summary.passed, 1);
        assert_eq!(report.exit_status(), 1);
    }

    #[test]
    fn run_blocking_builds_its_own_runtime() {
        let report = Runner::new("blocking")
            .run_blocking(&sample_suite())
            .unwrap();
        assert_eq!(report.summary.total, 2);
        assert!(matches!(
            report.structure[1].content,
            StructureContent::Children(_)
        ));
    }
}
