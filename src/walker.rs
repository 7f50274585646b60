//! The recursive suite walker.
//!
//! Each node goes through skip evaluation, setup, its entries in declaration order, then
//! teardown. Leaf failures are recorded and never stop iteration; a failing nested suite is
//! recorded against its own name; only the node's teardown failure escapes to the caller.

use crate::context::{SharedContext, derive_context};
use crate::description::{Entry, Suite, TeardownFn, TestFn};
use crate::errors::WalkError;
use crate::helpers::panic_message;
use crate::reporter::{Reporter, TestStart};
use crate::results::{Outcome, StructureContent, TestResult, TestStructure};
use crate::skip::{SkipAction, evaluate_skip};
use crate::timeout::{DEFAULT_GROUP_TIMEOUT, DEFAULT_TEST_TIMEOUT, with_timeout};
use chrono::Utc;
use futures::FutureExt;
use futures::future::BoxFuture;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, info, warn};

/// Entry name for a suite whose skip has expired.
pub(crate) const SKIP_ENTRY: &str = "<skip>";
/// Entry name for a suite whose setup failed.
pub(crate) const SETUP_ENTRY: &str = "<setup>";
/// Entry name for a root teardown failure.
pub(crate) const TEARDOWN_ENTRY: &str = "<teardown>";

/// Run-scoped sink for flattened results. Results are appended in execution order.
pub(crate) struct Recorder<'r> {
    results: Vec<TestResult>,
    reporter: &'r mut dyn Reporter,
}

impl<'r> Recorder<'r> {
    pub(crate) fn new(reporter: &'r mut dyn Reporter) -> Self {
        Self {
            results: Vec::new(),
            reporter,
        }
    }

    fn started(&mut self, path: &[String]) {
        self.reporter.on_test_start(&TestStart {
            name: path.last().cloned().unwrap_or_default(),
            path: path.to_vec(),
            start_time: Utc::now(),
        });
    }

    pub(crate) fn record(&mut self, result: TestResult) {
        self.reporter.on_test_result(&result);
        self.results.push(result);
    }

    /// Record a failed pseudo-entry named `name` below `path`.
    pub(crate) fn synthetic_failure(
        &mut self,
        path: &[String],
        name: &str,
        message: String,
    ) -> TestStructure {
        let mut entry_path = path.to_vec();
        entry_path.push(name.to_owned());
        let outcome = Outcome::failed(message);
        self.record(TestResult::from_outcome(
            &entry_path,
            &outcome,
            Duration::ZERO,
        ));
        TestStructure::outcome(name, outcome)
    }

    pub(crate) fn into_parts(self) -> (Vec<TestResult>, &'r mut dyn Reporter) {
        (self.results, self.reporter)
    }
}

/// What a node inherits from its ancestors.
pub(crate) struct Frame {
    /// Reason an ancestor (or the node itself) is skipped.
    pub(crate) skipping: Option<String>,
    pub(crate) depth: usize,
    pub(crate) context: SharedContext,
    pub(crate) path: Vec<String>,
    /// Timeout override in effect, if any.
    pub(crate) timeout: Option<Duration>,
    /// Nearest timeout declared on the node or an ancestor.
    pub(crate) declared: Option<Duration>,
}

impl Frame {
    pub(crate) fn root(context: SharedContext) -> Self {
        let timeout = context.timeout();
        Self {
            skipping: None,
            depth: 0,
            context,
            path: Vec::new(),
            timeout,
            declared: None,
        }
    }
}

/// Walk one suite node and everything below it.
pub(crate) fn walk<'a, 'r: 'a>(
    suite: &'a Suite,
    frame: Frame,
    recorder: &'a mut Recorder<'r>,
) -> BoxFuture<'a, Result<Vec<TestStructure>, WalkError>> {
    async move {
        let Frame {
            mut skipping,
            depth,
            context: parent,
            path,
            timeout: inherited_timeout,
            declared: inherited_declared,
        } = frame;
        debug!(depth, path = %display_path(&path), "entering suite");

        match evaluate_skip(suite.skip.as_ref(), skipping.as_deref()) {
            SkipAction::Fail(message) => {
                warn!(path = %display_path(&path), "{message}");
                return Ok(vec![recorder.synthetic_failure(&path, SKIP_ENTRY, message)]);
            }
            SkipAction::Skip(reason) => {
                if skipping.is_none() {
                    info!(path = %display_path(&path), %reason, "skipping suite");
                    skipping = Some(reason);
                }
            }
            SkipAction::Run => {}
        }

        // Skipped nodes never run their own setup.
        let context = if skipping.is_none() {
            match derive_context(suite.setup.as_ref(), &parent).await {
                Ok(context) => context,
                Err(message) => {
                    let message = format!("Setup failed with: '{message}'");
                    warn!(path = %display_path(&path), "{message}");
                    return Ok(vec![recorder.synthetic_failure(&path, SETUP_ENTRY, message)]);
                }
            }
        } else {
            parent
        };

        // A context produced here replaces any override read from an older context.
        let produced_context = skipping.is_none() && suite.setup.is_some();
        let declared = suite.timeout.or(inherited_declared);
        let timeout = match suite.timeout {
            Some(own) => Some(own),
            None if produced_context => context.timeout().or(inherited_declared),
            None => inherited_timeout,
        };

        let mut structure = Vec::with_capacity(suite.entries.len());
        for (name, entry) in &suite.entries {
            let mut entry_path = path.clone();
            entry_path.push(name.clone());

            let content = match entry {
                Entry::Test(test) => StructureContent::Outcome(
                    run_test(
                        test,
                        &entry_path,
                        skipping.as_deref(),
                        &context,
                        timeout,
                        recorder,
                    )
                    .await,
                ),
                Entry::Suite(child) => {
                    let child_frame = Frame {
                        skipping: skipping.clone(),
                        depth: depth + 1,
                        context: Arc::clone(&context),
                        path: entry_path.clone(),
                        timeout,
                        declared,
                    };
                    let start = Instant::now();
                    let body = AssertUnwindSafe(walk(child, child_frame, recorder)).catch_unwind();
                    let walked = match with_timeout(body, timeout.unwrap_or(DEFAULT_GROUP_TIMEOUT))
                        .await
                    {
                        Ok(Ok(walked)) => walked,
                        Ok(Err(panic)) => Err(WalkError::Group(panic_message(&*panic))),
                        Err(elapsed) => Err(WalkError::from(elapsed)),
                    };

                    match walked {
                        Ok(children) => StructureContent::Children(children),
                        Err(error) => {
                            warn!(path = %display_path(&entry_path), %error, "suite failed");
                            let outcome = Outcome::failed(error.to_string());
                            recorder.record(TestResult::from_outcome(
                                &entry_path,
                                &outcome,
                                start.elapsed(),
                            ));
                            StructureContent::Outcome(outcome)
                        }
                    }
                }
            };

            structure.push(TestStructure {
                name: name.clone(),
                content,
            });
        }

        if skipping.is_none()
            && let Some(teardown) = &suite.teardown
        {
            run_teardown(teardown, &context)
                .await
                .map_err(WalkError::Teardown)?;
        }

        Ok(structure)
    }
    .boxed()
}

async fn run_test(
    test: &TestFn,
    path: &[String],
    skipping: Option<&str>,
    context: &SharedContext,
    timeout: Option<Duration>,
    recorder: &mut Recorder<'_>,
) -> Outcome {
    recorder.started(path);
    let start = Instant::now();

    let outcome = match skipping {
        Some(reason) => Outcome::skipped(reason),
        None => {
            let invocation =
                AssertUnwindSafe(async { test(Arc::clone(context)).await }).catch_unwind();
            match with_timeout(invocation, timeout.unwrap_or(DEFAULT_TEST_TIMEOUT)).await {
                Ok(Ok(None)) => Outcome::passed(),
                Ok(Ok(Some(error))) => Outcome::failed(error),
                Ok(Err(panic)) => Outcome::failed(panic_message(&*panic)),
                Err(elapsed) => Outcome::failed(elapsed.to_string()),
            }
        }
    };

    let result = TestResult::from_outcome(path, &outcome, start.elapsed());
    debug!(test = %result.full_name(), status = %result.status, "test finished");
    recorder.record(result);
    outcome
}

async fn run_teardown(teardown: &TeardownFn, context: &SharedContext) -> Result<(), String> {
    let invocation = AssertUnwindSafe(async { teardown(Arc::clone(context)).await }).catch_unwind();
    match invocation.await {
        Ok(result) => result,
        Err(panic) => Err(panic_message(&*panic)),
    }
}

pub(crate) fn display_path(path: &[String]) -> String {
    if path.is_empty() {
        "<root>".to_string()
    } else {
        path.join(" > ")
    }
}
