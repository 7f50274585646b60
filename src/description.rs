//! Suite descriptions.
//!
//! A [`Suite`] is a tree of named entries, each either a leaf test or a nested suite, plus the
//! optional `setup`, `teardown`, `skip` and `timeout` hooks. Entries keep their declaration
//! order, which is also execution order.

use crate::context::{Context, SharedContext};
use crate::errors::{DescriptionError, SkipDateError};
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use futures::FutureExt;
use futures::future::{self, BoxFuture};
use indexmap::IndexMap;
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

/// Names reserved for suite hooks at every level.
pub const RESERVED_KEYS: [&str; 4] = ["setup", "teardown", "skip", "timeout"];

/// A leaf test. Resolves to `None` on pass or the failure message.
pub type TestFn = Arc<dyn Fn(SharedContext) -> BoxFuture<'static, Option<String>> + Send + Sync>;

/// A setup hook producing the context for a suite's children.
pub type SetupFn =
    Arc<dyn Fn(SharedContext) -> BoxFuture<'static, Result<Context, String>> + Send + Sync>;

/// A teardown hook receiving the context its suite's setup produced.
pub type TeardownFn =
    Arc<dyn Fn(SharedContext) -> BoxFuture<'static, Result<(), String>> + Send + Sync>;

/// A skip hook, evaluated once per walk of its suite.
pub type SkipFn = Arc<dyn Fn() -> Option<SkipDeclaration> + Send + Sync>;

/// Values a leaf test may return.
///
/// Empty messages count as a pass.
pub trait IntoTestError {
    fn into_test_error(self) -> Option<String>;
}

impl IntoTestError for () {
    fn into_test_error(self) -> Option<String> {
        None
    }
}

impl IntoTestError for Option<String> {
    fn into_test_error(self) -> Option<String> {
        self.filter(|message| !message.is_empty())
    }
}

impl<'a> IntoTestError for Option<&'a str> {
    fn into_test_error(self) -> Option<String> {
        self.filter(|message| !message.is_empty())
            .map(str::to_owned)
    }
}

impl IntoTestError for String {
    fn into_test_error(self) -> Option<String> {
        (!self.is_empty()).then_some(self)
    }
}

impl<'a> IntoTestError for &'a str {
    fn into_test_error(self) -> Option<String> {
        (!self.is_empty()).then(|| self.to_owned())
    }
}

impl<E: fmt::Display> IntoTestError for Result<(), E> {
    fn into_test_error(self) -> Option<String> {
        self.err().map(|e| e.to_string())
    }
}

/// Values a setup hook may return.
pub trait IntoContext {
    fn into_context(self) -> Result<Context, String>;
}

impl IntoContext for Context {
    fn into_context(self) -> Result<Context, String> {
        Ok(self)
    }
}

impl<E: fmt::Display> IntoContext for Result<Context, E> {
    fn into_context(self) -> Result<Context, String> {
        self.map_err(|e| e.to_string())
    }
}

/// Values a teardown hook may return.
pub trait IntoHookResult {
    fn into_hook_result(self) -> Result<(), String>;
}

impl IntoHookResult for () {
    fn into_hook_result(self) -> Result<(), String> {
        Ok(())
    }
}

impl<E: fmt::Display> IntoHookResult for Result<(), E> {
    fn into_hook_result(self) -> Result<(), String> {
        self.map_err(|e| e.to_string())
    }
}

/// Wrap an async closure as a [`TestFn`].
pub fn test_fn<F, Fut>(f: F) -> TestFn
where
    F: Fn(SharedContext) -> Fut + Send + Sync + 'static,
    Fut: Future + Send + 'static,
    Fut::Output: IntoTestError,
{
    Arc::new(move |ctx| f(ctx).map(IntoTestError::into_test_error).boxed())
}

/// Wrap an async closure as a [`SetupFn`].
pub fn setup_fn<F, Fut>(f: F) -> SetupFn
where
    F: Fn(SharedContext) -> Fut + Send + Sync + 'static,
    Fut: Future + Send + 'static,
    Fut::Output: IntoContext,
{
    Arc::new(move |ctx| f(ctx).map(IntoContext::into_context).boxed())
}

/// Wrap an async closure as a [`TeardownFn`].
pub fn teardown_fn<F, Fut>(f: F) -> TeardownFn
where
    F: Fn(SharedContext) -> Fut + Send + Sync + 'static,
    Fut: Future + Send + 'static,
    Fut::Output: IntoHookResult,
{
    Arc::new(move |ctx| f(ctx).map(IntoHookResult::into_hook_result).boxed())
}

/// A request to skip a suite until a point in time.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SkipDeclaration {
    pub reason: String,
    pub until: DateTime<Utc>,
}

impl SkipDeclaration {
    pub fn new(reason: impl Into<String>, until: DateTime<Utc>) -> Self {
        Self {
            reason: reason.into(),
            until,
        }
    }

    /// Create a declaration from a textual date, see [`parse_skip_date`].
    pub fn parse(reason: impl Into<String>, until: &str) -> Result<Self, SkipDateError> {
        Ok(Self::new(reason, parse_skip_date(until)?))
    }
}

/// Parse a skip expiry.
///
/// Accepts RFC 3339 timestamps, zone-less `YYYY-MM-DDTHH:MM:SS[.fff]` (read as UTC) and bare
/// `YYYY-MM-DD` dates (UTC midnight).
pub fn parse_skip_date(input: &str) -> Result<DateTime<Utc>, SkipDateError> {
    let trimmed = input.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(trimmed) {
        return Ok(dt.with_timezone(&Utc));
    }
    if let Ok(dt) = NaiveDateTime::parse_from_str(trimmed, "%Y-%m-%dT%H:%M:%S%.f") {
        return Ok(dt.and_utc());
    }
    if let Ok(date) = NaiveDate::parse_from_str(trimmed, "%Y-%m-%d")
        && let Some(dt) = date.and_hms_opt(0, 0, 0)
    {
        return Ok(dt.and_utc());
    }
    Err(SkipDateError::new(input))
}

/// A named entry inside a suite.
#[derive(Clone)]
pub enum Entry {
    Test(TestFn),
    Suite(Suite),
}

/// A suite description.
///
/// Inserting an entry under a name that already exists replaces it in place, keeping the
/// original position.
#[derive(Clone, Default)]
pub struct Suite {
    pub(crate) setup: Option<SetupFn>,
    pub(crate) teardown: Option<TeardownFn>,
    pub(crate) skip: Option<SkipFn>,
    pub(crate) timeout: Option<Duration>,
    pub(crate) entries: IndexMap<String, Entry>,
}

impl Suite {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn setup<F, Fut>(mut self, f: F) -> Self
    where
        F: Fn(SharedContext) -> Fut + Send + Sync + 'static,
        Fut: Future + Send + 'static,
        Fut::Output: IntoContext,
    {
        self.setup = Some(setup_fn(f));
        self
    }

    pub fn setup_sync<F, R>(mut self, f: F) -> Self
    where
        F: Fn(SharedContext) -> R + Send + Sync + 'static,
        R: IntoContext,
    {
        self.setup = Some(Arc::new(move |ctx| {
            future::ready(f(ctx).into_context()).boxed()
        }));
        self
    }

    pub fn teardown<F, Fut>(mut self, f: F) -> Self
    where
        F: Fn(SharedContext) -> Fut + Send + Sync + 'static,
        Fut: Future + Send + 'static,
        Fut::Output: IntoHookResult,
    {
        self.teardown = Some(teardown_fn(f));
        self
    }

    pub fn teardown_sync<F, R>(mut self, f: F) -> Self
    where
        F: Fn(SharedContext) -> R + Send + Sync + 'static,
        R: IntoHookResult,
    {
        self.teardown = Some(Arc::new(move |ctx| {
            future::ready(f(ctx).into_hook_result()).boxed()
        }));
        self
    }

    /// Declare a skip hook. It is not called when an ancestor is already skipped.
    pub fn skip<F>(mut self, f: F) -> Self
    where
        F: Fn() -> Option<SkipDeclaration> + Send + Sync + 'static,
    {
        self.skip = Some(Arc::new(f));
        self
    }

    /// Override the leaf and group timeouts for this suite and everything below it.
    ///
    /// A zero duration is ignored, the same as a zero `timeout` context value.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = (!timeout.is_zero()).then_some(timeout);
        self
    }

    /// Add an async leaf test.
    pub fn test<F, Fut>(self, name: impl Into<String>, f: F) -> Self
    where
        F: Fn(SharedContext) -> Fut + Send + Sync + 'static,
        Fut: Future + Send + 'static,
        Fut::Output: IntoTestError,
    {
        self.entry(name, Entry::Test(test_fn(f)))
    }

    /// Add a synchronous leaf test.
    pub fn test_sync<F, R>(self, name: impl Into<String>, f: F) -> Self
    where
        F: Fn(SharedContext) -> R + Send + Sync + 'static,
        R: IntoTestError,
    {
        let test: TestFn =
            Arc::new(move |ctx| future::ready(f(ctx).into_test_error()).boxed());
        self.entry(name, Entry::Test(test))
    }

    /// Add a nested suite.
    pub fn suite(self, name: impl Into<String>, suite: Suite) -> Self {
        self.entry(name, Entry::Suite(suite))
    }

    pub fn entry(mut self, name: impl Into<String>, entry: Entry) -> Self {
        self.entries.insert(name.into(), entry);
        self
    }

    pub fn entries(&self) -> impl Iterator<Item = (&str, &Entry)> {
        self.entries.iter().map(|(name, entry)| (name.as_str(), entry))
    }

    pub fn get(&self, name: &str) -> Option<&Entry> {
        self.entries.get(name)
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of leaf tests in this suite and all nested suites.
    pub fn test_count(&self) -> usize {
        self.entries
            .values()
            .map(|entry| match entry {
                Entry::Test(_) => 1,
                Entry::Suite(suite) => suite.test_count(),
            })
            .sum()
    }

    /// Check entry names across the whole tree.
    pub fn validate(&self) -> Result<(), DescriptionError> {
        self.validate_at(&mut Vec::new())
    }

    fn validate_at(&self, path: &mut Vec<String>) -> Result<(), DescriptionError> {
        let location = |path: &[String]| {
            if path.is_empty() {
                "<root>".to_string()
            } else {
                path.join(" > ")
            }
        };

        for (name, entry) in &self.entries {
            if name.is_empty() {
                return Err(DescriptionError::EmptyName {
                    path: location(path),
                });
            }
            if RESERVED_KEYS.contains(&name.as_str()) {
                return Err(DescriptionError::ReservedName {
                    name: name.clone(),
                    path: location(path),
                });
            }
            if let Entry::Suite(child) = entry {
                path.push(name.clone());
                child.validate_at(path)?;
                path.pop();
            }
        }
        Ok(())
    }
}

impl fmt::Debug for Suite {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut s = f.debug_struct("Suite");
        s.field("setup", &self.setup.is_some())
            .field("teardown", &self.teardown.is_some())
            .field("skip", &self.skip.is_some())
            .field("timeout", &self.timeout);
        let entries: Vec<_> = self.entries.iter().collect();
        s.field("entries", &entries).finish()
    }
}

impl fmt::Debug for Entry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Entry::Test(_) => f.write_str("Test"),
            Entry::Suite(suite) => suite.fmt(f),
        }
    }
}
