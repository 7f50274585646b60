//! Context values flowing from a suite's setup down to its children.
//!
//! A [`Context`] is an open-ended map of JSON values. Nodes pass it down as a [`SharedContext`]:
//! a node that declares a setup hands its children a freshly allocated context, while a node
//! without one hands them the parent's `Arc` unchanged. Children only ever see `&Context`, so an
//! inherited context cannot be mutated behind a sibling's back.

use crate::description::SetupFn;
use crate::helpers::panic_message;
use futures::FutureExt;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

/// Context key holding a timeout override, in milliseconds.
pub const TIMEOUT_KEY: &str = "timeout";

/// A context shared read-only by a subtree.
pub type SharedContext = Arc<Context>;

/// String-keyed values produced by setup functions.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Context {
    values: Map<String, Value>,
}

impl Context {
    /// Create an empty context.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.values.get(key)
    }

    /// Look up a string value.
    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.values.get(key).and_then(Value::as_str)
    }

    /// Insert a value, returning the one it replaced.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.values.insert(key.into(), value.into())
    }

    /// Builder-style [`insert`](Self::insert).
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(key, value);
        self
    }

    /// A copy of this context with `overrides` layered on top.
    pub fn merged<I, K>(&self, overrides: I) -> Self
    where
        I: IntoIterator<Item = (K, Value)>,
        K: Into<String>,
    {
        let mut merged = self.clone();
        for (key, value) in overrides {
            merged.insert(key, value);
        }
        merged
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// The timeout override carried under [`TIMEOUT_KEY`].
    ///
    /// Zero, negative, non-numeric and out-of-range values are ignored.
    pub fn timeout(&self) -> Option<Duration> {
        let value = self.values.get(TIMEOUT_KEY)?;
        if let Some(ms) = value.as_u64() {
            return (ms > 0).then(|| Duration::from_millis(ms));
        }
        value
            .as_f64()
            .filter(|ms| ms.is_finite() && *ms > 0.0)
            .and_then(|ms| Duration::try_from_secs_f64(ms / 1000.0).ok())
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for Context {
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        let mut context = Context::new();
        for (key, value) in iter {
            context.insert(key, value);
        }
        context
    }
}

/// Derive the context a node hands to its children.
///
/// Without a setup the parent's context is passed through by reference. With one, the setup's
/// result becomes a new context; an error or panic from the setup is returned as its message.
pub async fn derive_context(
    setup: Option<&SetupFn>,
    parent: &SharedContext,
) -> Result<SharedContext, String> {
    let Some(setup) = setup else {
        return Ok(Arc::clone(parent));
    };

    let invocation = AssertUnwindSafe(async { setup(Arc::clone(parent)).await }).catch_unwind();
    match invocation.await {
        Ok(Ok(context)) => Ok(Arc::new(context)),
        Ok(Err(message)) => Err(message),
        Err(panic) => Err(panic_message(&*panic)),
    }
}
