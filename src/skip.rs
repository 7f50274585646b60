//! Skip evaluation.
//!
//! A skip always carries an expiry. Until it passes, the suite and everything below it are
//! reported as skipped; afterwards the suite fails so a forgotten skip cannot linger.

use crate::description::{SkipDeclaration, SkipFn};
use crate::helpers::panic_message;
use chrono::{DateTime, SecondsFormat, Utc};
use std::panic::{AssertUnwindSafe, catch_unwind};

/// What to do with a suite node.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SkipAction {
    Run,
    /// Skip the node and its descendants with this reason.
    Skip(String),
    /// Fail the node with this message without running anything below it.
    Fail(String),
}

/// Decide whether a node runs, using the current wall-clock time.
pub fn evaluate_skip(skip: Option<&SkipFn>, inherited: Option<&str>) -> SkipAction {
    evaluate_skip_at(skip, inherited, Utc::now())
}

/// Decide whether a node runs as of `now`.
///
/// An inherited reason wins without calling the node's own hook.
pub fn evaluate_skip_at(
    skip: Option<&SkipFn>,
    inherited: Option<&str>,
    now: DateTime<Utc>,
) -> SkipAction {
    if let Some(reason) = inherited {
        return SkipAction::Skip(reason.to_owned());
    }
    let Some(skip) = skip else {
        return SkipAction::Run;
    };

    let declaration = match catch_unwind(AssertUnwindSafe(|| skip())) {
        Ok(declaration) => declaration,
        Err(panic) => {
            return SkipAction::Fail(format!(
                "Skip evaluation failed with: '{}'",
                panic_message(&*panic)
            ));
        }
    };

    match declaration {
        None => SkipAction::Run,
        Some(declaration) if declaration.until > now => SkipAction::Skip(declaration.reason),
        Some(declaration) => SkipAction::Fail(expired_message(&declaration)),
    }
}

/// Failure message for a skip whose expiry has passed.
pub fn expired_message(declaration: &SkipDeclaration) -> String {
    format!(
        "Skip expired on {}: {}",
        declaration.until.to_rfc3339_opts(SecondsFormat::Millis, true),
        declaration.reason
    )
}
