//! Nested test suites with cascading context, time-bounded skips and per-node timeouts.
//!
//! A [`Suite`] is walked depth-first in declaration order. Each node may skip itself (until a
//! date, after which the skip turns into a failure), derive a context for its children through
//! `setup`, and clean up through `teardown`. Leaf outcomes are gathered both as a tree mirroring
//! the suite and as a flat list handed to a [`Reporter`].
//!
//! ```
//! use suitewalk::{Context, Runner, Suite};
//!
//! let suite = Suite::new()
//!     .setup_sync(|_| Context::new().with("user", "ada"))
//!     .test_sync("has user", |ctx| {
//!         (ctx.get_str("user") != Some("ada")).then_some("user missing")
//!     });
//!
//! let report = Runner::new("doc").run_blocking(&suite).unwrap();
//! assert_eq!(report.summary.passed, 1);
//! assert_eq!(report.exit_status(), 0);
//! ```

pub mod ci;
pub mod command;
pub mod config;
pub mod context;
pub mod description;
pub mod errors;
pub mod interpolate;
pub mod loader;
pub mod reporter;
pub mod results;
pub mod runner;
pub mod schema;
pub mod skip;
pub mod timeout;

mod helpers;
mod walker;

pub use config::{CiKind, ReporterKind, RunConfig};
pub use context::{Context, SharedContext};
pub use description::{Entry, SkipDeclaration, Suite};
pub use errors::{RunError, TimeoutError, WalkError};
pub use reporter::Reporter;
pub use results::{Outcome, RunSummary, TestResult, TestStatus, TestStructure};
pub use runner::{RunReport, Runner};
