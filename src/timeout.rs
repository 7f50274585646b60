//! Deadline races for tests and suite bodies.

use crate::errors::TimeoutError;
use std::future::Future;
use std::time::Duration;

/// Budget for a single leaf test.
pub const DEFAULT_TEST_TIMEOUT: Duration = Duration::from_millis(5000);

/// Budget for all children of a nested suite.
pub const DEFAULT_GROUP_TIMEOUT: Duration = Duration::from_millis(10000);

/// Race `operation` against a deadline of `limit`.
///
/// Whichever settles first wins. If the operation completes, the deadline timer is dropped with
/// it. If the deadline wins, the operation is dropped without being polled again, so a late
/// result can never be observed.
pub async fn with_timeout<F>(operation: F, limit: Duration) -> Result<F::Output, TimeoutError>
where
    F: Future,
{
    tokio::time::timeout(limit, operation)
        .await
        .map_err(|_| TimeoutError::new(limit))
}
