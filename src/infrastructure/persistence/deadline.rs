//! # Operation Deadlines
//!
//! Every backend call runs under the operation timeout the backend was
//! constructed with.

use crate::infrastructure::persistence::traits::{RepositoryError, RepositoryResult};
use std::future::Future;
use std::time::Duration;

/// Runs `fut` under `timeout`, mapping expiry to [`RepositoryError::Timeout`].
///
/// # Errors
///
/// Returns the error of `fut`, or `RepositoryError::Timeout` if it did not
/// complete in time.
pub async fn with_deadline<T, F>(
    operation: &'static str,
    timeout: Duration,
    fut: F,
) -> RepositoryResult<T>
where
    F: Future<Output = RepositoryResult<T>>,
{
    match tokio::time::timeout(timeout, fut).await {
        Ok(result) => result,
        Err(_) => {
            tracing::warn!(operation, timeout_ms = timeout.as_millis() as u64, "storage operation timed out");
            Err(RepositoryError::timeout(operation, timeout))
        }
    }
}
