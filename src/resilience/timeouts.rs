//! Timeout enforcement.
//!
//! # Responsibilities
//! - Wrap asynchronous interceptors and whole navigations with a deadline
//! - Cancel the wrapped future cleanly on timeout
//!
//! # Design Decisions
//! - Uses Tokio's timeout facilities
//! - Timeout errors are distinct from other errors
//! - `None` means unbounded

use std::future::Future;
use std::time::Duration;

use crate::error::{Result, RouterError};

/// Run `future` under an optional deadline.
pub async fn with_timeout<F, T>(operation: &str, limit: Option<Duration>, future: F) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    let Some(limit) = limit else {
        return future.await;
    };

    match tokio::time::timeout(limit, future).await {
        Ok(result) => result,
        Err(_) => {
            tracing::warn!(operation, timeout = ?limit, "Operation timed out");
            Err(RouterError::Timeout {
                operation: operation.to_string(),
                elapsed: limit,
            })
        }
    }
}
