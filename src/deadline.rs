//! Deadline enforcement for external backend calls.

use std::future::Future;
use std::time::Duration;

use crate::error::{RagError, Result};

/// Run a backend call under a deadline. An elapsed deadline becomes
/// [`RagError::Timeout`], so callers treat it like any other backend failure
/// for that call's path; nothing in the pipeline blocks indefinitely.
pub(crate) async fn bounded<T, F>(operation: &'static str, limit: Duration, call: F) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    match tokio::time::timeout(limit, call).await {
        Ok(result) => result,
        Err(_) => Err(RagError::Timeout { operation, seconds: limit.as_secs() }),
    }
}
