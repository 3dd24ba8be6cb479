//! Conditional rewrite of low-fidelity output before it reaches the
//! caller.
//!
//! Targets flagged `low_fidelity` tend to answer with bare code and no
//! surrounding explanation. When such a payload falls below the prose
//! floor, a lightweight rewriting backend gets one bounded chance to
//! flesh it out. The rewrite never re-runs classification and never
//! replaces a payload with nothing: any rewrite problem returns the raw
//! result unchanged.

use std::time::Duration;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::dispatch::ExecutionResult;
use crate::error::BackendError;
use crate::registry::ExecutionTarget;

/// Rewriting backend invoked for sparse low-fidelity payloads.
#[async_trait]
pub trait RewriteBackend: Send + Sync {
    /// Produce a caller-ready version of `raw`, given the request that
    /// prompted it.
    async fn rewrite(&self, request: &str, raw: &str) -> Result<String, BackendError>;
}

/// Non-whitespace characters outside ``` fences. An unterminated fence
/// swallows the rest of the payload.
pub(crate) fn prose_chars_outside_fences(payload: &str) -> usize {
    payload
        .split("```")
        .step_by(2)
        .map(|segment| segment.chars().filter(|c| !c.is_whitespace()).count())
        .sum()
}

/// Whether a successful result from `target` is sparse enough to rewrite.
pub fn should_post_process(
    target: &ExecutionTarget,
    result: &ExecutionResult,
    min_prose_chars: usize,
) -> bool {
    target.low_fidelity
        && result.is_success()
        && prose_chars_outside_fences(&result.payload) < min_prose_chars
}

/// Run the rewriter under a timeout, racing cancellation. Failures,
/// timeouts, and cancellation all fall back to the raw result.
pub async fn post_process(
    rewriter: &dyn RewriteBackend,
    request: &str,
    result: ExecutionResult,
    timeout: Duration,
    cancel: &CancellationToken,
) -> ExecutionResult {
    let rewritten = tokio::select! {
        _ = cancel.cancelled() => {
            debug!(served_by = %result.served_by, "Rewrite cancelled, returning the raw payload");
            return result;
        }
        outcome = tokio::time::timeout(timeout, rewriter.rewrite(request, &result.payload)) => outcome,
    };

    match rewritten {
        Ok(Ok(payload)) => ExecutionResult { payload, ..result },
        Ok(Err(err)) => {
            warn!(
                error = %err,
                served_by = %result.served_by,
                "Rewrite failed, returning the raw payload"
            );
            result
        }
        Err(_) => {
            warn!(
                timeout_ms = timeout.as_millis() as u64,
                served_by = %result.served_by,
                "Rewrite timed out, returning the raw payload"
            );
            result
        }
    }
}
