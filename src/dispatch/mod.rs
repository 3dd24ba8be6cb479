//! Bounded, cancellable execution of a routed decision.
//!
//! A dispatch runs the selected target's backend under a per-invocation
//! timeout and retries transient failures with exponential backoff. Once
//! the primary target is exhausted it degrades one tier for a single
//! final attempt. A dispatch that still fails surfaces a structured
//! error; it never falls back to inline handling on its own.
//!
//! # Lifecycle
//!
//! ```text
//! Idle -> Classifying -> Resolved -> Dispatching -> Completed
//!                                        └--------> Failed
//! ```

mod backend;
mod retry;

pub use backend::{ExecutionBackend, ExecutionResult, ExecutionStatus};

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::config::DispatchConfig;
use crate::error::{BackendError, DispatchError};
use crate::registry::TargetSet;
use crate::stats::RouterStats;

/// Phase of one routing cycle. `Completed` and `Failed` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CyclePhase {
    Idle,
    Classifying,
    Resolved,
    Dispatching,
    Completed,
    Failed,
}

impl CyclePhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            CyclePhase::Idle => "idle",
            CyclePhase::Classifying => "classifying",
            CyclePhase::Resolved => "resolved",
            CyclePhase::Dispatching => "dispatching",
            CyclePhase::Completed => "completed",
            CyclePhase::Failed => "failed",
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, CyclePhase::Completed | CyclePhase::Failed)
    }

    /// Whether `next` is a legal successor of this phase.
    pub fn can_advance(self, next: CyclePhase) -> bool {
        matches!(
            (self, next),
            (CyclePhase::Idle, CyclePhase::Classifying)
                | (CyclePhase::Classifying, CyclePhase::Resolved)
                | (CyclePhase::Resolved, CyclePhase::Dispatching)
                | (CyclePhase::Dispatching, CyclePhase::Completed)
                | (CyclePhase::Dispatching, CyclePhase::Failed)
        )
    }

    /// Advance to `next`, logging the transition.
    pub(crate) fn advanced_to(self, next: CyclePhase) -> CyclePhase {
        debug_assert!(
            self.can_advance(next),
            "invalid cycle transition {self} -> {next}"
        );
        debug!(from = %self, to = %next, "cycle phase advanced");
        next
    }
}

impl std::fmt::Display for CyclePhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Failure modes of a single bounded invocation.
enum InvokeFailure {
    Cancelled,
    Backend(BackendError),
}

/// Drives backend invocations for routed decisions.
///
/// Backends are registered under target ids; a decision whose target has
/// no backend fails immediately with `BackendUnavailable`.
pub struct Dispatcher {
    backends: HashMap<String, Arc<dyn ExecutionBackend>>,
    config: DispatchConfig,
    stats: Arc<RouterStats>,
}

impl Dispatcher {
    pub fn new(config: DispatchConfig, stats: Arc<RouterStats>) -> Self {
        Self {
            backends: HashMap::new(),
            config,
            stats,
        }
    }

    /// Register a backend for a target id, replacing any previous one.
    pub fn register(&mut self, target_id: impl Into<String>, backend: Arc<dyn ExecutionBackend>) {
        self.backends.insert(target_id.into(), backend);
    }

    pub fn has_backend(&self, target_id: &str) -> bool {
        self.backends.contains_key(target_id)
    }

    /// Execute a decision's target with retries, then one degraded
    /// attempt a tier below. Cancellation and missing backends are
    /// surfaced immediately without degradation.
    pub async fn dispatch(
        &self,
        target_id: &str,
        request: &str,
        targets: &TargetSet,
        cancel: &CancellationToken,
    ) -> Result<ExecutionResult, DispatchError> {
        if cancel.is_cancelled() {
            return Err(DispatchError::Cancelled {
                target: target_id.to_string(),
            });
        }

        let started = Instant::now();
        let primary_err = match self.try_target(target_id, request, cancel).await {
            Ok(payload) => {
                return Ok(ExecutionResult::success(payload, target_id, started.elapsed()));
            }
            Err(err @ DispatchError::Exhausted { .. }) => err,
            // Missing backends and cancellations are not degradable.
            Err(other) => return Err(other),
        };

        let Some(lower) = targets
            .get(target_id)
            .and_then(|current| targets.next_below(current.tier))
        else {
            return Err(primary_err);
        };
        let Some(backend) = self.backends.get(&lower.id) else {
            warn!(
                target = %lower.id,
                "No backend registered for the degraded target, surfacing primary exhaustion"
            );
            return Err(primary_err);
        };

        warn!(
            target = %target_id,
            degraded_to = %lower.id,
            error = %primary_err,
            "Primary target exhausted, degrading one tier for a final attempt"
        );
        self.stats.record_degraded();

        match self.invoke_bounded(backend.as_ref(), request, cancel).await {
            Ok(payload) => Ok(ExecutionResult::success(payload, &lower.id, started.elapsed())),
            Err(InvokeFailure::Cancelled) => Err(DispatchError::Cancelled {
                target: lower.id.clone(),
            }),
            Err(InvokeFailure::Backend(err)) => {
                warn!(
                    target = %lower.id,
                    error = %err,
                    "Degraded attempt failed, surfacing primary exhaustion"
                );
                Err(primary_err)
            }
        }
    }

    /// Retry loop against a single target. Returns `Exhausted` once the
    /// attempt budget is spent or the backend rejects the request.
    async fn try_target(
        &self,
        target_id: &str,
        request: &str,
        cancel: &CancellationToken,
    ) -> Result<String, DispatchError> {
        let backend = self
            .backends
            .get(target_id)
            .ok_or_else(|| DispatchError::BackendUnavailable {
                target: target_id.to_string(),
            })?;

        let mut attempts = 0u32;
        let mut last_error: Option<BackendError> = None;
        for attempt in 0..=self.config.max_retries {
            attempts += 1;
            let err = match self.invoke_bounded(backend.as_ref(), request, cancel).await {
                Ok(payload) => return Ok(payload),
                Err(InvokeFailure::Cancelled) => {
                    return Err(DispatchError::Cancelled {
                        target: target_id.to_string(),
                    });
                }
                Err(InvokeFailure::Backend(err)) => err,
            };

            if !retry::is_retryable(&err) {
                warn!(
                    target = %target_id,
                    error = %err,
                    "Backend rejected the request, skipping further attempts on this target"
                );
                last_error = Some(err);
                break;
            }
            if attempt == self.config.max_retries {
                last_error = Some(err);
                break;
            }

            let delay = retry::retry_delay(&err, &self.config, attempt);
            warn!(
                target = %target_id,
                attempt = attempt + 1,
                max_retries = self.config.max_retries,
                delay_ms = delay.as_millis() as u64,
                error = %err,
                "Retrying backend after transient error"
            );
            last_error = Some(err);
            self.stats.record_retry();
            tokio::select! {
                _ = cancel.cancelled() => {
                    return Err(DispatchError::Cancelled {
                        target: target_id.to_string(),
                    });
                }
                _ = tokio::time::sleep(delay) => {}
            }
        }

        Err(DispatchError::Exhausted {
            target: target_id.to_string(),
            attempts,
            last_error: last_error.map_or_else(|| "unknown".to_string(), |e| e.to_string()),
        })
    }

    /// One invocation under the configured timeout, racing cancellation.
    async fn invoke_bounded(
        &self,
        backend: &dyn ExecutionBackend,
        request: &str,
        cancel: &CancellationToken,
    ) -> Result<String, InvokeFailure> {
        let timeout = self.config.invoke_timeout();
        tokio::select! {
            _ = cancel.cancelled() => Err(InvokeFailure::Cancelled),
            invoked = tokio::time::timeout(timeout, backend.invoke(request)) => match invoked {
                Ok(Ok(payload)) => Ok(payload),
                Ok(Err(err)) => Err(InvokeFailure::Backend(err)),
                Err(_) => Err(InvokeFailure::Backend(BackendError::Timeout(timeout))),
            },
        }
    }
}
