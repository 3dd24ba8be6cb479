//! The caller-facing facade: classify, dispatch, post-process.
//!
//! `Router::decide` runs the pure classification pipeline and is safe to
//! call from anywhere. `Router::route` additionally drives the dispatch
//! lifecycle against registered backends. The rule registry is shared as
//! a read-only snapshot per cycle and replaced only by an explicit
//! `reload`, so a long-running route keeps the rules it started with.

use std::sync::{Arc, PoisonError, RwLock};

use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::config::RouterConfig;
use crate::dispatch::{CyclePhase, Dispatcher, ExecutionBackend, ExecutionResult};
use crate::error::RouteError;
use crate::postprocess::{self, RewriteBackend};
use crate::registry::RuleRegistry;
use crate::routing::{self, Classification, Decision, RequestContext};
use crate::stats::{RouterStats, StatsSnapshot};

/// What one successful routing cycle hands back.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct RouteOutcome {
    pub decision: Decision,
    pub result: ExecutionResult,
}

pub struct Router {
    registry: RwLock<Arc<RuleRegistry>>,
    config: RouterConfig,
    dispatcher: Dispatcher,
    rewriter: Option<Arc<dyn RewriteBackend>>,
    stats: Arc<RouterStats>,
}

impl Router {
    pub fn new(registry: RuleRegistry, config: RouterConfig) -> Self {
        let stats = Arc::new(RouterStats::new());
        Self {
            registry: RwLock::new(Arc::new(registry)),
            dispatcher: Dispatcher::new(config.dispatch.clone(), Arc::clone(&stats)),
            config,
            rewriter: None,
            stats,
        }
    }

    /// Register an execution backend under a target id.
    pub fn with_backend(
        mut self,
        target_id: impl Into<String>,
        backend: Arc<dyn ExecutionBackend>,
    ) -> Self {
        self.dispatcher.register(target_id, backend);
        self
    }

    /// Attach the rewriting backend used for sparse low-fidelity output.
    pub fn with_rewriter(mut self, rewriter: Arc<dyn RewriteBackend>) -> Self {
        self.rewriter = Some(rewriter);
        self
    }

    pub fn config(&self) -> &RouterConfig {
        &self.config
    }

    pub fn stats(&self) -> StatsSnapshot {
        self.stats.snapshot()
    }

    /// Replace the rule registry. In-flight cycles keep the snapshot they
    /// started with; new cycles see the new rules.
    pub fn reload(&self, registry: RuleRegistry) {
        let mut guard = self.registry.write().unwrap_or_else(PoisonError::into_inner);
        *guard = Arc::new(registry);
        debug!("rule registry reloaded");
    }

    fn registry_snapshot(&self) -> Arc<RuleRegistry> {
        let guard = self.registry.read().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(&guard)
    }

    /// Classify a request without dispatching. Pure with respect to the
    /// current registry snapshot: identical inputs produce decisions with
    /// identical routed outcomes.
    pub fn decide(&self, ctx: &RequestContext) -> Decision {
        let registry = self.registry_snapshot();
        self.decide_with(&registry, ctx)
    }

    fn decide_with(&self, registry: &RuleRegistry, ctx: &RequestContext) -> Decision {
        // An explicit target bypasses rule evaluation entirely.
        let matches = if ctx.explicit_target.is_some() {
            Vec::new()
        } else {
            routing::match_request(ctx, registry)
        };
        let classification = routing::resolve(ctx, &matches, registry);
        if classification == Classification::Ambiguous {
            self.stats.record_ambiguous();
        }
        let confidence = routing::score(&classification);
        let decision = routing::finalize(classification, confidence, &matches, &self.config, registry);
        self.stats.record_decision(&decision);
        decision
    }

    /// Full routing cycle: decide, dispatch, optionally rewrite.
    pub async fn route(&self, ctx: &RequestContext) -> Result<RouteOutcome, RouteError> {
        self.route_with_cancellation(ctx, &CancellationToken::new()).await
    }

    /// `route` with caller-supplied cancellation. Cancellation before
    /// dispatch is a no-op for classification; cancellation during
    /// dispatch aborts the backend call while the error keeps the
    /// already-computed decision.
    pub async fn route_with_cancellation(
        &self,
        ctx: &RequestContext,
        cancel: &CancellationToken,
    ) -> Result<RouteOutcome, RouteError> {
        let registry = self.registry_snapshot();

        let mut phase = CyclePhase::Idle;
        phase = phase.advanced_to(CyclePhase::Classifying);
        let decision = self.decide_with(&registry, ctx);
        phase = phase.advanced_to(CyclePhase::Resolved);

        phase = phase.advanced_to(CyclePhase::Dispatching);
        let dispatched = self
            .dispatcher
            .dispatch(&decision.target, &ctx.text, registry.targets(), cancel)
            .await;
        let result = match dispatched {
            Ok(result) => result,
            Err(source) => {
                phase = phase.advanced_to(CyclePhase::Failed);
                warn!(
                    phase = %phase,
                    decision = %decision.id,
                    target = %decision.target,
                    error = %source,
                    "routing cycle failed"
                );
                self.stats.record_failed();
                return Err(RouteError::DispatchFailed {
                    decision: Box::new(decision),
                    source,
                });
            }
        };

        let result = match self.rewriter.as_deref() {
            Some(rewriter) => {
                self.maybe_rewrite(rewriter, &registry, ctx, result, cancel).await
            }
            None => result,
        };

        phase = phase.advanced_to(CyclePhase::Completed);
        debug!(
            phase = %phase,
            decision = %decision.id,
            served_by = %result.served_by,
            elapsed_ms = result.elapsed.as_millis() as u64,
            "routing cycle completed"
        );
        Ok(RouteOutcome { decision, result })
    }

    async fn maybe_rewrite(
        &self,
        rewriter: &dyn RewriteBackend,
        registry: &RuleRegistry,
        ctx: &RequestContext,
        result: ExecutionResult,
        cancel: &CancellationToken,
    ) -> ExecutionResult {
        // The richness check applies to whichever target actually served,
        // degraded or not.
        let Some(served_by) = registry.targets().get(&result.served_by) else {
            return result;
        };
        if !postprocess::should_post_process(served_by, &result, self.config.min_prose_chars) {
            return result;
        }
        debug!(served_by = %served_by.id, "payload below the prose floor, rewriting");
        postprocess::post_process(
            rewriter,
            &ctx.text,
            result,
            self.config.dispatch.invoke_timeout(),
            cancel,
        )
        .await
    }
}
