//! Atomic counters for routing observability.
//!
//! Counters are monotonic for the life of the process and survive
//! registry reloads. Reads are `Relaxed`; a snapshot is consistent enough
//! for dashboards, not for accounting.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

use crate::routing::{Decision, RouteMode};

#[derive(Debug, Default)]
pub struct RouterStats {
    routed_total: AtomicU64,
    inline_total: AtomicU64,
    delegated_total: AtomicU64,
    escalated_total: AtomicU64,
    ambiguous_total: AtomicU64,
    dispatch_retries: AtomicU64,
    degraded_dispatches: AtomicU64,
    failed_dispatches: AtomicU64,
}

/// Point-in-time copy of the counters for external consumption.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatsSnapshot {
    pub routed_total: u64,
    pub inline_total: u64,
    pub delegated_total: u64,
    pub escalated_total: u64,
    pub ambiguous_total: u64,
    pub dispatch_retries: u64,
    pub degraded_dispatches: u64,
    pub failed_dispatches: u64,
}

impl RouterStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn record_decision(&self, decision: &Decision) {
        self.routed_total.fetch_add(1, Ordering::Relaxed);
        match decision.mode {
            RouteMode::Inline => self.inline_total.fetch_add(1, Ordering::Relaxed),
            RouteMode::Delegate => self.delegated_total.fetch_add(1, Ordering::Relaxed),
        };
        if decision.escalated {
            self.escalated_total.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub(crate) fn record_ambiguous(&self) {
        self.ambiguous_total.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_retry(&self) {
        self.dispatch_retries.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_degraded(&self) {
        self.degraded_dispatches.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_failed(&self) {
        self.failed_dispatches.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            routed_total: self.routed_total.load(Ordering::Relaxed),
            inline_total: self.inline_total.load(Ordering::Relaxed),
            delegated_total: self.delegated_total.load(Ordering::Relaxed),
            escalated_total: self.escalated_total.load(Ordering::Relaxed),
            ambiguous_total: self.ambiguous_total.load(Ordering::Relaxed),
            dispatch_retries: self.dispatch_retries.load(Ordering::Relaxed),
            degraded_dispatches: self.degraded_dispatches.load(Ordering::Relaxed),
            failed_dispatches: self.failed_dispatches.load(Ordering::Relaxed),
        }
    }
}
