//! Error types for Switchyard.

use std::time::Duration;

use crate::routing::Decision;

/// Top-level error type for the router.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Backend error: {0}")]
    Backend(#[from] BackendError),

    #[error("Dispatch error: {0}")]
    Dispatch(#[from] DispatchError),

    #[error("Route error: {0}")]
    Route(#[from] RouteError),
}

/// Configuration and rule-set load errors.
///
/// Everything here is rejected before a registry is handed to a router;
/// none of these can occur while serving a request.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid configuration value for {key}: {message}")]
    InvalidValue { key: String, message: String },

    #[error("Failed to parse rule set: {0}")]
    ParseError(String),

    #[error("Rule set defines no execution targets")]
    NoTargets,

    #[error("Duplicate target id: {0}")]
    DuplicateTarget(String),

    #[error("Duplicate domain: {0}")]
    DuplicateDomain(String),

    #[error("Duplicate rule id {rule} in domain {domain}")]
    DuplicateRuleId { domain: String, rule: String },

    #[error("Rule {rule} in domain {domain} references unknown target {target}")]
    UnknownTarget {
        domain: String,
        rule: String,
        target: String,
    },

    #[error("Domain {domain} fallback target {target} is not defined")]
    UnknownFallbackTarget { domain: String, target: String },

    #[error("Rule {rule} in domain {domain} has no predicates")]
    EmptyPredicates { domain: String, rule: String },

    #[error("Invalid predicate on rule {rule} in domain {domain}: {message}")]
    InvalidPredicate {
        domain: String,
        rule: String,
        message: String,
    },

    #[error(
        "Invalid weight {weight} on rule {rule} in domain {domain}: must be finite and positive"
    )]
    InvalidWeight {
        domain: String,
        rule: String,
        weight: f64,
    },

    #[error(
        "Overrides {first} and {second} in domain {domain} can match the same input ({overlap})"
    )]
    ConflictingOverrides {
        domain: String,
        first: String,
        second: String,
        overlap: String,
    },
}

/// Errors produced by execution backends.
#[derive(Debug, thiserror::Error)]
pub enum BackendError {
    #[error("Transport failure: {0}")]
    Transport(String),

    #[error("Backend rate limited, retry after {retry_after:?}")]
    RateLimited { retry_after: Option<Duration> },

    #[error("Backend timed out after {0:?}")]
    Timeout(Duration),

    #[error("Request rejected: {0}")]
    Rejected(String),
}

/// Dispatch-stage errors.
#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    #[error("No backend registered for target {target}")]
    BackendUnavailable { target: String },

    #[error("Dispatch to {target} cancelled")]
    Cancelled { target: String },

    #[error("Dispatch to {target} failed after {attempts} attempts: {last_error}")]
    Exhausted {
        target: String,
        attempts: u32,
        last_error: String,
    },
}

/// Request-time errors surfaced by `Router::route`.
///
/// Carries the decision that was being executed so callers can log or
/// persist what the router chose even when no backend delivered a result.
#[derive(Debug, thiserror::Error)]
pub enum RouteError {
    #[error("Dispatch failed for target {}: {source}", .decision.target)]
    DispatchFailed {
        decision: Box<Decision>,
        #[source]
        source: DispatchError,
    },
}

impl RouteError {
    /// The decision the router committed to before the failure.
    pub fn decision(&self) -> &Decision {
        match self {
            RouteError::DispatchFailed { decision, .. } => decision,
        }
    }
}

/// Result type alias for the router.
pub type Result<T> = std::result::Result<T, Error>;
