//! Routing decisions.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::registry::RuleKind;

/// How the chosen target handles the task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RouteMode {
    /// Handled with minimal overhead on the chosen target.
    Inline,
    /// Handed off to the chosen target.
    Delegate,
}

impl RouteMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            RouteMode::Inline => "inline",
            RouteMode::Delegate => "delegate",
        }
    }
}

impl std::fmt::Display for RouteMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One rule match as recorded on a decision.
///
/// Partial simple matches are recorded too; they explain a conservative
/// delegation even though they can never win classification.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchRecord {
    pub rule_id: String,
    pub domain: String,
    pub kind: RuleKind,
    pub strength: f64,
}

/// The single artifact a routing cycle produces.
///
/// Immutable once built; carries everything the dispatcher and an audit
/// trail need. Serializes losslessly through serde.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Decision {
    pub id: Uuid,
    pub mode: RouteMode,
    /// Chosen execution target id.
    pub target: String,
    /// Scalar confidence in [0, 1].
    pub confidence: f64,
    /// True when the escalation policy raised the tier or resolved an
    /// ambiguous classification.
    pub escalated: bool,
    /// Every match recorded during classification, partials included.
    pub matches: Vec<MatchRecord>,
    /// Human-readable summary of why this decision was made.
    pub reason: String,
    pub created_at: DateTime<Utc>,
}

impl Decision {
    /// Whether two decisions route the same way: same mode, target,
    /// confidence, escalation and matches. Ignores per-instance identity
    /// (`id`, `created_at`, `reason` wording).
    pub fn same_outcome(&self, other: &Decision) -> bool {
        self.mode == other.mode
            && self.target == other.target
            && self.confidence == other.confidence
            && self.escalated == other.escalated
            && self.matches == other.matches
    }
}
