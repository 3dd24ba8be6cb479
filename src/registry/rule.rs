//! Routing rules: config form and compiled form.

use serde::{Deserialize, Serialize};

use super::predicate::{CompiledPredicate, Predicate};

fn default_weight() -> f64 {
    1.0
}

/// How a rule participates in classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RuleKind {
    /// Forces a specific target. Beats everything except an explicit
    /// caller-requested target.
    Override,
    /// Any single predicate firing forces delegation.
    Mandatory,
    /// All predicates must hold for inline handling to stay on the table.
    Simple,
}

impl RuleKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            RuleKind::Override => "override",
            RuleKind::Mandatory => "mandatory",
            RuleKind::Simple => "simple",
        }
    }
}

impl std::fmt::Display for RuleKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Serde model for one rule within a domain.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuleConfig {
    pub id: String,
    pub kind: RuleKind,
    /// Target this rule routes to when it wins.
    pub target: String,
    /// Relative weight in confidence aggregation.
    #[serde(default = "default_weight")]
    pub weight: f64,
    pub predicates: Vec<Predicate>,
}

/// A rule compiled for evaluation.
#[derive(Debug, Clone)]
pub struct Rule {
    pub id: String,
    pub domain: String,
    pub kind: RuleKind,
    pub target: String,
    pub weight: f64,
    pub(crate) predicates: Vec<CompiledPredicate>,
    /// Position in registry load order. Every tie in the routing pipeline
    /// breaks on this, lowest first.
    pub registration_index: usize,
}

impl Rule {
    /// Fraction of predicates that hold for this text, in [0, 1].
    pub(crate) fn match_strength(&self, text: &str) -> f64 {
        let held = self.predicates.iter().filter(|p| p.holds(text)).count();
        held as f64 / self.predicates.len() as f64
    }

    /// Whether at least one predicate holds.
    pub(crate) fn any_predicate_holds(&self, text: &str) -> bool {
        self.predicates.iter().any(|p| p.holds(text))
    }

    pub fn predicate_count(&self) -> usize {
        self.predicates.len()
    }
}
