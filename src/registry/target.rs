//! Execution targets and the capability-tier ladder.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Capability tier of an execution target.
///
/// Ordered lowest to highest; escalation walks up the ladder, dispatch
/// degradation walks down.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tier {
    /// Minimal-overhead handling: trivial edits, quick lookups.
    Lite,
    /// Defined tasks with clear scope.
    Standard,
    /// Multi-step work that needs isolation or broader context.
    Advanced,
    /// Highest-capability handling for ambiguous or critical work.
    Frontier,
}

impl Tier {
    /// Tier name as string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Tier::Lite => "lite",
            Tier::Standard => "standard",
            Tier::Advanced => "advanced",
            Tier::Frontier => "frontier",
        }
    }

    /// The next tier up, if any.
    pub fn above(self) -> Option<Tier> {
        match self {
            Tier::Lite => Some(Tier::Standard),
            Tier::Standard => Some(Tier::Advanced),
            Tier::Advanced => Some(Tier::Frontier),
            Tier::Frontier => None,
        }
    }

    /// The next tier down, if any.
    pub fn below(self) -> Option<Tier> {
        match self {
            Tier::Lite => None,
            Tier::Standard => Some(Tier::Lite),
            Tier::Advanced => Some(Tier::Standard),
            Tier::Frontier => Some(Tier::Advanced),
        }
    }
}

impl std::fmt::Display for Tier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for Tier {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "lite" => Ok(Tier::Lite),
            "standard" => Ok(Tier::Standard),
            "advanced" => Ok(Tier::Advanced),
            "frontier" => Ok(Tier::Frontier),
            _ => Err(format!(
                "invalid tier '{}', expected lite, standard, advanced or frontier",
                s
            )),
        }
    }
}

/// An execution target the router can dispatch to.
///
/// The router is agnostic to what a target actually does; it only orders
/// targets by tier and selects among them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionTarget {
    pub id: String,
    pub tier: Tier,
    /// Targets that trade answer fidelity for speed. Their results are
    /// eligible for post-processing when too terse.
    #[serde(default)]
    pub low_fidelity: bool,
}

/// Registration-ordered set of execution targets.
///
/// Non-empty by construction. All tie-breaks favor the earlier-registered
/// target.
#[derive(Debug, Clone)]
pub struct TargetSet {
    targets: Vec<ExecutionTarget>,
}

impl TargetSet {
    pub(crate) fn new(targets: Vec<ExecutionTarget>) -> Result<Self, ConfigError> {
        if targets.is_empty() {
            return Err(ConfigError::NoTargets);
        }
        let mut seen = HashSet::new();
        for target in &targets {
            if !seen.insert(target.id.clone()) {
                return Err(ConfigError::DuplicateTarget(target.id.clone()));
            }
        }
        Ok(Self { targets })
    }

    pub fn get(&self, id: &str) -> Option<&ExecutionTarget> {
        self.targets.iter().find(|t| t.id == id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.get(id).is_some()
    }

    /// First registered target at exactly this tier.
    pub fn at_tier(&self, tier: Tier) -> Option<&ExecutionTarget> {
        self.targets.iter().find(|t| t.tier == tier)
    }

    /// First registered target at the highest populated tier.
    pub fn highest(&self) -> &ExecutionTarget {
        let mut best = &self.targets[0];
        for target in &self.targets[1..] {
            if target.tier > best.tier {
                best = target;
            }
        }
        best
    }

    /// First registered target at the nearest populated tier above `tier`.
    pub fn next_above(&self, tier: Tier) -> Option<&ExecutionTarget> {
        let mut best: Option<&ExecutionTarget> = None;
        for target in &self.targets {
            if target.tier > tier && best.is_none_or(|b| target.tier < b.tier) {
                best = Some(target);
            }
        }
        best
    }

    /// First registered target at the nearest populated tier below `tier`.
    pub fn next_below(&self, tier: Tier) -> Option<&ExecutionTarget> {
        let mut best: Option<&ExecutionTarget> = None;
        for target in &self.targets {
            if target.tier < tier && best.is_none_or(|b| target.tier > b.tier) {
                best = Some(target);
            }
        }
        best
    }

    pub fn iter(&self) -> impl Iterator<Item = &ExecutionTarget> {
        self.targets.iter()
    }

    pub fn len(&self) -> usize {
        self.targets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.targets.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn target(id: &str, tier: Tier) -> ExecutionTarget {
        ExecutionTarget {
            id: id.to_string(),
            tier,
            low_fidelity: false,
        }
    }

    #[test]
    fn tier_order_is_lite_to_frontier() {
        assert!(Tier::Lite < Tier::Standard);
        assert!(Tier::Standard < Tier::Advanced);
        assert!(Tier::Advanced < Tier::Frontier);
        assert_eq!(Tier::Frontier.above(), None);
        assert_eq!(Tier::Lite.below(), None);
        assert_eq!(Tier::Standard.above(), Some(Tier::Advanced));
    }

    #[test]
    fn tier_parses_case_insensitively() {
        assert_eq!("Frontier".parse::<Tier>().unwrap(), Tier::Frontier);
        assert!("turbo".parse::<Tier>().is_err());
    }

    #[test]
    fn empty_target_set_rejected() {
        let err = TargetSet::new(vec![]).unwrap_err();
        assert!(matches!(err, ConfigError::NoTargets));
    }

    #[test]
    fn duplicate_target_id_rejected() {
        let err = TargetSet::new(vec![
            target("worker", Tier::Standard),
            target("worker", Tier::Advanced),
        ])
        .unwrap_err();
        assert!(matches!(err, ConfigError::DuplicateTarget(id) if id == "worker"));
    }

    #[test]
    fn ladder_navigation_skips_unpopulated_tiers() {
        // No Advanced-tier target.
        let set = TargetSet::new(vec![
            target("quick", Tier::Lite),
            target("deep", Tier::Frontier),
            target("worker", Tier::Standard),
        ])
        .unwrap();

        assert_eq!(set.next_above(Tier::Standard).unwrap().id, "deep");
        assert_eq!(set.next_below(Tier::Frontier).unwrap().id, "worker");
        assert_eq!(set.next_above(Tier::Frontier), None);
        assert_eq!(set.next_below(Tier::Lite), None);
        assert_eq!(set.highest().id, "deep");
        assert_eq!(set.at_tier(Tier::Standard).unwrap().id, "worker");
        assert_eq!(set.at_tier(Tier::Advanced), None);
    }

    #[test]
    fn ties_go_to_first_registered() {
        let set = TargetSet::new(vec![
            target("a", Tier::Frontier),
            target("b", Tier::Frontier),
            target("base", Tier::Lite),
        ])
        .unwrap();
        assert_eq!(set.highest().id, "a");
        assert_eq!(set.next_above(Tier::Lite).unwrap().id, "a");
    }
}
