//! Rule registry: validated, ordered, immutable rule storage.
//!
//! A registry is built once from caller-supplied configuration and shared
//! read-only across routing cycles. Everything that can be rejected is
//! rejected here, so the matching path never sees a malformed rule:
//!
//! - unknown target references and fallback targets
//! - duplicate target ids, domain names, and rule ids (per domain)
//! - empty predicate lists, invalid patterns, non-positive weights
//! - same-domain override pairs that can provably fire together
//!
//! Within a domain, rules are held in evaluation order: overrides, then
//! mandatory, then simple. The original load position is kept on each rule
//! as `registration_index`; it is the tie-break key for every downstream
//! selection.

mod predicate;
mod rule;
mod target;

pub use predicate::Predicate;
pub use rule::{Rule, RuleConfig, RuleKind};
pub use target::{ExecutionTarget, TargetSet, Tier};

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::ConfigError;

/// Serde model for a complete rule set.
///
/// Acquisition is the caller's concern; this crate only parses and
/// validates. `from_toml_str` covers the common case of a TOML document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RuleSetConfig {
    #[serde(default)]
    pub targets: Vec<ExecutionTarget>,
    #[serde(default)]
    pub domains: Vec<DomainConfig>,
}

impl RuleSetConfig {
    /// Parse a TOML rule-set document.
    pub fn from_toml_str(raw: &str) -> Result<Self, ConfigError> {
        toml::from_str(raw).map_err(|e| ConfigError::ParseError(e.to_string()))
    }
}

/// Serde model for one domain's rules.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DomainConfig {
    pub name: String,
    /// Where this domain delegates when inline criteria are not met.
    pub fallback_target: String,
    #[serde(default)]
    pub rules: Vec<RuleConfig>,
}

/// One domain's compiled rules, in evaluation order.
#[derive(Debug)]
pub struct Domain {
    name: String,
    fallback_target: String,
    rules: Vec<Rule>,
}

impl Domain {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn fallback_target(&self) -> &str {
        &self.fallback_target
    }

    /// Rules in evaluation order: overrides, then mandatory, then simple.
    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    pub fn simple_rules(&self) -> impl Iterator<Item = &Rule> {
        self.rules.iter().filter(|r| r.kind == RuleKind::Simple)
    }

    pub fn overrides(&self) -> impl Iterator<Item = &Rule> {
        self.rules.iter().filter(|r| r.kind == RuleKind::Override)
    }
}

/// Immutable, validated rule registry.
#[derive(Debug)]
pub struct RuleRegistry {
    targets: TargetSet,
    domains: Vec<Domain>,
    by_name: HashMap<String, usize>,
}

impl RuleRegistry {
    /// Validate and compile a rule set.
    pub fn load(config: RuleSetConfig) -> Result<Self, ConfigError> {
        let targets = TargetSet::new(config.targets)?;

        let mut domains: Vec<Domain> = Vec::with_capacity(config.domains.len());
        let mut by_name = HashMap::new();
        let mut next_index = 0usize;

        for domain_cfg in config.domains {
            let DomainConfig {
                name,
                fallback_target,
                rules: rule_cfgs,
            } = domain_cfg;

            if by_name.contains_key(&name) {
                return Err(ConfigError::DuplicateDomain(name));
            }
            if !targets.contains(&fallback_target) {
                return Err(ConfigError::UnknownFallbackTarget {
                    domain: name,
                    target: fallback_target,
                });
            }

            check_override_disjointness(&name, &rule_cfgs)?;

            let mut seen_rules = HashSet::new();
            let mut rules = Vec::with_capacity(rule_cfgs.len());
            for rule_cfg in rule_cfgs {
                if !seen_rules.insert(rule_cfg.id.clone()) {
                    return Err(ConfigError::DuplicateRuleId {
                        domain: name,
                        rule: rule_cfg.id,
                    });
                }
                if !targets.contains(&rule_cfg.target) {
                    return Err(ConfigError::UnknownTarget {
                        domain: name,
                        rule: rule_cfg.id,
                        target: rule_cfg.target,
                    });
                }
                if rule_cfg.predicates.is_empty() {
                    return Err(ConfigError::EmptyPredicates {
                        domain: name,
                        rule: rule_cfg.id,
                    });
                }
                if !rule_cfg.weight.is_finite() || rule_cfg.weight <= 0.0 {
                    return Err(ConfigError::InvalidWeight {
                        domain: name,
                        rule: rule_cfg.id,
                        weight: rule_cfg.weight,
                    });
                }

                let mut compiled = Vec::with_capacity(rule_cfg.predicates.len());
                for predicate in &rule_cfg.predicates {
                    compiled.push(predicate.compile().map_err(|message| {
                        ConfigError::InvalidPredicate {
                            domain: name.clone(),
                            rule: rule_cfg.id.clone(),
                            message,
                        }
                    })?);
                }

                rules.push(Rule {
                    id: rule_cfg.id,
                    domain: name.clone(),
                    kind: rule_cfg.kind,
                    target: rule_cfg.target,
                    weight: rule_cfg.weight,
                    predicates: compiled,
                    registration_index: next_index,
                });
                next_index += 1;
            }

            // Evaluation order within the domain; registration_index still
            // records the original load position.
            rules.sort_by_key(|r| (kind_rank(r.kind), r.registration_index));

            by_name.insert(name.clone(), domains.len());
            domains.push(Domain {
                name,
                fallback_target,
                rules,
            });
        }

        Ok(Self {
            targets,
            domains,
            by_name,
        })
    }

    pub fn targets(&self) -> &TargetSet {
        &self.targets
    }

    /// Domains in registration order.
    pub fn domains(&self) -> impl Iterator<Item = &Domain> {
        self.domains.iter()
    }

    pub fn domain(&self, name: &str) -> Option<&Domain> {
        self.by_name.get(name).map(|&i| &self.domains[i])
    }

    /// Rules of one domain in evaluation order, if the domain exists.
    pub fn rules_for(&self, domain: &str) -> Option<&[Rule]> {
        self.domain(domain).map(Domain::rules)
    }

    /// Override rules across all domains, in domain registration order.
    pub fn all_overrides(&self) -> impl Iterator<Item = &Rule> {
        self.domains.iter().flat_map(Domain::overrides)
    }

    pub fn rule_count(&self) -> usize {
        self.domains.iter().map(|d| d.rules.len()).sum()
    }
}

fn kind_rank(kind: RuleKind) -> u8 {
    match kind {
        RuleKind::Override => 0,
        RuleKind::Mandatory => 1,
        RuleKind::Simple => 2,
    }
}

/// Static disjointness analysis for a domain's overrides.
///
/// The decidable cases: a keyword of one override containing a keyword of
/// the other (a single phrase satisfies both) and identical pattern
/// sources. Those load as errors. Pairs that cannot be proven disjoint
/// (distinct regexes, structural predicates) load with a warning; if both
/// fire at runtime the resolver keeps the first-registered one.
fn check_override_disjointness(domain: &str, rules: &[RuleConfig]) -> Result<(), ConfigError> {
    let overrides: Vec<&RuleConfig> = rules
        .iter()
        .filter(|r| r.kind == RuleKind::Override)
        .collect();

    for (i, first) in overrides.iter().enumerate() {
        for second in &overrides[i + 1..] {
            if let Some(overlap) = static_overlap(first, second) {
                return Err(ConfigError::ConflictingOverrides {
                    domain: domain.to_string(),
                    first: first.id.clone(),
                    second: second.id.clone(),
                    overlap,
                });
            }
            if !provably_disjoint(first, second) {
                warn!(
                    domain = %domain,
                    first = %first.id,
                    second = %second.id,
                    "override predicates cannot be proven disjoint; first registered wins if both match"
                );
            }
        }
    }
    Ok(())
}

/// A concrete overlap between two overrides, if one is statically evident.
fn static_overlap(first: &RuleConfig, second: &RuleConfig) -> Option<String> {
    for a in first.predicates.iter().filter_map(|p| p.keyword_list()) {
        for b in second.predicates.iter().filter_map(|p| p.keyword_list()) {
            for ka in a {
                for kb in b {
                    let (ka_low, kb_low) = (ka.to_lowercase(), kb.to_lowercase());
                    if ka_low.contains(&kb_low) || kb_low.contains(&ka_low) {
                        return Some(format!("keyword {ka:?} overlaps {kb:?}"));
                    }
                }
            }
        }
    }

    for a in first.predicates.iter().filter_map(|p| p.pattern_source()) {
        for b in second.predicates.iter().filter_map(|p| p.pattern_source()) {
            if a == b {
                return Some(format!("identical pattern {a:?}"));
            }
        }
    }

    None
}

/// True when both sides carry only keyword predicates; with no containment
/// overlap (checked first), a single matched phrase cannot satisfy both.
fn provably_disjoint(first: &RuleConfig, second: &RuleConfig) -> bool {
    first
        .predicates
        .iter()
        .chain(second.predicates.iter())
        .all(|p| p.keyword_list().is_some())
}
