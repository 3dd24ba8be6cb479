//! Rule matching: request text against every rule in scope.

use tracing::debug;

use crate::registry::{Domain, Rule, RuleKind, RuleRegistry};

use super::context::RequestContext;

/// One rule's outcome against one request. Produced per cycle, never
/// persisted.
#[derive(Debug, Clone, PartialEq)]
pub struct MatchResult {
    pub rule_id: String,
    pub domain: String,
    pub kind: RuleKind,
    pub target: String,
    pub weight: f64,
    /// 1.0 for override/mandatory hits; fraction of held predicates for
    /// simple rules.
    pub strength: f64,
    pub registration_index: usize,
}

impl MatchResult {
    fn from_rule(rule: &Rule, strength: f64) -> Self {
        Self {
            rule_id: rule.id.clone(),
            domain: rule.domain.clone(),
            kind: rule.kind,
            target: rule.target.clone(),
            weight: rule.weight,
            strength,
            registration_index: rule.registration_index,
        }
    }

    /// Simple rules are only eligible to win when fully matched.
    pub fn is_full(&self) -> bool {
        self.strength >= 1.0
    }
}

/// Evaluate a request against every rule in scope.
///
/// Scope is all domains, narrowed to the hinted domain when the hint names
/// a known one; a hint naming nothing known falls back to all domains.
/// Override and mandatory rules match at strength 1.0 when any predicate
/// holds. Simple rules record the held fraction, so partial matches stay
/// visible for diagnostics. An empty result is a valid outcome.
pub fn match_request(ctx: &RequestContext, registry: &RuleRegistry) -> Vec<MatchResult> {
    let mut results = Vec::new();

    let hinted = ctx.domain_hint.as_deref().and_then(|name| {
        let domain = registry.domain(name);
        if domain.is_none() {
            debug!(hint = %name, "domain hint names no known domain; matching all domains");
        }
        domain
    });

    match hinted {
        Some(domain) => match_domain(domain, &ctx.text, &mut results),
        None => {
            for domain in registry.domains() {
                match_domain(domain, &ctx.text, &mut results);
            }
        }
    }

    results
}

fn match_domain(domain: &Domain, text: &str, results: &mut Vec<MatchResult>) {
    for rule in domain.rules() {
        match rule.kind {
            RuleKind::Override | RuleKind::Mandatory => {
                if rule.any_predicate_holds(text) {
                    results.push(MatchResult::from_rule(rule, 1.0));
                }
            }
            RuleKind::Simple => {
                let strength = rule.match_strength(text);
                if strength > 0.0 {
                    results.push(MatchResult::from_rule(rule, strength));
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::{
        DomainConfig, ExecutionTarget, Predicate, RuleConfig, RuleSetConfig, Tier,
    };

    fn keywords(words: &[&str]) -> Predicate {
        Predicate::Keywords {
            keywords: words.iter().map(|w| w.to_string()).collect(),
        }
    }

    fn registry() -> RuleRegistry {
        let config = RuleSetConfig {
            targets: vec![
                ExecutionTarget {
                    id: "quick".to_string(),
                    tier: Tier::Lite,
                    low_fidelity: true,
                },
                ExecutionTarget {
                    id: "worker".to_string(),
                    tier: Tier::Standard,
                    low_fidelity: false,
                },
                ExecutionTarget {
                    id: "deep".to_string(),
                    tier: Tier::Frontier,
                    low_fidelity: false,
                },
            ],
            domains: vec![
                DomainConfig {
                    name: "bug-fix".to_string(),
                    fallback_target: "worker".to_string(),
                    rules: vec![
                        RuleConfig {
                            id: "unclear-repro".to_string(),
                            kind: RuleKind::Mandatory,
                            target: "deep".to_string(),
                            weight: 1.0,
                            predicates: vec![
                                keywords(&["sometimes", "intermittent"]),
                                keywords(&["can't reproduce"]),
                            ],
                        },
                        RuleConfig {
                            id: "cosmetic".to_string(),
                            kind: RuleKind::Simple,
                            target: "quick".to_string(),
                            weight: 1.0,
                            predicates: vec![
                                keywords(&["typo", "rename", "remove"]),
                                Predicate::MaxLength { max_chars: 120 },
                            ],
                        },
                    ],
                },
                DomainConfig {
                    name: "release".to_string(),
                    fallback_target: "worker".to_string(),
                    rules: vec![RuleConfig {
                        id: "rollbacks".to_string(),
                        kind: RuleKind::Override,
                        target: "deep".to_string(),
                        weight: 1.0,
                        predicates: vec![keywords(&["rollback"])],
                    }],
                },
            ],
        };
        RuleRegistry::load(config).unwrap()
    }

    #[test]
    fn mandatory_matches_on_any_predicate_at_full_strength() {
        let registry = registry();
        let ctx = RequestContext::new("it fails sometimes under load");
        let results = match_request(&ctx, &registry);

        let m = results
            .iter()
            .find(|r| r.rule_id == "unclear-repro")
            .expect("mandatory rule should match");
        assert_eq!(m.strength, 1.0);
        assert_eq!(m.kind, RuleKind::Mandatory);
    }

    #[test]
    fn simple_records_partial_fraction() {
        let registry = registry();
        // "remove" hits the keyword predicate; text is over 120 chars, so
        // the length predicate fails.
        let long_tail = "x".repeat(130);
        let ctx = RequestContext::new(format!("remove the logging call {long_tail}"));
        let results = match_request(&ctx, &registry);

        let m = results
            .iter()
            .find(|r| r.rule_id == "cosmetic")
            .expect("simple rule should record a partial match");
        assert_eq!(m.strength, 0.5);
        assert!(!m.is_full());
    }

    #[test]
    fn no_matches_is_a_valid_outcome() {
        let registry = registry();
        // Long enough to fail the cosmetic rule's length predicate, with no
        // keyword from any rule.
        let ctx = RequestContext::new("write a long ballad about compilers ".repeat(5));
        assert!(match_request(&ctx, &registry).is_empty());
    }

    #[test]
    fn known_hint_narrows_scope() {
        let registry = registry();
        // Matches the release override only when release rules are in scope.
        let ctx = RequestContext::new("rollback the deploy").with_domain_hint("bug-fix");
        let results = match_request(&ctx, &registry);
        assert!(results.iter().all(|r| r.domain == "bug-fix"));
        assert!(results.iter().all(|r| r.rule_id != "rollbacks"));
    }

    #[test]
    fn unknown_hint_widens_to_all_domains() {
        let registry = registry();
        let ctx = RequestContext::new("rollback the deploy").with_domain_hint("no-such-domain");
        let results = match_request(&ctx, &registry);
        assert!(results.iter().any(|r| r.rule_id == "rollbacks"));
    }

    #[test]
    fn fully_held_simple_rule_is_full_strength() {
        let registry = registry();
        let ctx = RequestContext::new("remove the stray debug print");
        let results = match_request(&ctx, &registry);
        let m = results.iter().find(|r| r.rule_id == "cosmetic").unwrap();
        assert!(m.is_full());
    }
}
