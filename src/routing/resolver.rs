//! Priority resolution: candidate matches to a single classification.

use tracing::warn;

use crate::registry::{Domain, RuleKind, RuleRegistry};

use super::context::RequestContext;
use super::matcher::MatchResult;

/// Outcome of priority resolution, before escalation builds the decision.
#[derive(Debug, Clone, PartialEq)]
pub enum Classification {
    /// Caller named a target; matching was skipped.
    Explicit { target: String },
    /// An override rule won.
    Override { winner: MatchResult },
    /// One or more mandatory rules fired. Candidates are kept in
    /// registration order; the escalation policy picks among their
    /// suggested targets.
    Mandatory { candidates: Vec<MatchResult> },
    /// Every simple rule of the inferred domain held fully.
    Inline { domain: String, target: String },
    /// Simple rules held only partially; delegate conservatively.
    Partial {
        domain: String,
        fallback_target: String,
        /// Weighted aggregate strength over the domain's simple rules,
        /// strictly below 1.0.
        aggregate: f64,
    },
    /// Nothing matched.
    Ambiguous,
}

/// Resolve matches into a classification using the strict priority order:
/// explicit caller target, then overrides, then mandatory rules, then the
/// inferred domain's simple-rule sweep, then ambiguity.
pub fn resolve(
    ctx: &RequestContext,
    matches: &[MatchResult],
    registry: &RuleRegistry,
) -> Classification {
    if let Some(target) = &ctx.explicit_target {
        return Classification::Explicit {
            target: target.clone(),
        };
    }

    // Overrides beat everything below. Two firing at once means a rule-set
    // conflict the static analysis could not prove; keep the first
    // registered and say so.
    let mut overrides: Vec<&MatchResult> = matches
        .iter()
        .filter(|m| m.kind == RuleKind::Override)
        .collect();
    overrides.sort_by_key(|m| m.registration_index);
    if overrides.len() > 1 {
        warn!(
            first = %overrides[0].rule_id,
            second = %overrides[1].rule_id,
            "multiple override rules matched one request; keeping the first registered"
        );
    }
    if let Some(winner) = overrides.first() {
        return Classification::Override {
            winner: (*winner).clone(),
        };
    }

    // Any mandatory hit forces delegation; all of them become candidates.
    let mut mandatory: Vec<MatchResult> = matches
        .iter()
        .filter(|m| m.kind == RuleKind::Mandatory)
        .cloned()
        .collect();
    if !mandatory.is_empty() {
        mandatory.sort_by_key(|m| m.registration_index);
        return Classification::Mandatory {
            candidates: mandatory,
        };
    }

    let simple: Vec<&MatchResult> = matches
        .iter()
        .filter(|m| m.kind == RuleKind::Simple)
        .collect();
    if simple.is_empty() {
        return Classification::Ambiguous;
    }

    let Some(inferred) = infer_domain(ctx, &simple, registry) else {
        return Classification::Ambiguous;
    };

    let total = inferred.simple_rules().count();
    let full = simple
        .iter()
        .filter(|m| m.domain == inferred.name() && m.is_full())
        .count();

    if total > 0 && full == total {
        // All simple criteria held; inline at the first-registered simple
        // rule's target.
        if let Some(first_simple) = inferred.simple_rules().next() {
            return Classification::Inline {
                domain: inferred.name().to_string(),
                target: first_simple.target.clone(),
            };
        }
    }

    Classification::Partial {
        domain: inferred.name().to_string(),
        fallback_target: inferred.fallback_target().to_string(),
        aggregate: domain_aggregate(inferred, &simple),
    }
}

/// The domain a simple-rule sweep applies to: the hinted domain when known,
/// otherwise the domain with the highest weighted aggregate strength.
/// Domain registration order breaks ties.
fn infer_domain<'a>(
    ctx: &RequestContext,
    simple: &[&MatchResult],
    registry: &'a RuleRegistry,
) -> Option<&'a Domain> {
    if let Some(domain) = ctx.domain_hint.as_deref().and_then(|n| registry.domain(n)) {
        return Some(domain);
    }

    let mut best: Option<(&Domain, f64)> = None;
    for domain in registry.domains() {
        let aggregate = domain_aggregate(domain, simple);
        if aggregate > 0.0 && best.is_none_or(|(_, b)| aggregate > b) {
            best = Some((domain, aggregate));
        }
    }
    best.map(|(domain, _)| domain)
}

/// Weighted mean strength over all of a domain's simple rules. Unmatched
/// rules contribute zero to the numerator but full weight to the
/// denominator, so missing criteria drag the aggregate down.
fn domain_aggregate(domain: &Domain, simple: &[&MatchResult]) -> f64 {
    let total_weight: f64 = domain.simple_rules().map(|r| r.weight).sum();
    if total_weight <= 0.0 {
        return 0.0;
    }
    let matched: f64 = simple
        .iter()
        .filter(|m| m.domain == domain.name())
        .map(|m| m.strength * m.weight)
        .sum();
    matched / total_weight
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::{
        DomainConfig, ExecutionTarget, Predicate, RuleConfig, RuleSetConfig, Tier,
    };
    use crate::routing::matcher::match_request;

    fn keywords(words: &[&str]) -> Predicate {
        Predicate::Keywords {
            keywords: words.iter().map(|w| w.to_string()).collect(),
        }
    }

    fn rule(id: &str, kind: RuleKind, target: &str, predicates: Vec<Predicate>) -> RuleConfig {
        RuleConfig {
            id: id.to_string(),
            kind,
            target: target.to_string(),
            weight: 1.0,
            predicates,
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
                    id: "isolated".to_string(),
                    tier: Tier::Advanced,
                    low_fidelity: false,
                },
                ExecutionTarget {
                    id: "deep".to_string(),
                    tier: Tier::Frontier,
                    low_fidelity: false,
                },
            ],
            domains: vec![DomainConfig {
                name: "bug-fix".to_string(),
                fallback_target: "worker".to_string(),
                rules: vec![
                    rule(
                        "urgent",
                        RuleKind::Override,
                        "deep",
                        vec![keywords(&["sev1"])],
                    ),
                    rule(
                        "unclear-repro",
                        RuleKind::Mandatory,
                        "isolated",
                        vec![keywords(&["sometimes", "intermittent"])],
                    ),
                    rule(
                        "multi-file",
                        RuleKind::Mandatory,
                        "worker",
                        vec![Predicate::MentionsFiles { at_least_files: 2 }],
                    ),
                    rule(
                        "cosmetic",
                        RuleKind::Simple,
                        "quick",
                        vec![
                            keywords(&["typo", "remove", "rename"]),
                            Predicate::MaxLength { max_chars: 120 },
                        ],
                    ),
                ],
            }],
        };
        RuleRegistry::load(config).unwrap()
    }

    fn classify(text: &str) -> Classification {
        let registry = registry();
        let ctx = RequestContext::new(text);
        let matches = match_request(&ctx, &registry);
        resolve(&ctx, &matches, &registry)
    }

    #[test]
    fn explicit_target_wins_without_matching() {
        let registry = registry();
        let ctx = RequestContext::new("sev1 rollback sometimes").with_explicit_target("worker");
        // Explicit path never consults matches.
        let classification = resolve(&ctx, &[], &registry);
        assert_eq!(
            classification,
            Classification::Explicit {
                target: "worker".to_string()
            }
        );
    }

    #[test]
    fn override_beats_mandatory() {
        let classification = classify("sev1: fails sometimes in prod");
        match classification {
            Classification::Override { winner } => assert_eq!(winner.rule_id, "urgent"),
            other => panic!("expected override win, got {other:?}"),
        }
    }

    #[test]
    fn mandatory_beats_simple() {
        let classification = classify("remove the typo, it renders wrong sometimes");
        match classification {
            Classification::Mandatory { candidates } => {
                assert_eq!(candidates.len(), 1);
                assert_eq!(candidates[0].rule_id, "unclear-repro");
            }
            other => panic!("expected mandatory delegation, got {other:?}"),
        }
    }

    #[test]
    fn multiple_mandatory_candidates_keep_registration_order() {
        let classification =
            classify("it fails sometimes; check src/parser.rs and src/lexer.rs");
        match classification {
            Classification::Mandatory { candidates } => {
                let ids: Vec<&str> = candidates.iter().map(|c| c.rule_id.as_str()).collect();
                assert_eq!(ids, vec!["unclear-repro", "multi-file"]);
            }
            other => panic!("expected mandatory delegation, got {other:?}"),
        }
    }

    #[test]
    fn full_simple_sweep_goes_inline() {
        let classification = classify("remove the stray debug print");
        assert_eq!(
            classification,
            Classification::Inline {
                domain: "bug-fix".to_string(),
                target: "quick".to_string()
            }
        );
    }

    #[test]
    fn partial_simple_sweep_delegates_conservatively() {
        let long_tail = "x".repeat(130);
        let classification = classify(&format!("remove the logging call {long_tail}"));
        match classification {
            Classification::Partial {
                domain,
                fallback_target,
                aggregate,
            } => {
                assert_eq!(domain, "bug-fix");
                assert_eq!(fallback_target, "worker");
                assert_eq!(aggregate, 0.5);
            }
            other => panic!("expected conservative delegation, got {other:?}"),
        }
    }

    #[test]
    fn nothing_matched_is_ambiguous() {
        let classification = classify(&"compose a ballad about the build farm ".repeat(5));
        assert_eq!(classification, Classification::Ambiguous);
    }

    #[test]
    fn aggregate_counts_unmatched_rules_in_denominator() {
        // Two simple rules; text matches only one of them fully.
        let config = RuleSetConfig {
            targets: vec![ExecutionTarget {
                id: "quick".to_string(),
                tier: Tier::Lite,
                low_fidelity: false,
            }],
            domains: vec![DomainConfig {
                name: "docs".to_string(),
                fallback_target: "quick".to_string(),
                rules: vec![
                    rule(
                        "short",
                        RuleKind::Simple,
                        "quick",
                        vec![Predicate::MaxLength { max_chars: 200 }],
                    ),
                    rule(
                        "mentions-readme",
                        RuleKind::Simple,
                        "quick",
                        vec![keywords(&["README"])],
                    ),
                ],
            }],
        };
        let registry = RuleRegistry::load(config).unwrap();
        let ctx = RequestContext::new("tidy the changelog wording");
        let matches = match_request(&ctx, &registry);
        let classification = resolve(&ctx, &matches, &registry);
        match classification {
            Classification::Partial { aggregate, .. } => assert_eq!(aggregate, 0.5),
            other => panic!("expected partial, got {other:?}"),
        }
    }
}
