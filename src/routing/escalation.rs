//! Escalation policy: classification plus confidence becomes a `Decision`.
//!
//! The policy may only raise a provisional outcome. A low-confidence
//! delegate moves one tier up; an ambiguous request goes straight to the
//! highest tier. Nothing here ever downgrades a delegate to inline.

use chrono::Utc;
use tracing::debug;
use uuid::Uuid;

use crate::config::RouterConfig;
use crate::registry::{ExecutionTarget, RuleRegistry};

use super::decision::{Decision, MatchRecord, RouteMode};
use super::matcher::MatchResult;
use super::resolver::Classification;

/// Apply the escalation policy and produce the final `Decision`.
///
/// `matches` is the full candidate list from matching; it is recorded on
/// the decision verbatim so callers can audit what the classification saw.
pub fn finalize(
    classification: Classification,
    confidence: f64,
    matches: &[MatchResult],
    config: &RouterConfig,
    registry: &RuleRegistry,
) -> Decision {
    let records: Vec<MatchRecord> = matches
        .iter()
        .map(|m| MatchRecord {
            rule_id: m.rule_id.clone(),
            domain: m.domain.clone(),
            kind: m.kind,
            strength: m.strength,
        })
        .collect();

    let (mode, mut target, mut escalated, mut reason) = match classification {
        Classification::Explicit { target } => (
            RouteMode::Delegate,
            target,
            false,
            "caller requested this target explicitly".to_string(),
        ),
        Classification::Override { winner } => (
            RouteMode::Delegate,
            winner.target.clone(),
            false,
            format!("override rule '{}' forced delegation", winner.rule_id),
        ),
        Classification::Mandatory { candidates } => {
            let chosen = pick_mandatory_target(&candidates, registry);
            let reason = if candidates.len() == 1 {
                format!("mandatory rule '{}' requires delegation", candidates[0].rule_id)
            } else {
                format!(
                    "{} mandatory rules require delegation; taking the highest tier among their targets",
                    candidates.len()
                )
            };
            (RouteMode::Delegate, chosen.id.clone(), false, reason)
        }
        Classification::Inline { domain, target } => (
            RouteMode::Inline,
            target,
            false,
            format!("all simple criteria for domain '{domain}' held"),
        ),
        Classification::Partial {
            domain,
            fallback_target,
            aggregate,
        } => (
            RouteMode::Delegate,
            fallback_target,
            false,
            format!(
                "partial evidence ({aggregate:.2}) for domain '{domain}'; delegating to its fallback"
            ),
        ),
        Classification::Ambiguous => (
            RouteMode::Delegate,
            registry.targets().highest().id.clone(),
            true,
            "no rule matched; escalating to the highest available tier".to_string(),
        ),
    };

    // Low confidence raises the provisional target one tier. Strictly
    // below: a decision sitting exactly at the threshold stands.
    if !escalated && confidence < config.confidence_threshold {
        escalated = true;
        let above = registry
            .targets()
            .get(&target)
            .and_then(|current| registry.targets().next_above(current.tier));
        match above {
            Some(raised) => {
                reason = format!(
                    "{reason}; confidence {confidence:.2} below threshold {:.2}, raised to '{}'",
                    config.confidence_threshold, raised.id
                );
                target = raised.id.clone();
            }
            None => {
                reason = format!(
                    "{reason}; confidence {confidence:.2} below threshold {:.2}, already at the highest tier",
                    config.confidence_threshold
                );
            }
        }
    }

    let decision = Decision {
        id: Uuid::new_v4(),
        mode,
        target,
        confidence,
        escalated,
        matches: records,
        reason,
        created_at: Utc::now(),
    };
    debug!(
        decision = %decision.id,
        mode = %decision.mode,
        target = %decision.target,
        confidence = decision.confidence,
        escalated = decision.escalated,
        "routing decision finalized"
    );
    decision
}

/// Highest-tier target among the mandatory candidates' suggestions.
/// Candidates arrive in registration order and ties keep the earliest.
fn pick_mandatory_target<'a>(
    candidates: &[MatchResult],
    registry: &'a RuleRegistry,
) -> &'a ExecutionTarget {
    let mut best: Option<&ExecutionTarget> = None;
    for candidate in candidates {
        if let Some(target) = registry.targets().get(&candidate.target) {
            if best.is_none_or(|b| target.tier > b.tier) {
                best = Some(target);
            }
        }
    }
    best.unwrap_or_else(|| registry.targets().highest())
}
