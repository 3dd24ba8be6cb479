//! Confidence scoring for a resolved classification.
//!
//! Confidence reflects how certain the rule evidence was, not how likely
//! the dispatch is to succeed. Rule-forced outcomes score 1.0 even when
//! they delegate; only partial evidence lands strictly between 0 and 1,
//! and a request nothing matched scores 0.0.

use super::resolver::Classification;

/// Score a classification in `[0.0, 1.0]`.
pub fn score(classification: &Classification) -> f64 {
    match classification {
        Classification::Explicit { .. }
        | Classification::Override { .. }
        | Classification::Mandatory { .. }
        | Classification::Inline { .. } => 1.0,
        Classification::Partial { aggregate, .. } => aggregate.clamp(0.0, 1.0),
        Classification::Ambiguous => 0.0,
    }
}
