//! Immutable request context.

use serde::{Deserialize, Serialize};

/// Everything the router knows about one incoming task.
///
/// Built once per request and never mutated afterwards; construct a new
/// context to route a changed request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RequestContext {
    /// Raw request text.
    pub text: String,
    /// Caller-requested target. When set it wins outright and rule
    /// matching is skipped.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub explicit_target: Option<String>,
    /// Narrows matching to one domain when it names a known domain.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub domain_hint: Option<String>,
}

impl RequestContext {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            explicit_target: None,
            domain_hint: None,
        }
    }

    pub fn with_explicit_target(mut self, target: impl Into<String>) -> Self {
        self.explicit_target = Some(target.into());
        self
    }

    pub fn with_domain_hint(mut self, domain: impl Into<String>) -> Self {
        self.domain_hint = Some(domain.into());
        self
    }
}
