//! The synchronous routing cycle: request in, `Decision` out.
//!
//! Classification never blocks on a backend. Every stage is a pure
//! function over the request and a registry snapshot, so the same inputs
//! always produce the same routed outcome.
//!
//! # Pipeline
//!
//! ```text
//! RequestContext
//!      │
//!      ▼
//! ┌──────────────────┐
//! │     Matcher      │  ← evaluate rules, collect candidates
//! └────────┬─────────┘
//!          │ Vec<MatchResult>
//!          ▼
//! ┌──────────────────┐
//! │     Resolver     │  ← explicit > override > mandatory > simple
//! └────────┬─────────┘
//!          │ Classification
//!          ▼
//! ┌──────────────────┐
//! │    Confidence    │  ← certainty of the evidence, 0.0..=1.0
//! └────────┬─────────┘
//!          │
//!          ▼
//! ┌──────────────────┐
//! │    Escalation    │  ← low confidence raises the tier
//! └────────┬─────────┘
//!          │
//!          ▼
//!       Decision
//! ```
//!
//! # Usage
//!
//! ```rust,ignore
//! use switchyard::routing::{self, RequestContext};
//!
//! let ctx = RequestContext::new("fix the typo in the greeting banner");
//! let matches = routing::match_request(&ctx, &registry);
//! let classification = routing::resolve(&ctx, &matches, &registry);
//! let confidence = routing::score(&classification);
//! let decision = routing::finalize(classification, confidence, &matches, &config, &registry);
//! ```

mod confidence;
mod context;
mod decision;
mod escalation;
mod matcher;
mod resolver;

pub use confidence::score;
pub use context::RequestContext;
pub use decision::{Decision, MatchRecord, RouteMode};
pub use escalation::finalize;
pub use matcher::{match_request, MatchResult};
pub use resolver::{resolve, Classification};
