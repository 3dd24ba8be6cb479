//! Capability-based task routing.
//!
//! switchyard turns a free-text task request into an auditable routing
//! [`Decision`] and executes it against caller-supplied backends. Rules
//! are declarative and per-domain: `override` rules pin whole categories
//! to a target, while `mandatory` rules force delegation on a single
//! predicate hit. `simple` rules vote for cheap inline handling only when
//! every criterion holds. Uncertain classifications escalate a capability
//! tier rather than guess.
//!
//! # Architecture
//!
//! - [`registry`]: declarative rule sets, validated at load time and
//!   shared read-only afterwards.
//! - [`routing`]: the pure classification pipeline producing a
//!   [`Decision`].
//! - [`dispatch`]: bounded, cancellable backend execution with retries
//!   and one-tier degradation.
//! - [`postprocess`]: conditional rewrite of sparse low-fidelity output.
//! - [`router`]: the facade tying the stages together.
//!
//! # Usage
//!
//! ```rust,ignore
//! use std::sync::Arc;
//!
//! use switchyard::{RequestContext, Router, RouterConfig, RuleRegistry, RuleSetConfig};
//!
//! let rules = RuleSetConfig::from_toml_str(&std::fs::read_to_string("rules.toml")?)?;
//! let router = Router::new(RuleRegistry::load(rules)?, RouterConfig::from_env()?)
//!     .with_backend("quick", Arc::new(LocalHandler))
//!     .with_backend("deep", Arc::new(FrontierClient::new()?));
//!
//! let outcome = router.route(&RequestContext::new("Remove this console.log")).await?;
//! println!("{} via {}", outcome.decision.mode, outcome.result.served_by);
//! ```

pub mod config;
pub mod dispatch;
pub mod error;
pub mod postprocess;
pub mod registry;
pub mod router;
pub mod routing;
pub mod stats;

pub use config::{DispatchConfig, RouterConfig};
pub use dispatch::{CyclePhase, Dispatcher, ExecutionBackend, ExecutionResult, ExecutionStatus};
pub use error::{BackendError, ConfigError, DispatchError, Error, Result, RouteError};
pub use postprocess::RewriteBackend;
pub use registry::{ExecutionTarget, RuleRegistry, RuleSetConfig, Tier};
pub use router::{RouteOutcome, Router};
pub use routing::{Decision, MatchRecord, RequestContext, RouteMode};
pub use stats::{RouterStats, StatsSnapshot};
