//! MiniWAF Policy Engine
//!
//! Declarative request-inspection rules and the engine that applies them.
//!
//! Rules are defined in YAML and specify:
//! - A case-insensitive regular expression
//! - The request facets it is tested against (url, query_params, headers, post_body)
//! - An action: `block` rejects the request, `log` records the match only
//!
//! Rules are evaluated in declaration order and the first matching `block`
//! rule decides the request.

pub mod config;
pub mod engine;
pub mod extractor;
pub mod matcher;
pub mod rule;
pub mod store;

pub use config::EngineConfig;
pub use engine::{Decision, InspectionEngine};
pub use extractor::extract;
pub use matcher::{matches, MatchError};
pub use rule::{Rule, RuleSet};
pub use store::RuleStore;

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::config::EngineConfig;
    pub use crate::engine::{Decision, InspectionEngine};
    pub use crate::rule::{Rule, RuleSet};
    pub use crate::store::RuleStore;
}
