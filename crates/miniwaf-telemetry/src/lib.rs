//! MiniWAF Telemetry
//!
//! Observability collaborators for the inspection engine.
//!
//! Provides:
//! - Structured warning-level logging of every rule match
//! - A JSON-lines audit log written by a background thread
//! - Request and decision metrics

pub mod log;
pub mod metrics;
pub mod persistence;
pub mod service;

pub use log::TracingSink;
pub use metrics::{MetricsCollector, MetricsSnapshot};
pub use persistence::{read_events, AuditConfig, AuditWriter, PersistedEvent};
pub use service::AuditService;

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::log::TracingSink;
    pub use crate::metrics::MetricsCollector;
    pub use crate::service::AuditService;
}
