//! MiniWAF Core
//!
//! Core types, traits, and utilities shared across MiniWAF components.
//!
//! This crate provides:
//! - Error types for rule loading and configuration
//! - Request facets, the typed values rules are matched against
//! - The `InspectableRequest` capability trait and a concrete `HttpRequest`
//! - Audit events and the `EventSink` observability port

pub mod error;
pub mod event;
pub mod request;
pub mod types;

pub use error::{Error, Result};
pub use event::{Event, EventSink, NullSink, RequestSummary, SinkSet};
pub use request::{HttpRequest, InspectableRequest};
pub use types::{Action, Facet, FacetMap, FacetName};

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::error::{Error, Result};
    pub use crate::event::{Event, EventSink, RequestSummary};
    pub use crate::request::{HttpRequest, InspectableRequest};
    pub use crate::types::{Action, Facet, FacetMap, FacetName};
}
