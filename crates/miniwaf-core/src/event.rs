//! Audit events and the sink they are emitted to

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;

use crate::types::Action;

/// A structured record of one rule match
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    /// When the match happened
    pub timestamp: DateTime<Utc>,

    /// Origin address of the request
    pub client_ip: Option<String>,

    /// Id of the matched rule
    pub rule_id: String,

    /// Description of the matched rule
    pub description: String,

    /// The matched rule's action
    pub action: Action,

    /// What was requested
    pub request: RequestSummary,
}

impl Event {
    pub fn is_block(&self) -> bool {
        self.action.is_block()
    }
}

/// The part of a request recorded in an event
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RequestSummary {
    pub url: String,
    pub method: String,
    pub headers: BTreeMap<String, String>,
}

/// Receives events as rules match.
///
/// `emit` is called on the inspecting thread before the decision is
/// returned, so implementations should hand off rather than block on I/O.
pub trait EventSink: Send + Sync {
    fn emit(&self, event: &Event);
}

impl<T: EventSink + ?Sized> EventSink for Arc<T> {
    fn emit(&self, event: &Event) {
        (**self).emit(event)
    }
}

/// Fans one event out to several sinks, in order
#[derive(Clone, Default)]
pub struct SinkSet {
    sinks: Vec<Arc<dyn EventSink>>,
}

impl SinkSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a sink
    pub fn with(mut self, sink: Arc<dyn EventSink>) -> Self {
        self.sinks.push(sink);
        self
    }

    pub fn push(&mut self, sink: Arc<dyn EventSink>) {
        self.sinks.push(sink);
    }

    pub fn len(&self) -> usize {
        self.sinks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sinks.is_empty()
    }
}

impl EventSink for SinkSet {
    fn emit(&self, event: &Event) {
        for sink in &self.sinks {
            sink.emit(event);
        }
    }
}

/// Discards every event
#[derive(Debug, Clone, Copy, Default)]
pub struct NullSink;

impl EventSink for NullSink {
    fn emit(&self, _event: &Event) {}
}
