//! Structured logging of rule matches

use miniwaf_core::{Event, EventSink};
use tracing::warn;

/// Logs every event at warning level.
///
/// The event is attached both as individual fields and as one JSON value,
/// so plain-text and JSON subscribers each get something usable.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl TracingSink {
    pub fn new() -> Self {
        Self
    }
}

impl EventSink for TracingSink {
    fn emit(&self, event: &Event) {
        let payload = serde_json::to_string(event).unwrap_or_default();
        let verdict = if event.is_block() {
            "Blocked request"
        } else {
            "Flagged request"
        };

        warn!(
            rule_id = %event.rule_id,
            action = %event.action,
            client_ip = event.client_ip.as_deref().unwrap_or("-"),
            method = %event.request.method,
            url = %event.request.url,
            event = %payload,
            "{}: {}",
            verdict,
            event.description
        );
    }
}
