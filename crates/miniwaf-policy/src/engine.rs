//! Request inspection engine

use chrono::Utc;
use miniwaf_core::{Event, EventSink, InspectableRequest, NullSink, RequestSummary};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::config::EngineConfig;
use crate::extractor::extract;
use crate::matcher::matches;
use crate::rule::{Rule, RuleSet};
use crate::store::RuleStore;

/// Outcome of inspecting one request
#[derive(Debug, Clone, PartialEq)]
pub enum Decision {
    /// No blocking rule matched
    Allow,
    /// A blocking rule matched; carries that rule's event
    Block(Event),
}

impl Decision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, Decision::Allow)
    }

    /// The event of the blocking rule, if any
    pub fn event(&self) -> Option<&Event> {
        match self {
            Decision::Allow => None,
            Decision::Block(event) => Some(event),
        }
    }

    /// Split into the `(allowed, event)` pair
    pub fn into_parts(self) -> (bool, Option<Event>) {
        match self {
            Decision::Allow => (true, None),
            Decision::Block(event) => (false, Some(event)),
        }
    }
}

/// Applies a rule set to requests.
///
/// Every matching rule emits an event to the sink. The first matching
/// `block` rule ends the inspection; `log` rules never do.
pub struct InspectionEngine {
    rules: RuleStore,
    sink: Arc<dyn EventSink>,
    config: EngineConfig,
}

impl InspectionEngine {
    /// Create an engine over a fixed rule set that discards events
    pub fn new(rules: RuleSet) -> Self {
        Self::with_store(RuleStore::new(rules))
    }

    /// Create an engine over a shared, reloadable rule store
    pub fn with_store(rules: RuleStore) -> Self {
        Self {
            rules,
            sink: Arc::new(NullSink),
            config: EngineConfig::default(),
        }
    }

    /// Set the event sink
    pub fn with_sink(mut self, sink: Arc<dyn EventSink>) -> Self {
        self.sink = sink;
        self
    }

    /// Set engine limits
    pub fn with_config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    /// The rule store this engine reads from
    pub fn store(&self) -> &RuleStore {
        &self.rules
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Inspect a request against the current rule set
    pub fn inspect<R: InspectableRequest + ?Sized>(&self, request: &R) -> Decision {
        let facets = extract(request);
        let rules = self.rules.snapshot();

        for rule in rules.iter() {
            let matched = match matches(rule, &facets, &self.config) {
                Ok(matched) => matched,
                Err(e) => {
                    warn!(rule_id = %rule.id, error = %e, "Rule evaluation failed, treating as no match");
                    metrics::counter!("miniwaf_rule_faults_total", "rule" => rule.id.clone())
                        .increment(1);
                    continue;
                }
            };

            if !matched {
                continue;
            }

            let event = self.build_event(rule, request);
            self.sink.emit(&event);

            if rule.action.is_block() {
                debug!(rule_id = %rule.id, "Request blocked");
                return Decision::Block(event);
            }

            debug!(rule_id = %rule.id, "Rule matched, continuing");
        }

        Decision::Allow
    }

    fn build_event<R: InspectableRequest + ?Sized>(&self, rule: &Rule, request: &R) -> Event {
        let headers: BTreeMap<String, String> = request
            .headers()
            .into_iter()
            .take(self.config.max_event_headers)
            .map(|(name, value)| (name, truncate(&value, self.config.max_event_header_len)))
            .collect();

        Event {
            timestamp: Utc::now(),
            client_ip: request.remote_addr().map(str::to_string),
            rule_id: rule.id.clone(),
            description: rule.description.clone(),
            action: rule.action,
            request: RequestSummary {
                url: truncate(request.url(), self.config.max_event_url_len),
                method: request.method().to_string(),
                headers,
            },
        }
    }
}

/// Truncate to at most `max` bytes on a char boundary, marking the cut
fn truncate(text: &str, max: usize) -> String {
    if text.len() <= max {
        return text.to_string();
    }

    let mut end = max;
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}...", &text[..end])
}
