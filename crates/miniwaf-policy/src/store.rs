//! Shared, atomically replaceable rule set

use miniwaf_core::Result;
use parking_lot::RwLock;
use std::path::Path;
use std::sync::Arc;
use tracing::{info, warn};

use crate::config::EngineConfig;
use crate::rule::RuleSet;

/// Holds the current rule set.
///
/// Readers take an `Arc` snapshot and never see a partially updated set;
/// writers swap in a complete, validated replacement.
#[derive(Clone, Default)]
pub struct RuleStore {
    current: Arc<RwLock<Arc<RuleSet>>>,
}

impl RuleStore {
    pub fn new(rules: RuleSet) -> Self {
        Self {
            current: Arc::new(RwLock::new(Arc::new(rules))),
        }
    }

    /// The rule set in effect right now
    pub fn snapshot(&self) -> Arc<RuleSet> {
        self.current.read().clone()
    }

    /// Swap in a new rule set, returning the previous one
    pub fn replace(&self, rules: RuleSet) -> Arc<RuleSet> {
        let next = Arc::new(rules);
        std::mem::replace(&mut *self.current.write(), next)
    }

    /// Load a rule file and swap it in. On error the current set stays.
    pub fn reload(&self, path: impl AsRef<Path>, config: &EngineConfig) -> Result<usize> {
        let path = path.as_ref();
        match RuleSet::load_with(path, config) {
            Ok(rules) => {
                let count = rules.len();
                self.replace(rules);
                info!(path = %path.display(), rules = count, "Rule set reloaded");
                Ok(count)
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Rule reload rejected, keeping current rules");
                Err(e)
            }
        }
    }

    pub fn len(&self) -> usize {
        self.current.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.current.read().is_empty()
    }
}
