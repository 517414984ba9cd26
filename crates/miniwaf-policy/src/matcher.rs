//! Rule matching against extracted facets

use miniwaf_core::{FacetMap, FacetName};
use thiserror::Error;

use crate::config::EngineConfig;
use crate::rule::Rule;

/// A fault while evaluating one rule
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MatchError {
    #[error("{facet} is {len} bytes, over the {limit} byte scan limit")]
    ScanLimitExceeded {
        facet: FacetName,
        len: usize,
        limit: usize,
    },
}

/// Test a rule against a request's facets.
///
/// Targets are tried in declared order and the first hit wins. The search is
/// unanchored, so a match anywhere in the facet text counts.
pub fn matches(rule: &Rule, facets: &FacetMap, config: &EngineConfig) -> Result<bool, MatchError> {
    for &target in &rule.targets {
        let text = facets.get(target).as_text();

        if let Some(limit) = config.max_scan_bytes {
            if text.len() > limit {
                return Err(MatchError::ScanLimitExceeded {
                    facet: target,
                    len: text.len(),
                    limit,
                });
            }
        }

        if rule.pattern.is_match(&text) {
            return Ok(true);
        }
    }

    Ok(false)
}
