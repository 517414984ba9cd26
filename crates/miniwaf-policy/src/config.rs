//! Engine limits

use serde::{Deserialize, Serialize};

/// Limits applied while loading rules and while inspecting requests
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Largest facet text a pattern is searched in, in bytes.
    /// Exceeding it is a matching fault for that rule. `None` disables the check.
    #[serde(default)]
    pub max_scan_bytes: Option<usize>,

    /// Compiled size limit for each rule pattern
    #[serde(default = "default_regex_size_limit")]
    pub regex_size_limit: usize,

    /// Longest URL kept in an event
    #[serde(default = "default_max_event_url_len")]
    pub max_event_url_len: usize,

    /// Longest header value kept in an event
    #[serde(default = "default_max_event_header_len")]
    pub max_event_header_len: usize,

    /// Most headers kept in an event
    #[serde(default = "default_max_event_headers")]
    pub max_event_headers: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_scan_bytes: None,
            regex_size_limit: default_regex_size_limit(),
            max_event_url_len: default_max_event_url_len(),
            max_event_header_len: default_max_event_header_len(),
            max_event_headers: default_max_event_headers(),
        }
    }
}

fn default_regex_size_limit() -> usize {
    10 * 1024 * 1024 // regex crate default
}

fn default_max_event_url_len() -> usize {
    2048
}

fn default_max_event_header_len() -> usize {
    512
}

fn default_max_event_headers() -> usize {
    64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_config_uses_defaults() {
        let config: EngineConfig = serde_yaml::from_str("max_scan_bytes: 4096").unwrap();
        assert_eq!(config.max_scan_bytes, Some(4096));
        assert_eq!(config.max_event_url_len, 2048);
        assert_eq!(config.max_event_headers, 64);
    }
}
