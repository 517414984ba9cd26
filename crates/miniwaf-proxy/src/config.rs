//! Proxy configuration

use anyhow::Context;
use miniwaf_policy::EngineConfig;
use miniwaf_telemetry::AuditConfig;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use url::Url;

use crate::cli::Cli;

/// Proxy configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProxyConfig {
    /// Socket address to listen on
    #[serde(default = "default_listen")]
    pub listen: String,

    /// Rule file
    #[serde(default = "default_rules_path")]
    pub rules_path: PathBuf,

    /// Upstream application to forward allowed requests to
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub upstream_url: Option<String>,

    /// Largest request body buffered for inspection
    #[serde(default = "default_max_body_bytes")]
    pub max_body_bytes: usize,

    /// Engine limits
    #[serde(default)]
    pub engine: EngineConfig,

    /// Audit log
    #[serde(default)]
    pub audit: AuditConfig,
}

impl ProxyConfig {
    /// Load configuration from file and CLI overrides
    pub fn load(cli: &Cli) -> anyhow::Result<Self> {
        let mut config = if cli.config.exists() {
            Self::from_file(&cli.config)?
        } else {
            Self::default()
        };

        if let Some(rules) = &cli.rules {
            config.rules_path = rules.clone();
        }

        if let Some(upstream) = &cli.upstream {
            config.upstream_url = Some(upstream.clone());
        }

        if let Some(listen) = &cli.listen {
            config.listen = listen.clone();
        }

        config.validate()?;
        Ok(config)
    }

    /// Parse a configuration file
    pub fn from_file(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let config = serde_yaml::from_str(&content)
            .with_context(|| format!("Invalid config file {}", path.display()))?;
        Ok(config)
    }

    /// Check values that serde cannot
    pub fn validate(&self) -> anyhow::Result<()> {
        if let Some(upstream) = &self.upstream_url {
            let url = Url::parse(upstream)
                .with_context(|| format!("Invalid upstream URL '{}'", upstream))?;
            if !matches!(url.scheme(), "http" | "https") {
                anyhow::bail!("Upstream URL scheme '{}' is not supported", url.scheme());
            }
            if url.host_str().is_none() {
                anyhow::bail!("Upstream URL '{}' has no host", upstream);
            }
        }

        if self.max_body_bytes == 0 {
            anyhow::bail!("max_body_bytes must be greater than zero");
        }

        Ok(())
    }
}

impl Default for ProxyConfig {
    fn default() -> Self {
        Self {
            listen: default_listen(),
            rules_path: default_rules_path(),
            upstream_url: None,
            max_body_bytes: default_max_body_bytes(),
            engine: EngineConfig::default(),
            audit: AuditConfig::default(),
        }
    }
}

fn default_listen() -> String {
    "127.0.0.1:5000".to_string()
}

fn default_rules_path() -> PathBuf {
    PathBuf::from("rules.yaml")
}

fn default_max_body_bytes() -> usize {
    1024 * 1024 // 1MB
}
