//! Configuration file for the CLI.
//!
//! Every section is optional. Values are layered: built-in defaults, then
//! the YAML file, then command-line flags.

use std::path::Path;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use segmentation::SegmentationConfig;
use serde::{Deserialize, Serialize};
use tracing::debug;
use wms_client::FetchConfig;
use wms_protocol::GetMapDefaults;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CliConfig {
    pub server: ServerSection,
    pub defaults: GetMapDefaults,
    pub fetch: FetchSection,
    pub segmentation: SegmentationConfig,
}

/// Service used when no `--url` / `--layers` are given.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSection {
    pub base_url: Option<String>,
    pub layers: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FetchSection {
    pub request_timeout_secs: u64,
    pub connect_timeout_secs: u64,
    pub max_retries: u32,
    pub retry_delay_ms: u64,
    pub user_agent: Option<String>,
}

impl Default for FetchSection {
    fn default() -> Self {
        let base = FetchConfig::default();
        Self {
            request_timeout_secs: base.request_timeout.as_secs(),
            connect_timeout_secs: base.connect_timeout.as_secs(),
            max_retries: base.max_retries,
            retry_delay_ms: base.retry_delay.as_millis() as u64,
            user_agent: None,
        }
    }
}

impl FetchSection {
    pub fn to_fetch_config(&self) -> FetchConfig {
        let base = FetchConfig::default();
        FetchConfig {
            request_timeout: Duration::from_secs(self.request_timeout_secs),
            connect_timeout: Duration::from_secs(self.connect_timeout_secs),
            max_retries: self.max_retries,
            retry_delay: Duration::from_millis(self.retry_delay_ms),
            user_agent: self.user_agent.clone().unwrap_or(base.user_agent),
        }
    }
}

impl CliConfig {
    /// Load and validate a config file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config = Self::from_yaml(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        debug!(path = %path.display(), "Loaded CLI config");
        Ok(config)
    }

    pub fn from_yaml(content: &str) -> Result<Self> {
        // An empty file deserializes to unit, not to an empty mapping
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        let config: CliConfig = serde_yaml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Built-in defaults when `path` is `None`.
    pub fn resolve(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::load(path),
            None => Ok(Self::default()),
        }
    }

    fn validate(&self) -> Result<()> {
        if self.fetch.request_timeout_secs == 0 {
            bail!("fetch.request_timeout_secs must be positive");
        }
        if self.fetch.connect_timeout_secs == 0 {
            bail!("fetch.connect_timeout_secs must be positive");
        }
        if self.defaults.width == 0 || self.defaults.height == 0 {
            bail!("defaults.width and defaults.height must be positive");
        }
        Ok(())
    }
}
