//! Configuration management.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Lower bound for the poll interval in milliseconds.
pub const MIN_INTERVAL_MS: u64 = 500;
/// Upper bound for the poll interval in milliseconds.
pub const MAX_INTERVAL_MS: u64 = 600_000;

/// Main configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Poll interval in milliseconds
    #[serde(default = "default_interval")]
    pub interval: u64,

    /// Data source configuration
    #[serde(default)]
    pub source: SourceConfig,

    /// Web UI configuration
    #[serde(default)]
    pub web: WebConfig,
}

/// Simulated data source configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct SourceConfig {
    /// RNG seed for a reproducible walk (None = random)
    #[serde(default)]
    pub seed: Option<u64>,

    /// Probability (0.0-1.0) that a fetch fails
    #[serde(default)]
    pub failure_rate: f64,
}

/// Web server configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebConfig {
    /// Whether to serve the dashboard
    #[serde(default = "default_web_enable")]
    pub enable: bool,

    /// Server listen address (e.g., "0.0.0.0:8787")
    #[serde(default = "default_listen")]
    pub listen: String,

    /// How often the page refreshes its dashboard partial, in milliseconds
    #[serde(default = "default_page_refresh")]
    pub page_refresh: u64,
}

impl Default for WebConfig {
    fn default() -> Self {
        Self {
            enable: default_web_enable(),
            listen: default_listen(),
            page_refresh: default_page_refresh(),
        }
    }
}

// Default value functions
fn default_interval() -> u64 {
    5000
}

fn default_web_enable() -> bool {
    true
}

fn default_listen() -> String {
    "0.0.0.0:8787".to_string()
}

fn default_page_refresh() -> u64 {
    1000
}

impl Config {
    /// Loads configuration from a TOML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content =
            std::fs::read_to_string(path.as_ref()).context("Failed to read configuration file")?;
        Self::parse(&content)
    }

    /// Parses configuration from TOML text.
    pub fn parse(content: &str) -> Result<Self> {
        let config: Config = toml::from_str(content).context("Failed to parse configuration")?;
        if !(0.0..=1.0).contains(&config.source.failure_rate) {
            anyhow::bail!(
                "source.failure_rate must be between 0.0 and 1.0, got {}",
                config.source.failure_rate
            );
        }
        Ok(config)
    }

    /// Returns the poll interval, clamped to 500ms-10min.
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval.clamp(MIN_INTERVAL_MS, MAX_INTERVAL_MS))
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            interval: default_interval(),
            source: SourceConfig::default(),
            web: WebConfig::default(),
        }
    }
}
