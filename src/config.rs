//! Configuration file handling
//!
//! A run is described by a TOML file:
//!
//! ```toml
//! strategy = "mobile"
//!
//! [[sites]]
//! id = "me"
//! url = "https://example.com"
//! label = "Example"
//! role = "target"
//!
//! [[sites]]
//! id = "rival"
//! url = "https://rival.example"
//! label = "Rival"
//! role = "competitor"
//!
//! [priority]
//! urgent_ms = 800
//! medium_ms = 300
//!
//! [collector]
//! max_in_flight = 2
//! max_retries = 3
//!
//! [delivery]
//! kind = "file"
//! dir = "reports"
//! ```

use crate::error::{Error, Result};
use crate::retry::RetryPolicy;
use serde::{Deserialize, Serialize};
use site_pulse_core::{CompareConfig, PriorityConfig, Site, Strategy};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Top-level configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub strategy: Strategy,
    /// Sites in report order; exactly one must be the target
    pub sites: Vec<Site>,
    #[serde(default)]
    pub compare: CompareConfig,
    #[serde(default)]
    pub priority: PriorityConfig,
    #[serde(default)]
    pub collector: CollectorConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub delivery: DeliveryConfig,
}

/// Fetching behaviour
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CollectorConfig {
    /// Maximum concurrent provider requests
    #[serde(default = "default_max_in_flight")]
    pub max_in_flight: usize,
    /// Retries after the first attempt for transient failures
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_base_delay_ms")]
    pub base_delay_ms: u64,
    #[serde(default = "default_max_delay_ms")]
    pub max_delay_ms: u64,
    /// Overall deadline for the whole collection
    #[serde(default)]
    pub deadline_secs: Option<u64>,
    /// Provider request budget; unlimited when unset
    #[serde(default)]
    pub requests_per_minute: Option<u32>,
    /// Timeout of a single provider request
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

/// Where history and reports are persisted
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    #[serde(default = "default_storage_path")]
    pub path: PathBuf,
    /// Reports and snapshots kept per site; unlimited when unset
    #[serde(default)]
    pub max_items: Option<usize>,
}

/// Where rendered reports are sent
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum DeliveryConfig {
    #[default]
    Stdout,
    File {
        dir: PathBuf,
    },
    Webhook {
        url: String,
    },
}

fn default_max_in_flight() -> usize {
    2
}

fn default_max_retries() -> u32 {
    3
}

fn default_base_delay_ms() -> u64 {
    2_000
}

fn default_max_delay_ms() -> u64 {
    30_000
}

fn default_request_timeout_secs() -> u64 {
    60
}

fn default_storage_path() -> PathBuf {
    PathBuf::from("site-pulse-data.json")
}

impl Default for CollectorConfig {
    fn default() -> Self {
        Self {
            max_in_flight: default_max_in_flight(),
            max_retries: default_max_retries(),
            base_delay_ms: default_base_delay_ms(),
            max_delay_ms: default_max_delay_ms(),
            deadline_secs: None,
            requests_per_minute: None,
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            path: default_storage_path(),
            max_items: None,
        }
    }
}

impl CollectorConfig {
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(
            self.max_retries,
            Duration::from_millis(self.base_delay_ms),
            Duration::from_millis(self.max_delay_ms),
        )
    }

    pub fn deadline(&self) -> Option<Duration> {
        self.deadline_secs.map(Duration::from_secs)
    }
}

impl Config {
    /// Load and validate configuration from a TOML file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| Error::FileRead {
            path: path.display().to_string(),
            source: e,
        })?;
        Self::from_toml(&content)
    }

    /// Parse and validate configuration from a TOML string
    pub fn from_toml(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        let targets = self.sites.iter().filter(|s| s.is_target()).count();
        if targets != 1 {
            return Err(Error::Config(format!(
                "exactly one target site is required, found {}",
                targets
            )));
        }

        let mut seen = HashSet::new();
        for site in &self.sites {
            if site.id.trim().is_empty() {
                return Err(Error::Config("site id must not be empty".to_string()));
            }
            if !seen.insert(site.id.as_str()) {
                return Err(Error::Config(format!("duplicate site id '{}'", site.id)));
            }
        }

        if self.collector.max_in_flight == 0 {
            return Err(Error::Config("max_in_flight must be at least 1".to_string()));
        }
        if self.collector.requests_per_minute == Some(0) {
            return Err(Error::Config(
                "requests_per_minute must be at least 1".to_string(),
            ));
        }
        if self.collector.base_delay_ms > self.collector.max_delay_ms {
            return Err(Error::Config(
                "base_delay_ms must be <= max_delay_ms".to_string(),
            ));
        }

        if let DeliveryConfig::Webhook { url } = &self.delivery {
            url::Url::parse(url)?;
        }

        self.compare.validate()?;
        self.priority.validate()?;
        Ok(())
    }

    /// The single target site
    pub fn target(&self) -> Result<&Site> {
        self.sites
            .iter()
            .find(|s| s.is_target())
            .ok_or_else(|| Error::Config("no target site configured".to_string()))
    }

    /// Competitor sites in configured order
    pub fn competitors(&self) -> impl Iterator<Item = &Site> {
        self.sites.iter().filter(|s| !s.is_target())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use site_pulse_core::SiteRole;

    const MINIMAL: &str = r#"
[[sites]]
id = "me"
url = "https://example.com"
label = "Example"
role = "target"

[[sites]]
id = "rival"
url = "https://rival.example"
label = "Rival"
role = "competitor"
"#;

    #[test]
    fn test_minimal_config_defaults() {
        let config = Config::from_toml(MINIMAL).unwrap();

        assert_eq!(config.strategy, Strategy::Mobile);
        assert_eq!(config.sites.len(), 2);
        assert_eq!(config.target().unwrap().id, "me");
        assert_eq!(config.competitors().count(), 1);
        assert_eq!(config.priority, PriorityConfig::default());
        assert_eq!(config.collector.max_retries, 3);
        assert_eq!(config.delivery, DeliveryConfig::Stdout);
        assert!(config.collector.deadline().is_none());
    }

    #[test]
    fn test_full_config() {
        let content = format!(
            r#"
strategy = "desktop"
{}
[compare]
tie_tolerance = 0.05

[priority]
urgent_ms = 1000
medium_ms = 200

[collector]
max_in_flight = 4
deadline_secs = 90
requests_per_minute = 30

[storage]
path = "data/history.json"
max_items = 20

[delivery]
kind = "webhook"
url = "https://hooks.example.com/pulse"
"#,
            MINIMAL
        );

        let config = Config::from_toml(&content).unwrap();

        assert_eq!(config.strategy, Strategy::Desktop);
        assert_eq!(config.compare.tie_tolerance, 0.05);
        assert_eq!(config.priority.urgent_ms, 1000);
        assert_eq!(config.priority.urgent_bytes, 100_000);
        assert_eq!(config.collector.max_in_flight, 4);
        assert_eq!(config.collector.deadline(), Some(Duration::from_secs(90)));
        assert_eq!(config.storage.max_items, Some(20));
        assert_eq!(
            config.delivery,
            DeliveryConfig::Webhook {
                url: "https://hooks.example.com/pulse".to_string()
            }
        );
    }

    #[test]
    fn test_rejects_missing_target() {
        let content = r#"
[[sites]]
id = "rival"
url = "https://rival.example"
label = "Rival"
role = "competitor"
"#;
        let err = Config::from_toml(content).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn test_rejects_duplicate_ids() {
        let mut config = Config::from_toml(MINIMAL).unwrap();
        config.sites.push(Site {
            id: "rival".to_string(),
            url: "https://other.example".to_string(),
            label: "Other".to_string(),
            role: SiteRole::Competitor,
        });
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_rejects_inverted_thresholds() {
        let content = format!("{}\n[priority]\nurgent_ms = 100\nmedium_ms = 500\n", MINIMAL);
        assert!(matches!(
            Config::from_toml(&content),
            Err(Error::Core(_))
        ));
    }

    #[test]
    fn test_sample_config_is_valid() {
        let config = Config::from_toml(include_str!("../demos/site-pulse.toml")).unwrap();

        assert_eq!(config.target().unwrap().id, "shop");
        assert_eq!(config.competitors().count(), 2);
        assert_eq!(config.collector.requests_per_minute, Some(12));
        assert_eq!(
            config.delivery,
            DeliveryConfig::File {
                dir: PathBuf::from("reports")
            }
        );
    }
}
