//! Layered client configuration: files, then `KCC_*` environment variables.

use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::time::Duration;

use crate::split::DEFAULT_SPLIT_THRESHOLD;

/// Timeout and retry policy applied to every request against the config
/// service. The default performs a single attempt with the network stack's
/// own timeout.
#[derive(Debug, Deserialize, Clone, Default, PartialEq, Eq)]
pub struct DeliveryPolicy {
    /// Per-request timeout in seconds
    #[serde(default)]
    pub timeout_secs: Option<u64>,
    /// Additional attempts after a transient failure
    #[serde(default)]
    pub max_retries: u32,
}

impl DeliveryPolicy {
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_secs.map(Duration::from_secs)
    }

    /// Backoff before the given retry attempt (1-based).
    pub fn backoff(&self, attempt: u32) -> Duration {
        Duration::from_millis(100 * 2u64.pow(attempt))
    }
}

fn default_split_threshold() -> usize {
    DEFAULT_SPLIT_THRESHOLD
}

/// Root client configuration
#[derive(Debug, Deserialize, Clone)]
pub struct ClientConfig {
    /// Base address of the keycloak-config service
    #[serde(default)]
    pub endpoint: String,
    /// Skip TLS certificate verification for every connection this client
    /// opens. Must be enabled explicitly.
    #[serde(default)]
    pub insecure: bool,
    /// Serialized size above which a realm configuration is split by user
    #[serde(default = "default_split_threshold")]
    pub split_threshold: usize,
    #[serde(default)]
    pub delivery: DeliveryPolicy,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            endpoint: String::new(),
            insecure: false,
            split_threshold: default_split_threshold(),
            delivery: DeliveryPolicy::default(),
        }
    }
}

impl ClientConfig {
    /// Configuration pointing at `endpoint` with every other value defaulted.
    pub fn with_endpoint<S: Into<String>>(endpoint: S) -> Self {
        Self {
            endpoint: endpoint.into(),
            ..Self::default()
        }
    }

    /// Load configuration from files and environment variables
    pub fn load() -> Result<Self, ConfigError> {
        let config = Config::builder()
            // Start with default config file
            .add_source(File::with_name("config/default").required(false))
            // Override with local config if present
            .add_source(File::with_name("config/local").required(false))
            // Override with environment variables (prefix: KCC_)
            // e.g., KCC_ENDPOINT, KCC_DELIVERY__MAX_RETRIES
            .add_source(
                Environment::with_prefix("KCC")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }
}
