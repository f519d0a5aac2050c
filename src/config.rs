//! Configuration management for txflow
//!
//! Loads configuration from TOML files with environment variable substitution.

use anyhow::{Context, Result};
use ethers::types::{H256, U256};
use serde::Deserialize;
use std::collections::HashMap;
use std::env;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{TxError, TxResult};

/// Root configuration structure
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub poller: PollerConfig,
    #[serde(default)]
    pub wallet: WalletConfig,
    pub networks: HashMap<String, NetworkConfig>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PollerConfig {
    #[serde(default = "default_poll_interval_ms")]
    pub interval_ms: u64,
    #[serde(default = "default_poll_attempts")]
    pub max_attempts: u32,
}

impl PollerConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }
}

impl Default for PollerConfig {
    fn default() -> Self {
        Self {
            interval_ms: default_poll_interval_ms(),
            max_attempts: default_poll_attempts(),
        }
    }
}

/// Longest accepted delay between receipt lookups
const MAX_POLL_INTERVAL_MS: u64 = 60_000;

fn default_poll_interval_ms() -> u64 {
    250
}

fn default_poll_attempts() -> u32 {
    100
}

#[derive(Debug, Clone, Deserialize)]
pub struct WalletConfig {
    #[serde(default = "default_private_key_env")]
    pub private_key_env: String,
}

impl Default for WalletConfig {
    fn default() -> Self {
        Self {
            private_key_env: default_private_key_env(),
        }
    }
}

fn default_private_key_env() -> String {
    "TXFLOW_PRIVATE_KEY".to_string()
}

/// Per-network settings
#[derive(Debug, Clone, Deserialize)]
pub struct NetworkConfig {
    pub name: String,
    pub display_name: String,
    pub chain_id: u64,
    pub kind: NetworkKind,
    pub rpc_url: String,
    pub explorer_url: String,
    #[serde(flatten)]
    pub gas: NetworkGasConfig,
}

impl NetworkConfig {
    /// Explorer page for a transaction
    pub fn explorer_tx_url(&self, tx_hash: H256) -> String {
        format!("{}/tx/{:?}", self.explorer_url.trim_end_matches('/'), tx_hash)
    }

    pub fn base_timeout(&self) -> Duration {
        self.kind.base_timeout()
    }
}

/// Gas bounds for a network
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct NetworkGasConfig {
    pub min_gas: u64,
    pub max_gas: u64,
    #[serde(default = "default_gas_buffer")]
    pub gas_buffer_multiplier: f64,
}

impl NetworkGasConfig {
    pub fn min(&self) -> U256 {
        U256::from(self.min_gas)
    }

    pub fn max(&self) -> U256 {
        U256::from(self.max_gas)
    }
}

fn default_gas_buffer() -> f64 {
    1.0
}

#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum NetworkKind {
    Ethereum,
    Arbitrum,
    Optimism,
}

impl NetworkKind {
    /// How long a submitted transaction is expected to take to land
    pub fn base_timeout(&self) -> Duration {
        match self {
            // L2 sequencers confirm quickly
            NetworkKind::Arbitrum | NetworkKind::Optimism => Duration::from_secs(10),
            NetworkKind::Ethereum => Duration::from_secs(60),
        }
    }
}

impl Settings {
    /// Load settings from the configured file
    pub fn load() -> Result<Self> {
        let config_path = env::var("TXFLOW_CONFIG")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("config/default.toml"));

        Self::load_from(&config_path)
    }

    /// Load settings from an explicit path
    pub fn load_from(config_path: &Path) -> Result<Self> {
        let config_str = std::fs::read_to_string(config_path)
            .with_context(|| format!("Failed to read config file: {:?}", config_path))?;

        Self::parse(&config_str)
    }

    /// Parse settings from TOML text
    pub fn parse(config_str: &str) -> Result<Self> {
        // Substitute environment variables
        let config_str = substitute_env_vars(config_str);

        let settings: Settings =
            toml::from_str(&config_str).with_context(|| "Failed to parse configuration")?;

        settings.validate()?;

        Ok(settings)
    }

    /// Validate configuration
    fn validate(&self) -> Result<()> {
        if self.networks.is_empty() {
            anyhow::bail!("At least one network must be configured");
        }

        if self.poller.max_attempts == 0 {
            anyhow::bail!("poller.max_attempts must be at least 1");
        }

        if self.poller.interval_ms == 0 || self.poller.interval_ms > MAX_POLL_INTERVAL_MS {
            anyhow::bail!(
                "poller.interval_ms must be between 1 and {}, got {}",
                MAX_POLL_INTERVAL_MS,
                self.poller.interval_ms
            );
        }

        for (key, network) in &self.networks {
            if network.rpc_url.is_empty() {
                anyhow::bail!("Network {} has no RPC URL configured", key);
            }
            if network.gas.min_gas > network.gas.max_gas {
                anyhow::bail!(
                    "Network {} has min_gas {} above max_gas {}",
                    key,
                    network.gas.min_gas,
                    network.gas.max_gas
                );
            }
            let multiplier = network.gas.gas_buffer_multiplier;
            if !multiplier.is_finite() || multiplier <= 0.0 {
                anyhow::bail!("Network {} has invalid gas_buffer_multiplier {}", key, multiplier);
            }
            if network.explorer_url.is_empty() {
                tracing::warn!("Network {} has no explorer URL - links will be relative", key);
            }
        }

        Ok(())
    }

    /// Get network config by key
    pub fn network(&self, name: &str) -> TxResult<&NetworkConfig> {
        self.networks.get(name).ok_or_else(|| TxError::NetworkNotFound {
            name: name.to_string(),
        })
    }
}

/// Substitute environment variables in the format ${VAR_NAME}
fn substitute_env_vars(input: &str) -> String {
    lazy_static::lazy_static! {
        static ref ENV_VAR: regex::Regex =
            regex::Regex::new(r"\$\{([A-Z_][A-Z0-9_]*)\}").expect("valid env var pattern");
    }

    ENV_VAR
        .replace_all(input, |cap: &regex::Captures| {
            env::var(&cap[1]).unwrap_or_default()
        })
        .into_owned()
}
