//! Configuration for the engine
//!
//! Loaded from a TOML file, optionally preceded by a `.env` file and
//! followed by `PUMP_*` environment overrides. Every field has a default so
//! a partial file is valid.

use anyhow::{bail, Context};
use serde::{Deserialize, Serialize};
use solana_sdk::commitment_config::CommitmentConfig;
use std::time::Duration;

use crate::curve::{accounts::MAX_BASIS_POINTS, DEFAULT_SLIPPAGE_BPS};
use crate::tx_builder::bundle::{DEFAULT_BLOCK_ENGINE_URLS, MAX_BUNDLE_TRANSACTIONS};

/// Main engine configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EngineConfig {
    #[serde(default)]
    pub rpc: RpcConfig,

    #[serde(default)]
    pub trading: TradingConfig,

    #[serde(default)]
    pub relay: RelayConfig,

    #[serde(default)]
    pub metadata: MetadataConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RpcConfig {
    #[serde(default = "default_rpc_endpoint")]
    pub endpoint: String,

    /// Websocket endpoint used for event subscriptions
    #[serde(default = "default_ws_endpoint")]
    pub ws_endpoint: String,

    /// `processed`, `confirmed` or `finalized`
    #[serde(default = "default_commitment")]
    pub commitment: String,

    #[serde(default = "default_rpc_timeout")]
    pub timeout_secs: u64,

    /// Upper bound on a single confirmation wait, on top of blockhash expiry
    #[serde(default = "default_confirm_timeout")]
    pub confirm_timeout_secs: u64,

    #[serde(default = "default_poll_interval")]
    pub poll_interval_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TradingConfig {
    #[serde(default = "default_slippage_bps")]
    pub default_slippage_bps: u64,

    /// Bundled-buy participants packed into one secondary transaction
    #[serde(default = "default_max_buys_per_tx")]
    pub max_buys_per_tx: usize,

    /// Compute unit limit, 0 = leave to the runtime
    #[serde(default)]
    pub compute_unit_limit: u32,

    /// Priority fee in micro-lamports per compute unit, 0 = none
    #[serde(default)]
    pub compute_unit_price: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RelayConfig {
    /// Route through the relay by default
    #[serde(default)]
    pub enabled: bool,

    #[serde(default = "default_relay_endpoints")]
    pub endpoints: Vec<String>,

    #[serde(default = "default_tip_lamports")]
    pub tip_lamports: u64,

    #[serde(default = "default_relay_timeout")]
    pub timeout_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetadataConfig {
    #[serde(default = "default_metadata_url")]
    pub upload_url: String,

    #[serde(default = "default_metadata_timeout")]
    pub timeout_secs: u64,
}

// Default value functions
fn default_rpc_endpoint() -> String {
    "https://api.mainnet-beta.solana.com".to_string()
}

fn default_ws_endpoint() -> String {
    "wss://api.mainnet-beta.solana.com".to_string()
}

fn default_commitment() -> String {
    "finalized".to_string()
}

fn default_rpc_timeout() -> u64 {
    30
}

fn default_confirm_timeout() -> u64 {
    90
}

fn default_poll_interval() -> u64 {
    500
}

fn default_slippage_bps() -> u64 {
    DEFAULT_SLIPPAGE_BPS
}

fn default_max_buys_per_tx() -> usize {
    4
}

fn default_relay_endpoints() -> Vec<String> {
    DEFAULT_BLOCK_ENGINE_URLS.iter().map(|s| s.to_string()).collect()
}

fn default_tip_lamports() -> u64 {
    100_000
}

fn default_relay_timeout() -> u64 {
    5_000
}

fn default_metadata_url() -> String {
    "https://pump.fun/api/ipfs".to_string()
}

fn default_metadata_timeout() -> u64 {
    30
}

impl Default for RpcConfig {
    fn default() -> Self {
        Self {
            endpoint: default_rpc_endpoint(),
            ws_endpoint: default_ws_endpoint(),
            commitment: default_commitment(),
            timeout_secs: default_rpc_timeout(),
            confirm_timeout_secs: default_confirm_timeout(),
            poll_interval_ms: default_poll_interval(),
        }
    }
}

impl Default for TradingConfig {
    fn default() -> Self {
        Self {
            default_slippage_bps: default_slippage_bps(),
            max_buys_per_tx: default_max_buys_per_tx(),
            compute_unit_limit: 0,
            compute_unit_price: 0,
        }
    }
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            endpoints: default_relay_endpoints(),
            tip_lamports: default_tip_lamports(),
            timeout_ms: default_relay_timeout(),
        }
    }
}

impl Default for MetadataConfig {
    fn default() -> Self {
        Self {
            upload_url: default_metadata_url(),
            timeout_secs: default_metadata_timeout(),
        }
    }
}

/// Parse a durability level name
pub fn parse_commitment(level: &str) -> anyhow::Result<CommitmentConfig> {
    match level {
        "processed" => Ok(CommitmentConfig::processed()),
        "confirmed" => Ok(CommitmentConfig::confirmed()),
        "finalized" => Ok(CommitmentConfig::finalized()),
        other => bail!("unknown commitment level '{}'", other),
    }
}

impl RpcConfig {
    pub fn commitment(&self) -> anyhow::Result<CommitmentConfig> {
        parse_commitment(&self.commitment)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn confirm_timeout(&self) -> Duration {
        Duration::from_secs(self.confirm_timeout_secs)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

impl EngineConfig {
    /// Load configuration from a TOML file
    pub fn from_file(path: &str) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path))?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> anyhow::Result<Self> {
        let config: EngineConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration with `.env` and environment variable overrides
    pub fn from_file_with_env(path: &str) -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();
        let mut config = Self::from_file(path)?;
        config.apply_env_overrides(|key| std::env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    /// Apply `PUMP_*` overrides from a variable lookup
    pub fn apply_env_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup("PUMP_RPC_URL") {
            self.rpc.endpoint = url;
        }
        if let Some(url) = lookup("PUMP_WS_URL") {
            self.rpc.ws_endpoint = url;
        }
        if let Some(list) = lookup("PUMP_RELAY_ENDPOINTS") {
            self.relay.endpoints = list
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(String::from)
                .collect();
        }
        if let Some(url) = lookup("PUMP_METADATA_URL") {
            self.metadata.upload_url = url;
        }
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        self.rpc.commitment()?;
        if self.trading.default_slippage_bps > MAX_BASIS_POINTS {
            bail!(
                "trading.default_slippage_bps must be at most {}",
                MAX_BASIS_POINTS
            );
        }
        if self.trading.max_buys_per_tx == 0 {
            bail!("trading.max_buys_per_tx must be at least 1");
        }
        if self.relay.enabled && self.relay.endpoints.is_empty() {
            bail!("relay.endpoints must not be empty when the relay is enabled");
        }
        if self.rpc.poll_interval_ms == 0 {
            bail!("rpc.poll_interval_ms must be positive");
        }
        Ok(())
    }

    /// Largest bundled-buy count the relay can carry in one bundle
    pub fn max_relay_participants(&self) -> usize {
        (MAX_BUNDLE_TRANSACTIONS - 1) * self.trading.max_buys_per_tx
    }
}
