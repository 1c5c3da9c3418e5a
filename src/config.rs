//! Configuration management for the submitter
//!
//! Loads configuration from TOML files with environment variable substitution.

use anyhow::{Context, Result};
use lazy_static::lazy_static;
use regex::Regex;
use serde::Deserialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

lazy_static! {
    static ref ENV_VAR: Regex = Regex::new(r"\$\{([A-Z_][A-Z0-9_]*)\}").unwrap();
}

/// Env var consulted for the signer key when `wallet.private_key_env` is unset
pub const DEFAULT_PRIVATE_KEY_ENV: &str = "SUBMITTER_PRIVATE_KEY";

/// Root configuration structure
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub chains: HashMap<String, ChainConfig>,
    #[serde(default)]
    pub wallet: WalletConfig,
    pub simulator: Option<SimulatorConfig>,
    #[serde(default)]
    pub metrics: MetricsConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChainConfig {
    pub chain_id: u64,
    /// Messaging domain; most chains use their chain id
    pub domain_id: Option<u32>,
    pub rpc_urls: Vec<String>,
    #[serde(default = "default_confirmation_blocks")]
    pub confirmation_blocks: usize,
    pub safe_tx_service_url: Option<String>,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

impl ChainConfig {
    /// Domain id used when addressing this chain from another one. Chain ids
    /// that do not fit in a u32 need an explicit `domain_id`.
    pub fn domain(&self) -> Option<u32> {
        self.domain_id
            .or_else(|| u32::try_from(self.chain_id).ok())
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct WalletConfig {
    pub private_key_env: Option<String>,
}

impl WalletConfig {
    /// Name of the env var that holds the signer key
    pub fn key_env(&self) -> &str {
        self.private_key_env
            .as_deref()
            .unwrap_or(DEFAULT_PRIVATE_KEY_ENV)
    }
}

/// Local fork-capable node used by impersonated-account submissions.
///
/// Both timeouts are mandatory: there is no sensible default for how long a
/// fork of an arbitrary chain may take.
#[derive(Debug, Clone, Deserialize)]
pub struct SimulatorConfig {
    pub rpc_url: String,
    pub reachability_timeout_ms: u64,
    pub fork_timeout_ms: u64,
    pub fork_block_number: Option<u64>,
}

impl SimulatorConfig {
    pub fn reachability_timeout(&self) -> Duration {
        Duration::from_millis(self.reachability_timeout_ms)
    }

    pub fn fork_timeout(&self) -> Duration {
        Duration::from_millis(self.fork_timeout_ms)
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct MetricsConfig {
    /// Prometheus text exposition is written here after each run
    pub textfile_path: Option<PathBuf>,
}

fn default_confirmation_blocks() -> usize {
    1
}

fn default_enabled() -> bool {
    true
}

impl Settings {
    /// Load settings from a configuration file
    pub fn load(config_path: &Path) -> Result<Self> {
        let config_str = std::fs::read_to_string(config_path)
            .with_context(|| format!("Failed to read config file: {:?}", config_path))?;

        Self::from_toml(&config_str)
    }

    /// Parse settings from TOML source, substituting `${VAR}` references first
    pub fn from_toml(source: &str) -> Result<Self> {
        let config_str = substitute_env_vars(source);

        let settings: Settings =
            toml::from_str(&config_str).with_context(|| "Failed to parse configuration")?;

        settings.validate()?;

        Ok(settings)
    }

    /// Validate configuration
    fn validate(&self) -> Result<()> {
        if self.enabled_chains().is_empty() {
            anyhow::bail!("At least one chain must be enabled");
        }

        for (name, chain) in &self.chains {
            if chain.enabled && chain.rpc_urls.is_empty() {
                anyhow::bail!("Chain {} has no RPC URLs configured", name);
            }
            if chain.enabled && chain.domain().is_none() {
                anyhow::bail!(
                    "Chain {} has chain_id {} which does not fit a domain id; set domain_id",
                    name,
                    chain.chain_id
                );
            }
        }

        if let Some(simulator) = &self.simulator {
            if simulator.rpc_url.is_empty() {
                anyhow::bail!("Simulator rpc_url must not be empty");
            }
            if simulator.reachability_timeout_ms == 0 || simulator.fork_timeout_ms == 0 {
                anyhow::bail!("Simulator timeouts must be greater than zero");
            }
        }

        Ok(())
    }

    /// Get list of enabled chains
    pub fn enabled_chains(&self) -> Vec<(&String, &ChainConfig)> {
        self.chains.iter().filter(|(_, c)| c.enabled).collect()
    }
}

/// Substitute environment variables in the format ${VAR_NAME}
fn substitute_env_vars(input: &str) -> String {
    let mut result = input.to_string();

    for cap in ENV_VAR.captures_iter(input) {
        let var_name = &cap[1];
        let var_value = std::env::var(var_name).unwrap_or_default();
        result = result.replace(&cap[0], &var_value);
    }

    result
}
