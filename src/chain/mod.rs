//! Chain module - resolves chain names to providers and signers
//!
//! This module provides:
//! - Multi-RPC provider management with automatic failover
//! - Signer loading from the environment
//! - The single mutation point used when a chain is forked for simulation

pub mod provider;

pub use provider::ChainProvider;

use crate::config::{ChainConfig, Settings};
use crate::error::{SubmitResult, SubmitterError};

use dashmap::DashMap;
use ethers::signers::{LocalWallet, Signer};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Static facts about a chain
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NetworkInfo {
    pub name: String,
    pub chain_id: u64,
    pub domain_id: u32,
}

/// Everything a strategy needs to talk to one chain
#[derive(Debug, Clone)]
pub struct ChainHandles {
    pub network: NetworkInfo,
    pub provider: Arc<ChainProvider>,
    pub signer: Option<LocalWallet>,
}

impl ChainHandles {
    /// Signer bound to this chain's id
    pub fn chain_signer(&self) -> Option<LocalWallet> {
        self.signer
            .clone()
            .map(|wallet| wallet.with_chain_id(self.network.chain_id))
    }
}

struct ChainEntry {
    network: NetworkInfo,
    provider: Arc<ChainProvider>,
}

/// Shared registry of every configured chain
pub struct ChainContext {
    /// Chain entries indexed by name
    chains: DashMap<String, ChainEntry>,
    /// Signer shared by all chains
    signer: Option<LocalWallet>,
}

impl ChainContext {
    /// Create an empty context
    pub fn new(signer: Option<LocalWallet>) -> Self {
        Self {
            chains: DashMap::new(),
            signer,
        }
    }

    /// Build a context for all enabled chains in the settings
    pub fn from_settings(settings: &Settings) -> SubmitResult<Self> {
        let signer = load_signer(settings.wallet.key_env())?;
        match &signer {
            Some(wallet) => info!("Loaded signer {:?}", wallet.address()),
            None => warn!(
                "No signer configured; set {} to submit signed transactions",
                settings.wallet.key_env()
            ),
        }

        let context = Self::new(signer);
        for (name, chain_config) in settings.enabled_chains() {
            context.insert_chain(name, chain_config.clone())?;
        }

        Ok(context)
    }

    /// Register a chain with a live provider
    pub fn insert_chain(&self, name: &str, config: ChainConfig) -> SubmitResult<()> {
        let domain_id = config.domain().ok_or_else(|| {
            SubmitterError::Config(format!(
                "Chain {} has chain_id {} which does not fit a domain id",
                name, config.chain_id
            ))
        })?;
        let network = NetworkInfo {
            name: name.to_string(),
            chain_id: config.chain_id,
            domain_id,
        };
        let provider = Arc::new(ChainProvider::new(name, config)?);

        debug!("Registered chain {} (ID: {})", name, network.chain_id);
        self.chains
            .insert(name.to_string(), ChainEntry { network, provider });
        Ok(())
    }

    /// Resolve a chain name to its network, provider and signer
    pub fn resolve(&self, chain: &str) -> SubmitResult<ChainHandles> {
        let entry = self
            .chains
            .get(chain)
            .ok_or_else(|| SubmitterError::ChainNotFound {
                chain: chain.to_string(),
            })?;

        Ok(ChainHandles {
            network: entry.network.clone(),
            provider: entry.provider.clone(),
            signer: self.signer.clone(),
        })
    }

    /// Point a chain at a local fork. Pipelines built afterwards see the fork;
    /// submitters already holding the live provider keep it.
    pub fn fork_into(&self, chain: &str, fork_url: &str) -> SubmitResult<()> {
        let mut entry = self
            .chains
            .get_mut(chain)
            .ok_or_else(|| SubmitterError::ChainNotFound {
                chain: chain.to_string(),
            })?;

        let config = entry.provider.config().clone();
        entry.provider = Arc::new(ChainProvider::forked(chain, config, fork_url)?);

        info!("Chain {} now served by fork at {}", chain, fork_url);
        Ok(())
    }

    /// Health check for all chains
    pub async fn health_check(&self) -> Vec<(String, bool)> {
        let providers: Vec<_> = self
            .chains
            .iter()
            .map(|e| (e.key().clone(), e.value().provider.clone()))
            .collect();

        let mut results = Vec::new();
        for (name, provider) in providers {
            results.push((name, provider.health_check().await));
        }
        results
    }
}

/// Load the signer key from the named env var, if set
fn load_signer(key_env: &str) -> SubmitResult<Option<LocalWallet>> {
    match std::env::var(key_env) {
        Ok(key) => key
            .parse::<LocalWallet>()
            .map(Some)
            .map_err(|e| SubmitterError::Wallet(format!("Invalid private key: {}", e))),
        Err(_) => Ok(None),
    }
}

#[cfg(test)]
pub(crate) mod test_utils {
    use super::*;

    /// First default anvil account
    pub const TEST_KEY: &str = "ac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";

    pub fn chain_config(chain_id: u64, safe_service: Option<&str>) -> ChainConfig {
        ChainConfig {
            chain_id,
            domain_id: None,
            rpc_urls: vec!["http://127.0.0.1:18545".to_string()],
            confirmation_blocks: 1,
            safe_tx_service_url: safe_service.map(str::to_string),
            enabled: true,
        }
    }

    /// Context with "ethereum" (1), "arbitrum" (42161) and "neutron" (1853125230)
    pub fn test_context() -> Arc<ChainContext> {
        let signer = TEST_KEY.parse::<LocalWallet>().unwrap();
        let context = ChainContext::new(Some(signer));
        context
            .insert_chain(
                "ethereum",
                chain_config(1, Some("https://safe-transaction-mainnet.safe.global")),
            )
            .unwrap();
        context
            .insert_chain("arbitrum", chain_config(42161, None))
            .unwrap();
        context
            .insert_chain("neutron", chain_config(1853125230, None))
            .unwrap();
        Arc::new(context)
    }
}
