//! Chain provider with multi-RPC support and automatic failover

use crate::config::ChainConfig;
use crate::error::{DeliveryError, SubmitResult, SubmitterError};

use ethers::prelude::*;
use ethers::providers::{Http, Provider};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tracing::{debug, error, warn};

/// Multi-provider wrapper with automatic failover
#[derive(Debug)]
pub struct ChainProvider {
    /// Chain name as used in strategy files
    name: String,
    /// Chain configuration
    config: ChainConfig,
    /// HTTP providers (multiple for failover)
    http_providers: Vec<Provider<Http>>,
    /// Current active provider index
    current_provider: AtomicUsize,
    /// Set when the providers point at a local fork instead of the live network
    forked: bool,
}

impl ChainProvider {
    /// Create a provider for the live network. Does not contact any endpoint.
    pub fn new(name: &str, config: ChainConfig) -> SubmitResult<Self> {
        let urls = config.rpc_urls.clone();
        Self::with_urls(name, config, &urls, false)
    }

    /// Create a provider that talks to a local fork of this chain
    pub fn forked(name: &str, config: ChainConfig, fork_url: &str) -> SubmitResult<Self> {
        Self::with_urls(name, config, &[fork_url.to_string()], true)
    }

    fn with_urls(
        name: &str,
        config: ChainConfig,
        urls: &[String],
        forked: bool,
    ) -> SubmitResult<Self> {
        let mut http_providers = Vec::new();

        for url in urls {
            match Provider::<Http>::try_from(url.as_str()) {
                Ok(provider) => {
                    let provider = provider.interval(Duration::from_millis(100));
                    http_providers.push(provider);
                    debug!("Added HTTP provider for chain {}: {}", name, url);
                }
                Err(e) => {
                    warn!("Failed to create provider for {}: {}", url, e);
                }
            }
        }

        if http_providers.is_empty() {
            return Err(SubmitterError::Config(format!(
                "No valid RPC providers for chain {}",
                name
            )));
        }

        Ok(Self {
            name: name.to_string(),
            config,
            http_providers,
            current_provider: AtomicUsize::new(0),
            forked,
        })
    }

    /// Get the active HTTP provider
    pub fn http(&self) -> &Provider<Http> {
        let idx = self.current_provider.load(Ordering::Relaxed);
        &self.http_providers[idx % self.http_providers.len()]
    }

    /// Switch to next available provider
    pub fn failover(&self) {
        let current = self.current_provider.load(Ordering::Relaxed);
        let next = (current + 1) % self.http_providers.len();
        self.current_provider.store(next, Ordering::Relaxed);
        warn!("Chain {} failover to provider {}", self.name, next);
    }

    /// Get current block number with failover
    pub async fn get_block_number(&self) -> Result<u64, DeliveryError> {
        for _ in 0..self.http_providers.len() {
            match self.http().get_block_number().await {
                Ok(block) => return Ok(block.as_u64()),
                Err(e) => {
                    warn!("Failed to get block number from chain {}: {}", self.name, e);
                    self.failover();
                }
            }
        }

        Err(DeliveryError::Provider {
            chain: self.name.clone(),
            message: "All providers failed".to_string(),
        })
    }

    /// Health check
    pub async fn health_check(&self) -> bool {
        match self.get_block_number().await {
            Ok(_) => true,
            Err(e) => {
                error!("Health check failed for chain {}: {}", self.name, e);
                false
            }
        }
    }

    /// Wrap a provider error with this chain's name
    pub fn provider_error(&self, err: impl std::fmt::Display) -> DeliveryError {
        DeliveryError::Provider {
            chain: self.name.clone(),
            message: err.to_string(),
        }
    }

    /// Primary live RPC URL, regardless of whether this provider is forked
    pub fn live_rpc_url(&self) -> Option<&str> {
        self.config.rpc_urls.first().map(String::as_str)
    }

    /// Get confirmation blocks
    pub fn confirmation_blocks(&self) -> usize {
        self.config.confirmation_blocks
    }

    pub fn is_forked(&self) -> bool {
        self.forked
    }

    pub fn config(&self) -> &ChainConfig {
        &self.config
    }
}
