//! Anvil-backed simulation environment

use super::SimulationEnvironment;
use crate::chain::ChainContext;
use crate::config::SimulatorConfig;
use crate::error::PreconditionError;

use async_trait::async_trait;
use ethers::prelude::*;
use ethers::providers::{Http, Provider};
use serde_json::json;
use tokio::time::timeout;
use tracing::{debug, info};

/// Local anvil node reached over JSON-RPC
#[derive(Debug, Clone)]
pub struct AnvilSimulator {
    config: SimulatorConfig,
}

impl AnvilSimulator {
    pub fn new(config: SimulatorConfig) -> Self {
        Self { config }
    }

    fn provider(&self) -> Result<Provider<Http>, PreconditionError> {
        Provider::<Http>::try_from(self.config.rpc_url.as_str()).map_err(|e| {
            PreconditionError::Unreachable {
                url: self.config.rpc_url.clone(),
                message: e.to_string(),
            }
        })
    }

    /// Parameters for `anvil_reset` that fork from `live_url`
    fn fork_params(&self, live_url: &str) -> serde_json::Value {
        let mut forking = json!({ "jsonRpcUrl": live_url });
        if let Some(block) = self.config.fork_block_number {
            forking["blockNumber"] = json!(block);
        }
        json!([{ "forking": forking }])
    }
}

#[async_trait]
impl SimulationEnvironment for AnvilSimulator {
    async fn verify_reachable(&self) -> Result<(), PreconditionError> {
        let provider = self.provider()?;
        let step_timeout = self.config.reachability_timeout();

        let chain_id = timeout(step_timeout, provider.get_chainid())
            .await
            .map_err(|_| PreconditionError::TimedOut {
                step: "simulator reachability check",
                timeout: step_timeout,
            })?
            .map_err(|e| PreconditionError::Unreachable {
                url: self.config.rpc_url.clone(),
                message: e.to_string(),
            })?;

        debug!(
            "Simulator at {} reachable (chain id {})",
            self.config.rpc_url, chain_id
        );
        Ok(())
    }

    async fn fork_chain_into(
        &self,
        context: &ChainContext,
        chain: &str,
    ) -> Result<(), PreconditionError> {
        let fork_failed = |message: String| PreconditionError::ForkFailed {
            chain: chain.to_string(),
            message,
        };

        let handles = context.resolve(chain).map_err(|e| fork_failed(e.to_string()))?;
        let live_url = handles
            .provider
            .live_rpc_url()
            .ok_or_else(|| fork_failed("no live RPC URL configured".to_string()))?
            .to_string();

        let provider = self.provider()?;
        let step_timeout = self.config.fork_timeout();

        info!("Forking chain {} into simulator {}", chain, self.config.rpc_url);
        timeout(
            step_timeout,
            provider.request::<_, serde_json::Value>("anvil_reset", self.fork_params(&live_url)),
        )
        .await
        .map_err(|_| PreconditionError::TimedOut {
            step: "simulator fork",
            timeout: step_timeout,
        })?
        .map_err(|e| fork_failed(e.to_string()))?;

        context
            .fork_into(chain, &self.config.rpc_url)
            .map_err(|e| fork_failed(e.to_string()))?;

        Ok(())
    }
}
