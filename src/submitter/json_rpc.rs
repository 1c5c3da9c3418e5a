//! Direct submission to a chain's JSON-RPC endpoint

use super::{ensure_chain, SubmissionReceipt, SubmitterKind, TxSubmitter};
use crate::chain::ChainHandles;
use crate::error::DeliveryError;
use crate::operation::Operation;

use async_trait::async_trait;
use ethers::prelude::*;
use std::time::Duration;
use tokio::time::timeout;
use tracing::{debug, info};

const SEND_TIMEOUT: Duration = Duration::from_secs(30);

/// Signs with the context's wallet and waits for a finality receipt
pub struct JsonRpcSubmitter {
    handles: ChainHandles,
}

impl JsonRpcSubmitter {
    pub fn new(handles: ChainHandles) -> Self {
        Self { handles }
    }
}

#[async_trait]
impl TxSubmitter for JsonRpcSubmitter {
    fn kind(&self) -> SubmitterKind {
        SubmitterKind::JsonRpc
    }

    fn chain(&self) -> &str {
        &self.handles.network.name
    }

    async fn deliver(&self, operation: &Operation) -> Result<SubmissionReceipt, DeliveryError> {
        ensure_chain(self.chain(), operation)?;

        let chain = self.chain().to_string();
        let wallet = self
            .handles
            .chain_signer()
            .ok_or_else(|| DeliveryError::Signer {
                chain: chain.clone(),
                message: "no signer configured".to_string(),
            })?;

        // SignerMiddleware forwards a foreign `from` to the node unsigned
        if let Some(from) = operation.tx.from() {
            if *from != wallet.address() {
                return Err(DeliveryError::Signer {
                    chain,
                    message: format!(
                        "operation is sent from {:?} but the signer is {:?}",
                        from,
                        wallet.address()
                    ),
                });
            }
        }

        let provider = &self.handles.provider;
        let client = SignerMiddleware::new(provider.http().clone(), wallet);

        let mut tx = operation.tx.clone();
        tx.set_chain_id(self.handles.network.chain_id);

        let pending = timeout(SEND_TIMEOUT, client.send_transaction(tx, None))
            .await
            .map_err(|_| DeliveryError::Timeout {
                chain: chain.clone(),
                operation: "send transaction".to_string(),
            })?
            .map_err(|e| provider.provider_error(e))?;

        let tx_hash = pending.tx_hash();
        info!("Transaction sent on {}: {:?}", chain, tx_hash);

        let receipt = pending
            .confirmations(provider.confirmation_blocks())
            .await
            .map_err(|e| provider.provider_error(e))?
            .ok_or_else(|| DeliveryError::Dropped {
                chain: chain.clone(),
                tx_hash: format!("{:?}", tx_hash),
            })?;

        debug!(
            "Transaction {:?} confirmed in block {:?}",
            tx_hash, receipt.block_number
        );
        Ok(SubmissionReceipt::Executed { receipt })
    }
}
