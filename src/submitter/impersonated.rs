//! Submission from an impersonated account on a forked chain
//!
//! Only ever valid against a local fork; the factory refuses to build one
//! for a provider that still points at the live network.

use super::{ensure_chain, SubmissionReceipt, SubmitterKind, TxSubmitter};
use crate::chain::ChainHandles;
use crate::error::DeliveryError;
use crate::operation::Operation;

use async_trait::async_trait;
use ethers::prelude::*;
use tracing::{debug, warn};

pub struct ImpersonatedAccountSubmitter {
    handles: ChainHandles,
    user: Address,
}

impl ImpersonatedAccountSubmitter {
    pub fn new(handles: ChainHandles, user: Address) -> Self {
        Self { handles, user }
    }

    async fn send_as_user(
        &self,
        operation: &Operation,
    ) -> Result<TransactionReceipt, DeliveryError> {
        let provider = &self.handles.provider;

        let mut tx = operation.tx.clone();
        tx.set_from(self.user);
        tx.set_chain_id(self.handles.network.chain_id);

        let pending = provider
            .http()
            .send_transaction(tx, None)
            .await
            .map_err(|e| provider.provider_error(e))?;
        let tx_hash = pending.tx_hash();

        pending
            .await
            .map_err(|e| provider.provider_error(e))?
            .ok_or_else(|| DeliveryError::Dropped {
                chain: self.chain().to_string(),
                tx_hash: format!("{:?}", tx_hash),
            })
    }
}

#[async_trait]
impl TxSubmitter for ImpersonatedAccountSubmitter {
    fn kind(&self) -> SubmitterKind {
        SubmitterKind::ImpersonatedAccount
    }

    fn chain(&self) -> &str {
        &self.handles.network.name
    }

    async fn deliver(&self, operation: &Operation) -> Result<SubmissionReceipt, DeliveryError> {
        ensure_chain(self.chain(), operation)?;

        let provider = &self.handles.provider;
        provider
            .http()
            .request::<_, ()>("anvil_impersonateAccount", [self.user])
            .await
            .map_err(|e| provider.provider_error(e))?;
        debug!("Impersonating {:?} on {}", self.user, self.chain());

        let result = self.send_as_user(operation).await;

        // Stop impersonating even when the send failed
        if let Err(e) = provider
            .http()
            .request::<_, ()>("anvil_stopImpersonatingAccount", [self.user])
            .await
        {
            warn!(
                "Failed to stop impersonating {:?} on {}: {}",
                self.user,
                self.chain(),
                e
            );
        }

        let receipt = result?;
        Ok(SubmissionReceipt::Simulated { receipt })
    }
}
