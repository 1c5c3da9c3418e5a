//! Proposal submission to a Safe multisig
//!
//! The operation is registered with the Safe Transaction Service as a pending
//! multisig transaction signed by the proposer. Collecting the remaining owner
//! signatures and executing happen elsewhere.

use super::{ensure_chain, SubmissionReceipt, SubmitterKind, TxSubmitter};
use crate::chain::ChainHandles;
use crate::error::DeliveryError;
use crate::operation::Operation;

use async_trait::async_trait;
use ethers::prelude::*;
use ethers::utils::to_checksum;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info};

abigen!(
    GnosisSafe,
    r#"[
        function nonce() external view returns (uint256)
        function getTransactionHash(address to, uint256 value, bytes data, uint8 operation, uint256 safeTxGas, uint256 baseGas, uint256 gasPrice, address gasToken, address refundReceiver, uint256 _nonce) external view returns (bytes32)
    ]"#
);

/// Safe `operation` value for a plain call
const CALL_OPERATION: u8 = 0;

/// Reference to a proposal awaiting owner approvals
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProposalHandle {
    pub safe: Address,
    pub safe_tx_hash: H256,
    pub nonce: U256,
    pub proposer: Address,
}

/// Body of a multisig-transaction proposal
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SafeProposal {
    to: String,
    value: String,
    data: Option<String>,
    operation: u8,
    safe_tx_gas: String,
    base_gas: String,
    gas_price: String,
    gas_token: String,
    refund_receiver: String,
    nonce: String,
    contract_transaction_hash: String,
    sender: String,
    signature: String,
    origin: String,
}

#[derive(Debug, Deserialize)]
struct PendingPage {
    results: Vec<PendingEntry>,
}

#[derive(Debug, Deserialize)]
struct PendingEntry {
    nonce: u64,
}

pub struct GnosisSafeSubmitter {
    handles: ChainHandles,
    safe: Address,
    service_url: String,
    http: reqwest::Client,
}

impl GnosisSafeSubmitter {
    pub fn new(handles: ChainHandles, safe: Address, service_url: String) -> Self {
        Self {
            handles,
            safe,
            service_url,
            http: reqwest::Client::new(),
        }
    }

    fn transactions_url(&self) -> String {
        format!(
            "{}/api/v1/safes/{}/multisig-transactions/",
            self.service_url.trim_end_matches('/'),
            to_checksum(&self.safe, None)
        )
    }

    fn service_error(&self, err: impl std::fmt::Display) -> DeliveryError {
        DeliveryError::Provider {
            chain: self.chain().to_string(),
            message: format!("safe transaction service: {}", err),
        }
    }

    /// Highest nonce already proposed but not executed
    async fn highest_pending_nonce(&self) -> Result<Option<u64>, DeliveryError> {
        let page: PendingPage = self
            .http
            .get(self.transactions_url())
            .query(&[("executed", "false"), ("ordering", "-nonce"), ("limit", "1")])
            .send()
            .await
            .map_err(|e| self.service_error(e))?
            .error_for_status()
            .map_err(|e| self.service_error(e))?
            .json()
            .await
            .map_err(|e| self.service_error(e))?;

        Ok(page.results.first().map(|entry| entry.nonce))
    }

    async fn next_nonce(&self, safe: &GnosisSafe<Provider<Http>>) -> Result<U256, DeliveryError> {
        let provider = &self.handles.provider;
        let on_chain = safe
            .nonce()
            .call()
            .await
            .map_err(|e| provider.provider_error(e))?;

        let next = match self.highest_pending_nonce().await? {
            Some(pending) => std::cmp::max(on_chain, U256::from(pending) + 1),
            None => on_chain,
        };
        debug!(
            "Safe {:?} nonce: on-chain {}, next proposal {}",
            self.safe, on_chain, next
        );
        Ok(next)
    }
}

#[async_trait]
impl TxSubmitter for GnosisSafeSubmitter {
    fn kind(&self) -> SubmitterKind {
        SubmitterKind::GnosisSafe
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
                message: "no proposer signer configured".to_string(),
            })?;
        let to = operation
            .target()
            .ok_or_else(|| DeliveryError::InvalidOperation {
                chain: chain.clone(),
                message: "safe proposals need an explicit recipient address".to_string(),
            })?;

        let provider = &self.handles.provider;
        let safe = GnosisSafe::new(self.safe, Arc::new(provider.http().clone()));
        let nonce = self.next_nonce(&safe).await?;

        let data = operation.data();
        let value = operation.value();
        let safe_tx_hash = safe
            .get_transaction_hash(
                to,
                value,
                data.clone(),
                CALL_OPERATION,
                U256::zero(),
                U256::zero(),
                U256::zero(),
                Address::zero(),
                Address::zero(),
                nonce,
            )
            .call()
            .await
            .map_err(|e| provider.provider_error(e))?;
        let safe_tx_hash = H256::from(safe_tx_hash);

        let signature = wallet
            .sign_hash(safe_tx_hash)
            .map_err(|e| DeliveryError::Signer {
                chain: chain.clone(),
                message: e.to_string(),
            })?;

        let proposal = build_proposal(
            to,
            value,
            &data,
            nonce,
            safe_tx_hash,
            wallet.address(),
            &signature,
        );

        let response = self
            .http
            .post(self.transactions_url())
            .json(&proposal)
            .send()
            .await
            .map_err(|e| self.service_error(e))?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(DeliveryError::SafeService {
                status: status.as_u16(),
                message,
            });
        }

        info!(
            "Proposed safe tx {:?} to {:?} on {} (nonce {})",
            safe_tx_hash, self.safe, chain, nonce
        );
        Ok(SubmissionReceipt::Proposed {
            proposal: ProposalHandle {
                safe: self.safe,
                safe_tx_hash,
                nonce,
                proposer: wallet.address(),
            },
        })
    }
}

fn build_proposal(
    to: Address,
    value: U256,
    data: &Bytes,
    nonce: U256,
    safe_tx_hash: H256,
    sender: Address,
    signature: &Signature,
) -> SafeProposal {
    let zero = U256::zero().to_string();
    SafeProposal {
        to: to_checksum(&to, None),
        value: value.to_string(),
        data: (!data.is_empty()).then(|| format!("0x{}", hex::encode(data))),
        operation: CALL_OPERATION,
        safe_tx_gas: zero.clone(),
        base_gas: zero.clone(),
        gas_price: zero,
        gas_token: to_checksum(&Address::zero(), None),
        refund_receiver: to_checksum(&Address::zero(), None),
        nonce: nonce.to_string(),
        contract_transaction_hash: format!("{:?}", safe_tx_hash),
        sender: to_checksum(&sender, None),
        signature: format!("0x{}", hex::encode(signature.to_vec())),
        origin: env!("CARGO_PKG_NAME").to_string(),
    }
}
