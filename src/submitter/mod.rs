//! Submission strategies
//!
//! A submitter delivers the final operations of a pipeline. Exactly one is
//! built per pipeline, selected by the descriptor's `type`:
//! - `jsonRpc`: sign locally and send to the chain's RPC endpoint
//! - `impersonatedAccount`: send from an impersonated account on a local fork
//! - `gnosisSafe`: propose to a Safe multisig without executing

mod factory;
mod gnosis_safe;
mod impersonated;
mod json_rpc;

pub use factory::SubmitterFactory;
pub use gnosis_safe::{GnosisSafeSubmitter, ProposalHandle};
pub use impersonated::ImpersonatedAccountSubmitter;
pub use json_rpc::JsonRpcSubmitter;

use crate::error::{DeliveryError, SubmitterError, VariantFamily};
use crate::metadata::StrategySettings;
use crate::operation::Operation;

use async_trait::async_trait;
use ethers::types::TransactionReceipt;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Known submitter types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SubmitterKind {
    JsonRpc,
    ImpersonatedAccount,
    GnosisSafe,
}

impl SubmitterKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            SubmitterKind::JsonRpc => "jsonRpc",
            SubmitterKind::ImpersonatedAccount => "impersonatedAccount",
            SubmitterKind::GnosisSafe => "gnosisSafe",
        }
    }
}

impl fmt::Display for SubmitterKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SubmitterKind {
    type Err = SubmitterError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "jsonRpc" => Ok(SubmitterKind::JsonRpc),
            "impersonatedAccount" => Ok(SubmitterKind::ImpersonatedAccount),
            "gnosisSafe" => Ok(SubmitterKind::GnosisSafe),
            other => Err(SubmitterError::UnsupportedVariant {
                family: VariantFamily::Submitter,
                value: other.to_string(),
            }),
        }
    }
}

/// Descriptor selecting and configuring a submitter
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SubmitterMetadata {
    #[serde(rename = "type")]
    pub kind: String,
    pub chain: String,
    #[serde(default)]
    pub settings: Option<StrategySettings>,
}

/// What a successful delivery produced
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "status", rename_all = "camelCase")]
pub enum SubmissionReceipt {
    /// Included on the live network
    Executed { receipt: TransactionReceipt },
    /// Included on a local fork only
    Simulated { receipt: TransactionReceipt },
    /// Pending multisig approval; nothing has executed yet
    Proposed { proposal: ProposalHandle },
}

/// Delivers a single operation
#[async_trait]
pub trait TxSubmitter: Send + Sync {
    fn kind(&self) -> SubmitterKind;

    /// Chain this submitter is bound to
    fn chain(&self) -> &str;

    async fn deliver(&self, operation: &Operation) -> Result<SubmissionReceipt, DeliveryError>;
}

/// Reject operations meant for a different chain than the submitter's
pub(crate) fn ensure_chain(submitter: &str, operation: &Operation) -> Result<(), DeliveryError> {
    if operation.chain != submitter {
        return Err(DeliveryError::ChainMismatch {
            submitter: submitter.to_string(),
            operation: operation.chain.clone(),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use ethers::types::{Address, Bytes, U256};

    #[test]
    fn test_kind_round_trips_through_str() {
        for kind in [
            SubmitterKind::JsonRpc,
            SubmitterKind::ImpersonatedAccount,
            SubmitterKind::GnosisSafe,
        ] {
            assert_eq!(kind.as_str().parse::<SubmitterKind>().unwrap(), kind);
        }
    }

    #[test]
    fn test_unknown_kind() {
        let err = "JSON_RPC".parse::<SubmitterKind>().unwrap_err();
        assert!(matches!(
            err,
            SubmitterError::UnsupportedVariant { family: VariantFamily::Submitter, value } if value == "JSON_RPC"
        ));
    }

    #[test]
    fn test_metadata_settings_optional() {
        let meta: SubmitterMetadata =
            serde_json::from_str(r#"{"type": "jsonRpc", "chain": "ethereum"}"#).unwrap();
        assert_eq!(meta.kind, "jsonRpc");
        assert!(meta.settings.is_none());
    }

    #[test]
    fn test_ensure_chain() {
        let op = Operation::call("arbitrum", Address::zero(), Bytes::default(), U256::zero());
        assert!(ensure_chain("arbitrum", &op).is_ok());
        assert!(matches!(
            ensure_chain("ethereum", &op),
            Err(DeliveryError::ChainMismatch { .. })
        ));
    }
}
