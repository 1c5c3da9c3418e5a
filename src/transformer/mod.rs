//! Transformation strategies
//!
//! Transformers rewrite a batch of operations before they reach the
//! submitter. A pipeline applies them in descriptor order, each stage seeing
//! the full output of the previous one.

mod factory;
mod interchain_account;

pub use factory::TransformerFactory;
pub use interchain_account::{AccountConfig, InterchainAccountTransformer};

use crate::error::{SubmitResult, SubmitterError, VariantFamily};
use crate::metadata::StrategySettings;
use crate::operation::Operation;

use async_trait::async_trait;
use serde::Deserialize;
use std::fmt;
use std::str::FromStr;

/// Known transformer types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TransformerKind {
    InterchainAccount,
}

impl TransformerKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransformerKind::InterchainAccount => "interchainAccount",
        }
    }
}

impl fmt::Display for TransformerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TransformerKind {
    type Err = SubmitterError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "interchainAccount" => Ok(TransformerKind::InterchainAccount),
            other => Err(SubmitterError::UnsupportedVariant {
                family: VariantFamily::Transformer,
                value: other.to_string(),
            }),
        }
    }
}

/// Descriptor selecting and configuring one transformer
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct TransformerMetadata {
    #[serde(rename = "type")]
    pub kind: String,
    pub chain: String,
    #[serde(default)]
    pub settings: Option<StrategySettings>,
}

/// Rewrites a set of operations into another; may change how many there are
#[async_trait]
pub trait TxTransformer: Send + Sync {
    fn kind(&self) -> TransformerKind;

    fn chain(&self) -> &str;

    async fn transform(&self, operations: Vec<Operation>) -> SubmitResult<Vec<Operation>>;
}
