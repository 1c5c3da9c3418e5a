//! Error types for the submission pipeline

use std::fmt;
use std::time::Duration;

use thiserror::Error;

/// Which factory rejected an unknown `type` value
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VariantFamily {
    Submitter,
    Transformer,
}

impl fmt::Display for VariantFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VariantFamily::Submitter => write!(f, "TxSubmitterType"),
            VariantFamily::Transformer => write!(f, "TxTransformerType"),
        }
    }
}

/// Main error type for building and running pipelines
#[derive(Error, Debug)]
pub enum SubmitterError {
    #[error("Missing param '{field}': cannot instantiate {kind}")]
    MissingParameter { kind: &'static str, field: &'static str },

    #[error("Invalid param '{field}' for {kind}: {message}")]
    InvalidParameter {
        kind: &'static str,
        field: &'static str,
        message: String,
    },

    #[error("Invalid {family}: {value}")]
    UnsupportedVariant { family: VariantFamily, value: String },

    #[error("Precondition failed: {0}")]
    Precondition(#[from] PreconditionError),

    #[error("Delivery failed: {0}")]
    Delivery(#[from] DeliveryError),

    #[error("Transform error: {0}")]
    Transform(String),

    #[error("Chain {chain} not found")]
    ChainNotFound { chain: String },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Wallet error: {0}")]
    Wallet(String),
}

impl SubmitterError {
    /// True for errors caused by the strategy descriptors rather than the environment
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            SubmitterError::MissingParameter { .. }
                | SubmitterError::InvalidParameter { .. }
                | SubmitterError::UnsupportedVariant { .. }
        )
    }

    /// Name of the missing field, if this is a `MissingParameter` error
    pub fn missing_field(&self) -> Option<&'static str> {
        match self {
            SubmitterError::MissingParameter { field, .. } => Some(*field),
            _ => None,
        }
    }
}

/// Failures of the simulator setup run before an impersonated-account submitter exists
#[derive(Error, Debug)]
pub enum PreconditionError {
    #[error("no local simulator configured")]
    NotConfigured,

    #[error("simulator at {url} is unreachable: {message}")]
    Unreachable { url: String, message: String },

    #[error("{step} timed out after {timeout:?}")]
    TimedOut { step: &'static str, timeout: Duration },

    #[error("failed to fork chain {chain}: {message}")]
    ForkFailed { chain: String, message: String },

    #[error("chain {chain} is not backed by a forked provider")]
    NotForked { chain: String },
}

/// Failure of a single delivery. Propagated as-is, never retried here.
#[derive(Error, Debug, Clone)]
pub enum DeliveryError {
    #[error("operation targets chain {operation} but submitter is bound to {submitter}")]
    ChainMismatch { submitter: String, operation: String },

    #[error("provider error on chain {chain}: {message}")]
    Provider { chain: String, message: String },

    #[error("operation cannot be delivered on chain {chain}: {message}")]
    InvalidOperation { chain: String, message: String },

    #[error("signer error on chain {chain}: {message}")]
    Signer { chain: String, message: String },

    #[error("transaction {tx_hash} on chain {chain} was dropped from the mempool")]
    Dropped { chain: String, tx_hash: String },

    #[error("timeout waiting for {operation} on chain {chain}")]
    Timeout { chain: String, operation: String },

    #[error("safe transaction service rejected proposal ({status}): {message}")]
    SafeService { status: u16, message: String },
}

/// Result type for pipeline operations
pub type SubmitResult<T> = Result<T, SubmitterError>;
