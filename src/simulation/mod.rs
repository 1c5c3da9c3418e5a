//! Local simulation environment used by impersonated-account submissions
//!
//! Building an impersonated-account submitter runs two setup steps against a
//! fork-capable node, strictly in order:
//! 1. the node must answer within the configured reachability timeout
//! 2. the target chain's live state is forked into it and the chain context
//!    is repointed at the fork

mod anvil;

pub use anvil::AnvilSimulator;

use crate::chain::ChainContext;
use crate::error::PreconditionError;

use async_trait::async_trait;

/// Setup steps a fork-capable node must provide
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SimulationEnvironment: Send + Sync {
    /// Fail fast when the local node cannot be reached
    async fn verify_reachable(&self) -> Result<(), PreconditionError>;

    /// Fork `chain`'s live state into the local node and repoint `context` at it
    async fn fork_chain_into(
        &self,
        context: &ChainContext,
        chain: &str,
    ) -> Result<(), PreconditionError>;
}

/// Stand-in used when no `[simulator]` section is configured
#[derive(Debug, Default, Clone, Copy)]
pub struct NoSimulator;

#[async_trait]
impl SimulationEnvironment for NoSimulator {
    async fn verify_reachable(&self) -> Result<(), PreconditionError> {
        Err(PreconditionError::NotConfigured)
    }

    async fn fork_chain_into(
        &self,
        _context: &ChainContext,
        _chain: &str,
    ) -> Result<(), PreconditionError> {
        Err(PreconditionError::NotConfigured)
    }
}
