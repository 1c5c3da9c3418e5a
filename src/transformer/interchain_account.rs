//! Redirect operations through an interchain-account router
//!
//! Operations targeting a remote chain are batched into a single call to the
//! local `InterchainAccountRouter`, which dispatches them to the owner's
//! interchain account on the destination. Encoding is purely local.

use super::{TransformerKind, TxTransformer};
use crate::chain::{ChainContext, NetworkInfo};
use crate::error::{SubmitResult, SubmitterError};
use crate::operation::Operation;

use async_trait::async_trait;
use ethers::abi::{encode, Token};
use ethers::types::{Address, Bytes, Eip1559TransactionRequest, H256};
use ethers::utils::id;
use serde::Deserialize;
use std::sync::Arc;
use tracing::debug;

const CALL_REMOTE: &str = "callRemote(uint32,(bytes32,uint256,bytes)[])";
const CALL_REMOTE_WITH_HOOK: &str = "callRemote(uint32,(bytes32,uint256,bytes)[],bytes)";
const CALL_REMOTE_WITH_OVERRIDES: &str =
    "callRemoteWithOverrides(uint32,bytes32,bytes32,(bytes32,uint256,bytes)[],bytes)";

/// Addressing and ownership of the remote interchain account
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountConfig {
    /// Chain the owner lives on; must be the transformer's chain
    pub origin: String,
    pub owner: Address,
    /// Replaces the `interchainAccount` router on the origin chain
    pub local_router: Option<Address>,
    /// Router on the destination; selects `callRemoteWithOverrides`
    pub router_override: Option<Address>,
    /// ISM on the destination; only meaningful with `router_override`
    pub ism_override: Option<Address>,
}

pub struct InterchainAccountTransformer {
    context: Arc<ChainContext>,
    network: NetworkInfo,
    interchain_account: Address,
    account_config: AccountConfig,
    hook_metadata: Option<Bytes>,
}

impl InterchainAccountTransformer {
    pub fn new(
        context: Arc<ChainContext>,
        network: NetworkInfo,
        interchain_account: Address,
        account_config: AccountConfig,
        hook_metadata: Option<Bytes>,
    ) -> Self {
        Self {
            context,
            network,
            interchain_account,
            account_config,
            hook_metadata,
        }
    }

    /// Router the dispatch call is sent to
    pub fn router(&self) -> Address {
        self.account_config
            .local_router
            .unwrap_or(self.interchain_account)
    }

    /// Calldata for the router call carrying `calls` to `destination`
    fn encode_dispatch(&self, destination: u32, calls: Vec<Token>) -> Bytes {
        let destination = Token::Uint(destination.into());
        let calls = Token::Array(calls);

        let (signature, args) = match self.account_config.router_override {
            Some(router) => {
                let ism = self.account_config.ism_override.unwrap_or_default();
                let hook = self.hook_metadata.clone().unwrap_or_default();
                (
                    CALL_REMOTE_WITH_OVERRIDES,
                    vec![
                        destination,
                        bytes32(router),
                        bytes32(ism),
                        calls,
                        Token::Bytes(hook.to_vec()),
                    ],
                )
            }
            None => match &self.hook_metadata {
                Some(hook) => (
                    CALL_REMOTE_WITH_HOOK,
                    vec![destination, calls, Token::Bytes(hook.to_vec())],
                ),
                None => (CALL_REMOTE, vec![destination, calls]),
            },
        };

        let mut data = id(signature).to_vec();
        data.extend(encode(&args));
        data.into()
    }
}

fn bytes32(address: Address) -> Token {
    Token::FixedBytes(H256::from(address).as_bytes().to_vec())
}

/// `CallLib.Call` tuple for one operation
fn remote_call(operation: &Operation) -> SubmitResult<Token> {
    let to = operation.target().ok_or_else(|| {
        SubmitterError::Transform(format!(
            "operation on {} has no recipient address",
            operation.chain
        ))
    })?;

    Ok(Token::Tuple(vec![
        bytes32(to),
        Token::Uint(operation.value()),
        Token::Bytes(operation.data().to_vec()),
    ]))
}

#[async_trait]
impl TxTransformer for InterchainAccountTransformer {
    fn kind(&self) -> TransformerKind {
        TransformerKind::InterchainAccount
    }

    fn chain(&self) -> &str {
        &self.network.name
    }

    async fn transform(&self, operations: Vec<Operation>) -> SubmitResult<Vec<Operation>> {
        let Some(first) = operations.first() else {
            return Ok(Vec::new());
        };

        let destination_chain = first.chain.as_str();
        if let Some(other) = operations.iter().find(|op| op.chain != destination_chain) {
            return Err(SubmitterError::Transform(format!(
                "cannot batch operations for {} and {} into one interchain call",
                destination_chain, other.chain
            )));
        }
        if destination_chain == self.network.name {
            return Err(SubmitterError::Transform(format!(
                "operations already target origin chain {}",
                destination_chain
            )));
        }

        let destination = self.context.resolve(destination_chain)?.network;
        let calls = operations
            .iter()
            .map(remote_call)
            .collect::<SubmitResult<Vec<_>>>()?;

        debug!(
            "Redirecting {} operation(s) from {} through ICA router {:?} on {}",
            calls.len(),
            destination.name,
            self.router(),
            self.network.name
        );

        let tx = Eip1559TransactionRequest::new()
            .to(self.router())
            .from(self.account_config.owner)
            .data(self.encode_dispatch(destination.domain_id, calls))
            .chain_id(self.network.chain_id);

        Ok(vec![Operation::new(self.network.name.clone(), tx)])
    }
}
