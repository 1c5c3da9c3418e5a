//! Builds a submitter from its descriptor

use super::{
    GnosisSafeSubmitter, ImpersonatedAccountSubmitter, JsonRpcSubmitter, SubmitterKind,
    SubmitterMetadata, TxSubmitter,
};
use crate::chain::ChainContext;
use crate::error::{PreconditionError, SubmitResult, SubmitterError};
use crate::metadata::{parse_param, require_param};
use crate::metrics;
use crate::simulation::SimulationEnvironment;

use ethers::types::Address;
use std::sync::Arc;
use tracing::{debug, info};

const IMPERSONATED: &str = "ImpersonatedAccountSubmitter";
const GNOSIS_SAFE: &str = "GnosisSafeSubmitter";

pub struct SubmitterFactory {
    context: Arc<ChainContext>,
    simulator: Arc<dyn SimulationEnvironment>,
}

impl SubmitterFactory {
    pub fn new(context: Arc<ChainContext>, simulator: Arc<dyn SimulationEnvironment>) -> Self {
        Self { context, simulator }
    }

    /// Build the submitter named by `metadata.kind`
    pub async fn build(&self, metadata: SubmitterMetadata) -> SubmitResult<Box<dyn TxSubmitter>> {
        let SubmitterMetadata {
            kind,
            chain,
            settings,
        } = metadata;
        let kind: SubmitterKind = kind.parse()?;
        let settings = settings.as_ref();

        debug!("Building {} submitter for {}", kind, chain);

        let submitter: Box<dyn TxSubmitter> = match kind {
            SubmitterKind::JsonRpc => {
                Box::new(JsonRpcSubmitter::new(self.context.resolve(&chain)?))
            }
            SubmitterKind::ImpersonatedAccount => {
                let user: Address = parse_param(
                    require_param(settings, IMPERSONATED, "userAddress")?,
                    IMPERSONATED,
                    "userAddress",
                )?;

                self.prepare_fork(&chain).await?;

                let handles = self.context.resolve(&chain)?;
                if !handles.provider.is_forked() {
                    return Err(PreconditionError::NotForked { chain }.into());
                }
                Box::new(ImpersonatedAccountSubmitter::new(handles, user))
            }
            SubmitterKind::GnosisSafe => {
                let safe: Address = parse_param(
                    require_param(settings, GNOSIS_SAFE, "safeAddress")?,
                    GNOSIS_SAFE,
                    "safeAddress",
                )?;

                let handles = self.context.resolve(&chain)?;
                let service_url = handles
                    .provider
                    .config()
                    .safe_tx_service_url
                    .clone()
                    .ok_or_else(|| {
                        SubmitterError::Config(format!(
                            "Chain {} has no safe_tx_service_url configured",
                            chain
                        ))
                    })?;
                Box::new(GnosisSafeSubmitter::new(handles, safe, service_url))
            }
        };

        info!("Built {} submitter for {}", kind, submitter.chain());
        Ok(submitter)
    }

    /// Reachability check, then fork. The fork never starts if the check fails.
    async fn prepare_fork(&self, chain: &str) -> Result<(), PreconditionError> {
        let result = async {
            self.simulator.verify_reachable().await?;
            self.simulator.fork_chain_into(&self.context, chain).await
        }
        .await;

        if result.is_err() {
            metrics::record_precondition_failure(chain);
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chain::test_utils::test_context;
    use crate::error::VariantFamily;
    use crate::simulation::MockSimulationEnvironment;
    use mockall::Sequence;
    use serde_json::json;

    const USER: &str = "0x70997970C51812dc3A010C7d01b50e0d17dc79C8";

    fn metadata(value: serde_json::Value) -> SubmitterMetadata {
        serde_json::from_value(value).unwrap()
    }

    /// Simulator that must never be touched
    fn untouched_simulator() -> Arc<dyn SimulationEnvironment> {
        let mut sim = MockSimulationEnvironment::new();
        sim.expect_verify_reachable().never();
        sim.expect_fork_chain_into().never();
        Arc::new(sim)
    }

    fn factory(simulator: Arc<dyn SimulationEnvironment>) -> SubmitterFactory {
        SubmitterFactory::new(test_context(), simulator)
    }

    #[tokio::test]
    async fn test_json_rpc_binds_to_chain() {
        let submitter = factory(untouched_simulator())
            .build(metadata(json!({ "type": "jsonRpc", "chain": "ethereum" })))
            .await
            .unwrap();

        assert_eq!(submitter.kind(), SubmitterKind::JsonRpc);
        assert_eq!(submitter.chain(), "ethereum");
    }

    #[tokio::test]
    async fn test_json_rpc_ignores_unrelated_settings() {
        let submitter = factory(untouched_simulator())
            .build(metadata(json!({
                "type": "jsonRpc",
                "chain": "arbitrum",
                "settings": { "userAddress": null }
            })))
            .await
            .unwrap();
        assert_eq!(submitter.chain(), "arbitrum");
    }

    #[tokio::test]
    async fn test_json_rpc_unknown_chain() {
        let err = factory(untouched_simulator())
            .build(metadata(json!({ "type": "jsonRpc", "chain": "solana" })))
            .await
            .err()
            .unwrap();
        assert!(matches!(err, SubmitterError::ChainNotFound { .. }));
    }

    #[tokio::test]
    async fn test_gnosis_safe_requires_safe_address() {
        let err = factory(untouched_simulator())
            .build(metadata(json!({ "type": "gnosisSafe", "chain": "ethereum", "settings": {} })))
            .await
            .err()
            .unwrap();
        assert_eq!(err.missing_field(), Some("safeAddress"));
    }

    #[tokio::test]
    async fn test_gnosis_safe_builds() {
        let submitter = factory(untouched_simulator())
            .build(metadata(json!({
                "type": "gnosisSafe",
                "chain": "ethereum",
                "settings": { "safeAddress": "0x000000000000000000000000000000000000dEaD" }
            })))
            .await
            .unwrap();
        assert_eq!(submitter.kind(), SubmitterKind::GnosisSafe);
    }

    #[tokio::test]
    async fn test_gnosis_safe_needs_service_url() {
        let err = factory(untouched_simulator())
            .build(metadata(json!({
                "type": "gnosisSafe",
                "chain": "arbitrum",
                "settings": { "safeAddress": "0x000000000000000000000000000000000000dEaD" }
            })))
            .await
            .err()
            .unwrap();
        assert!(matches!(err, SubmitterError::Config(_)));
    }

    #[tokio::test]
    async fn test_impersonated_requires_user_address() {
        let err = factory(untouched_simulator())
            .build(metadata(json!({ "type": "impersonatedAccount", "chain": "ethereum" })))
            .await
            .err()
            .unwrap();
        assert_eq!(err.missing_field(), Some("userAddress"));
    }

    #[tokio::test]
    async fn test_impersonated_invalid_address() {
        let err = factory(untouched_simulator())
            .build(metadata(json!({
                "type": "impersonatedAccount",
                "chain": "ethereum",
                "settings": { "userAddress": "alice" }
            })))
            .await
            .err()
            .unwrap();
        assert!(matches!(
            err,
            SubmitterError::InvalidParameter { field: "userAddress", .. }
        ));
    }

    #[tokio::test]
    async fn test_impersonated_checks_reachability_before_fork() {
        let mut seq = Sequence::new();
        let mut sim = MockSimulationEnvironment::new();
        sim.expect_verify_reachable()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|| Ok(()));
        sim.expect_fork_chain_into()
            .withf(|_, chain| chain.to_string() == "ethereum")
            .times(1)
            .in_sequence(&mut seq)
            .returning(|context, chain| {
                context
                    .fork_into(chain, "http://127.0.0.1:18545")
                    .map_err(|e| PreconditionError::ForkFailed {
                        chain: chain.to_string(),
                        message: e.to_string(),
                    })
            });

        let submitter = factory(Arc::new(sim))
            .build(metadata(json!({
                "type": "impersonatedAccount",
                "chain": "ethereum",
                "settings": { "userAddress": USER }
            })))
            .await
            .unwrap();

        assert_eq!(submitter.kind(), SubmitterKind::ImpersonatedAccount);
        assert_eq!(submitter.chain(), "ethereum");
    }

    #[tokio::test]
    async fn test_unreachable_simulator_skips_fork() {
        let mut sim = MockSimulationEnvironment::new();
        sim.expect_verify_reachable().times(1).returning(|| {
            Err(PreconditionError::Unreachable {
                url: "http://127.0.0.1:8545".to_string(),
                message: "connection refused".to_string(),
            })
        });
        sim.expect_fork_chain_into().never();

        let err = factory(Arc::new(sim))
            .build(metadata(json!({
                "type": "impersonatedAccount",
                "chain": "ethereum",
                "settings": { "userAddress": USER }
            })))
            .await
            .err()
            .unwrap();

        assert!(matches!(
            err,
            SubmitterError::Precondition(PreconditionError::Unreachable { .. })
        ));
    }

    #[tokio::test]
    async fn test_failed_fork_returns_no_submitter() {
        let context = test_context();
        let mut sim = MockSimulationEnvironment::new();
        sim.expect_verify_reachable().times(1).returning(|| Ok(()));
        sim.expect_fork_chain_into().times(1).returning(|_, chain| {
            Err(PreconditionError::ForkFailed {
                chain: chain.to_string(),
                message: "anvil_reset rejected".to_string(),
            })
        });

        let err = SubmitterFactory::new(context.clone(), Arc::new(sim))
            .build(metadata(json!({
                "type": "impersonatedAccount",
                "chain": "ethereum",
                "settings": { "userAddress": USER }
            })))
            .await
            .err()
            .unwrap();

        assert!(matches!(
            err,
            SubmitterError::Precondition(PreconditionError::ForkFailed { ref chain, .. }) if chain == "ethereum"
        ));
        assert!(!context.resolve("ethereum").unwrap().provider.is_forked());
    }

    #[tokio::test]
    async fn test_fork_that_leaves_live_provider_is_rejected() {
        let mut sim = MockSimulationEnvironment::new();
        sim.expect_verify_reachable().returning(|| Ok(()));
        sim.expect_fork_chain_into().returning(|_, _| Ok(()));

        let err = factory(Arc::new(sim))
            .build(metadata(json!({
                "type": "impersonatedAccount",
                "chain": "ethereum",
                "settings": { "userAddress": USER }
            })))
            .await
            .err()
            .unwrap();

        assert!(matches!(
            err,
            SubmitterError::Precondition(PreconditionError::NotForked { .. })
        ));
    }

    #[tokio::test]
    async fn test_missing_user_address_skips_preconditions() {
        // Validation happens before any side effect
        let err = factory(untouched_simulator())
            .build(metadata(json!({
                "type": "impersonatedAccount",
                "chain": "ethereum",
                "settings": { "userAddress": "" }
            })))
            .await
            .err()
            .unwrap();
        assert_eq!(err.missing_field(), Some("userAddress"));
    }

    #[tokio::test]
    async fn test_unknown_kind() {
        let err = factory(untouched_simulator())
            .build(metadata(json!({ "type": "bogus", "chain": "ethereum" })))
            .await
            .err()
            .unwrap();

        assert!(matches!(
            err,
            SubmitterError::UnsupportedVariant { family: VariantFamily::Submitter, ref value } if value == "bogus"
        ));
    }
}
