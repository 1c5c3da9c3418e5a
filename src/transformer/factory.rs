//! Builds transformers from their descriptors

use super::{
    AccountConfig, InterchainAccountTransformer, TransformerKind, TransformerMetadata,
    TxTransformer,
};
use crate::chain::ChainContext;
use crate::error::{SubmitResult, SubmitterError};
use crate::metadata::{optional_param, parse_param, require_param};

use ethers::types::{Address, Bytes};
use futures::future::try_join_all;
use std::sync::Arc;
use tracing::debug;

const INTERCHAIN_ACCOUNT: &str = "InterchainAccountTransformer";

pub struct TransformerFactory {
    context: Arc<ChainContext>,
}

impl TransformerFactory {
    pub fn new(context: Arc<ChainContext>) -> Self {
        Self { context }
    }

    /// Build every descriptor concurrently; output order matches input order
    pub async fn build(
        &self,
        metadata: Vec<TransformerMetadata>,
    ) -> SubmitResult<Vec<Box<dyn TxTransformer>>> {
        try_join_all(metadata.into_iter().map(|m| self.build_one(m))).await
    }

    async fn build_one(&self, metadata: TransformerMetadata) -> SubmitResult<Box<dyn TxTransformer>> {
        let TransformerMetadata {
            kind,
            chain,
            settings,
        } = metadata;
        let kind: TransformerKind = kind.parse()?;
        let settings = settings.as_ref();

        debug!("Building {} transformer for {}", kind, chain);

        let transformer: Box<dyn TxTransformer> = match kind {
            TransformerKind::InterchainAccount => {
                // Presence of both fields is checked before either is parsed
                let interchain_account =
                    require_param(settings, INTERCHAIN_ACCOUNT, "interchainAccount")?;
                let account_config = require_param(settings, INTERCHAIN_ACCOUNT, "accountConfig")?;

                let interchain_account: Address =
                    parse_param(interchain_account, INTERCHAIN_ACCOUNT, "interchainAccount")?;
                let account_config: AccountConfig =
                    parse_param(account_config, INTERCHAIN_ACCOUNT, "accountConfig")?;
                let hook_metadata: Option<Bytes> = optional_param(settings, "hookMetadata")
                    .map(|v| parse_param(v, INTERCHAIN_ACCOUNT, "hookMetadata"))
                    .transpose()?;

                if account_config.origin != chain {
                    return Err(SubmitterError::InvalidParameter {
                        kind: INTERCHAIN_ACCOUNT,
                        field: "accountConfig",
                        message: format!(
                            "origin {} does not match transformer chain {}",
                            account_config.origin, chain
                        ),
                    });
                }
                if account_config.ism_override.is_some() && account_config.router_override.is_none()
                {
                    return Err(SubmitterError::InvalidParameter {
                        kind: INTERCHAIN_ACCOUNT,
                        field: "accountConfig",
                        message: "ismOverride requires routerOverride".to_string(),
                    });
                }

                let network = self.context.resolve(&chain)?.network;
                Box::new(InterchainAccountTransformer::new(
                    self.context.clone(),
                    network,
                    interchain_account,
                    account_config,
                    hook_metadata,
                ))
            }
        };

        Ok(transformer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chain::test_utils::test_context;
    use crate::error::VariantFamily;
    use serde_json::{json, Value};

    const ROUTER: &str = "0x0000000000000000000000000000000000001ca0";

    fn account_config(origin: &str) -> Value {
        json!({ "origin": origin, "owner": "0x0000000000000000000000000000000000000a11" })
    }

    fn ica(chain: &str, settings: Value) -> TransformerMetadata {
        serde_json::from_value(json!({
            "type": "interchainAccount",
            "chain": chain,
            "settings": settings,
        }))
        .unwrap()
    }

    fn factory() -> TransformerFactory {
        TransformerFactory::new(test_context())
    }

    async fn build_err(metadata: Vec<TransformerMetadata>) -> SubmitterError {
        factory().build(metadata).await.err().unwrap()
    }

    #[tokio::test]
    async fn test_empty_list() {
        let transformers = factory().build(Vec::new()).await.unwrap();
        assert!(transformers.is_empty());
    }

    #[tokio::test]
    async fn test_single_ica_transformer() {
        let transformers = factory()
            .build(vec![ica(
                "neutron",
                json!({ "interchainAccount": ROUTER, "accountConfig": account_config("neutron") }),
            )])
            .await
            .unwrap();

        assert_eq!(transformers.len(), 1);
        assert_eq!(transformers[0].kind(), TransformerKind::InterchainAccount);
        assert_eq!(transformers[0].chain(), "neutron");
    }

    #[tokio::test]
    async fn test_order_preserved() {
        let chains = ["arbitrum", "ethereum", "neutron", "ethereum"];
        let metadata = chains
            .iter()
            .map(|chain| {
                ica(
                    chain,
                    json!({
                        "interchainAccount": ROUTER,
                        "accountConfig": account_config(chain),
                        "hookMetadata": "0x01",
                    }),
                )
            })
            .collect();

        let transformers = factory().build(metadata).await.unwrap();
        let built: Vec<&str> = transformers.iter().map(|t| t.chain()).collect();
        assert_eq!(built, chains);
    }

    #[tokio::test]
    async fn test_missing_interchain_account() {
        let err = build_err(vec![ica(
            "neutron",
            json!({ "accountConfig": account_config("neutron") }),
        )])
        .await;
        assert_eq!(err.missing_field(), Some("interchainAccount"));
    }

    #[tokio::test]
    async fn test_missing_account_config() {
        let err = build_err(vec![ica("neutron", json!({ "interchainAccount": ROUTER }))]).await;
        assert_eq!(err.missing_field(), Some("accountConfig"));
    }

    #[tokio::test]
    async fn test_missing_both_names_first_checked() {
        let err = build_err(vec![ica("neutron", json!({}))]).await;
        assert_eq!(err.missing_field(), Some("interchainAccount"));

        let err = build_err(vec![TransformerMetadata {
            kind: "interchainAccount".to_string(),
            chain: "neutron".to_string(),
            settings: None,
        }])
        .await;
        assert_eq!(err.missing_field(), Some("interchainAccount"));
    }

    #[tokio::test]
    async fn test_origin_mismatch() {
        let err = build_err(vec![ica(
            "neutron",
            json!({ "interchainAccount": ROUTER, "accountConfig": account_config("ethereum") }),
        )])
        .await;
        assert!(matches!(
            err,
            SubmitterError::InvalidParameter { field: "accountConfig", .. }
        ));
    }

    #[tokio::test]
    async fn test_ism_override_without_router_override() {
        let mut config = account_config("neutron");
        config["ismOverride"] = json!("0x0000000000000000000000000000000000000bad");
        let err = build_err(vec![ica(
            "neutron",
            json!({ "interchainAccount": ROUTER, "accountConfig": config }),
        )])
        .await;
        assert!(matches!(err, SubmitterError::InvalidParameter { .. }));
    }

    #[tokio::test]
    async fn test_one_bad_descriptor_fails_whole_build() {
        let err = build_err(vec![
            ica(
                "neutron",
                json!({ "interchainAccount": ROUTER, "accountConfig": account_config("neutron") }),
            ),
            ica("ethereum", json!({ "interchainAccount": ROUTER })),
        ])
        .await;
        assert_eq!(err.missing_field(), Some("accountConfig"));
    }

    #[tokio::test]
    async fn test_unknown_kind() {
        let metadata = TransformerMetadata {
            kind: "bogus".to_string(),
            chain: "neutron".to_string(),
            settings: None,
        };
        let err = build_err(vec![metadata]).await;
        assert!(matches!(
            err,
            SubmitterError::UnsupportedVariant { family: VariantFamily::Transformer, ref value } if value == "bogus"
        ));
    }
}
