//! Pipeline composition: transformers in order, then one submitter

use crate::chain::ChainContext;
use crate::error::{DeliveryError, SubmitResult};
use crate::metrics;
use crate::operation::Operation;
use crate::simulation::SimulationEnvironment;
use crate::submitter::{SubmissionReceipt, SubmitterFactory, SubmitterMetadata, TxSubmitter};
use crate::transformer::{TransformerFactory, TransformerMetadata, TxTransformer};

use anyhow::Context;
use serde::Deserialize;
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, info_span, warn, Instrument};
use uuid::Uuid;

/// A submitter descriptor plus the transformers applied before it
#[derive(Debug, Clone, Deserialize)]
pub struct SubmissionStrategy {
    pub submitter: SubmitterMetadata,
    #[serde(default)]
    pub transformers: Vec<TransformerMetadata>,
}

impl SubmissionStrategy {
    /// Load a strategy from a JSON file
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let source = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read strategy file: {:?}", path))?;
        serde_json::from_str(&source).with_context(|| "Failed to parse strategy")
    }
}

/// Result of delivering one operation
#[derive(Debug, Clone)]
pub struct SubmissionOutcome {
    pub operation: Operation,
    pub result: Result<SubmissionReceipt, DeliveryError>,
}

impl SubmissionOutcome {
    pub fn is_success(&self) -> bool {
        self.result.is_ok()
    }

    /// Receipt, or the delivery failure as a library error
    pub fn into_result(self) -> SubmitResult<SubmissionReceipt> {
        Ok(self.result?)
    }
}

/// Assembles pipelines from strategies against a shared chain context
pub struct PipelineBuilder {
    submitters: SubmitterFactory,
    transformers: TransformerFactory,
}

impl PipelineBuilder {
    pub fn new(context: Arc<ChainContext>, simulator: Arc<dyn SimulationEnvironment>) -> Self {
        Self {
            submitters: SubmitterFactory::new(context.clone(), simulator),
            transformers: TransformerFactory::new(context),
        }
    }

    /// Build both halves concurrently. Both run to completion, so a fork
    /// started by the submitter factory is never abandoned half-way. A
    /// submitter failure takes precedence over a transformer failure.
    pub async fn build(&self, strategy: SubmissionStrategy) -> SubmitResult<SubmissionPipeline> {
        let SubmissionStrategy {
            submitter,
            transformers,
        } = strategy;

        let (submitter, transformers) = tokio::join!(
            self.submitters.build(submitter),
            self.transformers.build(transformers),
        );
        let submitter = submitter?;
        let transformers = transformers?;

        metrics::record_pipeline_built(submitter.kind().as_str());
        info!(
            "Pipeline ready: {} transformer(s) -> {} on {}",
            transformers.len(),
            submitter.kind(),
            submitter.chain()
        );
        Ok(SubmissionPipeline::new(submitter, transformers))
    }
}

/// One submitter behind an ordered list of transformers
pub struct SubmissionPipeline {
    submitter: Box<dyn TxSubmitter>,
    transformers: Vec<Box<dyn TxTransformer>>,
}

impl SubmissionPipeline {
    pub fn new(submitter: Box<dyn TxSubmitter>, transformers: Vec<Box<dyn TxTransformer>>) -> Self {
        Self {
            submitter,
            transformers,
        }
    }

    pub fn submitter(&self) -> &dyn TxSubmitter {
        self.submitter.as_ref()
    }

    pub fn transformers(&self) -> &[Box<dyn TxTransformer>] {
        &self.transformers
    }

    /// Transform then deliver. A transformer error aborts the whole call;
    /// delivery errors are reported per operation and do not stop later ones.
    pub async fn submit(&self, operations: Vec<Operation>) -> SubmitResult<Vec<SubmissionOutcome>> {
        let span = info_span!("submit", run_id = %Uuid::new_v4());
        self.run(operations).instrument(span).await
    }

    async fn run(&self, operations: Vec<Operation>) -> SubmitResult<Vec<SubmissionOutcome>> {
        let mut operations = operations;
        for transformer in &self.transformers {
            let before = operations.len();
            operations = transformer.transform(operations).await?;
            debug!(
                "{} transformer on {}: {} -> {} operation(s)",
                transformer.kind(),
                transformer.chain(),
                before,
                operations.len()
            );
            metrics::record_operations_transformed(
                transformer.kind().as_str(),
                transformer.chain(),
                operations.len(),
            );
        }

        let kind = self.submitter.kind().as_str();
        let mut outcomes = Vec::with_capacity(operations.len());
        for operation in operations {
            let started = Instant::now();
            let result = self.submitter.deliver(&operation).await;
            metrics::record_delivery(kind, &operation.chain, result.is_ok(), started.elapsed());

            if let Err(e) = &result {
                warn!("Delivery on {} failed: {}", operation.chain, e);
            }
            outcomes.push(SubmissionOutcome { operation, result });
        }

        info!(
            "Submitted {} operation(s) via {}, {} failed",
            outcomes.len(),
            kind,
            outcomes.iter().filter(|o| !o.is_success()).count()
        );
        Ok(outcomes)
    }
}
