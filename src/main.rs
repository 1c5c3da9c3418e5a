//! Tesseract Submitter - submit operations through a configured pipeline
//!
//! Loads chain settings, a submission strategy and a batch of operations,
//! then transforms and delivers them and reports one outcome per operation.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use clap::Parser;
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{error, info, warn};

use tesseract_submitter::chain::ChainContext;
use tesseract_submitter::config::Settings;
use tesseract_submitter::metrics;
use tesseract_submitter::operation::{Operation, RawOperation};
use tesseract_submitter::pipeline::{PipelineBuilder, SubmissionOutcome, SubmissionStrategy};
use tesseract_submitter::simulation::{AnvilSimulator, NoSimulator, SimulationEnvironment};
use tesseract_submitter::submitter::SubmissionReceipt;

#[derive(Debug, Parser)]
#[command(version, about = "Submit transactions through a submitter/transformer pipeline")]
struct Args {
    /// Chain settings (TOML)
    #[arg(long, env = "SUBMITTER_CONFIG", default_value = "config/default.toml")]
    config: PathBuf,

    /// Submission strategy (JSON)
    #[arg(long)]
    strategy: PathBuf,

    /// Operations to submit (JSON array)
    #[arg(long)]
    transactions: PathBuf,

    /// Write the outcome report here as JSON
    #[arg(long)]
    receipts: Option<PathBuf>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct OutcomeReport {
    chain: String,
    submitted_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    receipt: Option<SubmissionReceipt>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

impl OutcomeReport {
    fn new(outcome: SubmissionOutcome, submitted_at: DateTime<Utc>) -> Self {
        let chain = outcome.operation.chain.clone();
        let (receipt, error) = match outcome.into_result() {
            Ok(receipt) => (Some(receipt), None),
            Err(e) => (None, Some(e.to_string())),
        };
        Self {
            chain,
            submitted_at,
            receipt,
            error,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    init_logging();

    let args = Args::parse();
    info!("Starting Tesseract Submitter v{}", env!("CARGO_PKG_VERSION"));

    let settings = Settings::load(&args.config)?;
    info!(
        "Loaded configuration for {} chains",
        settings.enabled_chains().len()
    );

    let strategy = SubmissionStrategy::load(&args.strategy)?;
    let operations = load_operations(&args.transactions)?;

    let context = Arc::new(ChainContext::from_settings(&settings)?);
    for (chain, healthy) in context.health_check().await {
        if !healthy {
            warn!("Chain {} health check failed", chain);
        }
    }

    let simulator: Arc<dyn SimulationEnvironment> = match settings.simulator.clone() {
        Some(config) => Arc::new(AnvilSimulator::new(config)),
        None => Arc::new(NoSimulator),
    };

    let pipeline = PipelineBuilder::new(context, simulator)
        .build(strategy)
        .await
        .context("Failed to build submission pipeline")?;

    let submitted_at = Utc::now();
    let outcomes = pipeline.submit(operations).await?;
    let failed = outcomes.iter().filter(|o| !o.is_success()).count();

    let reports: Vec<OutcomeReport> = outcomes
        .into_iter()
        .map(|outcome| OutcomeReport::new(outcome, submitted_at))
        .collect();
    let report = serde_json::to_string_pretty(&reports)?;

    match &args.receipts {
        Some(path) => {
            std::fs::write(path, &report)
                .with_context(|| format!("Failed to write receipts: {:?}", path))?;
            info!("Receipts written to {:?}", path);
        }
        None => println!("{}", report),
    }

    if let Some(path) = &settings.metrics.textfile_path {
        std::fs::write(path, metrics::encode_text()?)
            .with_context(|| format!("Failed to write metrics: {:?}", path))?;
    }

    if failed > 0 {
        error!("{} of {} deliveries failed", failed, reports.len());
        anyhow::bail!("{} deliveries failed", failed);
    }

    info!("All {} operations submitted", reports.len());
    Ok(())
}

fn load_operations(path: &Path) -> Result<Vec<Operation>> {
    let source = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read transactions file: {:?}", path))?;
    let raw: Vec<RawOperation> =
        serde_json::from_str(&source).with_context(|| "Failed to parse transactions")?;
    Ok(raw.into_iter().map(Operation::from).collect())
}

fn init_logging() {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,tesseract_submitter=debug,hyper=warn"));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(true).with_thread_ids(true))
        .init();
}
