//! Tesseract Submitter - transaction submission pipelines
//!
//! A pipeline is built from a [`SubmissionStrategy`]: one submitter descriptor
//! selecting how operations are delivered (direct JSON-RPC, impersonated
//! account on a local fork, or Safe multisig proposal) and an ordered list of
//! transformer descriptors that rewrite operations first (interchain-account
//! redirection).

pub mod chain;
pub mod config;
pub mod error;
pub mod metadata;
pub mod metrics;
pub mod operation;
pub mod pipeline;
pub mod simulation;
pub mod submitter;
pub mod transformer;

pub use chain::ChainContext;
pub use config::Settings;
pub use error::{DeliveryError, PreconditionError, SubmitResult, SubmitterError};
pub use operation::Operation;
pub use pipeline::{PipelineBuilder, SubmissionOutcome, SubmissionPipeline, SubmissionStrategy};
