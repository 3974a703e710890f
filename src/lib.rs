// src/lib.rs
// Public library surface for the binary and integration tests.

pub mod adapters;
pub mod config;
pub mod dedup;
pub mod enrich;
pub mod error;
pub mod extract;
pub mod model;
pub mod pipeline;
pub mod telemetry;
pub mod text;
pub mod validate;
pub mod vocab;

// ---- Re-exports for stable public API ----
pub use crate::adapters::{PayloadSource, SourcePayload};
pub use crate::config::EtlConfig;
pub use crate::enrich::RelevanceEngine;
pub use crate::error::{ItemFault, PipelineError};
pub use crate::model::{ExtractedOpportunity, FinancialDisclosure, RawItem, SourceType};
pub use crate::pipeline::{
    BatchOutcome, CancelFlag, Flagged, MemorySink, OpportunitySink, Pipeline, PipelineStats,
    Rejection,
};
