// src/error.rs
use thiserror::Error;

pub type Result<T> = std::result::Result<T, PipelineError>;

/// Orchestrator-level failures. Per-item problems never surface here.
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error(transparent)]
    Anyhow(#[from] anyhow::Error),
}

/// Reasons the enhanced path gives up on a single item.
/// The legacy transform handles every variant.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ItemFault {
    #[error("empty body")]
    EmptyBody,

    #[error("non-finite {field}")]
    NonFiniteScore { field: &'static str },

    #[error("enhanced path panicked: {0}")]
    Panicked(String),
}
