// src/pipeline/sink.rs
use anyhow::{anyhow, Result};
use async_trait::async_trait;
use std::sync::Mutex;

use crate::model::ExtractedOpportunity;

/// Persistence collaborator. Called once per accepted, non-duplicate record.
#[async_trait]
pub trait OpportunitySink: Send + Sync {
    async fn persist(&self, opp: ExtractedOpportunity) -> Result<()>;
}

/// Keeps records in memory, in persistence order.
#[derive(Debug, Default)]
pub struct MemorySink {
    records: Mutex<Vec<ExtractedOpportunity>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn records(&self) -> Vec<ExtractedOpportunity> {
        self.records
            .lock()
            .map(|g| g.clone())
            .unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.records.lock().map(|g| g.len()).unwrap_or_default()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl OpportunitySink for MemorySink {
    async fn persist(&self, opp: ExtractedOpportunity) -> Result<()> {
        self.records
            .lock()
            .map_err(|_| anyhow!("memory sink lock poisoned"))?
            .push(opp);
        Ok(())
    }
}
