// src/model.rs
//! Shared record types flowing through the pipeline:
//! `RawItem` (adapter output) → `ExtractedOpportunity` (extraction output, enriched in place).

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

/// Version tag stamped into provenance so stored records can be traced to the rule tables.
pub const EXTRACTOR_VERSION: &str = "pattern-v1";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceType {
    Rss,
    Crawl,
    Search,
}

impl SourceType {
    pub fn as_str(&self) -> &'static str {
        match self {
            SourceType::Rss => "rss",
            SourceType::Crawl => "crawl",
            SourceType::Search => "search",
        }
    }
}

impl fmt::Display for SourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Common shape produced by every source adapter. Consumed once by extraction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawItem {
    pub source_type: SourceType,
    pub title: String,
    pub body_text: String,
    pub url: String,
    pub published_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub source_metadata: Map<String, Value>,
}

impl RawItem {
    /// Currency hint supplied by the adapter (`source_metadata.currency`), if any.
    pub fn currency_hint(&self) -> Option<&str> {
        self.source_metadata
            .get("currency")
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|s| !s.is_empty())
    }
}

/// How an announcement states its money. Exactly one variant holds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FinancialDisclosure {
    TotalPool {
        amount: f64,
        currency: String,
        estimated_count: Option<u32>,
        count_range: Option<(u32, u32)>,
    },
    ExactPerProject {
        amount: f64,
        currency: String,
    },
    RangePerProject {
        min: f64,
        max: f64,
        currency: String,
    },
    Unknown,
}

impl FinancialDisclosure {
    pub fn is_known(&self) -> bool {
        !matches!(self, FinancialDisclosure::Unknown)
    }

    pub fn currency(&self) -> Option<&str> {
        match self {
            FinancialDisclosure::TotalPool { currency, .. }
            | FinancialDisclosure::ExactPerProject { currency, .. }
            | FinancialDisclosure::RangePerProject { currency, .. } => Some(currency.as_str()),
            FinancialDisclosure::Unknown => None,
        }
    }

    /// Replace the currency code; no-op on `Unknown`.
    pub fn set_currency(&mut self, code: &str) {
        match self {
            FinancialDisclosure::TotalPool { currency, .. }
            | FinancialDisclosure::ExactPerProject { currency, .. }
            | FinancialDisclosure::RangePerProject { currency, .. } => {
                *currency = code.to_string();
            }
            FinancialDisclosure::Unknown => {}
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeadlineType {
    Fixed,
    Rolling,
    MultipleRounds,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProcessingPath {
    Enhanced,
    Legacy,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Provenance {
    pub source_type: SourceType,
    pub source_name: Option<String>,
    pub published_at: Option<DateTime<Utc>>,
    pub processing_path: ProcessingPath,
    pub extractor_version: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UrgencyLevel {
    High,
    Medium,
    Low,
    None,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnrichmentResult {
    pub urgency_level: UrgencyLevel,
    pub days_until_deadline: Option<i64>,
    pub suitability_score: f32,
    pub relevance_score: f32,
    #[serde(default)]
    pub relevance_matches: Vec<String>,
    /// Source-specific signals (search rank, crawl strategy, ...). Never feeds the scores.
    #[serde(default)]
    pub source_signals: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractedOpportunity {
    pub title: String,
    pub description: String,
    pub source_url: String,
    pub application_url: Option<String>,
    pub financial: FinancialDisclosure,
    pub deadline: Option<NaiveDate>,
    pub deadline_type: Option<DeadlineType>,
    pub target_audience: Vec<String>,
    pub ai_subsectors: Vec<String>,
    pub development_stage: Vec<String>,
    pub collaboration_required: bool,
    pub gender_focused: bool,
    pub youth_focused: bool,
    pub reporting_requirements: Vec<String>,
    pub selection_criteria: Vec<String>,
    pub application_process: Option<String>,
    pub provenance: Provenance,
    pub enrichment: Option<EnrichmentResult>,
}

impl ExtractedOpportunity {
    /// Minimal record carrying only the pass-through fields. Used by the legacy path.
    pub fn minimal(raw: &RawItem, path: ProcessingPath) -> Self {
        Self {
            title: crate::text::normalize_text(&raw.title),
            description: crate::text::normalize_text(&raw.body_text),
            source_url: raw.url.trim().to_string(),
            application_url: None,
            financial: FinancialDisclosure::Unknown,
            deadline: None,
            deadline_type: None,
            target_audience: Vec::new(),
            ai_subsectors: Vec::new(),
            development_stage: Vec::new(),
            collaboration_required: false,
            gender_focused: false,
            youth_focused: false,
            reporting_requirements: Vec::new(),
            selection_criteria: Vec::new(),
            application_process: None,
            provenance: Provenance {
                source_type: raw.source_type,
                source_name: raw
                    .source_metadata
                    .get("source_name")
                    .and_then(Value::as_str)
                    .map(str::to_string),
                published_at: raw.published_at,
                processing_path: path,
                extractor_version: EXTRACTOR_VERSION.to_string(),
            },
            enrichment: None,
        }
    }

    /// Title + description, the text every scorer reads.
    pub fn search_text(&self) -> String {
        format!("{}. {}", self.title, self.description)
    }
}
