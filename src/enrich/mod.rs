// src/enrich/mod.rs
//! Field enrichment: urgency, suitability and relevance. Pure; never rejects.
//!
//! Suitability = geography 0.30 + domain 0.30 + funding clarity 0.20
//!             + application clarity 0.10 + deadline clarity 0.10,
//! each component awarded in full or not at all.

pub mod relevance;

use chrono::NaiveDate;
use serde_json::{Map, Value};

use crate::model::{EnrichmentResult, ExtractedOpportunity, SourceType, UrgencyLevel};
use crate::vocab;

pub use relevance::{Relevance, RelevanceEngine};

// Weights in hundredths so the sum stays exact.
const W_GEOGRAPHY: u32 = 30;
const W_DOMAIN: u32 = 30;
const W_FUNDING: u32 = 20;
const W_APPLICATION: u32 = 10;
const W_DEADLINE: u32 = 10;

/// Metadata keys surfaced as source signals, per source type.
fn signal_keys(source: SourceType) -> &'static [&'static str] {
    match source {
        SourceType::Rss => &["feed_title"],
        SourceType::Crawl => &["crawl_strategy", "target_type"],
        SourceType::Search => &["rank", "query", "engine"],
    }
}

pub fn days_until(deadline: Option<NaiveDate>, today: NaiveDate) -> Option<i64> {
    deadline.map(|d| (d - today).num_days())
}

/// ≤7 days high, ≤30 medium, otherwise low; no deadline → none.
pub fn urgency_for(days: Option<i64>) -> UrgencyLevel {
    match days {
        None => UrgencyLevel::None,
        Some(d) if d <= 7 => UrgencyLevel::High,
        Some(d) if d <= 30 => UrgencyLevel::Medium,
        Some(_) => UrgencyLevel::Low,
    }
}

/// Components of the suitability score, exposed for diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SuitabilityParts {
    pub geographic: bool,
    pub domain: bool,
    pub funding: bool,
    pub application: bool,
    pub deadline: bool,
}

impl SuitabilityParts {
    pub fn of(opp: &ExtractedOpportunity) -> Self {
        let text = opp.search_text();
        Self {
            geographic: vocab::GEOGRAPHY_RE.is_match(&text),
            domain: !opp.ai_subsectors.is_empty() || vocab::AI_RE.is_match(&text),
            funding: opp.financial.is_known(),
            application: opp.application_process.is_some() || opp.application_url.is_some(),
            deadline: opp.deadline_type.is_some(),
        }
    }

    pub fn score(&self) -> f32 {
        let points = [
            (self.geographic, W_GEOGRAPHY),
            (self.domain, W_DOMAIN),
            (self.funding, W_FUNDING),
            (self.application, W_APPLICATION),
            (self.deadline, W_DEADLINE),
        ]
        .iter()
        .filter(|(hit, _)| *hit)
        .map(|(_, w)| *w)
        .sum::<u32>();
        points as f32 / 100.0
    }
}

pub fn suitability_score(opp: &ExtractedOpportunity) -> f32 {
    SuitabilityParts::of(opp).score()
}

/// Copy source-specific metadata without touching any shared score.
pub fn source_signals(source: SourceType, metadata: &Map<String, Value>) -> Map<String, Value> {
    signal_keys(source)
        .iter()
        .filter_map(|k| metadata.get(*k).map(|v| (k.to_string(), v.clone())))
        .collect()
}

/// Scores opportunities against a fixed reference date.
pub struct Enricher {
    relevance: RelevanceEngine,
    today: NaiveDate,
}

impl Enricher {
    pub fn new(relevance: RelevanceEngine, today: NaiveDate) -> Self {
        Self { relevance, today }
    }

    pub fn today(&self) -> NaiveDate {
        self.today
    }

    pub fn relevance(&self, text: &str) -> Relevance {
        self.relevance.score(text)
    }

    /// Attach an `EnrichmentResult` in place.
    pub fn enrich(&self, opp: &mut ExtractedOpportunity, metadata: &Map<String, Value>) {
        let days = days_until(opp.deadline, self.today);
        let rel = self.relevance.score(&opp.search_text());
        opp.enrichment = Some(EnrichmentResult {
            urgency_level: urgency_for(days),
            days_until_deadline: days,
            suitability_score: suitability_score(opp),
            relevance_score: rel.score.clamp(0.0, 1.0),
            relevance_matches: rel.matched,
            source_signals: source_signals(opp.provenance.source_type, metadata),
        });
    }
}
