// src/extract/mod.rs
//! Pattern extraction: `RawItem` → `ExtractedOpportunity`.
//!
//! Extraction never fails. Missing patterns leave fields empty (`Unknown`, `None`, `[]`),
//! which is not a rejection reason on its own.

pub mod deadline;
pub mod money;
pub mod targeting;

use metrics::histogram;

use crate::model::{ExtractedOpportunity, ProcessingPath, RawItem};
use crate::text::normalize_text;

pub use deadline::{extract_deadline, DeadlineInfo};
pub use money::{extract_disclosure, find_amounts, is_recognized_currency, MoneyMatch};
pub use targeting::{extract_targeting, Targeting};

/// Run every extractor over one raw item. Deterministic for identical input.
pub fn extract(raw: &RawItem) -> ExtractedOpportunity {
    let t0 = std::time::Instant::now();

    let mut opp = ExtractedOpportunity::minimal(raw, ProcessingPath::Enhanced);
    let hint = raw.currency_hint();

    // Title carries money/deadline phrases often enough to read both.
    let text = opp.search_text();
    opp.financial = extract_disclosure(&text, hint);

    let dl = extract_deadline(&text);
    opp.deadline = dl.date;
    opp.deadline_type = dl.kind;

    let t = extract_targeting(&opp.title, &opp.description);
    opp.target_audience = t.target_audience;
    opp.ai_subsectors = t.ai_subsectors;
    opp.development_stage = t.development_stage;
    opp.collaboration_required = t.collaboration_required;
    opp.gender_focused = t.gender_focused;
    opp.youth_focused = t.youth_focused;
    opp.reporting_requirements = t.reporting_requirements;
    opp.selection_criteria = t.selection_criteria;
    opp.application_process = t.application_process;
    opp.application_url = t.application_url;

    histogram!("etl_extract_ms").record(t0.elapsed().as_secs_f64() * 1_000.0);
    tracing::debug!(
        target: "extract",
        url = %opp.source_url,
        financial = ?opp.financial,
        deadline = ?opp.deadline,
        "extracted"
    );
    opp
}

/// Normalized body used by extraction, exposed for adapters that pre-check emptiness.
pub fn normalized_body(raw: &RawItem) -> String {
    normalize_text(&raw.body_text)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{FinancialDisclosure, SourceType};

    fn raw(title: &str, body: &str) -> RawItem {
        RawItem {
            source_type: SourceType::Rss,
            title: title.into(),
            body_text: body.into(),
            url: "https://example.org/call".into(),
            published_at: None,
            source_metadata: Default::default(),
        }
    }

    #[test]
    fn extraction_is_idempotent() {
        let r = raw(
            "AI for Climate grants",
            "Grants ranging from $25,000 to $100,000 for African startups. Deadline: May 1, 2025.",
        );
        assert_eq!(extract(&r), extract(&r));
    }

    #[test]
    fn currency_hint_comes_from_metadata() {
        let mut r = raw("Call", "Each project will receive exactly $20,000.");
        r.source_metadata
            .insert("currency".into(), serde_json::json!("AUD"));
        assert_eq!(
            extract(&r).financial,
            FinancialDisclosure::ExactPerProject {
                amount: 20_000.0,
                currency: "AUD".into()
            }
        );
    }
}
