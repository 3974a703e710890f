// src/pipeline/mod.rs
//! Orchestrator: adapters → extraction → enrichment → validation → dedup → sink.
//!
//! Per-item stages run as a parallel map over scoped worker threads. Dedup and stats are
//! reduced afterwards by one owner in input order, so "first occurrence wins" does not
//! depend on scheduling.

pub mod sink;
pub mod stats;

use chrono::NaiveDate;
use metrics::{counter, gauge};
use serde::Serialize;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use crate::adapters::PayloadSource;
use crate::config::EtlConfig;
use crate::dedup::DedupIndex;
use crate::enrich::{Enricher, RelevanceEngine};
use crate::error::{ItemFault, Result};
use crate::extract::{extract, normalized_body};
use crate::model::{
    ExtractedOpportunity, FinancialDisclosure, ProcessingPath, RawItem, SourceType,
};
use crate::telemetry::ensure_metrics_described;
use crate::validate::{
    apply_warnings, currency_warning, validate_required, RejectReason, ValidationResult,
    ValidationWarning, Validator,
};

pub use sink::{MemorySink, OpportunitySink};
pub use stats::{PipelineStats, SourceStats};

/// Batch-level cancellation. Workers stop pulling new items; in-flight items finish.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Result of one item's trip through the per-item stages, before dedup.
#[derive(Debug)]
enum ItemOutcome {
    Passed {
        opp: ExtractedOpportunity,
        warnings: Vec<ValidationWarning>,
        fell_back: bool,
    },
    Rejected {
        url: String,
        reasons: Vec<RejectReason>,
        fell_back: bool,
        enriched: bool,
    },
    Errored {
        url: String,
        fault: ItemFault,
    },
}

/// An item the quality gate turned away, with every failing rule.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Rejection {
    pub source_type: SourceType,
    pub url: String,
    pub reasons: Vec<RejectReason>,
}

/// An accepted record that passed with warnings.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Flagged {
    pub source_type: SourceType,
    pub url: String,
    pub warnings: Vec<ValidationWarning>,
}

#[derive(Debug, Default)]
pub struct BatchOutcome {
    /// Accepted, deduplicated records in input order.
    pub accepted: Vec<ExtractedOpportunity>,
    pub rejected: Vec<Rejection>,
    pub flagged: Vec<Flagged>,
    pub stats: PipelineStats,
}

pub struct Pipeline {
    config: EtlConfig,
    enricher: Enricher,
    validator: Validator,
}

impl Pipeline {
    /// Fails only on misconfiguration.
    pub fn new(config: EtlConfig, relevance: RelevanceEngine, today: NaiveDate) -> Result<Self> {
        config.validate()?;
        let validator = Validator {
            min_relevance_score: config.min_relevance_score,
            min_description_length: config.min_description_length,
            today,
        };
        Ok(Self {
            config,
            enricher: Enricher::new(relevance, today),
            validator,
        })
    }

    /// Config and relevance vocabulary from their default locations.
    pub fn from_env(today: NaiveDate) -> Result<Self> {
        let config = EtlConfig::load_default()?;
        let relevance = RelevanceEngine::from_env()?;
        Self::new(config, relevance, today)
    }

    pub fn config(&self) -> &EtlConfig {
        &self.config
    }

    pub fn today(&self) -> NaiveDate {
        self.enricher.today()
    }

    fn extract_and_enrich(&self, raw: &RawItem) -> ExtractedOpportunity {
        let mut opp = extract(raw);
        if self.config.enable_enrichment {
            self.enricher.enrich(&mut opp, &raw.source_metadata);
        }
        opp
    }

    /// Enhanced path for one item. Every fault is handed to the legacy transform.
    fn enhanced<F>(
        &self,
        raw: &RawItem,
        stage: F,
    ) -> std::result::Result<ExtractedOpportunity, ItemFault>
    where
        F: FnOnce(&RawItem) -> ExtractedOpportunity,
    {
        if normalized_body(raw).is_empty() {
            return Err(ItemFault::EmptyBody);
        }
        let opp = catch_unwind(AssertUnwindSafe(|| stage(raw)))
            .map_err(|payload| ItemFault::Panicked(panic_message(payload.as_ref())))?;
        check_finite(&opp)?;
        Ok(opp)
    }

    fn legacy(&self, raw: &RawItem) -> ExtractedOpportunity {
        ExtractedOpportunity::minimal(raw, ProcessingPath::Legacy)
    }

    fn process_item(&self, raw: &RawItem) -> ItemOutcome {
        self.process_item_with(raw, |r| self.extract_and_enrich(r))
    }

    fn process_item_with<F>(&self, raw: &RawItem, stage: F) -> ItemOutcome
    where
        F: FnOnce(&RawItem) -> ExtractedOpportunity,
    {
        let (mut opp, fell_back) = if !self.config.enable_extraction {
            (self.legacy(raw), false)
        } else {
            match self.enhanced(raw, stage) {
                Ok(opp) => (opp, false),
                Err(fault) if self.config.enable_fallback => {
                    tracing::warn!(
                        target: "pipeline",
                        url = %raw.url,
                        source = %raw.source_type,
                        %fault,
                        "enhanced path failed, using legacy transform"
                    );
                    (self.legacy(raw), true)
                }
                Err(fault) => {
                    return ItemOutcome::Errored {
                        url: raw.url.clone(),
                        fault,
                    }
                }
            }
        };

        let gated = opp.provenance.processing_path == ProcessingPath::Enhanced
            && self.config.enable_validation;
        let mut verdict: ValidationResult = if gated {
            self.validator.validate(&opp)
        } else {
            validate_required(&opp)
        };
        if !gated {
            verdict.warnings.extend(currency_warning(&opp));
        }

        if !verdict.is_accepted() {
            return ItemOutcome::Rejected {
                enriched: opp.enrichment.is_some(),
                url: opp.source_url,
                reasons: verdict.reasons,
                fell_back,
            };
        }

        for w in &verdict.warnings {
            tracing::debug!(target: "pipeline", url = %opp.source_url, warning = %w, "validation warning");
        }
        apply_warnings(&mut opp, &verdict.warnings);
        ItemOutcome::Passed {
            opp,
            warnings: verdict.warnings,
            fell_back,
        }
    }

    /// Parallel map over `workers` scoped threads. `None` marks items never pulled.
    fn map_items(&self, items: &[RawItem], cancel: &CancelFlag) -> Vec<Option<ItemOutcome>> {
        let workers = self.config.workers.min(items.len()).max(1);
        let next = AtomicUsize::new(0);
        let next = &next;

        let parts: Vec<Vec<(usize, ItemOutcome)>> = std::thread::scope(|s| {
            let handles: Vec<_> = (0..workers)
                .map(|_| {
                    s.spawn(move || {
                        let mut done = Vec::new();
                        while !cancel.is_cancelled() {
                            let i = next.fetch_add(1, Ordering::SeqCst);
                            let Some(raw) = items.get(i) else { break };
                            done.push((i, contain_panic(&raw.url, || self.process_item(raw))));
                        }
                        done
                    })
                })
                .collect();
            handles
                .into_iter()
                .map(|h| {
                    h.join().unwrap_or_else(|_| {
                        tracing::error!(target: "pipeline", "worker thread panicked");
                        Vec::new()
                    })
                })
                .collect()
        });

        let mut slots: Vec<Option<ItemOutcome>> = items.iter().map(|_| None).collect();
        for (i, outcome) in parts.into_iter().flatten() {
            slots[i] = Some(outcome);
        }
        slots
    }

    /// Run a batch of raw items. Never fails; per-item problems land in the stats.
    pub fn process_batch(&self, items: Vec<RawItem>, cancel: &CancelFlag) -> BatchOutcome {
        ensure_metrics_described();
        let slots = self.map_items(&items, cancel);

        let mut index = DedupIndex::new();
        let mut out = BatchOutcome::default();

        for (raw, slot) in items.iter().zip(slots) {
            let src = raw.source_type;
            let label = src.as_str();
            let Some(outcome) = slot else {
                out.stats.entry(src).skipped += 1;
                continue;
            };
            out.stats.entry(src).processed += 1;
            counter!("etl_items_processed_total", "source" => label).increment(1);

            match outcome {
                ItemOutcome::Errored { url, fault } => {
                    tracing::warn!(
                        target: "pipeline",
                        %url,
                        source = label,
                        %fault,
                        "item dropped"
                    );
                    out.stats.entry(src).errors += 1;
                    counter!("etl_item_errors_total", "source" => label).increment(1);
                }
                ItemOutcome::Rejected {
                    url,
                    reasons,
                    fell_back,
                    enriched,
                } => {
                    let text: Vec<String> = reasons.iter().map(ToString::to_string).collect();
                    tracing::info!(
                        target: "pipeline",
                        %url,
                        source = label,
                        reasons = ?text,
                        "rejected"
                    );
                    self.count_path(&mut out.stats, src, fell_back, enriched);
                    out.stats.entry(src).validation_failures += 1;
                    counter!("etl_validation_failures_total", "source" => label).increment(1);
                    out.rejected.push(Rejection {
                        source_type: src,
                        url,
                        reasons,
                    });
                }
                ItemOutcome::Passed {
                    opp,
                    warnings,
                    fell_back,
                } => {
                    let enriched = opp.enrichment.is_some();
                    self.count_path(&mut out.stats, src, fell_back, enriched);
                    if self.config.enable_dedup {
                        if let Err(kind) = index.check_and_insert(&opp) {
                            tracing::debug!(
                                target: "pipeline",
                                url = %opp.source_url,
                                duplicate = ?kind,
                                "duplicate dropped"
                            );
                            out.stats.entry(src).duplicates += 1;
                            counter!("etl_duplicates_total", "source" => label).increment(1);
                            continue;
                        }
                    }
                    out.stats.entry(src).accepted += 1;
                    if !warnings.is_empty() {
                        out.flagged.push(Flagged {
                            source_type: src,
                            url: opp.source_url.clone(),
                            warnings,
                        });
                    }
                    out.accepted.push(opp);
                }
            }
        }

        let t = out.stats.totals();
        tracing::info!(
            target: "pipeline",
            processed = t.processed,
            accepted = t.accepted,
            rejected = t.validation_failures,
            duplicates = t.duplicates,
            fallbacks = t.fallbacks,
            errors = t.errors,
            skipped = t.skipped,
            "batch done"
        );
        out
    }

    fn count_path(
        &self,
        stats: &mut PipelineStats,
        src: SourceType,
        fell_back: bool,
        enriched: bool,
    ) {
        let label = src.as_str();
        if fell_back {
            stats.entry(src).fallbacks += 1;
            counter!("etl_fallbacks_total", "source" => label).increment(1);
        } else if self.config.enable_extraction {
            stats.entry(src).extracted += 1;
            counter!("etl_items_extracted_total", "source" => label).increment(1);
        }
        if enriched {
            stats.entry(src).enriched += 1;
            counter!("etl_items_enriched_total", "source" => label).increment(1);
        }
    }

    /// Fetch from every source, process the combined batch, persist the survivors.
    /// A failing source is logged and counted; the others still run.
    pub async fn run(
        &self,
        sources: &[Box<dyn PayloadSource>],
        sink: &dyn OpportunitySink,
        cancel: &CancelFlag,
    ) -> PipelineStats {
        ensure_metrics_described();

        let mut items = Vec::new();
        let mut source_errors = 0u64;
        for src in sources {
            match src.fetch_batch().await {
                Ok(payloads) => {
                    tracing::debug!(target: "pipeline", source = src.name(), count = payloads.len(), "fetched");
                    items.extend(payloads.iter().map(|p| p.to_raw_item()));
                }
                Err(e) => {
                    tracing::warn!(target: "pipeline", error = ?e, source = src.name(), "source error");
                    counter!("etl_source_errors_total").increment(1);
                    source_errors += 1;
                }
            }
        }

        let BatchOutcome {
            accepted,
            mut stats,
            ..
        } = self.process_batch(items, cancel);
        stats.source_errors += source_errors;

        for opp in accepted {
            let src = opp.provenance.source_type;
            let label = src.as_str();
            let url = opp.source_url.clone();
            match sink.persist(opp).await {
                Ok(()) => {
                    stats.entry(src).persisted += 1;
                    counter!("etl_items_persisted_total", "source" => label).increment(1);
                }
                Err(e) => {
                    tracing::warn!(target: "pipeline", error = ?e, %url, "persist failed");
                    stats.entry(src).persist_failures += 1;
                    counter!("etl_persist_failures_total", "source" => label).increment(1);
                }
            }
        }

        let now = chrono::Utc::now().timestamp().max(0);
        gauge!("etl_last_run_ts").set(now as f64);
        stats
    }
}

fn check_finite(opp: &ExtractedOpportunity) -> std::result::Result<(), ItemFault> {
    let amounts: Vec<(&'static str, f64)> = match &opp.financial {
        FinancialDisclosure::TotalPool { amount, .. }
        | FinancialDisclosure::ExactPerProject { amount, .. } => {
            vec![("financial.amount", *amount)]
        }
        FinancialDisclosure::RangePerProject { min, max, .. } => {
            vec![("financial.min", *min), ("financial.max", *max)]
        }
        FinancialDisclosure::Unknown => Vec::new(),
    };
    if let Some((field, _)) = amounts.into_iter().find(|(_, v)| !v.is_finite()) {
        return Err(ItemFault::NonFiniteScore { field });
    }
    if let Some(en) = &opp.enrichment {
        if !en.relevance_score.is_finite() {
            return Err(ItemFault::NonFiniteScore {
                field: "relevance_score",
            });
        }
        if !en.suitability_score.is_finite() {
            return Err(ItemFault::NonFiniteScore {
                field: "suitability_score",
            });
        }
    }
    Ok(())
}

/// Run one item's stages; a panic anywhere in them drops only that item.
fn contain_panic<F>(url: &str, f: F) -> ItemOutcome
where
    F: FnOnce() -> ItemOutcome,
{
    catch_unwind(AssertUnwindSafe(f)).unwrap_or_else(|payload| ItemOutcome::Errored {
        url: url.to_string(),
        fault: ItemFault::Panicked(panic_message(payload.as_ref())),
    })
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{RawItem, SourceType};

    fn pipeline(config: EtlConfig) -> Pipeline {
        let today = NaiveDate::from_ymd_opt(2025, 3, 1).unwrap();
        Pipeline::new(config, RelevanceEngine::builtin().unwrap(), today).unwrap()
    }

    #[test]
    fn non_finite_amounts_are_faults() {
        let raw = RawItem {
            source_type: SourceType::Crawl,
            title: "t".into(),
            body_text: "b".into(),
            url: "https://example.org".into(),
            published_at: None,
            source_metadata: Default::default(),
        };
        let mut opp = ExtractedOpportunity::minimal(&raw, ProcessingPath::Enhanced);
        assert!(check_finite(&opp).is_ok());
        opp.financial = FinancialDisclosure::RangePerProject {
            min: f64::NAN,
            max: 10.0,
            currency: "USD".into(),
        };
        assert_eq!(
            check_finite(&opp),
            Err(ItemFault::NonFiniteScore {
                field: "financial.min"
            })
        );
    }

    #[test]
    fn panic_payloads_become_messages() {
        let err = catch_unwind(|| panic!("boom {}", 7)).unwrap_err();
        assert_eq!(panic_message(err.as_ref()), "boom 7");
        let err = catch_unwind(|| std::panic::panic_any(42u8)).unwrap_err();
        assert_eq!(panic_message(err.as_ref()), "unknown panic");
    }

    fn complete_item() -> RawItem {
        RawItem {
            source_type: SourceType::Search,
            title: "Africa AI Innovation Fund".into(),
            body_text: "Grants for African startups building machine learning tools.".into(),
            url: "https://example.org/fund".into(),
            published_at: None,
            source_metadata: Default::default(),
        }
    }

    #[test]
    fn panicking_extractor_falls_back_to_legacy() {
        let p = pipeline(EtlConfig::default());
        let outcome = p.process_item_with(&complete_item(), |_| panic!("extractor bug"));
        match outcome {
            ItemOutcome::Passed { opp, fell_back, .. } => {
                assert!(fell_back);
                assert_eq!(opp.provenance.processing_path, ProcessingPath::Legacy);
                assert!(opp.enrichment.is_none());
                assert_eq!(opp.source_url, "https://example.org/fund");
            }
            other => panic!("expected a legacy record, got {other:?}"),
        }
    }

    #[test]
    fn panicking_extractor_without_fallback_is_an_error() {
        let p = pipeline(EtlConfig {
            enable_fallback: false,
            ..Default::default()
        });
        let outcome = p.process_item_with(&complete_item(), |_| panic!("extractor bug"));
        match outcome {
            ItemOutcome::Errored { fault, .. } => {
                assert_eq!(fault, ItemFault::Panicked("extractor bug".into()));
            }
            other => panic!("expected an error, got {other:?}"),
        }
    }

    #[test]
    fn panic_outside_the_enhanced_guard_is_an_item_error() {
        let outcome = contain_panic("https://example.org/x", || panic!("validator bug"));
        match outcome {
            ItemOutcome::Errored { url, fault } => {
                assert_eq!(url, "https://example.org/x");
                assert_eq!(fault, ItemFault::Panicked("validator bug".into()));
            }
            other => panic!("expected an error, got {other:?}"),
        }
    }

    #[test]
    fn misconfiguration_is_refused() {
        let cfg = EtlConfig {
            workers: 0,
            ..Default::default()
        };
        let today = NaiveDate::from_ymd_opt(2025, 3, 1).unwrap();
        assert!(Pipeline::new(cfg, RelevanceEngine::builtin().unwrap(), today).is_err());
    }

    #[test]
    fn empty_batch_is_fine() {
        let out = pipeline(EtlConfig::default()).process_batch(Vec::new(), &CancelFlag::new());
        assert!(out.accepted.is_empty());
        assert_eq!(out.stats, PipelineStats::default());
    }
}
