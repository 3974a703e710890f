// src/pipeline/stats.rs
use serde::Serialize;
use std::collections::BTreeMap;

use crate::model::SourceType;

/// Per-source counters for one run.
///
/// `processed = accepted + validation_failures + duplicates + errors`; `skipped` items were
/// never pulled because the batch was cancelled. An item whose worker panicked is an error.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SourceStats {
    pub processed: u64,
    /// Enhanced path completed.
    pub extracted: u64,
    /// Enhanced records that carry an enrichment result.
    pub enriched: u64,
    pub fallbacks: u64,
    pub validation_failures: u64,
    pub duplicates: u64,
    pub errors: u64,
    pub accepted: u64,
    pub skipped: u64,
    pub persisted: u64,
    pub persist_failures: u64,
}

impl SourceStats {
    pub fn merge(&mut self, other: &SourceStats) {
        self.processed += other.processed;
        self.extracted += other.extracted;
        self.enriched += other.enriched;
        self.fallbacks += other.fallbacks;
        self.validation_failures += other.validation_failures;
        self.duplicates += other.duplicates;
        self.errors += other.errors;
        self.accepted += other.accepted;
        self.skipped += other.skipped;
        self.persisted += other.persisted;
        self.persist_failures += other.persist_failures;
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PipelineStats {
    pub by_source: BTreeMap<SourceType, SourceStats>,
    /// Sources whose fetch failed outright.
    pub source_errors: u64,
}

impl PipelineStats {
    pub fn entry(&mut self, source: SourceType) -> &mut SourceStats {
        self.by_source.entry(source).or_default()
    }

    pub fn get(&self, source: SourceType) -> SourceStats {
        self.by_source.get(&source).copied().unwrap_or_default()
    }

    /// Order-independent: merging a then b equals merging b then a.
    pub fn merge(&mut self, other: &PipelineStats) {
        for (src, s) in &other.by_source {
            self.entry(*src).merge(s);
        }
        self.source_errors += other.source_errors;
    }

    pub fn totals(&self) -> SourceStats {
        let mut t = SourceStats::default();
        for s in self.by_source.values() {
            t.merge(s);
        }
        t
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stats(src: SourceType, processed: u64, accepted: u64) -> PipelineStats {
        let mut p = PipelineStats::default();
        let e = p.entry(src);
        e.processed = processed;
        e.accepted = accepted;
        p
    }

    #[test]
    fn merge_is_order_independent() {
        let a = stats(SourceType::Rss, 3, 2);
        let b = stats(SourceType::Search, 4, 1);
        let c = stats(SourceType::Rss, 1, 1);

        let mut ab = PipelineStats::default();
        for s in [&a, &b, &c] {
            ab.merge(s);
        }
        let mut ba = PipelineStats::default();
        for s in [&c, &b, &a] {
            ba.merge(s);
        }
        assert_eq!(ab, ba);
        assert_eq!(ab.get(SourceType::Rss).processed, 4);
        assert_eq!(ab.totals().accepted, 4);
        assert_eq!(ab.get(SourceType::Crawl), SourceStats::default());
    }

    #[test]
    fn serializes_with_source_names() {
        let v = serde_json::to_value(stats(SourceType::Crawl, 1, 0)).unwrap();
        assert_eq!(v["by_source"]["crawl"]["processed"], 1);
    }
}
