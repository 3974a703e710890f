// tests/pipeline_batch.rs
use chrono::NaiveDate;
use funding_pipeline::model::{ProcessingPath, UrgencyLevel};
use funding_pipeline::validate::{RejectReason, ValidationWarning};
use funding_pipeline::{
    CancelFlag, EtlConfig, FinancialDisclosure, Pipeline, RawItem, RelevanceEngine, SourceType,
};

const RELEVANT_BODY: &str = "The Africa AI Innovation Fund offers grants to African startups \
building machine learning and NLP tools. Each selected project will receive exactly $50,000. \
Eligible applicants must submit proposals online.";

fn today() -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 3, 1).unwrap()
}

fn pipeline(config: EtlConfig) -> Pipeline {
    Pipeline::new(config, RelevanceEngine::builtin().unwrap(), today()).unwrap()
}

fn item(source_type: SourceType, url: &str, title: &str, body: &str) -> RawItem {
    RawItem {
        source_type,
        title: title.to_string(),
        body_text: body.to_string(),
        url: url.to_string(),
        published_at: None,
        source_metadata: Default::default(),
    }
}

fn relevant(url: &str) -> RawItem {
    item(SourceType::Rss, url, "Africa AI Innovation Fund", RELEVANT_BODY)
}

#[test]
fn relevant_item_is_accepted_and_scored() {
    let out = pipeline(EtlConfig::default())
        .process_batch(vec![relevant("https://example.org/a")], &CancelFlag::new());
    assert_eq!(out.accepted.len(), 1, "{:?}", out.rejected);
    let opp = &out.accepted[0];
    assert_eq!(opp.provenance.processing_path, ProcessingPath::Enhanced);
    assert_eq!(
        opp.financial,
        FinancialDisclosure::ExactPerProject {
            amount: 50_000.0,
            currency: "USD".into()
        }
    );
    let en = opp.enrichment.as_ref().unwrap();
    assert!(en.relevance_score >= 0.6, "{en:?}");
    assert!((0.0..=1.0).contains(&en.suitability_score));

    let s = out.stats.get(SourceType::Rss);
    assert_eq!((s.processed, s.extracted, s.enriched, s.accepted), (1, 1, 1, 1));
    assert!(out.flagged.is_empty());
}

#[test]
fn urgency_follows_days_to_deadline() {
    let cases = [
        ("Deadline: March 6, 2025.", UrgencyLevel::High, Some(5)),
        ("Deadline: March 21, 2025.", UrgencyLevel::Medium, Some(20)),
        ("Deadline: May 30, 2025.", UrgencyLevel::Low, Some(90)),
        ("", UrgencyLevel::None, None),
    ];
    let p = pipeline(EtlConfig::default());
    for (i, (deadline, level, days)) in cases.into_iter().enumerate() {
        let body = format!("{RELEVANT_BODY} {deadline}");
        let raw = item(
            SourceType::Search,
            &format!("https://example.org/u{i}"),
            "Africa AI Innovation Fund",
            &body,
        );
        let out = p.process_batch(vec![raw], &CancelFlag::new());
        assert_eq!(out.accepted.len(), 1, "{deadline}: {:?}", out.rejected);
        let en = out.accepted[0].enrichment.as_ref().unwrap();
        assert_eq!(en.urgency_level, level, "{deadline}");
        assert_eq!(en.days_until_deadline, days, "{deadline}");
    }
}

#[test]
fn same_url_twice_is_one_record_and_one_duplicate() {
    let mut second = relevant("https://www.example.org/a/?utm_source=feed");
    second.title = "Africa AI Innovation Fund (repost)".into();
    let out = pipeline(EtlConfig::default()).process_batch(
        vec![relevant("https://example.org/a"), second],
        &CancelFlag::new(),
    );
    assert_eq!(out.accepted.len(), 1);
    assert_eq!(out.accepted[0].title, "Africa AI Innovation Fund");
    let s = out.stats.get(SourceType::Rss);
    assert_eq!(s.duplicates, 1);
    assert_eq!(s.validation_failures, 0);
}

#[test]
fn same_content_under_another_url_is_a_duplicate() {
    let out = pipeline(EtlConfig::default()).process_batch(
        vec![relevant("https://example.org/a"), relevant("https://mirror.example.net/x")],
        &CancelFlag::new(),
    );
    assert_eq!(out.accepted.len(), 1);
    assert_eq!(out.stats.totals().duplicates, 1);
}

#[test]
fn dedup_can_be_switched_off() {
    let cfg = EtlConfig {
        enable_dedup: false,
        ..Default::default()
    };
    let out = pipeline(cfg).process_batch(
        vec![relevant("https://example.org/a"), relevant("https://example.org/a")],
        &CancelFlag::new(),
    );
    assert_eq!(out.accepted.len(), 2);
}

#[test]
fn missing_source_url_is_cited() {
    let out = pipeline(EtlConfig::default()).process_batch(vec![relevant("  ")], &CancelFlag::new());
    assert!(out.accepted.is_empty());
    assert_eq!(out.rejected.len(), 1);
    assert!(out.rejected[0]
        .reasons
        .iter()
        .any(|r| r.to_string().contains("source_url")));
}

#[test]
fn low_relevance_alone_is_cited() {
    let raw = item(
        SourceType::Crawl,
        "https://example.org/news/party",
        "Office party",
        "Our team celebrated the end of the quarter with cake and music in the garden.",
    );
    let out = pipeline(EtlConfig::default()).process_batch(vec![raw], &CancelFlag::new());
    assert_eq!(out.rejected.len(), 1);
    let reasons = &out.rejected[0].reasons;
    assert_eq!(reasons.len(), 1, "{reasons:?}");
    assert!(matches!(reasons[0], RejectReason::LowRelevance { .. }));
    assert!(reasons[0].to_string().contains("relevance"));
}

#[test]
fn every_failing_rule_is_reported() {
    let raw = item(SourceType::Search, "ftp://example.org/x", "Party", "Cake.");
    let out = pipeline(EtlConfig::default()).process_batch(vec![raw], &CancelFlag::new());
    let reasons = &out.rejected[0].reasons;
    assert!(reasons.iter().any(|r| matches!(r, RejectReason::InvalidUrl { .. })));
    assert!(reasons.iter().any(|r| matches!(r, RejectReason::LowRelevance { .. })));
    assert!(reasons
        .iter()
        .any(|r| matches!(r, RejectReason::DescriptionTooShort { .. })));
}

#[test]
fn unknown_money_alone_is_not_a_rejection() {
    let raw = item(
        SourceType::Rss,
        "https://example.org/no-money",
        "Africa AI Innovation Fund",
        "The Africa AI Innovation Fund offers grants to African startups building machine \
         learning and NLP tools. Eligible applicants must submit proposals online.",
    );
    let out = pipeline(EtlConfig::default()).process_batch(vec![raw], &CancelFlag::new());
    assert_eq!(out.accepted.len(), 1, "{:?}", out.rejected);
    assert_eq!(out.accepted[0].financial, FinancialDisclosure::Unknown);
}

#[test]
fn unrecognized_currency_falls_back_to_usd() {
    let mut raw = relevant("https://example.org/aud");
    raw.source_metadata
        .insert("currency".into(), serde_json::json!("XYZ"));
    let out = pipeline(EtlConfig::default()).process_batch(vec![raw], &CancelFlag::new());
    assert_eq!(out.accepted.len(), 1, "{:?}", out.rejected);
    assert_eq!(out.accepted[0].financial.currency(), Some("USD"));
    assert_eq!(
        out.flagged[0].warnings,
        vec![ValidationWarning::UnrecognizedCurrency {
            found: "XYZ".into()
        }]
    );
}

#[test]
fn unrecognized_currency_is_replaced_without_the_gate() {
    let cfg = EtlConfig {
        enable_validation: false,
        ..Default::default()
    };
    let mut raw = relevant("https://example.org/xyz");
    raw.source_metadata
        .insert("currency".into(), serde_json::json!("XYZ"));
    let out = pipeline(cfg).process_batch(vec![raw], &CancelFlag::new());
    assert_eq!(out.accepted.len(), 1);
    assert_eq!(out.accepted[0].financial.currency(), Some("USD"));
}

#[test]
fn past_deadline_is_accepted_with_a_warning() {
    let body = format!("{RELEVANT_BODY} Deadline: February 10, 2025.");
    let raw = item(
        SourceType::Rss,
        "https://example.org/late",
        "Africa AI Innovation Fund",
        &body,
    );
    let out = pipeline(EtlConfig::default()).process_batch(vec![raw], &CancelFlag::new());
    assert_eq!(out.accepted.len(), 1, "{:?}", out.rejected);
    let en = out.accepted[0].enrichment.as_ref().unwrap();
    assert_eq!(en.urgency_level, UrgencyLevel::High);
    assert_eq!(en.days_until_deadline, Some(-19));
    assert_eq!(out.flagged.len(), 1);
    assert_eq!(
        out.flagged[0].warnings,
        vec![ValidationWarning::DeadlinePassed {
            deadline: NaiveDate::from_ymd_opt(2025, 2, 10).unwrap()
        }]
    );
}

#[test]
fn empty_body_falls_back_to_legacy() {
    let raw = item(SourceType::Crawl, "https://example.org/empty", "Title only", "   ");
    let out = pipeline(EtlConfig::default()).process_batch(vec![raw], &CancelFlag::new());
    let s = out.stats.get(SourceType::Crawl);
    assert_eq!((s.fallbacks, s.extracted, s.validation_failures), (1, 0, 1));
    assert_eq!(
        out.rejected[0].reasons,
        vec![RejectReason::MissingField {
            field: "description"
        }]
    );
}

#[test]
fn fault_without_fallback_is_an_error() {
    let cfg = EtlConfig {
        enable_fallback: false,
        ..Default::default()
    };
    let raw = item(SourceType::Crawl, "https://example.org/empty", "Title only", "");
    let out = pipeline(cfg).process_batch(vec![raw], &CancelFlag::new());
    let s = out.stats.get(SourceType::Crawl);
    assert_eq!((s.processed, s.errors, s.fallbacks), (1, 1, 0));
    assert!(out.rejected.is_empty());
}

#[test]
fn extraction_off_uses_legacy_path_for_everything() {
    let cfg = EtlConfig {
        enable_extraction: false,
        ..Default::default()
    };
    let raw = item(
        SourceType::Rss,
        "https://example.org/news/party",
        "Office party",
        "Cake.",
    );
    let out = pipeline(cfg).process_batch(vec![raw], &CancelFlag::new());
    assert_eq!(out.accepted.len(), 1);
    let opp = &out.accepted[0];
    assert_eq!(opp.provenance.processing_path, ProcessingPath::Legacy);
    assert_eq!(opp.financial, FinancialDisclosure::Unknown);
    assert!(opp.enrichment.is_none());
    let s = out.stats.get(SourceType::Rss);
    assert_eq!((s.extracted, s.enriched, s.fallbacks), (0, 0, 0));
}

#[test]
fn validation_off_still_checks_required_fields() {
    let cfg = EtlConfig {
        enable_validation: false,
        ..Default::default()
    };
    let p = pipeline(cfg);
    let low = item(SourceType::Rss, "https://example.org/p", "Office party", "Cake.");
    let missing = item(SourceType::Rss, "", "Office party", "Cake and music.");
    let out = p.process_batch(vec![low, missing], &CancelFlag::new());
    assert_eq!(out.accepted.len(), 1);
    assert_eq!(out.rejected.len(), 1);
    assert_eq!(
        out.rejected[0].reasons,
        vec![RejectReason::MissingField {
            field: "source_url"
        }]
    );
}

#[test]
fn enrichment_off_skips_the_relevance_rule() {
    let cfg = EtlConfig {
        enable_enrichment: false,
        ..Default::default()
    };
    let raw = item(
        SourceType::Rss,
        "https://example.org/news/party",
        "Office party",
        "Our team celebrated the end of the quarter with cake and music in the garden.",
    );
    let out = pipeline(cfg).process_batch(vec![raw], &CancelFlag::new());
    assert_eq!(out.accepted.len(), 1);
    assert!(out.accepted[0].enrichment.is_none());
}

#[test]
fn cancelled_batch_reports_skipped_items() {
    let cancel = CancelFlag::new();
    cancel.cancel();
    let out = pipeline(EtlConfig::default()).process_batch(
        vec![relevant("https://example.org/a"), relevant("https://example.org/b")],
        &cancel,
    );
    assert!(out.accepted.is_empty());
    let s = out.stats.get(SourceType::Rss);
    assert_eq!((s.processed, s.skipped), (0, 2));
}

#[test]
fn worker_count_does_not_change_the_result() {
    let batch: Vec<RawItem> = (0..24)
        .map(|i| {
            if i % 3 == 0 {
                relevant("https://example.org/shared")
            } else {
                let mut r = relevant(&format!("https://example.org/{i}"));
                r.title = format!("Africa AI Innovation Fund call {i}");
                r
            }
        })
        .collect();

    let one = pipeline(EtlConfig::default()).process_batch(batch.clone(), &CancelFlag::new());
    let many = pipeline(EtlConfig {
        workers: 4,
        ..Default::default()
    })
    .process_batch(batch, &CancelFlag::new());

    assert_eq!(one.accepted, many.accepted);
    assert_eq!(one.stats, many.stats);
    assert_eq!(one.stats.totals().duplicates, 7);
}
