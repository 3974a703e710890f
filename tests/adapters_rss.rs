// tests/adapters_rss.rs
use funding_pipeline::adapters::{parse_rss, payloads_from_json, SourcePayload};
use funding_pipeline::SourceType;

#[test]
fn fixture_parses_into_feed_entries() {
    let xml = std::fs::read_to_string("tests/fixtures/grants_rss.xml").expect("fixture");
    let entries = parse_rss(&xml, None).unwrap();
    assert_eq!(entries.len(), 4);
    assert!(entries
        .iter()
        .all(|e| e.feed_title == "Africa Innovation Funding Digest"));
    assert_eq!(entries[1].entry_title, "Climate AI Challenge 2025");

    let raw = entries[0].to_raw_item();
    assert_eq!(raw.source_type, SourceType::Rss);
    assert!(raw.body_text.contains("<p>"), "markup is left for extraction");
    assert_eq!(
        raw.published_at.map(|d| d.to_rfc3339()),
        Some("2025-03-03T08:00:00+00:00".to_string())
    );
}

#[test]
fn json_batch_round_trips_through_raw_items() {
    let s = r#"[
        {"kind": "crawl", "url": "https://fund.example/call", "extracted_text": "Open Call\nGrants for AI startups.",
         "crawl_strategy": "sitemap", "target_type": "funder_site", "page_metadata": {"currency": "EUR"}},
        {"kind": "feed", "entry_title": 42}
    ]"#;
    let payloads = payloads_from_json(s).unwrap();
    assert_eq!(payloads.len(), 2);

    let crawl = payloads[0].to_raw_item();
    assert_eq!(crawl.title, "Open Call");
    assert_eq!(crawl.currency_hint(), Some("EUR"));
    assert_eq!(crawl.source_metadata["crawl_strategy"], "sitemap");

    // A malformed feed entry still becomes an (empty) item.
    assert!(matches!(payloads[1], SourcePayload::Feed(_)));
    assert!(payloads[1].to_raw_item().body_text.is_empty());
}

#[test]
fn non_array_batch_is_an_error() {
    assert!(payloads_from_json(r#"{"kind": "feed"}"#).is_err());
}
