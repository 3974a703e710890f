// src/adapters/mod.rs
//! Source adapters: feed entries, crawled pages and search hits → `RawItem`.
//!
//! Adapters never fail on a malformed payload; missing fields come through empty and the
//! pipeline rejects the resulting item.

pub mod crawl;
pub mod feed;
pub mod search;

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::model::RawItem;

pub use crawl::CrawledPage;
pub use feed::{parse_rss, FeedEntry};
pub use search::SearchHit;

/// One adapter input, tagged by `kind` so mixed batches deserialize from JSON.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SourcePayload {
    Feed(FeedEntry),
    Crawl(CrawledPage),
    Search(SearchHit),
}

impl SourcePayload {
    pub fn to_raw_item(&self) -> RawItem {
        match self {
            SourcePayload::Feed(e) => e.to_raw_item(),
            SourcePayload::Crawl(p) => p.to_raw_item(),
            SourcePayload::Search(h) => h.to_raw_item(),
        }
    }

    /// Lenient decode: a known `kind` with bad fields becomes an empty payload of that
    /// kind; an unknown or missing `kind` is `None`.
    pub fn from_value_lenient(v: &Value) -> Option<Self> {
        if let Ok(p) = serde_json::from_value::<SourcePayload>(v.clone()) {
            return Some(p);
        }
        let kind = v.get("kind").and_then(Value::as_str)?;
        tracing::warn!(target: "adapters", kind, "malformed payload, keeping empty item");
        match kind {
            "feed" => Some(SourcePayload::Feed(FeedEntry {
                entry_link: str_field(v, "entry_link"),
                ..Default::default()
            })),
            "crawl" => Some(SourcePayload::Crawl(CrawledPage {
                url: str_field(v, "url"),
                ..Default::default()
            })),
            "search" => Some(SourcePayload::Search(SearchHit {
                link: str_field(v, "link"),
                ..Default::default()
            })),
            _ => None,
        }
    }
}

fn str_field(v: &Value, key: &str) -> String {
    v.get(key)
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string()
}

/// Decode a JSON array of tagged payloads. Entries with an unknown kind are skipped.
pub fn payloads_from_json(s: &str) -> Result<Vec<SourcePayload>> {
    let values: Vec<Value> = serde_json::from_str(s).context("payload batch is not a JSON array")?;
    let total = values.len();
    let out: Vec<SourcePayload> = values
        .iter()
        .filter_map(SourcePayload::from_value_lenient)
        .collect();
    if out.len() < total {
        tracing::warn!(
            target: "adapters",
            skipped = total - out.len(),
            "payloads without a known kind"
        );
    }
    Ok(out)
}

/// Something that yields a batch of payloads per run.
#[async_trait]
pub trait PayloadSource: Send + Sync {
    async fn fetch_batch(&self) -> Result<Vec<SourcePayload>>;
    fn name(&self) -> &str;
}

/// A fixed, in-memory batch.
pub struct StaticSource {
    name: String,
    payloads: Vec<SourcePayload>,
}

impl StaticSource {
    pub fn new(name: impl Into<String>, payloads: Vec<SourcePayload>) -> Self {
        Self {
            name: name.into(),
            payloads,
        }
    }
}

#[async_trait]
impl PayloadSource for StaticSource {
    async fn fetch_batch(&self) -> Result<Vec<SourcePayload>> {
        Ok(self.payloads.clone())
    }

    fn name(&self) -> &str {
        &self.name
    }
}

/// An RSS 2.0 document held in memory, parsed on every fetch.
pub struct RssDocumentSource {
    name: String,
    xml: String,
    feed_title: Option<String>,
}

impl RssDocumentSource {
    pub fn new(name: impl Into<String>, xml: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            xml: xml.into(),
            feed_title: None,
        }
    }

    pub fn with_feed_title(mut self, title: impl Into<String>) -> Self {
        self.feed_title = Some(title.into());
        self
    }
}

#[async_trait]
impl PayloadSource for RssDocumentSource {
    async fn fetch_batch(&self) -> Result<Vec<SourcePayload>> {
        let entries = parse_rss(&self.xml, self.feed_title.as_deref())
            .with_context(|| format!("rss source {}", self.name))?;
        Ok(entries.into_iter().map(SourcePayload::Feed).collect())
    }

    fn name(&self) -> &str {
        &self.name
    }
}
