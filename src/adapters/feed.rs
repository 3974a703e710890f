// src/adapters/feed.rs
//! Feed entries, plus a small RSS 2.0 reader that turns a document into entries.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use metrics::histogram;
use quick_xml::de::from_str;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::model::{RawItem, SourceType};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FeedEntry {
    pub feed_title: String,
    pub entry_title: String,
    pub entry_summary: String,
    pub entry_link: String,
    /// RFC 2822 (RSS) or RFC 3339 (Atom).
    pub published: Option<String>,
}

pub fn parse_published(ts: &str) -> Option<DateTime<Utc>> {
    let ts = ts.trim();
    DateTime::parse_from_rfc2822(ts)
        .or_else(|_| DateTime::parse_from_rfc3339(ts))
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

impl FeedEntry {
    pub fn to_raw_item(&self) -> RawItem {
        let mut md = Map::new();
        let feed_title = self.feed_title.trim();
        if !feed_title.is_empty() {
            md.insert("feed_title".into(), Value::from(feed_title));
            md.insert("source_name".into(), Value::from(feed_title));
        }
        RawItem {
            source_type: SourceType::Rss,
            title: self.entry_title.clone(),
            body_text: self.entry_summary.clone(),
            url: self.entry_link.trim().to_string(),
            published_at: self.published.as_deref().and_then(parse_published),
            source_metadata: md,
        }
    }
}

#[derive(Debug, Deserialize)]
struct Rss {
    channel: Channel,
}
#[derive(Debug, Deserialize)]
struct Channel {
    title: Option<String>,
    #[serde(rename = "item", default)]
    item: Vec<Item>,
}
#[derive(Debug, Deserialize)]
struct Item {
    title: Option<String>,
    link: Option<String>,
    #[serde(rename = "pubDate")]
    pub_date: Option<String>,
    description: Option<String>,
}

/// Parse an RSS 2.0 document. `feed_title` overrides the channel title when given.
pub fn parse_rss(xml: &str, feed_title: Option<&str>) -> Result<Vec<FeedEntry>> {
    let t0 = std::time::Instant::now();
    let xml_clean = scrub_html_entities_for_xml(xml);
    let rss: Rss = from_str(&xml_clean).context("parsing rss xml")?;

    let title = feed_title
        .map(str::to_string)
        .or(rss.channel.title)
        .unwrap_or_default();

    let out: Vec<FeedEntry> = rss
        .channel
        .item
        .into_iter()
        .map(|it| FeedEntry {
            feed_title: title.trim().to_string(),
            entry_title: it.title.unwrap_or_default(),
            entry_summary: it.description.unwrap_or_default(),
            entry_link: it.link.unwrap_or_default(),
            published: it.pub_date,
        })
        .collect();

    histogram!("etl_rss_parse_ms").record(t0.elapsed().as_secs_f64() * 1_000.0);
    Ok(out)
}

// quick-xml only knows the five XML entities.
fn scrub_html_entities_for_xml(s: &str) -> String {
    s.replace("&nbsp;", " ")
        .replace("&ndash;", "-")
        .replace("&mdash;", "-")
        .replace("&ldquo;", "\"")
        .replace("&rdquo;", "\"")
        .replace("&lsquo;", "'")
        .replace("&rsquo;", "'")
        .replace("&hellip;", "...")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn published_accepts_both_formats() {
        let a = parse_published("Tue, 04 Mar 2025 09:30:00 +0000").unwrap();
        let b = parse_published("2025-03-04T09:30:00Z").unwrap();
        assert_eq!(a, b);
        assert!(parse_published("yesterday").is_none());
    }

    #[test]
    fn entry_maps_to_rss_raw_item() {
        let e = FeedEntry {
            feed_title: "Grants Weekly".into(),
            entry_title: "New call".into(),
            entry_summary: "Funding for AI startups".into(),
            entry_link: " https://example.org/call ".into(),
            published: Some("not a date".into()),
        };
        let r = e.to_raw_item();
        assert_eq!(r.source_type, SourceType::Rss);
        assert_eq!(r.url, "https://example.org/call");
        assert_eq!(r.published_at, None);
        assert_eq!(r.source_metadata["feed_title"], "Grants Weekly");
    }

    #[test]
    fn rss_document_with_html_entities() {
        let xml = r#"<?xml version="1.0"?>
<rss version="2.0"><channel><title>Funding Desk</title>
<item><title>AI&nbsp;Fund</title><link>https://example.org/a</link>
<pubDate>Tue, 04 Mar 2025 09:30:00 +0000</pubDate>
<description>Grants &ndash; apply now</description></item>
</channel></rss>"#;
        let entries = parse_rss(xml, None).unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].feed_title, "Funding Desk");
        assert_eq!(entries[0].entry_title, "AI Fund");
        assert_eq!(entries[0].entry_summary, "Grants - apply now");

        let renamed = parse_rss(xml, Some("Override")).unwrap();
        assert_eq!(renamed[0].feed_title, "Override");
    }

    #[test]
    fn broken_xml_is_an_error() {
        assert!(parse_rss("<rss><channel>", None).is_err());
    }
}
