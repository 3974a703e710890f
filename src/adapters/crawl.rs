// src/adapters/crawl.rs
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::feed::parse_published;
use crate::model::{RawItem, SourceType};
use crate::text::truncate_words;

const MAX_TITLE_CHARS: usize = 200;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CrawledPage {
    pub url: String,
    pub extracted_text: String,
    pub crawl_strategy: String,
    pub target_type: String,
    /// Free-form page metadata; `title`, `published` and `currency` are read when present.
    pub page_metadata: Value,
}

impl CrawledPage {
    fn meta_str(&self, key: &str) -> Option<&str> {
        self.page_metadata
            .get(key)
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|s| !s.is_empty())
    }

    /// `page_metadata.title`, else the first non-blank line of the text.
    pub fn title(&self) -> String {
        if let Some(t) = self.meta_str("title") {
            return t.to_string();
        }
        let first_line = self
            .extracted_text
            .lines()
            .map(str::trim)
            .find(|l| !l.is_empty())
            .unwrap_or_default();
        truncate_words(first_line, MAX_TITLE_CHARS)
    }

    pub fn to_raw_item(&self) -> RawItem {
        let mut md = Map::new();
        for (k, v) in [
            ("crawl_strategy", &self.crawl_strategy),
            ("target_type", &self.target_type),
        ] {
            if !v.trim().is_empty() {
                md.insert(k.into(), Value::from(v.trim()));
            }
        }
        if let Some(host) = url::Url::parse(self.url.trim())
            .ok()
            .and_then(|u| u.host_str().map(str::to_string))
        {
            md.insert("source_name".into(), Value::from(host));
        }
        if let Some(c) = self.meta_str("currency") {
            md.insert("currency".into(), Value::from(c));
        }
        RawItem {
            source_type: SourceType::Crawl,
            title: self.title(),
            body_text: self.extracted_text.clone(),
            url: self.url.trim().to_string(),
            published_at: self.meta_str("published").and_then(parse_published),
            source_metadata: md,
        }
    }
}
