// src/adapters/search.rs
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::model::{RawItem, SourceType};
use crate::text::first_sentence;

const MAX_TITLE_CHARS: usize = 120;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchHit {
    pub query: String,
    /// 1-based position in the engine's result list.
    pub rank: u32,
    pub engine: String,
    pub snippet: String,
    pub link: String,
}

impl SearchHit {
    pub fn to_raw_item(&self) -> RawItem {
        let mut md = Map::new();
        if self.rank > 0 {
            md.insert("rank".into(), Value::from(self.rank));
        }
        for (k, v) in [("query", &self.query), ("engine", &self.engine)] {
            if !v.trim().is_empty() {
                md.insert(k.into(), Value::from(v.trim()));
            }
        }
        if !self.engine.trim().is_empty() {
            md.insert("source_name".into(), Value::from(self.engine.trim()));
        }
        RawItem {
            source_type: SourceType::Search,
            title: first_sentence(&self.snippet, MAX_TITLE_CHARS),
            body_text: self.snippet.clone(),
            url: self.link.trim().to_string(),
            published_at: None,
            source_metadata: md,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn title_is_first_sentence_of_snippet() {
        let hit = SearchHit {
            query: "ai grants africa".into(),
            rank: 3,
            engine: "example-search".into(),
            snippet: "Applications open for the AI4D fund. Grants of up to $50,000.".into(),
            link: "https://example.org/ai4d".into(),
        };
        let r = hit.to_raw_item();
        assert_eq!(r.title, "Applications open for the AI4D fund");
        assert_eq!(r.source_type, SourceType::Search);
        assert_eq!(r.source_metadata["rank"], 3);
        assert_eq!(r.source_metadata["query"], "ai grants africa");
    }

    #[test]
    fn long_snippet_title_is_capped() {
        let hit = SearchHit {
            snippet: "word ".repeat(60),
            ..Default::default()
        };
        assert!(hit.to_raw_item().title.chars().count() <= MAX_TITLE_CHARS);
    }
}
