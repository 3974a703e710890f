// src/dedup.rs
//! Within-run deduplication.
//!
//! Primary key: normalized source url (scheme + host + path). Secondary key: SHA-256 of
//! the folded title + description, which catches reposts under a different url.
//! First occurrence wins.

use serde::Serialize;
use sha2::{Digest, Sha256};
use std::collections::HashSet;
use std::fmt::Write as _;

use crate::model::ExtractedOpportunity;
use crate::text::fold;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "key", content = "value", rename_all = "snake_case")]
pub enum DuplicateKind {
    Url(String),
    Content(String),
}

/// `scheme://host/path`, host lowercased without `www.`, no query/fragment/trailing slash.
/// Unparseable input falls back to a trimmed, lowercased copy.
pub fn normalize_url(raw: &str) -> String {
    let trimmed = raw.trim();
    let Ok(parsed) = url::Url::parse(trimmed) else {
        return trimmed.trim_end_matches('/').to_lowercase();
    };
    let host = parsed
        .host_str()
        .unwrap_or_default()
        .to_lowercase();
    let host = host.strip_prefix("www.").unwrap_or(&host);
    let port = parsed
        .port()
        .map(|p| format!(":{p}"))
        .unwrap_or_default();
    let path = parsed.path().trim_end_matches('/');
    format!("{}://{}{}{}", parsed.scheme(), host, port, path)
}

/// Hex SHA-256 over folded `title \n description`.
pub fn content_hash(title: &str, description: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(fold(title).as_bytes());
    hasher.update(b"\n");
    hasher.update(fold(description).as_bytes());
    let digest = hasher.finalize();
    let mut out = String::with_capacity(64);
    for b in digest.iter() {
        let _ = write!(&mut out, "{:02x}", b);
    }
    out
}

/// Keys seen so far in one run. Owned by a single reducer; not shared across threads.
#[derive(Debug, Default)]
pub struct DedupIndex {
    urls: HashSet<String>,
    hashes: HashSet<String>,
}

impl DedupIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `opp`'s keys, or report which key was already taken.
    /// A duplicate registers nothing.
    pub fn check_and_insert(&mut self, opp: &ExtractedOpportunity) -> Result<(), DuplicateKind> {
        let url_key = normalize_url(&opp.source_url);
        if self.urls.contains(&url_key) {
            return Err(DuplicateKind::Url(url_key));
        }
        let hash = content_hash(&opp.title, &opp.description);
        if self.hashes.contains(&hash) {
            return Err(DuplicateKind::Content(hash));
        }
        self.urls.insert(url_key);
        self.hashes.insert(hash);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.urls.len()
    }

    pub fn is_empty(&self) -> bool {
        self.urls.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn url_noise_is_stripped() {
        assert_eq!(
            normalize_url("HTTPS://WWW.Example.org/grants/ai/?utm_source=x#apply"),
            "https://example.org/grants/ai"
        );
        assert_eq!(
            normalize_url("https://example.org/grants/ai"),
            normalize_url("https://example.org/grants/ai/")
        );
        assert_ne!(
            normalize_url("https://example.org/a"),
            normalize_url("https://example.org:8443/a")
        );
    }

    #[test]
    fn content_hash_ignores_case_and_spacing() {
        assert_eq!(
            content_hash("AI  Grant", "Funding for\nstartups"),
            content_hash("ai grant", "funding for startups")
        );
        assert_ne!(content_hash("a", "b"), content_hash("a", "c"));
    }
}
