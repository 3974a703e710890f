// src/enrich/relevance.rs
//! Relevance scoring: tokenizer, config types, regex compilation, proximity checks,
//! and a capped keyword-density score in ⟨0..1⟩.
//!
//! The vocabulary lives in TOML (`config/relevance.toml`, embedded as the default).
//! Override with `RELEVANCE_CONFIG_PATH`.

use regex::Regex;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::fs;
use std::path::PathBuf;

pub const DEFAULT_RELEVANCE_TOML: &str = include_str!("../../config/relevance.toml");
pub const ENV_RELEVANCE_CONFIG_PATH: &str = "RELEVANCE_CONFIG_PATH";

/// Result of relevance evaluation
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Relevance {
    pub score: f32,
    pub matched: Vec<String>,
    pub reasons: Vec<String>,
}

/// A single token with byte span and sequential index
#[derive(Debug, Clone)]
pub struct Token {
    pub start: usize,
    pub end: usize,
    pub index: usize,
}

/// Basic, Unicode-friendly tokenizer.
pub fn tokenize(input: &str) -> Vec<Token> {
    static RE: once_cell::sync::OnceCell<Regex> = once_cell::sync::OnceCell::new();
    let re = RE.get_or_init(|| Regex::new(r"(?u)\b\w+\b").unwrap());
    re.find_iter(input)
        .enumerate()
        .map(|(i, m)| Token {
            start: m.start(),
            end: m.end(),
            index: i,
        })
        .collect()
}

/* ----------------------------
Config schema (from TOML)
---------------------------- */

#[derive(Debug, Clone, Deserialize)]
pub struct RelevanceRoot {
    pub relevance: RelevanceSection,
    pub weights: BTreeMap<String, i32>,
    #[serde(default)]
    pub anchors: Vec<AnchorCfg>,
    #[serde(default)]
    pub blockers: Vec<BlockerCfg>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RelevanceSection {
    /// Hits per category that already earn the full category weight.
    pub saturation: usize,
    #[serde(default = "default_window")]
    pub near_default_window: usize,
}

fn default_window() -> usize {
    6
}

#[derive(Debug, Clone, Deserialize)]
pub struct AnchorCfg {
    pub id: String,
    pub category: String,
    pub pattern: String,
    #[serde(default)]
    pub near: Option<NearCfg>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BlockerCfg {
    pub id: String,
    pub pattern: String,
    pub reason: String,
    #[serde(default)]
    pub near: Option<NearCfg>,
    #[serde(default, rename = "unless_near")]
    pub unless_near: Option<NearCfg>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NearCfg {
    pub pattern: String,
    pub window: Option<usize>,
}

/* ----------------------------
Compiled engine structures
---------------------------- */

#[derive(Debug)]
struct CompiledAnchor {
    cfg: AnchorCfg,
    re: Regex,
    near: Option<(Regex, usize)>,
}

#[derive(Debug)]
struct CompiledBlocker {
    cfg: BlockerCfg,
    re: Regex,
    near: Option<(Regex, usize)>,
    unless_near: Option<(Regex, usize)>,
}

/// The engine holds compiled regexes and provides proximity utilities.
#[derive(Debug)]
pub struct RelevanceEngine {
    pub cfg: RelevanceRoot,
    anchors: Vec<CompiledAnchor>,
    blockers: Vec<CompiledBlocker>,
}

fn compile_near(
    owner: &str,
    nc: &Option<NearCfg>,
    default_window: usize,
) -> anyhow::Result<Option<(Regex, usize)>> {
    match nc {
        Some(nc) => {
            let re = Regex::new(&nc.pattern)
                .map_err(|e| anyhow::anyhow!("`{}` near-regex error: {}", owner, e))?;
            Ok(Some((re, nc.window.unwrap_or(default_window))))
        }
        None => Ok(None),
    }
}

impl RelevanceEngine {
    /// The vocabulary shipped with the crate.
    pub fn builtin() -> anyhow::Result<Self> {
        Self::from_toml_str(DEFAULT_RELEVANCE_TOML)
    }

    /// `RELEVANCE_CONFIG_PATH` if set, otherwise the built-in vocabulary.
    pub fn from_env() -> anyhow::Result<Self> {
        match std::env::var(ENV_RELEVANCE_CONFIG_PATH) {
            Ok(p) => {
                let path = PathBuf::from(p);
                let content = fs::read_to_string(&path).map_err(|e| {
                    anyhow::anyhow!(
                        "Failed to read relevance config at {}: {}",
                        path.display(),
                        e
                    )
                })?;
                Self::from_toml_str(&content)
            }
            Err(_) => Self::builtin(),
        }
    }

    /// Load from a TOML string
    pub fn from_toml_str(toml_str: &str) -> anyhow::Result<Self> {
        let cfg: RelevanceRoot = toml::from_str(toml_str)?;
        if cfg.relevance.saturation == 0 {
            anyhow::bail!("relevance.saturation must be at least 1");
        }
        let win = cfg.relevance.near_default_window;

        let anchors = cfg
            .anchors
            .iter()
            .cloned()
            .map(|a| {
                let re = Regex::new(&a.pattern)
                    .map_err(|e| anyhow::anyhow!("anchor `{}` regex error: {}", a.id, e))?;
                let near = compile_near(&a.id, &a.near, win)?;
                Ok(CompiledAnchor { cfg: a, re, near })
            })
            .collect::<anyhow::Result<Vec<_>>>()?;

        let blockers = cfg
            .blockers
            .iter()
            .cloned()
            .map(|b| {
                let re = Regex::new(&b.pattern)
                    .map_err(|e| anyhow::anyhow!("blocker `{}` regex error: {}", b.id, e))?;
                let near = compile_near(&b.id, &b.near, win)?;
                let unless_near = compile_near(&b.id, &b.unless_near, win)?;
                Ok(CompiledBlocker {
                    cfg: b,
                    re,
                    near,
                    unless_near,
                })
            })
            .collect::<anyhow::Result<Vec<_>>>()?;

        Ok(Self {
            cfg,
            anchors,
            blockers,
        })
    }

    /// Byte-position → token-index lookup for proximity checks.
    #[allow(clippy::needless_range_loop)]
    fn byte_to_token(text: &str) -> Vec<usize> {
        let tokens = tokenize(text);
        let mut byte_to_tok = vec![usize::MAX; text.len() + 1];
        for t in &tokens {
            for i in t.start..=t.end {
                byte_to_tok[i] = t.index;
            }
        }
        // Backfill gaps with previous known index
        let mut last = usize::MAX;
        for i in 0..byte_to_tok.len() {
            if byte_to_tok[i] == usize::MAX {
                byte_to_tok[i] = last;
            } else {
                last = byte_to_tok[i];
            }
        }
        byte_to_tok
    }

    fn token_index_for_start(byte_to_tok: &[usize], start: usize) -> Option<usize> {
        byte_to_tok
            .get(start)
            .copied()
            .filter(|idx| *idx != usize::MAX)
    }

    fn near_any(idx: usize, near_idxs: &[usize], window: usize) -> bool {
        near_idxs.iter().any(|&b| idx.abs_diff(b) <= window)
    }

    fn match_token_indices(re: &Regex, text: &str, byte_to_tok: &[usize]) -> Vec<usize> {
        re.find_iter(text)
            .filter_map(|m| Self::token_index_for_start(byte_to_tok, m.start()))
            .collect()
    }

    /// Occurrences of `re` that satisfy the optional proximity requirement.
    fn qualified_hits(
        re: &Regex,
        near: &Option<(Regex, usize)>,
        text: &str,
        byte_to_tok: &[usize],
    ) -> usize {
        match near {
            None => re.find_iter(text).count(),
            Some((near_re, win)) => {
                let near_idxs = Self::match_token_indices(near_re, text, byte_to_tok);
                Self::match_token_indices(re, text, byte_to_tok)
                    .into_iter()
                    .filter(|&i| Self::near_any(i, &near_idxs, *win))
                    .count()
            }
        }
    }

    /// Blockers that apply to `text`, honoring `near` / `unless_near`.
    pub fn find_blockers(&self, text: &str) -> Vec<String> {
        let byte_to_tok = Self::byte_to_token(text);
        let mut hits = Vec::new();
        for b in &self.blockers {
            let mut main_idxs = Self::match_token_indices(&b.re, text, &byte_to_tok);
            if let Some((near_re, win)) = &b.near {
                let near_idxs = Self::match_token_indices(near_re, text, &byte_to_tok);
                main_idxs.retain(|&i| Self::near_any(i, &near_idxs, *win));
            }
            if main_idxs.is_empty() {
                continue;
            }
            if let Some((unless_re, win)) = &b.unless_near {
                let unless_idxs = Self::match_token_indices(unless_re, text, &byte_to_tok);
                if main_idxs
                    .iter()
                    .any(|&i| Self::near_any(i, &unless_idxs, *win))
                {
                    continue;
                }
            }
            hits.push(format!("blocker:{}:{}", b.cfg.id, b.cfg.reason));
        }
        hits
    }

    /// Per-category hit counts plus the ids of anchors that fired.
    fn collect_anchor_stats(&self, text: &str) -> (Vec<String>, BTreeMap<String, usize>) {
        let byte_to_tok = Self::byte_to_token(text);
        let mut matched_ids = Vec::new();
        let mut cat_counts: BTreeMap<String, usize> = BTreeMap::new();

        for a in &self.anchors {
            let hits = Self::qualified_hits(&a.re, &a.near, text, &byte_to_tok);
            if hits == 0 {
                continue;
            }
            matched_ids.push(a.cfg.id.clone());
            *cat_counts.entry(a.cfg.category.clone()).or_insert(0) += hits;
        }

        matched_ids.sort();
        matched_ids.dedup();
        (matched_ids, cat_counts)
    }

    /// Normalized score using category weights, each category capped at `saturation` hits.
    fn weighted_score(&self, cat_counts: &BTreeMap<String, usize>) -> f32 {
        let cap = self.cfg.relevance.saturation;
        let mut num = 0i64;
        let mut denom = 0i64;
        for (cat, w) in &self.cfg.weights {
            let cnt = cat_counts.get(cat).copied().unwrap_or(0).min(cap) as i64;
            num += cnt * i64::from(*w);
            denom += cap as i64 * i64::from(*w);
        }
        if denom <= 0 {
            return 0.0;
        }
        ((num as f32) / (denom as f32)).clamp(0.0, 1.0)
    }

    /// Blockers → anchors → weighted score.
    pub fn score(&self, text: &str) -> Relevance {
        let mut rel = Relevance::default();

        let blockers = self.find_blockers(text);
        if !blockers.is_empty() {
            rel.reasons = blockers;
            tracing::debug!(target: "relevance", reasons = ?rel.reasons, "blocked");
            return rel;
        }

        let (matched, cat_counts) = self.collect_anchor_stats(text);
        rel.score = self.weighted_score(&cat_counts);
        rel.reasons = cat_counts
            .iter()
            .map(|(cat, n)| format!("category:{cat}:{n}"))
            .collect();
        rel.matched = matched;
        rel
    }
}
