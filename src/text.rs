// src/text.rs
//! Text helpers shared by adapters, extraction and scoring.

use once_cell::sync::OnceCell;
use regex::Regex;

/// Hard cap for normalized bodies (chars).
pub const MAX_BODY_CHARS: usize = 8000;

/// Normalize text: decode entities, strip tags, fold smart quotes, collapse whitespace.
pub fn normalize_text(s: &str) -> String {
    // 1) HTML entity decode
    let mut out = html_escape::decode_html_entities(s).to_string();

    // 2) Strip HTML tags
    static RE_TAGS: OnceCell<Regex> = OnceCell::new();
    let re_tags = RE_TAGS.get_or_init(|| Regex::new(r"(?is)</?[a-z][^>]*>").unwrap());
    out = re_tags.replace_all(&out, " ").to_string();

    // 3) Normalize “ ” ‘ ’ « » to ASCII quotes, dashes to '-'
    out = out
        .replace(['\u{201C}', '\u{201D}', '\u{00AB}', '\u{00BB}'], "\"")
        .replace(['\u{2018}', '\u{2019}'], "'")
        .replace(['\u{2013}', '\u{2014}'], "-");

    // 4) Collapse whitespace (incl. NBSP)
    static RE_WS: OnceCell<Regex> = OnceCell::new();
    let re_ws = RE_WS.get_or_init(|| Regex::new(r"[\s\u{00A0}]+").unwrap());
    out = re_ws.replace_all(&out, " ").to_string();
    out = out.trim().to_string();

    // 5) Length cap
    if out.chars().count() > MAX_BODY_CHARS {
        out = out.chars().take(MAX_BODY_CHARS).collect();
    }

    out
}

/// Lowercase + condensed spaces, used for hashing and phrase matching.
pub fn fold(input: &str) -> String {
    input
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

fn is_boundary_at(bytes: &[u8], i: usize) -> bool {
    match bytes[i] {
        b'\n' => true,
        b'.' | b'!' | b'?' | b';' => bytes
            .get(i + 1)
            .map(|b| b.is_ascii_whitespace())
            .unwrap_or(true),
        _ => false,
    }
}

/// Byte range of the sentence containing `pos`.
///
/// A boundary is `.`/`!`/`?`/`;` followed by whitespace (or end of text) or a newline,
/// so decimals like `1.5` never split a sentence.
pub fn sentence_bounds(text: &str, pos: usize) -> (usize, usize) {
    let bytes = text.as_bytes();
    let pos = pos.min(bytes.len());

    let mut start = 0;
    let mut i = pos;
    while i > 0 {
        i -= 1;
        if is_boundary_at(bytes, i) {
            start = i + 1;
            break;
        }
    }

    let mut end = bytes.len();
    let mut j = pos;
    while j < bytes.len() {
        if is_boundary_at(bytes, j) {
            end = j + 1;
            break;
        }
        j += 1;
    }
    (start, end)
}

/// Split into sentences (trimmed, non-empty), using the same boundary rule.
pub fn sentences(text: &str) -> Vec<&str> {
    let bytes = text.as_bytes();
    let mut out = Vec::new();
    let mut start = 0;
    for i in 0..bytes.len() {
        if is_boundary_at(bytes, i) {
            let s = text[start..=i].trim();
            if !s.is_empty() {
                out.push(s);
            }
            start = i + 1;
        }
    }
    if start < text.len() {
        let s = text[start..].trim();
        if !s.is_empty() {
            out.push(s);
        }
    }
    out
}

/// First sentence, capped at `max_chars` on a word boundary.
pub fn first_sentence(text: &str, max_chars: usize) -> String {
    let first = sentences(text).into_iter().next().unwrap_or_default();
    let first = first.trim_end_matches(['.', '!', '?', ';']);
    truncate_words(first, max_chars)
}

pub fn truncate_words(s: &str, max_chars: usize) -> String {
    if s.chars().count() <= max_chars {
        return s.to_string();
    }
    let cut: String = s.chars().take(max_chars).collect();
    match cut.rfind(' ') {
        Some(idx) if idx > 0 => cut[..idx].trim_end().to_string(),
        _ => cut,
    }
}
