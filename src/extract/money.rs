// src/extract/money.rs
//! Financial-disclosure matchers.
//!
//! Only currency-qualified numbers are amounts; bare numbers (years, percentages, counts)
//! never are. Three matchers run in fixed order: total pool → exact per project → range.
//! The first one with a disambiguating phrase in the amount's sentence wins.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::model::FinancialDisclosure;
use crate::text::sentence_bounds;

/// ISO codes accepted by extraction and by the validation gate.
pub const RECOGNIZED_CURRENCIES: &[&str] = &[
    "USD", "EUR", "GBP", "NGN", "KES", "ZAR", "GHS", "EGP", "MAD", "RWF", "UGX", "TZS", "ETB",
    "XOF", "CAD", "AUD", "INR",
];

pub fn is_recognized_currency(code: &str) -> bool {
    RECOGNIZED_CURRENCIES.contains(&code)
}

const NUM: &str = r"\d{1,3}(?:[,.' \u{00A0}]\d{3})+(?:[.,]\d+)?|\d+(?:[.,]\d+)?";
const SUF: &str = r"(?i:thousand|million|billion|mn|bn|k|m|b)";
const CODES: &str = r"USD|EUR|GBP|NGN|KES|ZAR|GHS|EGP|MAD|RWF|UGX|TZS|ETB|XOF|CAD|AUD|INR";

static PREFIX_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(
        r"(?P<cur>US\$|\$|€|£|₦|₹|KSh|\b(?:{CODES})\b)\s?(?P<num>{NUM})(?:\s?(?P<suf>{SUF})\b)?"
    ))
    .unwrap()
});

static POSTFIX_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(
        r"\b(?P<num>{NUM})(?:\s?(?P<suf>{SUF})\b)?\s?(?P<cur>(?:{CODES})\b|(?i:us\s+dollars|dollars|euros|pounds)\b)"
    ))
    .unwrap()
});

/// Connector between the two ends of a range, anchored at the end of the first amount.
static RANGE_JOIN_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\s*(?:-|–|(?i:to|and|up\s+to))\s*").unwrap());

/// Bare upper bound ("$25,000 to 100,000", "$1-2 million").
static BARE_NUM_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(&format!(r"^(?P<num>{NUM})(?:\s?(?P<suf>{SUF})\b)?")).unwrap());

static BETWEEN_TAIL_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)\bbetween\s*$").unwrap());

static TOTAL_SIGNAL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)\b(?:total(?:ling|ing)?|in\s+total|pool|pooled|overall|combined|envelope|budget|fund\s+of|up\s+to\s+\d+\s+(?:grants|awards|prizes|projects|startups|teams))\b",
    )
    .unwrap()
});

static EXACT_SIGNAL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)\b(?:each|exactly|every\s+(?:selected|winning|successful)|fixed\s+(?:amount|grant|award|sum)|(?:a|one)\s+(?:grant|award|prize|stipend)\s+of|per\s+(?:project|startup|team|grantee|recipient|winner|company|organi[sz]ation|applicant|venture|award|grant|fellow|participant))\b",
    )
    .unwrap()
});

const COUNT_NOUNS: &str = r"startups|start-ups|projects|grants|awards|prizes|teams|companies|ventures|organi[sz]ations|winners|recipients|fellows|innovators|grantees|businesses|entrepreneurs|researchers|initiatives|applicants|scholarships|fellowships|smes";

static COUNT_RANGE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(
        r"(?i)\b(?:between\s+(?P<a1>\d{{1,4}})\s+and\s+(?P<b1>\d{{1,4}})|(?P<a2>\d{{1,4}})\s*(?:-|–|to)\s*(?P<b2>\d{{1,4}}))\s+(?P<fill>(?:[a-z][\w-]*\s+){{0,2}})(?:{COUNT_NOUNS})\b"
    ))
    .unwrap()
});

/// Filler that turns "18-35 year old founders" into an age band, not a head count.
static AGE_UNIT_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\b(?:years?|yrs?|old|aged?|months?)\b").unwrap());

/// A count noun right after a bare number ("to 20 startups").
static COUNT_TAIL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(
        r"(?i)^\s+(?:[a-z][\w-]*\s+){{0,2}}(?:{COUNT_NOUNS})\b"
    ))
    .unwrap()
});

static ESTIMATED_COUNT_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(
        r"(?i)\b(?:up\s+to|support|fund|select|award|finance|back)\s+(?P<n>\d{{1,4}})\s+(?:[a-z][\w-]*\s+){{0,2}}(?:{COUNT_NOUNS})\b"
    ))
    .unwrap()
});

/// A currency-qualified amount located in the text (byte span).
#[derive(Debug, Clone, PartialEq)]
pub struct MoneyMatch {
    pub amount: f64,
    pub currency: String,
    pub start: usize,
    pub end: usize,
    pub has_suffix: bool,
}

#[derive(Debug, Clone, PartialEq)]
struct RangeMatch {
    min: f64,
    max: f64,
    currency: String,
    start: usize,
    end: usize,
}

pub fn suffix_multiplier(suffix: &str) -> f64 {
    match suffix.to_ascii_lowercase().as_str() {
        "k" | "thousand" => 1e3,
        "m" | "mn" | "million" => 1e6,
        "b" | "bn" | "billion" => 1e9,
        _ => 1.0,
    }
}

/// Parse a locale-formatted number.
///
/// With both `,` and `.` present the last one is the decimal mark. A single separator
/// followed by exactly three digits is a thousands separator unless a magnitude suffix
/// follows (`1.500 million` is 1.5M). Repeated separators are always thousands.
pub fn parse_number(raw: &str, has_suffix: bool) -> Option<f64> {
    let cleaned: String = raw
        .chars()
        .filter(|c| !matches!(c, ' ' | '\u{00A0}' | '\''))
        .collect();
    let commas = cleaned.matches(',').count();
    let dots = cleaned.matches('.').count();

    let normalized = match (commas, dots) {
        (0, 0) => cleaned,
        (c, d) if c > 0 && d > 0 => {
            let last_comma = cleaned.rfind(',')?;
            let last_dot = cleaned.rfind('.')?;
            if last_comma > last_dot {
                cleaned.replace('.', "").replace(',', ".")
            } else {
                cleaned.replace(',', "")
            }
        }
        (c, _) if c > 0 => single_separator(&cleaned, ',', c, has_suffix),
        (_, d) => single_separator(&cleaned, '.', d, has_suffix),
    };
    normalized.parse::<f64>().ok().filter(|v| v.is_finite())
}

fn single_separator(s: &str, sep: char, count: usize, has_suffix: bool) -> String {
    if count > 1 {
        return s.replace(sep, "");
    }
    let idx = s.find(sep).unwrap_or(0);
    let digits_after = s.len() - idx - 1;
    if digits_after == 3 && !has_suffix {
        s.replace(sep, "")
    } else {
        s.replace(sep, ".")
    }
}

fn round_cents(v: f64) -> f64 {
    (v * 100.0).round() / 100.0
}

fn resolve_currency(token: &str, hint: Option<&str>) -> String {
    let dollar = || {
        hint.map(|h| h.trim().to_ascii_uppercase())
            .filter(|h| !h.is_empty())
            .unwrap_or_else(|| "USD".to_string())
    };
    match token {
        "$" => dollar(),
        "US$" => "USD".to_string(),
        "€" => "EUR".to_string(),
        "£" => "GBP".to_string(),
        "₦" => "NGN".to_string(),
        "₹" => "INR".to_string(),
        "KSh" => "KES".to_string(),
        other => match other.to_ascii_lowercase().as_str() {
            "dollars" => dollar(),
            "euros" => "EUR".to_string(),
            "pounds" => "GBP".to_string(),
            w if w.starts_with("us") && w.ends_with("dollars") => "USD".to_string(),
            _ => other.to_ascii_uppercase(),
        },
    }
}

fn build_match(
    caps: &regex::Captures<'_>,
    start: usize,
    end: usize,
    hint: Option<&str>,
) -> Option<MoneyMatch> {
    let suffix = caps.name("suf").map(|m| m.as_str());
    let value = parse_number(caps.name("num")?.as_str(), suffix.is_some())?;
    let amount = round_cents(value * suffix.map(suffix_multiplier).unwrap_or(1.0));
    if amount <= 0.0 {
        return None;
    }
    Some(MoneyMatch {
        amount,
        currency: resolve_currency(caps.name("cur")?.as_str(), hint),
        start,
        end,
        has_suffix: suffix.is_some(),
    })
}

/// All currency-qualified amounts, ordered by position.
pub fn find_amounts(text: &str, hint: Option<&str>) -> Vec<MoneyMatch> {
    let mut out: Vec<MoneyMatch> = PREFIX_RE
        .captures_iter(text)
        .filter_map(|caps| {
            let m = caps.get(0)?;
            build_match(&caps, m.start(), m.end(), hint)
        })
        .collect();

    for caps in POSTFIX_RE.captures_iter(text) {
        let Some(m) = caps.get(0) else { continue };
        let overlaps = out.iter().any(|o| m.start() < o.end && o.start < m.end());
        // "$5 USD" is already covered by the prefix form
        let after_symbol = text[..m.start()]
            .chars()
            .last()
            .is_some_and(|c| matches!(c, '$' | '€' | '£' | '₦' | '₹'));
        if overlaps || after_symbol {
            continue;
        }
        if let Some(mm) = build_match(&caps, m.start(), m.end(), hint) {
            out.push(mm);
        }
    }

    out.sort_by_key(|m| m.start);
    out
}

fn find_ranges(text: &str, amounts: &[MoneyMatch]) -> Vec<RangeMatch> {
    let mut out = Vec::new();
    let mut i = 0;
    while i < amounts.len() {
        let first = &amounts[i];
        let tail = &text[first.end..];
        let Some(join) = RANGE_JOIN_RE.find(tail) else {
            i += 1;
            continue;
        };
        let joiner = join.as_str().trim().to_ascii_lowercase();
        if joiner == "and" && !BETWEEN_TAIL_RE.is_match(&text[..first.start]) {
            i += 1;
            continue;
        }
        let upper_at = first.end + join.end();

        // Either a second currency amount right after the connector, or a bare number.
        let (upper, upper_suffixed, end, consumed) =
            match amounts.get(i + 1).filter(|n| n.start == upper_at) {
                Some(next) => (next.amount, next.has_suffix, next.end, 2),
                None => match bare_upper(text, upper_at, first) {
                    Some((upper, suffixed, end)) => (upper, suffixed, end, 1),
                    None => {
                        i += 1;
                        continue;
                    }
                },
            };

        // "$1-2 million": the lower bound borrows the upper bound's magnitude.
        let mut lower = first.amount;
        if !first.has_suffix && upper_suffixed {
            let scaled = round_cents(lower * magnitude_of(upper));
            if scaled <= upper {
                lower = scaled;
            }
        }

        // A bare upper bound below the qualified amount is a count or a year, not money.
        if consumed == 1 && lower >= upper {
            i += 1;
            continue;
        }
        let (min, max) = if lower <= upper { (lower, upper) } else { (upper, lower) };
        if min < max {
            out.push(RangeMatch {
                min,
                max,
                currency: first.currency.clone(),
                start: first.start,
                end,
            });
        }
        i += consumed;
    }
    out
}

/// Bare number after a range connector, read as the upper bound of `first`.
///
/// Without its own magnitude suffix it must share the first amount's magnitude, and it
/// must not be followed by a count noun.
fn bare_upper(text: &str, at: usize, first: &MoneyMatch) -> Option<(f64, bool, usize)> {
    let caps = BARE_NUM_RE.captures(&text[at..])?;
    let whole = caps.get(0)?.end();
    if COUNT_TAIL_RE.is_match(&text[at + whole..]) {
        return None;
    }
    let suffix = caps.name("suf").map(|m| m.as_str());
    let v = parse_number(caps.name("num")?.as_str(), suffix.is_some())?;
    let upper = round_cents(v * suffix.map(suffix_multiplier).unwrap_or(1.0));
    if suffix.is_none() && (first.has_suffix || magnitude_of(upper) != magnitude_of(first.amount))
    {
        return None;
    }
    Some((upper, suffix.is_some(), at + whole))
}

fn magnitude_of(v: f64) -> f64 {
    if v >= 1e9 {
        1e9
    } else if v >= 1e6 {
        1e6
    } else if v >= 1e3 {
        1e3
    } else {
        1.0
    }
}

fn in_range(m: &MoneyMatch, ranges: &[RangeMatch]) -> bool {
    ranges.iter().any(|r| m.start >= r.start && m.end <= r.end)
}

fn sentence_of(text: &str, pos: usize) -> &str {
    let (s, e) = sentence_bounds(text, pos);
    &text[s..e]
}

fn parse_count(s: Option<regex::Match<'_>>) -> Option<u32> {
    s.and_then(|m| m.as_str().parse::<u32>().ok())
}

/// Spans that must not be read as participant counts.
fn overlaps_money(start: usize, end: usize, amounts: &[MoneyMatch]) -> bool {
    amounts.iter().any(|a| start < a.end && a.start < end)
}

fn count_range(text: &str, offset: usize, amounts: &[MoneyMatch]) -> Option<(u32, u32)> {
    COUNT_RANGE_RE.captures_iter(text).find_map(|caps| {
        let m = caps.get(0)?;
        if overlaps_money(offset + m.start(), offset + m.end(), amounts) {
            return None;
        }
        if caps.name("fill").is_some_and(|f| AGE_UNIT_RE.is_match(f.as_str())) {
            return None;
        }
        let lo = parse_count(caps.name("a1").or_else(|| caps.name("a2")))?;
        let hi = parse_count(caps.name("b1").or_else(|| caps.name("b2")))?;
        (lo > 0 && lo < hi).then_some((lo, hi))
    })
}

fn estimated_count(text: &str, offset: usize, amounts: &[MoneyMatch]) -> Option<u32> {
    ESTIMATED_COUNT_RE.captures_iter(text).find_map(|caps| {
        let m = caps.get(0)?;
        if overlaps_money(offset + m.start(), offset + m.end(), amounts) {
            return None;
        }
        parse_count(caps.name("n")).filter(|n| *n > 0)
    })
}

fn match_total_pool(
    text: &str,
    amounts: &[MoneyMatch],
    ranges: &[RangeMatch],
) -> Option<FinancialDisclosure> {
    let m = amounts.iter().find(|m| {
        if in_range(m, ranges) {
            return false;
        }
        let sentence = sentence_of(text, m.start);
        TOTAL_SIGNAL_RE.is_match(sentence) && !EXACT_SIGNAL_RE.is_match(sentence)
    })?;

    // Participant counts: prefer the pool's own sentence, then the whole text.
    let (s, e) = sentence_bounds(text, m.start);
    let sentence = &text[s..e];
    let count_range =
        count_range(sentence, s, amounts).or_else(|| count_range(text, 0, amounts));
    let estimated_count =
        estimated_count(sentence, s, amounts).or_else(|| estimated_count(text, 0, amounts));

    Some(FinancialDisclosure::TotalPool {
        amount: m.amount,
        currency: m.currency.clone(),
        estimated_count,
        count_range,
    })
}

fn match_exact(
    text: &str,
    amounts: &[MoneyMatch],
    ranges: &[RangeMatch],
) -> Option<FinancialDisclosure> {
    amounts
        .iter()
        .filter(|m| !in_range(m, ranges))
        .find(|m| EXACT_SIGNAL_RE.is_match(sentence_of(text, m.start)))
        .map(|m| FinancialDisclosure::ExactPerProject {
            amount: m.amount,
            currency: m.currency.clone(),
        })
}

/// Classify how `text` discloses money. Never fails: no signal means `Unknown`.
pub fn extract_disclosure(text: &str, currency_hint: Option<&str>) -> FinancialDisclosure {
    let amounts = find_amounts(text, currency_hint);
    if amounts.is_empty() {
        return FinancialDisclosure::Unknown;
    }
    let ranges = find_ranges(text, &amounts);

    if let Some(d) = match_total_pool(text, &amounts, &ranges) {
        return d;
    }
    if let Some(d) = match_exact(text, &amounts, &ranges) {
        return d;
    }
    if let Some(r) = ranges.into_iter().next() {
        return FinancialDisclosure::RangePerProject {
            min: r.min,
            max: r.max,
            currency: r.currency,
        };
    }
    FinancialDisclosure::Unknown
}
