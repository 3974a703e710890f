// src/extract/deadline.rs
//! Deadline phrase → calendar date + deadline type.

use chrono::{Datelike, NaiveDate};
use once_cell::sync::Lazy;
use regex::Regex;

use crate::model::DeadlineType;

/// How far after a deadline cue a date may appear (bytes).
const CUE_WINDOW: usize = 80;

static ROLLING_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)\b(?:rolling\s+(?:basis|deadline|applications?|admissions?|intake)|on\s+a\s+rolling|open\s+until\s+filled|until\s+funds\s+are\s+(?:exhausted|depleted)|no\s+(?:fixed\s+)?deadline|accepted\s+(?:year-round|continuously)|ongoing\s+basis|open\s+year-round)\b",
    )
    .unwrap()
});

static ROUNDS_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)\b(?:multiple\s+(?:rounds|deadlines|cohorts|calls|windows)|round\s+(?:1|one|i)\b|(?:first|second|third)\s+round|quarterly\s+deadlines?|(?:two|three|four|several)\s+(?:rounds|cohorts|calls|application\s+windows)|next\s+cohort)",
    )
    .unwrap()
});

static CUE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)\b(?:deadline|apply\s+by|applications?\s+(?:close|closes|are\s+due|due|must\s+be\s+(?:submitted|received)\s+(?:by|before))|closes?\s+on|closing\s+date|due\s+(?:date|by|on)|submit\s+(?:by|before)|submissions?\s+(?:close|closes|due)|no\s+later\s+than|open\s+until)\b",
    )
    .unwrap()
});

const MONTHS: &str = r"jan(?:uary)?|feb(?:ruary)?|mar(?:ch)?|apr(?:il)?|may|jun(?:e)?|jul(?:y)?|aug(?:ust)?|sep(?:t(?:ember)?)?|oct(?:ober)?|nov(?:ember)?|dec(?:ember)?";

static ISO_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b(?P<y>\d{4})-(?P<m>\d{1,2})-(?P<d>\d{1,2})\b").unwrap());

static MDY_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(
        r"(?i)\b(?P<mon>{MONTHS})\.?\s+(?P<d>\d{{1,2}})(?:st|nd|rd|th)?,?\s+(?P<y>\d{{4}})\b"
    ))
    .unwrap()
});

static DMY_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(
        r"(?i)\b(?P<d>\d{{1,2}})(?:st|nd|rd|th)?\s+(?:of\s+)?(?P<mon>{MONTHS})\.?,?\s+(?P<y>\d{{4}})\b"
    ))
    .unwrap()
});

static SLASH_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b(?P<a>\d{1,2})/(?P<b>\d{1,2})/(?P<y>\d{4})\b").unwrap());

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DeadlineInfo {
    pub date: Option<NaiveDate>,
    pub kind: Option<DeadlineType>,
}

fn month_number(name: &str) -> Option<u32> {
    let key: String = name.chars().take(3).collect::<String>().to_ascii_lowercase();
    let n = match key.as_str() {
        "jan" => 1,
        "feb" => 2,
        "mar" => 3,
        "apr" => 4,
        "may" => 5,
        "jun" => 6,
        "jul" => 7,
        "aug" => 8,
        "sep" => 9,
        "oct" => 10,
        "nov" => 11,
        "dec" => 12,
        _ => return None,
    };
    Some(n)
}

fn plausible(date: NaiveDate) -> Option<NaiveDate> {
    (2000..=2100).contains(&date.year()).then_some(date)
}

fn num(caps: &regex::Captures<'_>, name: &str) -> Option<u32> {
    caps.name(name)?.as_str().parse().ok()
}

/// Earliest parseable date in `text`, with its byte offset.
pub fn find_date(text: &str) -> Option<(usize, NaiveDate)> {
    let mut found: Vec<(usize, NaiveDate)> = Vec::new();

    for caps in ISO_RE.captures_iter(text) {
        let (Some(m), Some(y), Some(mo), Some(d)) =
            (caps.get(0), num(&caps, "y"), num(&caps, "m"), num(&caps, "d"))
        else {
            continue;
        };
        if let Some(date) = NaiveDate::from_ymd_opt(y as i32, mo, d).and_then(plausible) {
            found.push((m.start(), date));
        }
    }

    for re in [&*MDY_RE, &*DMY_RE] {
        for caps in re.captures_iter(text) {
            let (Some(m), Some(mo), Some(y), Some(d)) = (
                caps.get(0),
                caps.name("mon").and_then(|m| month_number(m.as_str())),
                num(&caps, "y"),
                num(&caps, "d"),
            ) else {
                continue;
            };
            if let Some(date) = NaiveDate::from_ymd_opt(y as i32, mo, d).and_then(plausible) {
                found.push((m.start(), date));
            }
        }
    }

    for caps in SLASH_RE.captures_iter(text) {
        let (Some(m), Some(a), Some(b), Some(y)) =
            (caps.get(0), num(&caps, "a"), num(&caps, "b"), num(&caps, "y"))
        else {
            continue;
        };
        // US order unless the first part cannot be a month.
        let (mo, d) = if a > 12 { (b, a) } else { (a, b) };
        if let Some(date) = NaiveDate::from_ymd_opt(y as i32, mo, d).and_then(plausible) {
            found.push((m.start(), date));
        }
    }

    found.into_iter().min_by_key(|(pos, _)| *pos)
}

/// First date that follows a deadline cue within `CUE_WINDOW` bytes.
fn cue_date(text: &str) -> Option<NaiveDate> {
    CUE_RE.find_iter(text).find_map(|cue| {
        let mut end = (cue.end() + CUE_WINDOW).min(text.len());
        while !text.is_char_boundary(end) {
            end -= 1;
        }
        find_date(&text[cue.end()..end]).map(|(_, d)| d)
    })
}

/// Classify the deadline. Rolling beats rounds, rounds beat a fixed date.
/// A rolling call never carries a date.
pub fn extract_deadline(text: &str) -> DeadlineInfo {
    if ROLLING_RE.is_match(text) {
        return DeadlineInfo {
            date: None,
            kind: Some(DeadlineType::Rolling),
        };
    }

    let date = cue_date(text);
    if ROUNDS_RE.is_match(text) {
        return DeadlineInfo {
            date,
            kind: Some(DeadlineType::MultipleRounds),
        };
    }
    match date {
        Some(d) => DeadlineInfo {
            date: Some(d),
            kind: Some(DeadlineType::Fixed),
        },
        None => DeadlineInfo::default(),
    }
}
