// src/extract/targeting.rs
//! Eligibility/targeting fields: keyword-set memberships, focus flags, reporting,
//! selection criteria and how-to-apply details.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::text::{sentence_bounds, sentences, truncate_words};
use crate::vocab;

const MAX_PROCESS_CHARS: usize = 300;

static CRITERIA_CONTEXT_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)\b(?:criteria|criterion|evaluated|assessed|judged|scored|selection\s+will|selected\s+based|selected\s+on|based\s+on\s+their)\b",
    )
    .unwrap()
});

static APPLY_PROCESS_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)\b(?:apply\s+(?:online|via|through|at|using|here)|submit\s+(?:an?|your)\s+(?:application|proposal|concept\s+note|pitch)|application\s+(?:form|portal)|applications?\s+(?:must|should)\s+be\s+submitted|to\s+apply|how\s+to\s+apply)\b",
    )
    .unwrap()
});

static URL_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r#"https?://[^\s<>"'()\[\]]+"#).unwrap());

static APPLY_WORD_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(?:apply|application|applications|submit|register|registration)\b")
        .unwrap()
});

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Targeting {
    pub target_audience: Vec<String>,
    pub ai_subsectors: Vec<String>,
    pub development_stage: Vec<String>,
    pub collaboration_required: bool,
    pub gender_focused: bool,
    pub youth_focused: bool,
    pub reporting_requirements: Vec<String>,
    pub selection_criteria: Vec<String>,
    pub application_process: Option<String>,
    pub application_url: Option<String>,
}

pub fn extract_targeting(title: &str, body: &str) -> Targeting {
    let text = format!("{title}. {body}");
    Targeting {
        target_audience: vocab::AUDIENCE_TABLE.labels_in(&text),
        ai_subsectors: vocab::SUBSECTOR_TABLE.labels_in(&text),
        development_stage: vocab::STAGE_TABLE.labels_in(&text),
        collaboration_required: vocab::COLLABORATION_RE.is_match(&text),
        gender_focused: vocab::GENDER_RE.is_match(&text),
        youth_focused: vocab::YOUTH_RE.is_match(&text),
        reporting_requirements: vocab::REPORTING_TABLE.labels_in(body),
        selection_criteria: selection_criteria(body),
        application_process: application_process(body),
        application_url: application_url(body),
    }
}

/// Criteria labels, read only from sentences that talk about evaluation.
pub fn selection_criteria(body: &str) -> Vec<String> {
    let scoped = sentences(body)
        .into_iter()
        .filter(|s| CRITERIA_CONTEXT_RE.is_match(s))
        .collect::<Vec<_>>()
        .join(" ");
    if scoped.is_empty() {
        return Vec::new();
    }
    vocab::CRITERIA_TABLE.labels_in(&scoped)
}

pub fn application_process(body: &str) -> Option<String> {
    sentences(body)
        .into_iter()
        .find(|s| APPLY_PROCESS_RE.is_match(s))
        .map(|s| truncate_words(s, MAX_PROCESS_CHARS))
}

/// First URL whose sentence or path mentions applying.
pub fn application_url(body: &str) -> Option<String> {
    URL_RE.find_iter(body).find_map(|m| {
        let url = m.as_str().trim_end_matches(['.', ',', ';', ':', '!', '?']);
        let (s, e) = sentence_bounds(body, m.start());
        let lower = url.to_ascii_lowercase();
        let in_path = ["apply", "application", "submit", "register"]
            .iter()
            .any(|k| lower.contains(k));
        (in_path || APPLY_WORD_RE.is_match(&body[s..e])).then(|| url.to_string())
    })
}
