// src/validate.rs
//! Validation & quality gate.
//!
//! Rules are evaluated in order and never short-circuit, so a rejection carries every
//! failing reason. Warnings never reject.

use chrono::NaiveDate;
use serde::Serialize;
use std::fmt;

use crate::extract::is_recognized_currency;
use crate::model::ExtractedOpportunity;

pub const FALLBACK_CURRENCY: &str = "USD";

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "rule", rename_all = "snake_case")]
pub enum RejectReason {
    MissingField { field: &'static str },
    InvalidUrl { field: &'static str, detail: String },
    LowRelevance { score: f32, threshold: f32 },
    DescriptionTooShort { length: usize, minimum: usize },
}

impl fmt::Display for RejectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RejectReason::MissingField { field } => write!(f, "missing required field: {field}"),
            RejectReason::InvalidUrl { field, detail } => {
                write!(f, "{field} is not an absolute http(s) url: {detail}")
            }
            RejectReason::LowRelevance { score, threshold } => write!(
                f,
                "relevance_score {score:.2} below threshold {threshold:.2}"
            ),
            RejectReason::DescriptionTooShort { length, minimum } => write!(
                f,
                "description too short: {length} chars, minimum {minimum}"
            ),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "warning", rename_all = "snake_case")]
pub enum ValidationWarning {
    /// Replaced by `FALLBACK_CURRENCY` before persistence.
    UnrecognizedCurrency { found: String },
    DeadlinePassed { deadline: NaiveDate },
}

impl fmt::Display for ValidationWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationWarning::UnrecognizedCurrency { found } => write!(
                f,
                "unrecognized currency {found:?}, defaulting to {FALLBACK_CURRENCY}"
            ),
            ValidationWarning::DeadlinePassed { deadline } => {
                write!(f, "deadline {deadline} already passed")
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ValidationStatus {
    Accepted,
    Rejected,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ValidationResult {
    pub status: ValidationStatus,
    pub reasons: Vec<RejectReason>,
    pub warnings: Vec<ValidationWarning>,
}

impl ValidationResult {
    pub fn is_accepted(&self) -> bool {
        self.status == ValidationStatus::Accepted
    }

    fn from_parts(reasons: Vec<RejectReason>, warnings: Vec<ValidationWarning>) -> Self {
        let status = if reasons.is_empty() {
            ValidationStatus::Accepted
        } else {
            ValidationStatus::Rejected
        };
        Self {
            status,
            reasons,
            warnings,
        }
    }
}

/// Gate thresholds, taken from `EtlConfig`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Validator {
    pub min_relevance_score: f32,
    pub min_description_length: usize,
    pub today: NaiveDate,
}

/// Rule 1 alone. Also the only rule the legacy path runs.
pub fn required_fields(opp: &ExtractedOpportunity) -> Vec<RejectReason> {
    [
        ("title", &opp.title),
        ("description", &opp.description),
        ("source_url", &opp.source_url),
    ]
    .into_iter()
    .filter(|(_, v)| v.trim().is_empty())
    .map(|(field, _)| RejectReason::MissingField { field })
    .collect()
}

/// Syntactic check only: absolute, http/https, with a host.
pub fn check_http_url(raw: &str) -> Result<url::Url, String> {
    let parsed = url::Url::parse(raw.trim()).map_err(|e| e.to_string())?;
    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(format!("unsupported scheme {}", parsed.scheme()));
    }
    if parsed.host_str().map_or(true, str::is_empty) {
        return Err("missing host".to_string());
    }
    Ok(parsed)
}

impl Validator {
    pub fn validate(&self, opp: &ExtractedOpportunity) -> ValidationResult {
        let mut reasons = Vec::new();
        let mut warnings = Vec::new();

        // 1. required fields
        reasons.extend(required_fields(opp));

        // 2. url format (an empty url is already reported by rule 1)
        if !opp.source_url.trim().is_empty() {
            if let Err(detail) = check_http_url(&opp.source_url) {
                reasons.push(RejectReason::InvalidUrl {
                    field: "source_url",
                    detail,
                });
            }
        }

        // 3. currency
        warnings.extend(currency_warning(opp));

        // 4. relevance (only when enrichment ran)
        if let Some(en) = &opp.enrichment {
            if en.relevance_score < self.min_relevance_score {
                reasons.push(RejectReason::LowRelevance {
                    score: en.relevance_score,
                    threshold: self.min_relevance_score,
                });
            }
        }

        // 5. description length (an empty one is already reported by rule 1)
        let length = opp.description.trim().chars().count();
        if length > 0 && length < self.min_description_length {
            reasons.push(RejectReason::DescriptionTooShort {
                length,
                minimum: self.min_description_length,
            });
        }

        if let Some(deadline) = opp.deadline {
            if deadline < self.today {
                warnings.push(ValidationWarning::DeadlinePassed { deadline });
            }
        }

        ValidationResult::from_parts(reasons, warnings)
    }
}

/// Rule 3 alone. Also run when the full gate is switched off, so no record leaves with an
/// unrecognized code.
pub fn currency_warning(opp: &ExtractedOpportunity) -> Option<ValidationWarning> {
    opp.financial
        .currency()
        .filter(|code| !is_recognized_currency(code))
        .map(|code| ValidationWarning::UnrecognizedCurrency {
            found: code.to_string(),
        })
}

/// Legacy-path gate: required fields only.
pub fn validate_required(opp: &ExtractedOpportunity) -> ValidationResult {
    ValidationResult::from_parts(required_fields(opp), Vec::new())
}

/// Apply warning-driven fixes to an accepted record.
pub fn apply_warnings(opp: &mut ExtractedOpportunity, warnings: &[ValidationWarning]) {
    if warnings
        .iter()
        .any(|w| matches!(w, ValidationWarning::UnrecognizedCurrency { .. }))
    {
        opp.financial.set_currency(FALLBACK_CURRENCY);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn http_url_check() {
        assert!(check_http_url("https://example.org/a?b=1").is_ok());
        assert!(check_http_url("ftp://example.org").is_err());
        assert!(check_http_url("/relative/path").is_err());
        assert!(check_http_url("mailto:grants@example.org").is_err());
    }

    #[test]
    fn reason_text_names_the_field() {
        let r = RejectReason::MissingField {
            field: "source_url",
        };
        assert!(r.to_string().contains("source_url"));
        let r = RejectReason::LowRelevance {
            score: 0.4,
            threshold: 0.6,
        };
        assert_eq!(r.to_string(), "relevance_score 0.40 below threshold 0.60");
    }
}
