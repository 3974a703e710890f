// src/vocab.rs
//! Static keyword/phrase tables. Each entry maps a canonical label to the phrases that
//! signal it; matching is case-insensitive on word boundaries (see `KeywordTable`).
//! Edit vocabulary here; control flow never needs to change.

use once_cell::sync::Lazy;
use regex::Regex;

pub type LabelTable = &'static [(&'static str, &'static [&'static str])];

pub const TARGET_AUDIENCES: LabelTable = &[
    ("startups", &["startup", "startups", "start-up", "start-ups", "early-stage companies"]),
    ("smes", &["sme", "smes", "msme", "msmes", "small and medium enterprises", "small businesses"]),
    ("researchers", &["researcher", "researchers", "research institutions", "scientists", "phd"]),
    ("universities", &["university", "universities", "academic institutions", "higher education"]),
    ("nonprofits", &["ngo", "ngos", "nonprofit", "nonprofits", "non-profit", "non-profits", "civil society", "charities"]),
    ("entrepreneurs", &["entrepreneur", "entrepreneurs", "founder", "founders", "innovators"]),
    ("students", &["student", "students", "graduate students", "undergraduates"]),
    ("developers", &["developer", "developers", "engineers", "open source communities"]),
    ("governments", &["government agencies", "public sector", "ministries", "municipalities"]),
];

pub const AI_SUBSECTORS: LabelTable = &[
    ("machine_learning", &["machine learning", "deep learning", "neural network", "neural networks"]),
    ("nlp", &["natural language processing", "nlp", "language model", "language models", "llm", "llms", "speech recognition"]),
    ("computer_vision", &["computer vision", "image recognition", "satellite imagery", "remote sensing"]),
    ("generative_ai", &["generative ai", "genai", "foundation model", "foundation models"]),
    ("robotics", &["robotics", "robot", "robots", "autonomous systems", "drones"]),
    ("healthcare", &["healthcare", "health", "medical", "diagnostics", "healthtech"]),
    ("agriculture", &["agriculture", "agritech", "agtech", "farming", "farmers", "food security"]),
    ("fintech", &["fintech", "financial inclusion", "mobile money", "digital payments"]),
    ("education", &["edtech", "education technology", "digital learning"]),
    ("climate", &["climate", "clean energy", "renewable energy", "environmental"]),
    ("data_science", &["data science", "big data", "analytics", "open data"]),
    ("governance", &["responsible ai", "ai ethics", "ai governance", "ai policy"]),
];

pub const DEVELOPMENT_STAGES: LabelTable = &[
    ("idea", &["idea stage", "ideation", "concept stage", "pre-idea"]),
    ("prototype", &["prototype", "prototypes", "proof of concept", "mvp", "minimum viable product"]),
    ("early_stage", &["early-stage", "early stage", "pre-seed", "seed stage", "seed-stage"]),
    ("growth", &["growth stage", "growth-stage", "scale-up", "scale-ups", "scaling", "series a"]),
    ("research", &["basic research", "applied research", "research stage", "research projects"]),
    ("deployment", &["deployment", "commercialization", "market entry", "pilot deployment"]),
];

pub const REPORTING_REQUIREMENTS: LabelTable = &[
    ("progress_reports", &["progress report", "progress reports", "interim report", "interim reports"]),
    ("financial_reports", &["financial report", "financial reports", "audited accounts", "financial statements"]),
    ("final_report", &["final report", "completion report", "end of grant report"]),
    ("impact_metrics", &["impact report", "impact metrics", "impact reporting", "kpis", "key performance indicators"]),
    ("quarterly_updates", &["quarterly report", "quarterly reports", "quarterly update", "quarterly updates"]),
    ("milestones", &["milestone reports", "milestone-based", "milestones"]),
];

pub const SELECTION_CRITERIA: LabelTable = &[
    ("innovation", &["innovation", "innovative", "novelty", "originality"]),
    ("impact", &["impact", "social impact", "potential impact"]),
    ("feasibility", &["feasibility", "technical feasibility", "viability"]),
    ("scalability", &["scalability", "scalable", "potential to scale"]),
    ("team", &["team", "team experience", "team capacity", "track record"]),
    ("sustainability", &["sustainability", "sustainable", "long-term viability"]),
    ("local_relevance", &["local relevance", "local context", "community relevance"]),
];

pub const COLLABORATION_PHRASES: &[&str] = &[
    "partnership required",
    "must partner",
    "must be submitted jointly",
    "in partnership with a",
    "consortium",
    "consortia",
    "joint application",
    "joint applications",
    "co-applicant",
    "co-applicants",
    "collaborative proposals",
    "collaboration is required",
    "collaboration required",
    "partner institution",
];

pub const GENDER_PHRASES: &[&str] = &[
    "women-led",
    "women led",
    "female-led",
    "female founders",
    "female founder",
    "women founders",
    "women entrepreneurs",
    "women-owned",
    "women in ai",
    "women in tech",
    "gender equality",
    "gender-focused",
    "gender lens",
];

pub const YOUTH_PHRASES: &[&str] = &[
    "youth",
    "youth-led",
    "young people",
    "young innovators",
    "young entrepreneurs",
    "young africans",
    "under 35",
    "under the age of 35",
    "aged 18-35",
    "aged 18 to 35",
];

pub const GEOGRAPHIC_TERMS: &[&str] = &[
    "africa",
    "african",
    "sub-saharan",
    "east africa",
    "west africa",
    "north africa",
    "southern africa",
    "nigeria",
    "kenya",
    "south africa",
    "ghana",
    "egypt",
    "ethiopia",
    "rwanda",
    "uganda",
    "tanzania",
    "senegal",
    "morocco",
    "tunisia",
    "cameroon",
    "zambia",
    "zimbabwe",
    "global south",
    "emerging markets",
    "developing countries",
    "low- and middle-income countries",
    "lmics",
];

pub const AI_TERMS: &[&str] = &[
    "ai",
    "artificial intelligence",
    "machine learning",
    "deep learning",
    "data science",
    "generative ai",
];

/// Compiled matcher for a label table: one word-bounded alternation per label.
pub struct KeywordTable {
    entries: Vec<(&'static str, Regex)>,
}

impl KeywordTable {
    pub fn new(table: LabelTable) -> Self {
        let entries = table
            .iter()
            .map(|(label, phrases)| (*label, phrase_regex(phrases)))
            .collect();
        Self { entries }
    }

    /// Labels whose phrases occur in `text`, in table order.
    pub fn labels_in(&self, text: &str) -> Vec<String> {
        self.entries
            .iter()
            .filter(|(_, re)| re.is_match(text))
            .map(|(label, _)| label.to_string())
            .collect()
    }
}

/// `(?i)\b(?:p1|p2|...)\b` with every phrase escaped.
pub fn phrase_regex(phrases: &[&str]) -> Regex {
    let alts = phrases
        .iter()
        .map(|p| regex::escape(p))
        .collect::<Vec<_>>()
        .join("|");
    // Phrases are escaped literals, so the pattern always compiles.
    Regex::new(&format!(r"(?i)\b(?:{alts})\b")).expect("phrase regex")
}

pub static AUDIENCE_TABLE: Lazy<KeywordTable> = Lazy::new(|| KeywordTable::new(TARGET_AUDIENCES));
pub static SUBSECTOR_TABLE: Lazy<KeywordTable> = Lazy::new(|| KeywordTable::new(AI_SUBSECTORS));
pub static STAGE_TABLE: Lazy<KeywordTable> = Lazy::new(|| KeywordTable::new(DEVELOPMENT_STAGES));
pub static REPORTING_TABLE: Lazy<KeywordTable> =
    Lazy::new(|| KeywordTable::new(REPORTING_REQUIREMENTS));
pub static CRITERIA_TABLE: Lazy<KeywordTable> = Lazy::new(|| KeywordTable::new(SELECTION_CRITERIA));

pub static COLLABORATION_RE: Lazy<Regex> = Lazy::new(|| phrase_regex(COLLABORATION_PHRASES));
pub static GENDER_RE: Lazy<Regex> = Lazy::new(|| phrase_regex(GENDER_PHRASES));
pub static YOUTH_RE: Lazy<Regex> = Lazy::new(|| phrase_regex(YOUTH_PHRASES));
pub static GEOGRAPHY_RE: Lazy<Regex> = Lazy::new(|| phrase_regex(GEOGRAPHIC_TERMS));
pub static AI_RE: Lazy<Regex> = Lazy::new(|| phrase_regex(AI_TERMS));
