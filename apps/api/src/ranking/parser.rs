//! Heuristic field parser — derives a structured record (skills, experience
//! years, project categories) from the plain text of a resume or a job
//! description.
//!
//! Extraction is keyword/regex-based, not statistical. Skill matching is
//! plain substring matching against a fixed vocabulary; partial-word hits
//! ("java" inside "javascript") are accepted.

use chrono::{Datelike, NaiveDate, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashSet;

/// Fixed skill vocabulary, in display priority order: backend, frontend,
/// data/AI, testing, tooling.
const SKILL_KEYWORDS: &[&str] = &[
    // Backend
    "python",
    "django",
    "flask",
    "fastapi",
    "rest",
    "api",
    "graphql",
    "celery",
    "redis",
    "postgresql",
    "mysql",
    "sqlite",
    "mongodb",
    "docker",
    "kubernetes",
    "aws",
    "gcp",
    "azure",
    // Frontend
    "javascript",
    "typescript",
    "react",
    "angular",
    "vue",
    "html",
    "css",
    "bootstrap",
    "tailwind",
    // Data/AI
    "pandas",
    "numpy",
    "scikit-learn",
    "sklearn",
    "tensorflow",
    "pytorch",
    "power bi",
    "tableau",
    "excel",
    "nlp",
    "computer vision",
    // Testing / tools
    "pytest",
    "unittest",
    "selenium",
    "postman",
    "git",
    "github",
    "linux",
];

/// Category vocabulary with trigger keywords. A category fires when any
/// trigger appears in the document text or the extracted skill list.
const CATEGORY_RULES: &[(&str, &[&str])] = &[
    (
        "Backend",
        &[
            "django",
            "flask",
            "fastapi",
            "rest",
            "api",
            "postgresql",
            "mysql",
            "redis",
            "celery",
        ],
    ),
    (
        "Frontend",
        &[
            "react",
            "angular",
            "vue",
            "javascript",
            "typescript",
            "html",
            "css",
            "bootstrap",
            "tailwind",
        ],
    ),
    (
        "Cloud/DevOps",
        &[
            "aws",
            "gcp",
            "azure",
            "docker",
            "kubernetes",
            "ci/cd",
            "jenkins",
            "github actions",
            "terraform",
        ],
    ),
    (
        "Data/Analytics",
        &[
            "power bi",
            "tableau",
            "pandas",
            "numpy",
            "excel",
            "analytics",
            "dashboard",
            "sql",
        ],
    ),
    (
        "AI/ML",
        &[
            "machine learning",
            "deep learning",
            "tensorflow",
            "pytorch",
            "scikit-learn",
            "nlp",
            "computer vision",
        ],
    ),
    (
        "Testing/QA",
        &["selenium", "postman", "pytest", "qa", "test case", "jira"],
    ),
    (
        "Mobile",
        &["android", "kotlin", "flutter", "dart", "firebase"],
    ),
    (
        "Cybersecurity",
        &[
            "kali",
            "siem",
            "firewall",
            "pentest",
            "vulnerability",
            "ethical hacking",
        ],
    ),
];

/// Self-declared no-experience signals, searched in the whole document.
const FRESHER_SIGNALS: &[&str] = &[
    "fresher",
    "entry level",
    "recent graduate",
    "seeking entry-level",
];

/// Longest plausible contiguous employment span, in months. Ranges beyond
/// this are treated as OCR/typo garbage and discarded.
const MAX_SPAN_MONTHS: i32 = 12 * 50;

static SECTION_START: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^(work\s+experience|experience|employment|professional\s+experience)\b")
        .unwrap()
});

static SECTION_END: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^(education|projects?|skills?|certifications?|achievements?|summary|profile)\b")
        .unwrap()
});

static EXPLICIT_TOTAL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)total\s+experience\s*[:\-]?\s*(\d+(?:\.\d+)?)\s*(?:years|yrs)\b").unwrap()
});

static DATE_RANGE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)((?:jan|feb|mar|apr|may|jun|jul|aug|sep|sept|oct|nov|dec|january|february|march|april|june|july|august|september|october|november|december)\s+\d{4}|\d{4})\s*(?:-|–|to)\s*(present|current|(?:jan|feb|mar|apr|may|jun|jul|aug|sep|sept|oct|nov|dec|january|february|march|april|june|july|august|september|october|november|december)\s+\d{4}|\d{4})",
    )
    .unwrap()
});

/// The derived record for either a job description or a resume.
/// Wire names match the persisted JSONB schema.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StructuredDocument {
    /// Found skills in first-seen vocabulary order, display-cased.
    pub skills: Vec<String>,
    /// Estimated years of professional experience. `None` means the
    /// document gave no usable signal — distinct from `Some(0.0)`,
    /// which is a self-declared fresher.
    #[serde(rename = "total_years_experience")]
    pub experience_years: Option<f64>,
    /// Alphabetically sorted members of the category vocabulary.
    pub project_categories: Vec<String>,
}

/// Runs all three extraction passes over the document text.
pub fn parse_document(text: &str) -> StructuredDocument {
    let skills = extract_skills(text);
    let experience_years = estimate_experience_years(text);
    let project_categories = extract_project_categories(text, &skills);

    StructuredDocument {
        skills,
        experience_years,
        project_categories,
    }
}

/// A cached parse is only reusable when every derived key is present.
pub fn is_complete_parse(extracted: &Value) -> bool {
    extracted.get("skills").is_some()
        && extracted.get("project_categories").is_some()
        && extracted.get("total_years_experience").is_some()
}

/// Collapses whitespace runs to single spaces and lower-cases for matching.
fn normalize(s: &str) -> String {
    s.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

/// Capitalizes the first letter of each word-ish run: "power bi" → "Power Bi",
/// "scikit-learn" → "Scikit-Learn".
fn title_case(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut prev_alpha = false;
    for ch in s.chars() {
        if ch.is_alphabetic() && !prev_alpha {
            out.extend(ch.to_uppercase());
        } else {
            out.push(ch);
        }
        prev_alpha = ch.is_alphabetic();
    }
    out
}

fn is_all_lowercase(s: &str) -> bool {
    s.chars().any(|c| c.is_lowercase()) && !s.chars().any(|c| c.is_uppercase())
}

// ────────────────────────────────────────────────────────────────────────────
// Skill extraction
// ────────────────────────────────────────────────────────────────────────────

/// Substring-matches the skill vocabulary against the normalized text.
/// Output preserves first-seen vocabulary order, deduplicated, each entry
/// title-cased for display when the vocabulary form is all-lowercase.
pub fn extract_skills(text: &str) -> Vec<String> {
    let haystack = normalize(text);

    let mut found = Vec::new();
    let mut seen = HashSet::new();
    for kw in SKILL_KEYWORDS {
        let key = normalize(kw);
        if haystack.contains(&key) && seen.insert(key) {
            let display = if is_all_lowercase(kw) {
                title_case(kw)
            } else {
                (*kw).to_string()
            };
            found.push(display);
        }
    }
    found
}

// ────────────────────────────────────────────────────────────────────────────
// Category extraction
// ────────────────────────────────────────────────────────────────────────────

/// Matches category trigger keywords against the document text plus the
/// already-extracted skill list as one combined search space. Output is the
/// sorted set of triggered category names.
pub fn extract_project_categories(text: &str, skills: &[String]) -> Vec<String> {
    let mut signals = normalize(text);
    for skill in skills {
        signals.push(' ');
        signals.push_str(&normalize(skill));
    }

    let mut categories: Vec<String> = CATEGORY_RULES
        .iter()
        .filter(|(_, triggers)| triggers.iter().any(|t| signals.contains(&normalize(t))))
        .map(|(name, _)| (*name).to_string())
        .collect();
    categories.sort();
    categories.dedup();
    categories
}

// ────────────────────────────────────────────────────────────────────────────
// Experience estimation
// ────────────────────────────────────────────────────────────────────────────

/// Estimates total years of professional experience.
///
/// Precedence:
/// 1. An explicit "total experience: X years" phrase wins outright (max of
///    all occurrences).
/// 2. Otherwise date ranges are read ONLY from inside the Experience
///    section. Covered months accumulate into a set, so overlapping or
///    concurrent jobs are not double-counted.
/// 3. With no section and no ranges, a fresher signal means 0.0; anything
///    else is unknown — never guessed from off-section text.
pub fn estimate_experience_years(text: &str) -> Option<f64> {
    estimate_experience_years_at(text, Utc::now().date_naive())
}

/// Same as [`estimate_experience_years`] with an explicit "today" used to
/// resolve open-ended ("present"/"current") ranges.
pub fn estimate_experience_years_at(text: &str, today: NaiveDate) -> Option<f64> {
    let raw = text.trim();
    let low = raw.to_lowercase();

    let says_fresher = FRESHER_SIGNALS.iter().any(|signal| low.contains(signal));

    // (1) Strict explicit total experience
    let explicit_max = EXPLICIT_TOTAL_RE
        .captures_iter(&low)
        .filter_map(|c| c[1].parse::<f64>().ok())
        .fold(None::<f64>, |acc, x| Some(acc.map_or(x, |a| a.max(x))));
    if let Some(total) = explicit_max {
        return Some(total);
    }

    // (2) Only look at the Experience section for date ranges
    let section_lines = experience_section_lines(raw);
    if section_lines.is_empty() {
        return if says_fresher { Some(0.0) } else { None };
    }

    let today_index = month_index(today.year(), today.month());
    let mut covered_months: HashSet<i32> = HashSet::new();

    for line in &section_lines {
        for caps in DATE_RANGE_RE.captures_iter(line) {
            let Some(start) = parse_month_year(&caps[1]) else {
                continue;
            };
            let end_token = caps[2].to_lowercase();
            let end_index = if end_token == "present" || end_token == "current" {
                today_index
            } else {
                let Some((year, month)) = parse_month_year(&caps[2]) else {
                    continue;
                };
                month_index(year, month)
            };
            let start_index = month_index(start.0, start.1);

            // sanity checks
            if end_index <= start_index {
                continue;
            }
            if end_index - start_index > MAX_SPAN_MONTHS {
                continue;
            }

            // union months so overlaps don't double count
            covered_months.extend(start_index..end_index);
        }
    }

    if covered_months.is_empty() {
        return if says_fresher { Some(0.0) } else { None };
    }

    Some(round_one_decimal(covered_months.len() as f64 / 12.0))
}

/// The contiguous non-empty lines between a recognized Experience header
/// and the next recognized section header (or end of document). Header
/// lines themselves are excluded.
fn experience_section_lines(text: &str) -> Vec<&str> {
    let mut in_section = false;
    let mut section = Vec::new();

    for line in text.lines().map(str::trim).filter(|l| !l.is_empty()) {
        if SECTION_START.is_match(line) {
            in_section = true;
            continue;
        }
        if in_section && SECTION_END.is_match(line) {
            break;
        }
        if in_section {
            section.push(line);
        }
    }
    section
}

/// Accepts "Jan 2022", "January 2022", or a bare "2022" (January assumed).
fn parse_month_year(token: &str) -> Option<(i32, u32)> {
    let tok = normalize(token);

    if tok.len() == 4 && tok.chars().all(|c| c.is_ascii_digit()) {
        return Some((tok.parse().ok()?, 1));
    }

    let (name, year) = tok.split_once(' ')?;
    Some((year.parse().ok()?, month_number(name)?))
}

fn month_number(name: &str) -> Option<u32> {
    let month = match name {
        "jan" | "january" => 1,
        "feb" | "february" => 2,
        "mar" | "march" => 3,
        "apr" | "april" => 4,
        "may" => 5,
        "jun" | "june" => 6,
        "jul" | "july" => 7,
        "aug" | "august" => 8,
        "sep" | "sept" | "september" => 9,
        "oct" | "october" => 10,
        "nov" | "november" => 11,
        "dec" | "december" => 12,
        _ => return None,
    };
    Some(month)
}

fn month_index(year: i32, month: u32) -> i32 {
    year * 12 + (month as i32 - 1)
}

fn round_one_decimal(x: f64) -> f64 {
    (x * 10.0).round() / 10.0
}
