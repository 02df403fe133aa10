//! Explanation augmenter — turns a computed match into recruiter-readable
//! reasoning, strengths, and improvement suggestions.
//!
//! Pluggable, trait-based provider so the orchestrator never branches on
//! feature flags: `HeuristicExplainer` (deterministic, always available) and
//! `LlmExplainer` (Claude via `llm_client`, degrades to the heuristic output
//! on any failure). Augmentation can never fail a resume — a provider always
//! returns an `Explanation`.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Map, Value};
use std::sync::Arc;
use tracing::warn;

use crate::config::Config;
use crate::llm_client::prompts::{EXPLAIN_PROMPT_TEMPLATE, EXPLAIN_SYSTEM};
use crate::llm_client::{LlmClient, LlmError, MODEL};

/// Character budget applied to each of the job and resume texts before they
/// are sent to the external model.
const TEXT_CHAR_BUDGET: usize = 8000;
/// At most this many missing skills are named in the fallback suggestion.
const MAX_NAMED_MISSING: usize = 8;
/// Hard cap on the fallback suggestion list.
const MAX_SUGGESTIONS: usize = 10;

/// Everything a provider may use to explain one scored match.
#[derive(Debug, Clone)]
pub struct ExplainRequest<'a> {
    pub job_title: &'a str,
    pub job_text: &'a str,
    pub resume_text: &'a str,
    pub score: i32,
    pub matched_skills: &'a [String],
    pub missing_skills: &'a [String],
    pub categories: &'a [String],
    pub experience_years: Option<f64>,
}

/// Provider output. `meta` carries the provider mode and, when the LLM path
/// degraded, a failure tag for observability.
#[derive(Debug, Clone)]
pub struct Explanation {
    pub reasoning: String,
    pub strengths: Vec<String>,
    pub suggestions: Vec<String>,
    pub meta: Map<String, Value>,
}

/// The explanation provider seam. Carried in `AppState` as
/// `Arc<dyn ExplanationProvider>`, selected once at startup.
#[async_trait]
pub trait ExplanationProvider: Send + Sync {
    async fn explain(&self, request: &ExplainRequest<'_>) -> Explanation;
}

/// Picks the provider from configuration: the LLM provider only when the
/// flag is on AND a key is present, the heuristic provider otherwise.
pub fn select_provider(config: &Config) -> Arc<dyn ExplanationProvider> {
    match (&config.anthropic_api_key, config.ai_explanations_active()) {
        (Some(key), true) => Arc::new(LlmExplainer::new(LlmClient::new(key.clone()))),
        _ => Arc::new(HeuristicExplainer),
    }
}

// ────────────────────────────────────────────────────────────────────────────
// HeuristicExplainer — deterministic fallback, no network
// ────────────────────────────────────────────────────────────────────────────

pub struct HeuristicExplainer;

#[async_trait]
impl ExplanationProvider for HeuristicExplainer {
    async fn explain(&self, request: &ExplainRequest<'_>) -> Explanation {
        let mut meta = base_meta(request);
        meta.insert("mode".to_string(), json!("heuristic"));
        Explanation {
            reasoning: heuristic_reasoning(),
            strengths: heuristic_strengths(request),
            suggestions: heuristic_suggestions(
                request.missing_skills,
                request.job_title,
                request.categories,
            ),
            meta,
        }
    }
}

fn heuristic_reasoning() -> String {
    "Score computed using skill overlap between job description keywords and extracted resume skills."
        .to_string()
}

/// Generic, non-personalized strengths. Never empty.
fn heuristic_strengths(request: &ExplainRequest<'_>) -> Vec<String> {
    let mut strengths = Vec::new();

    if request.matched_skills.is_empty() {
        strengths
            .push("Submitted a parseable resume; skill coverage for this role is limited.".to_string());
    } else {
        let named: Vec<&str> = request
            .matched_skills
            .iter()
            .take(6)
            .map(String::as_str)
            .collect();
        let ellipsis = if request.matched_skills.len() > 6 { ", ..." } else { "" };
        strengths.push(format!(
            "Demonstrates {} of the required skills: {}{}",
            request.matched_skills.len(),
            named.join(", "),
            ellipsis
        ));
    }

    if let Some(years) = request.experience_years {
        strengths.push(format!("Estimated experience: ~{years} years"));
    }

    strengths
}

/// Fixed suggestion policy: missing skills first (≤8 named, "..." marker
/// when truncated), then general resume tips, then category-specific tips,
/// capped at 10 total.
fn heuristic_suggestions(missing: &[String], job_title: &str, categories: &[String]) -> Vec<String> {
    let mut tips = Vec::new();

    if !missing.is_empty() {
        let named: Vec<&str> = missing
            .iter()
            .take(MAX_NAMED_MISSING)
            .map(String::as_str)
            .collect();
        let ellipsis = if missing.len() > MAX_NAMED_MISSING { "..." } else { "" };
        tips.push(format!(
            "Add evidence for missing skills: {}{}",
            named.join(", "),
            ellipsis
        ));
    }

    tips.push(format!(
        "Tailor your resume summary to the '{job_title}' role using the same JD keywords."
    ));
    tips.push(
        "Quantify impact in projects/experience (e.g., latency reduced 30%, served 10k users/day)."
            .to_string(),
    );
    tips.push("Add 2-4 relevant projects with tech stack + outcome + GitHub link.".to_string());
    tips.push("Move the most relevant skills/projects to page 1.".to_string());
    tips.push("Use consistent formatting and short bullets (1-2 lines) for readability.".to_string());

    let has = |name: &str| categories.iter().any(|c| c == name);
    if has("Backend") {
        tips.push(
            "Highlight backend depth: REST APIs, auth (JWT/OAuth), DB schema/indexing, caching, testing."
                .to_string(),
        );
    }
    if has("Cloud/DevOps") {
        tips.push(
            "Add deployment details: Docker, CI/CD, cloud services used, monitoring/logging."
                .to_string(),
        );
    }
    if has("Data/Analytics") || has("AI/ML") {
        tips.push(
            "Mention datasets, metrics, evaluation approach, and any deployment/inference details."
                .to_string(),
        );
    }

    tips.truncate(MAX_SUGGESTIONS);
    tips
}

// ────────────────────────────────────────────────────────────────────────────
// LlmExplainer — Claude-backed, degrades to the heuristic output
// ────────────────────────────────────────────────────────────────────────────

pub struct LlmExplainer {
    llm: LlmClient,
}

impl LlmExplainer {
    pub fn new(llm: LlmClient) -> Self {
        Self { llm }
    }
}

/// Strict response shape — extraneous keys are a parse failure.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct ExplainPayload {
    reasoning: String,
    strengths: Vec<String>,
    candidate_suggestions: Vec<String>,
}

#[async_trait]
impl ExplanationProvider for LlmExplainer {
    async fn explain(&self, request: &ExplainRequest<'_>) -> Explanation {
        // Start from the deterministic output; the model call only ever
        // upgrades it.
        let mut explanation = HeuristicExplainer.explain(request).await;

        let prompt = build_prompt(request);
        match self.llm.call_json::<ExplainPayload>(&prompt, EXPLAIN_SYSTEM).await {
            Ok(payload) => {
                if !payload.reasoning.trim().is_empty() {
                    explanation.reasoning = payload.reasoning;
                }
                if !payload.strengths.is_empty() {
                    explanation.strengths = payload.strengths;
                }
                if !payload.candidate_suggestions.is_empty() {
                    explanation.suggestions = payload.candidate_suggestions;
                }
                explanation.meta.insert("mode".to_string(), json!("ai"));
                explanation.meta.insert("model".to_string(), json!(MODEL));
            }
            Err(e) => {
                let tag = classify_failure(&e);
                warn!("Explanation call degraded to heuristic output ({tag}): {e}");
                explanation
                    .meta
                    .insert("augmentation_error".to_string(), json!(format!("{tag}: {e}")));
            }
        }

        explanation
    }
}

fn build_prompt(request: &ExplainRequest<'_>) -> String {
    let missing_json =
        serde_json::to_string(request.missing_skills).unwrap_or_else(|_| "[]".to_string());
    EXPLAIN_PROMPT_TEMPLATE
        .replace("{score}", &request.score.to_string())
        .replace("{missing_skills}", &missing_json)
        .replace("{job_text}", truncate_chars(request.job_text, TEXT_CHAR_BUDGET))
        .replace(
            "{resume_text}",
            truncate_chars(request.resume_text, TEXT_CHAR_BUDGET),
        )
}

/// Maps an LLM failure onto the recorded degradation category.
fn classify_failure(error: &LlmError) -> &'static str {
    match error {
        LlmError::Api { status: 401 | 403, .. } => "auth_error",
        LlmError::Api { status, .. } if *status == 429 || *status >= 500 => "temporary_error",
        LlmError::Http(_) | LlmError::RateLimited { .. } => "temporary_error",
        _ => "other_error",
    }
}

/// Character-based truncation; never slices inside a UTF-8 code point.
fn truncate_chars(s: &str, max_chars: usize) -> &str {
    match s.char_indices().nth(max_chars) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}

fn base_meta(request: &ExplainRequest<'_>) -> Map<String, Value> {
    let mut meta = Map::new();
    let matched: Vec<&str> = request
        .matched_skills
        .iter()
        .take(12)
        .map(String::as_str)
        .collect();
    meta.insert("matched_skills".to_string(), json!(matched));
    meta
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strings(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    fn request<'a>(
        missing: &'a [String],
        matched: &'a [String],
        categories: &'a [String],
    ) -> ExplainRequest<'a> {
        ExplainRequest {
            job_title: "Backend Engineer",
            job_text: "We need Python and Django.",
            resume_text: "Python developer.",
            score: 50,
            matched_skills: matched,
            missing_skills: missing,
            categories,
            experience_years: Some(3.0),
        }
    }

    #[test]
    fn test_suggestions_lead_with_missing_skills() {
        let missing = strings(&["django", "sql"]);
        let tips = heuristic_suggestions(&missing, "Backend Engineer", &[]);
        assert!(tips[0].contains("django, sql"));
        assert!(!tips[0].contains("..."));
    }

    #[test]
    fn test_suggestions_truncate_long_missing_list() {
        let missing = strings(&["a", "b", "c", "d", "e", "f", "g", "h", "i", "j"]);
        let tips = heuristic_suggestions(&missing, "Backend Engineer", &[]);
        assert!(tips[0].ends_with("..."));
        assert!(tips[0].contains("h"));
        assert!(!tips[0].contains("i,"));
    }

    #[test]
    fn test_suggestions_capped_at_ten() {
        let missing = strings(&["a", "b"]);
        let categories = strings(&["AI/ML", "Backend", "Cloud/DevOps", "Data/Analytics"]);
        let tips = heuristic_suggestions(&missing, "ML Engineer", &categories);
        assert!(tips.len() <= MAX_SUGGESTIONS);
    }

    #[test]
    fn test_suggestions_nonempty_without_missing() {
        let tips = heuristic_suggestions(&[], "Backend Engineer", &[]);
        assert!(!tips.is_empty());
        assert!(tips[0].contains("Backend Engineer"));
    }

    #[test]
    fn test_category_tips_are_gated() {
        let backend_only = strings(&["Backend"]);
        let tips = heuristic_suggestions(&[], "Backend Engineer", &backend_only);
        assert!(tips.iter().any(|t| t.contains("backend depth")));
        assert!(!tips.iter().any(|t| t.contains("deployment details")));
    }

    #[test]
    fn test_strengths_never_empty() {
        let empty: Vec<String> = vec![];
        let req = ExplainRequest {
            experience_years: None,
            ..request(&empty, &empty, &empty)
        };
        assert!(!heuristic_strengths(&req).is_empty());
    }

    #[test]
    fn test_strengths_include_experience_when_known() {
        let matched = strings(&["python"]);
        let empty: Vec<String> = vec![];
        let req = request(&empty, &matched, &empty);
        let strengths = heuristic_strengths(&req);
        assert!(strengths.iter().any(|s| s.contains("~3 years")));
    }

    #[tokio::test]
    async fn test_heuristic_provider_fills_all_fields() {
        let missing = strings(&["django"]);
        let matched = strings(&["python"]);
        let categories = strings(&["Backend"]);
        let explanation = HeuristicExplainer
            .explain(&request(&missing, &matched, &categories))
            .await;
        assert!(!explanation.reasoning.is_empty());
        assert!(!explanation.strengths.is_empty());
        assert!(!explanation.suggestions.is_empty());
        assert_eq!(explanation.meta.get("mode"), Some(&json!("heuristic")));
    }

    #[test]
    fn test_classify_auth_failure() {
        let error = LlmError::Api {
            status: 401,
            message: "invalid x-api-key".to_string(),
        };
        assert_eq!(classify_failure(&error), "auth_error");
    }

    #[test]
    fn test_classify_temporary_failures() {
        for status in [429, 500, 503] {
            let error = LlmError::Api {
                status,
                message: "unavailable".to_string(),
            };
            assert_eq!(classify_failure(&error), "temporary_error");
        }
        assert_eq!(
            classify_failure(&LlmError::RateLimited { retries: 3 }),
            "temporary_error"
        );
    }

    #[test]
    fn test_classify_other_failures() {
        assert_eq!(classify_failure(&LlmError::EmptyContent), "other_error");
        let parse_error = serde_json::from_str::<ExplainPayload>("not json").unwrap_err();
        assert_eq!(classify_failure(&LlmError::Parse(parse_error)), "other_error");
    }

    #[test]
    fn test_payload_rejects_extra_keys() {
        let json = r#"{
            "reasoning": "ok",
            "strengths": ["a"],
            "candidate_suggestions": ["b"],
            "confidence": 0.9
        }"#;
        assert!(serde_json::from_str::<ExplainPayload>(json).is_err());
    }

    #[test]
    fn test_truncate_chars_multibyte_safe() {
        let text: String = "é".repeat(TEXT_CHAR_BUDGET + 100);
        let truncated = truncate_chars(&text, TEXT_CHAR_BUDGET);
        assert_eq!(truncated.chars().count(), TEXT_CHAR_BUDGET);
    }

    #[test]
    fn test_truncate_chars_short_input_untouched() {
        assert_eq!(truncate_chars("short", TEXT_CHAR_BUDGET), "short");
    }

    #[test]
    fn test_prompt_embeds_score_and_missing() {
        let missing = strings(&["django"]);
        let matched = strings(&["python"]);
        let empty: Vec<String> = vec![];
        let prompt = build_prompt(&request(&missing, &matched, &empty));
        assert!(prompt.contains("match_score: 50"));
        assert!(prompt.contains(r#"["django"]"#));
    }
}
