//! Match scoring — a pure function of two structured documents.
//!
//! The job's skill set is treated as the requirement side; the score is the
//! Jaccard coefficient of the two lower-cased skill sets, scaled to 0–100.
//! Determinism matters: identical inputs must produce identical output so
//! that re-running a batch updates result rows in place.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use crate::ranking::parser::StructuredDocument;

/// Outcome of scoring one candidate against one job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchResult {
    /// `round(overlap * 100)`, always in [0, 100].
    pub score: i32,
    /// Raw Jaccard coefficient in [0, 1].
    pub overlap: f64,
    /// Sorted intersection of the two skill sets, lower-cased.
    pub matched_skills: Vec<String>,
    /// Sorted job-side skills the candidate lacks, lower-cased.
    pub missing_skills: Vec<String>,
}

/// Persisted audit record; enough to re-derive the score without
/// recomputation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreBreakdown {
    pub skill_overlap: f64,
    pub matched_skills_count: usize,
    pub missing_skills_count: usize,
}

impl MatchResult {
    pub fn breakdown(&self) -> ScoreBreakdown {
        ScoreBreakdown {
            skill_overlap: self.overlap,
            matched_skills_count: self.matched_skills.len(),
            missing_skills_count: self.missing_skills.len(),
        }
    }
}

/// Scores a candidate document against a job document.
pub fn score_match(job: &StructuredDocument, candidate: &StructuredDocument) -> MatchResult {
    let job_skills = normalize_skill_set(&job.skills);
    let candidate_skills = normalize_skill_set(&candidate.skills);

    let overlap = jaccard(&job_skills, &candidate_skills);

    let matched_skills: Vec<String> = job_skills
        .intersection(&candidate_skills)
        .cloned()
        .collect();
    let missing_skills: Vec<String> = job_skills
        .difference(&candidate_skills)
        .cloned()
        .collect();

    MatchResult {
        score: (overlap * 100.0).round() as i32,
        overlap,
        matched_skills,
        missing_skills,
    }
}

/// Lower-cases, trims, and drops empty entries. BTreeSet keeps the
/// derived lists sorted without a second pass.
fn normalize_skill_set(skills: &[String]) -> BTreeSet<String> {
    skills
        .iter()
        .map(|s| s.trim().to_lowercase())
        .filter(|s| !s.is_empty())
        .collect()
}

/// |A ∩ B| / |A ∪ B|, defined as 0.0 when both sets are empty.
fn jaccard(a: &BTreeSet<String>, b: &BTreeSet<String>) -> f64 {
    if a.is_empty() && b.is_empty() {
        return 0.0;
    }
    let intersection = a.intersection(b).count();
    let union = a.union(b).count();
    intersection as f64 / union as f64
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc(skills: &[&str]) -> StructuredDocument {
        StructuredDocument {
            skills: skills.iter().map(|s| s.to_string()).collect(),
            experience_years: None,
            project_categories: vec![],
        }
    }

    #[test]
    fn test_identical_sets_score_100() {
        let job = doc(&["Python", "Django", "Sql"]);
        let candidate = doc(&["python", "django", "sql"]);
        let result = score_match(&job, &candidate);
        assert_eq!(result.score, 100);
        assert!(result.missing_skills.is_empty());
        assert_eq!(result.matched_skills, vec!["django", "python", "sql"]);
    }

    #[test]
    fn test_disjoint_sets_score_0() {
        let result = score_match(&doc(&["python"]), &doc(&["react"]));
        assert_eq!(result.score, 0);
        assert_eq!(result.overlap, 0.0);
    }

    #[test]
    fn test_both_empty_is_defined_zero() {
        let result = score_match(&doc(&[]), &doc(&[]));
        assert_eq!(result.score, 0);
        assert_eq!(result.overlap, 0.0);
    }

    #[test]
    fn test_known_overlap() {
        // Jaccard = |{python, sql}| / |{python, django, sql, react}| = 0.5
        let job = doc(&["python", "django", "sql"]);
        let candidate = doc(&["python", "sql", "react"]);
        let result = score_match(&job, &candidate);
        assert_eq!(result.overlap, 0.5);
        assert_eq!(result.score, 50);
        assert_eq!(result.matched_skills, vec!["python", "sql"]);
        assert_eq!(result.missing_skills, vec!["django"]);
    }

    #[test]
    fn test_overlap_is_symmetric() {
        let a = doc(&["python", "django", "aws"]);
        let b = doc(&["python", "react"]);
        let ab = score_match(&a, &b);
        let ba = score_match(&b, &a);
        assert_eq!(ab.overlap, ba.overlap);
        assert_eq!(ab.score, ba.score);
    }

    #[test]
    fn test_score_bounded() {
        let cases = [
            (vec!["python"], vec![] as Vec<&str>),
            (vec!["python", "django"], vec!["python"]),
            (vec![], vec!["react", "vue"]),
        ];
        for (job_skills, candidate_skills) in cases {
            let result = score_match(&doc(&job_skills), &doc(&candidate_skills));
            assert!((0..=100).contains(&result.score));
            assert!((0.0..=1.0).contains(&result.overlap));
        }
    }

    #[test]
    fn test_matched_and_missing_are_disjoint_and_sorted() {
        let job = doc(&["sql", "python", "django", "aws"]);
        let candidate = doc(&["python", "aws"]);
        let result = score_match(&job, &candidate);
        assert_eq!(result.matched_skills, vec!["aws", "python"]);
        assert_eq!(result.missing_skills, vec!["django", "sql"]);
        for skill in &result.matched_skills {
            assert!(!result.missing_skills.contains(skill));
        }
    }

    #[test]
    fn test_scoring_is_deterministic() {
        let job = doc(&["python", "django", "sql"]);
        let candidate = doc(&["python", "sql", "react"]);
        assert_eq!(score_match(&job, &candidate), score_match(&job, &candidate));
    }

    #[test]
    fn test_blank_and_whitespace_skills_ignored() {
        let job = doc(&["python", "  ", ""]);
        let candidate = doc(&["Python "]);
        let result = score_match(&job, &candidate);
        assert_eq!(result.score, 100);
    }

    #[test]
    fn test_parse_then_score_pipeline() {
        use crate::ranking::parser::parse_document;

        let job = parse_document("We need Python, Django and PostgreSQL experience.");
        let candidate = parse_document("Skills\nPython, PostgreSQL, React");
        let result = score_match(&job, &candidate);
        assert_eq!(result.overlap, 0.5);
        assert_eq!(result.score, 50);
        assert_eq!(result.matched_skills, vec!["postgresql", "python"]);
        assert_eq!(result.missing_skills, vec!["django"]);
    }

    #[test]
    fn test_breakdown_counts() {
        let job = doc(&["python", "django", "sql"]);
        let candidate = doc(&["python", "sql", "react"]);
        let breakdown = score_match(&job, &candidate).breakdown();
        assert_eq!(breakdown.skill_overlap, 0.5);
        assert_eq!(breakdown.matched_skills_count, 2);
        assert_eq!(breakdown.missing_skills_count, 1);
    }
}
