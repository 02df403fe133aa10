//! Batch orchestrator — the background task that ranks every resume in a
//! batch against the batch's job description.
//!
//! One batch = one dispatched task; resumes are processed sequentially and
//! independently. A resume failure marks that resume `failed` and moves on —
//! it never aborts the batch. The batch always finishes `completed` once
//! every resume has been attempted; callers must inspect per-resume status
//! to detect total failure.

use anyhow::{anyhow, Context, Result};
use serde_json::Value;
use sqlx::PgPool;
use std::path::Path;
use std::sync::Arc;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::models::job::JobRow;
use crate::models::ranking::BatchStatus;
use crate::models::resume::{ResumeRow, ResumeStatus};
use crate::ranking::explain::{ExplainRequest, ExplanationProvider};
use crate::ranking::extract;
use crate::ranking::parser::{is_complete_parse, parse_document, StructuredDocument};
use crate::ranking::scoring::score_match;

/// Per-resume outcome, collected into the batch report instead of being
/// swallowed at the loop boundary.
#[derive(Debug, Clone, PartialEq)]
pub enum ResumeOutcome {
    Ranked { resume_id: Uuid, score: i32 },
    Failed { resume_id: Uuid, error: String },
}

/// What happened to each resume in one orchestrator run.
#[derive(Debug, Default)]
pub struct BatchReport {
    pub outcomes: Vec<ResumeOutcome>,
}

impl BatchReport {
    pub fn record(&mut self, outcome: ResumeOutcome) {
        self.outcomes.push(outcome);
    }

    pub fn ranked(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|o| matches!(o, ResumeOutcome::Ranked { .. }))
            .count()
    }

    pub fn failed(&self) -> usize {
        self.outcomes.len() - self.ranked()
    }

    /// Every attempted resume failed. The batch still reads `completed`;
    /// this is the signal result consumers should check instead.
    pub fn is_total_failure(&self) -> bool {
        !self.outcomes.is_empty() && self.ranked() == 0
    }
}

/// Queues the orchestrator for one batch: exactly one task per batch.
pub fn dispatch_batch(pool: PgPool, explainer: Arc<dyn ExplanationProvider>, batch_id: Uuid) {
    tokio::spawn(async move {
        if let Err(e) = run_batch(&pool, explainer.as_ref(), batch_id).await {
            error!("Batch {batch_id} orchestration aborted: {e:?}");
        }
    });
}

/// Runs the full ranking pipeline for one batch.
pub async fn run_batch(
    pool: &PgPool,
    explainer: &dyn ExplanationProvider,
    batch_id: Uuid,
) -> Result<BatchReport> {
    // Persist `running` up front so pollers observe the transition.
    sqlx::query("UPDATE ranking_batches SET status = $1 WHERE id = $2")
        .bind(BatchStatus::Running.as_str())
        .bind(batch_id)
        .execute(pool)
        .await?;

    let job: JobRow = sqlx::query_as(
        "SELECT j.* FROM jobs j JOIN ranking_batches b ON b.job_id = j.id WHERE b.id = $1",
    )
    .bind(batch_id)
    .fetch_optional(pool)
    .await?
    .ok_or_else(|| anyhow!("Batch {batch_id} has no job"))?;

    let jd_doc = parse_document(&job.raw_text);
    sqlx::query("UPDATE jobs SET extracted = $1 WHERE id = $2")
        .bind(serde_json::to_value(&jd_doc)?)
        .bind(job.id)
        .execute(pool)
        .await?;

    let resumes: Vec<ResumeRow> = sqlx::query_as(
        "SELECT r.* FROM resumes r JOIN batch_resumes br ON br.resume_id = r.id \
         WHERE br.batch_id = $1 ORDER BY r.created_at",
    )
    .bind(batch_id)
    .fetch_all(pool)
    .await?;

    info!(
        "Batch {batch_id} running: {} resume(s) against job '{}'",
        resumes.len(),
        job.title
    );

    let mut report = BatchReport::default();
    for resume in resumes {
        let resume_id = resume.id;
        match process_resume(pool, explainer, batch_id, &job, &jd_doc, resume).await {
            Ok(score) => report.record(ResumeOutcome::Ranked { resume_id, score }),
            Err(e) => {
                // Failure is isolated to this resume; siblings continue.
                let message = format!("{e:#}");
                warn!("Resume {resume_id} failed: {message}");
                sqlx::query("UPDATE resumes SET status = $1, error_message = $2 WHERE id = $3")
                    .bind(ResumeStatus::Failed.as_str())
                    .bind(&message)
                    .bind(resume_id)
                    .execute(pool)
                    .await?;
                report.record(ResumeOutcome::Failed {
                    resume_id,
                    error: message,
                });
            }
        }
    }

    sqlx::query("UPDATE ranking_batches SET status = $1, completed_at = now() WHERE id = $2")
        .bind(BatchStatus::Completed.as_str())
        .bind(batch_id)
        .execute(pool)
        .await?;

    info!(
        "Batch {batch_id} completed: {} ranked, {} failed",
        report.ranked(),
        report.failed()
    );
    if report.is_total_failure() {
        warn!("Batch {batch_id} completed with every resume failed");
    }

    Ok(report)
}

/// Extract → parse → score → explain → upsert for one resume.
/// Extraction and parsing are cached per resume identity and reused across
/// batches; only missing pieces are recomputed.
async fn process_resume(
    pool: &PgPool,
    explainer: &dyn ExplanationProvider,
    batch_id: Uuid,
    job: &JobRow,
    jd_doc: &StructuredDocument,
    resume: ResumeRow,
) -> Result<i32> {
    let text = if resume.extracted_text.is_empty() {
        // Mark `extracting` before the work runs so a crash mid-extraction
        // leaves an observable state.
        sqlx::query("UPDATE resumes SET status = $1 WHERE id = $2")
            .bind(ResumeStatus::Extracting.as_str())
            .bind(resume.id)
            .execute(pool)
            .await?;

        let path = resume.file_path.clone();
        let filename = resume.original_filename.clone();
        let text = tokio::task::spawn_blocking(move || {
            extract::extract_text(Path::new(&path), &filename)
        })
        .await
        .map_err(|e| anyhow!("Extraction task panicked: {e}"))?
        .context("Text extraction failed")?;

        sqlx::query("UPDATE resumes SET extracted_text = $1 WHERE id = $2")
            .bind(&text)
            .bind(resume.id)
            .execute(pool)
            .await?;
        text
    } else {
        resume.extracted_text.clone()
    };

    let candidate_doc = match reuse_cached_parse(resume.extracted.as_ref()) {
        Some(doc) => doc,
        None => {
            let doc = parse_document(&text);
            sqlx::query("UPDATE resumes SET extracted = $1, status = $2 WHERE id = $3")
                .bind(serde_json::to_value(&doc)?)
                .bind(ResumeStatus::Parsed.as_str())
                .bind(resume.id)
                .execute(pool)
                .await?;
            doc
        }
    };

    let result = score_match(jd_doc, &candidate_doc);

    let explanation = explainer
        .explain(&ExplainRequest {
            job_title: &job.title,
            job_text: &job.raw_text,
            resume_text: &text,
            score: result.score,
            matched_skills: &result.matched_skills,
            missing_skills: &result.missing_skills,
            categories: &candidate_doc.project_categories,
            experience_years: candidate_doc.experience_years,
        })
        .await;

    sqlx::query(
        r#"
        INSERT INTO ranking_results
            (id, batch_id, job_id, resume_id, score, score_breakdown, reasoning,
             missing_required, strengths, candidate_suggestions, model_meta)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
        ON CONFLICT (batch_id, job_id, resume_id) DO UPDATE SET
            score = EXCLUDED.score,
            score_breakdown = EXCLUDED.score_breakdown,
            reasoning = EXCLUDED.reasoning,
            missing_required = EXCLUDED.missing_required,
            strengths = EXCLUDED.strengths,
            candidate_suggestions = EXCLUDED.candidate_suggestions,
            model_meta = EXCLUDED.model_meta
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(batch_id)
    .bind(job.id)
    .bind(resume.id)
    .bind(result.score)
    .bind(serde_json::to_value(result.breakdown())?)
    .bind(&explanation.reasoning)
    .bind(serde_json::to_value(&result.missing_skills)?)
    .bind(serde_json::to_value(&explanation.strengths)?)
    .bind(serde_json::to_value(&explanation.suggestions)?)
    .bind(Value::Object(explanation.meta))
    .execute(pool)
    .await?;

    Ok(result.score)
}

/// A cached parse is reused only when every derived key is present and the
/// stored shape still deserializes; anything else triggers a re-parse.
fn reuse_cached_parse(extracted: Option<&Value>) -> Option<StructuredDocument> {
    extracted
        .filter(|v| is_complete_parse(v))
        .and_then(|v| serde_json::from_value(v.clone()).ok())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_report_counts() {
        let mut report = BatchReport::default();
        report.record(ResumeOutcome::Ranked {
            resume_id: Uuid::new_v4(),
            score: 50,
        });
        report.record(ResumeOutcome::Failed {
            resume_id: Uuid::new_v4(),
            error: "Unsupported file type '.txt'. Only PDF/DOCX supported.".to_string(),
        });
        assert_eq!(report.ranked(), 1);
        assert_eq!(report.failed(), 1);
        assert!(!report.is_total_failure());
    }

    #[test]
    fn test_report_total_failure() {
        let mut report = BatchReport::default();
        report.record(ResumeOutcome::Failed {
            resume_id: Uuid::new_v4(),
            error: "boom".to_string(),
        });
        assert!(report.is_total_failure());
    }

    #[test]
    fn test_empty_report_is_not_total_failure() {
        assert!(!BatchReport::default().is_total_failure());
    }

    #[test]
    fn test_cached_parse_reused_when_complete() {
        let value = json!({
            "skills": ["Python"],
            "total_years_experience": 2.5,
            "project_categories": ["Backend"]
        });
        let doc = reuse_cached_parse(Some(&value)).expect("complete parse should be reused");
        assert_eq!(doc.skills, vec!["Python"]);
        assert_eq!(doc.experience_years, Some(2.5));
    }

    #[test]
    fn test_cached_parse_with_missing_key_is_recomputed() {
        let value = json!({"skills": ["Python"], "project_categories": []});
        assert!(reuse_cached_parse(Some(&value)).is_none());
    }

    #[test]
    fn test_cached_parse_with_unknown_experience_is_still_complete() {
        let value = json!({
            "skills": [],
            "total_years_experience": null,
            "project_categories": []
        });
        let doc = reuse_cached_parse(Some(&value)).expect("null experience is a complete parse");
        assert_eq!(doc.experience_years, None);
    }

    #[test]
    fn test_absent_cache_is_recomputed() {
        assert!(reuse_cached_parse(None).is_none());
    }
}
