#![allow(dead_code)]

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::FromRow;
use uuid::Uuid;

/// Batch lifecycle: `queued → running → completed`.
///
/// There is deliberately no batch-level failed state — individual resume
/// failures are recorded on the resume rows and the batch still completes.
/// Callers must inspect per-resume status to detect total failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BatchStatus {
    Queued,
    Running,
    Completed,
}

impl BatchStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            BatchStatus::Queued => "queued",
            BatchStatus::Running => "running",
            BatchStatus::Completed => "completed",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "queued" => Some(BatchStatus::Queued),
            "running" => Some(BatchStatus::Running),
            "completed" => Some(BatchStatus::Completed),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct RankingBatchRow {
    pub id: Uuid,
    pub job_id: Uuid,
    pub status: String,
    pub created_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct RankingResultRow {
    pub id: Uuid,
    pub batch_id: Uuid,
    pub job_id: Uuid,
    pub resume_id: Uuid,
    /// 0–100 match score derived from the skill-overlap ratio.
    pub score: i32,
    /// `{skill_overlap, matched_skills_count, missing_skills_count}`.
    pub score_breakdown: Value,
    pub reasoning: String,
    pub missing_required: Value,
    pub strengths: Value,
    pub candidate_suggestions: Value,
    /// Free-form provider metadata, including degradation tags when the
    /// LLM explanation step fell back to heuristics.
    pub model_meta: Value,
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_batch_status_round_trips() {
        for status in [
            BatchStatus::Queued,
            BatchStatus::Running,
            BatchStatus::Completed,
        ] {
            assert_eq!(BatchStatus::parse(status.as_str()), Some(status));
        }
    }

    #[test]
    fn test_no_failed_batch_status() {
        assert_eq!(BatchStatus::parse("failed"), None);
    }
}
