use axum::{
    extract::{Multipart, Path, State},
    http::StatusCode,
    Json,
};
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::job::{JobRow, JobSummaryRow};
use crate::models::ranking::{BatchStatus, RankingBatchRow, RankingResultRow};
use crate::models::resume::ResumeStatus;
use crate::ranking::extract::DocumentKind;
use crate::ranking::orchestrator::dispatch_batch;
use crate::state::AppState;

// ────────────────────────────────────────────────────────────────────────────
// Jobs
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct CreateJobRequest {
    pub title: String,
    pub raw_text: String,
}

/// POST /api/v1/jobs
pub async fn handle_create_job(
    State(state): State<AppState>,
    Json(req): Json<CreateJobRequest>,
) -> Result<(StatusCode, Json<JobRow>), AppError> {
    if req.title.trim().is_empty() {
        return Err(AppError::Validation("title must not be empty".to_string()));
    }
    if req.raw_text.trim().is_empty() {
        return Err(AppError::Validation(
            "raw_text must not be empty".to_string(),
        ));
    }

    let job: JobRow = sqlx::query_as(
        "INSERT INTO jobs (id, title, raw_text) VALUES ($1, $2, $3) RETURNING *",
    )
    .bind(Uuid::new_v4())
    .bind(req.title.trim())
    .bind(&req.raw_text)
    .fetch_one(&state.db)
    .await?;

    Ok((StatusCode::CREATED, Json(job)))
}

/// GET /api/v1/jobs
pub async fn handle_list_jobs(
    State(state): State<AppState>,
) -> Result<Json<Vec<JobSummaryRow>>, AppError> {
    let jobs: Vec<JobSummaryRow> =
        sqlx::query_as("SELECT id, title, created_at FROM jobs ORDER BY created_at DESC")
            .fetch_all(&state.db)
            .await?;
    Ok(Json(jobs))
}

// ────────────────────────────────────────────────────────────────────────────
// Upload boundary
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
pub struct CreateRankingResponse {
    pub batch_id: Uuid,
    pub resume_count: usize,
}

/// POST /api/v1/rankings
///
/// Multipart form: a `job_id` field plus one or more `resumes` file parts.
/// Creates one resume row per file and one queued batch, then hands the
/// batch to the orchestrator as a single background task.
pub async fn handle_create_ranking(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<(StatusCode, Json<CreateRankingResponse>), AppError> {
    let mut job_id: Option<Uuid> = None;
    let mut files: Vec<(String, Bytes)> = Vec::new();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::Validation(format!("Invalid multipart payload: {e}")))?
    {
        let name = field.name().map(|n| n.to_string());
        match name.as_deref() {
            Some("job_id") => {
                let text = field
                    .text()
                    .await
                    .map_err(|e| AppError::Validation(format!("Invalid job_id field: {e}")))?;
                job_id = Some(
                    text.trim()
                        .parse()
                        .map_err(|_| AppError::Validation("job_id must be a UUID".to_string()))?,
                );
            }
            Some("resumes") => {
                let filename = field.file_name().unwrap_or_default().to_string();
                // Reject unsupported formats before accepting any bytes.
                DocumentKind::from_filename(&filename)
                    .map_err(|e| AppError::Validation(e.to_string()))?;
                let data = field
                    .bytes()
                    .await
                    .map_err(|e| AppError::Validation(format!("Invalid file upload: {e}")))?;
                files.push((filename, data));
            }
            _ => {}
        }
    }

    let job_id = job_id.ok_or_else(|| AppError::Validation("job_id is required".to_string()))?;
    if files.is_empty() {
        return Err(AppError::Validation(
            "At least one resume file is required".to_string(),
        ));
    }

    let job: Option<JobRow> = sqlx::query_as("SELECT * FROM jobs WHERE id = $1")
        .bind(job_id)
        .fetch_optional(&state.db)
        .await?;
    let job = job.ok_or_else(|| AppError::NotFound(format!("Job {job_id} not found")))?;

    tokio::fs::create_dir_all(&state.config.upload_dir)
        .await
        .map_err(|e| AppError::Internal(anyhow::anyhow!("Failed to create upload dir: {e}")))?;

    let mut resume_ids = Vec::with_capacity(files.len());
    for (filename, data) in &files {
        let resume_id = Uuid::new_v4();
        let stored_path = stored_file_path(&state.config.upload_dir, resume_id, filename);
        tokio::fs::write(&stored_path, data)
            .await
            .map_err(|e| AppError::Internal(anyhow::anyhow!("Failed to save resume: {e}")))?;

        sqlx::query(
            "INSERT INTO resumes (id, original_filename, file_path, status) VALUES ($1, $2, $3, $4)",
        )
        .bind(resume_id)
        .bind(filename)
        .bind(&stored_path)
        .bind(ResumeStatus::Uploaded.as_str())
        .execute(&state.db)
        .await?;
        resume_ids.push(resume_id);
    }

    let batch_id = Uuid::new_v4();
    sqlx::query("INSERT INTO ranking_batches (id, job_id, status) VALUES ($1, $2, $3)")
        .bind(batch_id)
        .bind(job.id)
        .bind(BatchStatus::Queued.as_str())
        .execute(&state.db)
        .await?;
    for resume_id in &resume_ids {
        sqlx::query("INSERT INTO batch_resumes (batch_id, resume_id) VALUES ($1, $2)")
            .bind(batch_id)
            .bind(resume_id)
            .execute(&state.db)
            .await?;
    }

    info!(
        "Queued batch {batch_id}: {} resume(s) against job '{}'",
        resume_ids.len(),
        job.title
    );
    dispatch_batch(state.db.clone(), state.explainer.clone(), batch_id);

    Ok((
        StatusCode::ACCEPTED,
        Json(CreateRankingResponse {
            batch_id,
            resume_count: resume_ids.len(),
        }),
    ))
}

/// Files are stored under a fresh UUID with the original extension; the
/// user-supplied name never touches the filesystem.
fn stored_file_path(upload_dir: &str, resume_id: Uuid, original_filename: &str) -> String {
    let ext = original_filename
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_lowercase())
        .unwrap_or_default();
    format!("{upload_dir}/{resume_id}.{ext}")
}

// ────────────────────────────────────────────────────────────────────────────
// Results boundary
// ────────────────────────────────────────────────────────────────────────────

/// Per-resume view inside the batch detail. A failed resume has no result
/// row, so its status and error are only visible here.
#[derive(Debug, Serialize, sqlx::FromRow)]
pub struct BatchResumeStatusRow {
    pub resume_id: Uuid,
    pub original_filename: String,
    pub status: String,
    pub error_message: String,
}

#[derive(Debug, Serialize)]
pub struct BatchDetailResponse {
    pub batch: RankingBatchRow,
    pub resumes: Vec<BatchResumeStatusRow>,
}

/// GET /api/v1/batches/:id
///
/// The batch reads `completed` even when every resume failed; the per-resume
/// statuses in the response are the failure surface.
pub async fn handle_get_batch(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<BatchDetailResponse>, AppError> {
    let batch: Option<RankingBatchRow> =
        sqlx::query_as("SELECT * FROM ranking_batches WHERE id = $1")
            .bind(id)
            .fetch_optional(&state.db)
            .await?;
    let batch = batch.ok_or_else(|| AppError::NotFound(format!("Batch {id} not found")))?;

    let resumes: Vec<BatchResumeStatusRow> = sqlx::query_as(
        "SELECT r.id AS resume_id, r.original_filename, r.status, r.error_message \
         FROM resumes r JOIN batch_resumes br ON br.resume_id = r.id \
         WHERE br.batch_id = $1 ORDER BY r.created_at",
    )
    .bind(id)
    .fetch_all(&state.db)
    .await?;

    Ok(Json(BatchDetailResponse { batch, resumes }))
}

/// GET /api/v1/batches/:id/results
///
/// Ordered by descending score with the row id as a stable tie-break.
pub async fn handle_list_results(
    State(state): State<AppState>,
    Path(batch_id): Path<Uuid>,
) -> Result<Json<Vec<RankingResultRow>>, AppError> {
    let batch: Option<RankingBatchRow> =
        sqlx::query_as("SELECT * FROM ranking_batches WHERE id = $1")
            .bind(batch_id)
            .fetch_optional(&state.db)
            .await?;
    if batch.is_none() {
        return Err(AppError::NotFound(format!("Batch {batch_id} not found")));
    }

    let results: Vec<RankingResultRow> = sqlx::query_as(
        "SELECT * FROM ranking_results WHERE batch_id = $1 ORDER BY score DESC, id ASC",
    )
    .bind(batch_id)
    .fetch_all(&state.db)
    .await?;
    Ok(Json(results))
}

/// GET /api/v1/results/:id
pub async fn handle_get_result(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<RankingResultRow>, AppError> {
    let result: Option<RankingResultRow> =
        sqlx::query_as("SELECT * FROM ranking_results WHERE id = $1")
            .bind(id)
            .fetch_optional(&state.db)
            .await?;
    let result = result.ok_or_else(|| AppError::NotFound(format!("Result {id} not found")))?;
    Ok(Json(result))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stored_path_uses_uuid_and_extension() {
        let id = Uuid::new_v4();
        let path = stored_file_path("uploads", id, "My Resume.PDF");
        assert_eq!(path, format!("uploads/{id}.pdf"));
    }

    #[test]
    fn test_stored_path_ignores_directory_components_in_name() {
        let id = Uuid::new_v4();
        let path = stored_file_path("uploads", id, "../../etc/passwd.docx");
        assert_eq!(path, format!("uploads/{id}.docx"));
    }
}
