use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct JobRow {
    pub id: Uuid,
    pub title: String,
    pub raw_text: String,
    /// Cached structured parse of the job description, if any.
    pub extracted: Option<Value>,
    pub created_at: DateTime<Utc>,
}

/// Slim listing shape for `GET /api/v1/jobs`.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct JobSummaryRow {
    pub id: Uuid,
    pub title: String,
    pub created_at: DateTime<Utc>,
}
