#![allow(dead_code)]

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::FromRow;
use uuid::Uuid;

/// Resume lifecycle. Transitions are monotonic:
/// `uploaded → extracting → parsed`, with `failed` as the only terminal
/// failure state. A resume never regresses to an earlier status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResumeStatus {
    Uploaded,
    Extracting,
    Parsed,
    Failed,
}

impl ResumeStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResumeStatus::Uploaded => "uploaded",
            ResumeStatus::Extracting => "extracting",
            ResumeStatus::Parsed => "parsed",
            ResumeStatus::Failed => "failed",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "uploaded" => Some(ResumeStatus::Uploaded),
            "extracting" => Some(ResumeStatus::Extracting),
            "parsed" => Some(ResumeStatus::Parsed),
            "failed" => Some(ResumeStatus::Failed),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ResumeRow {
    pub id: Uuid,
    pub original_filename: String,
    pub file_path: String,
    /// Cached plain text. Empty until extraction has run; write-once.
    pub extracted_text: String,
    /// Cached structured parse (skills / experience / categories) as JSONB.
    pub extracted: Option<Value>,
    pub status: String,
    pub error_message: String,
    pub created_at: DateTime<Utc>,
}

impl ResumeRow {
    pub fn status(&self) -> Option<ResumeStatus> {
        ResumeStatus::parse(&self.status)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_round_trips() {
        for status in [
            ResumeStatus::Uploaded,
            ResumeStatus::Extracting,
            ResumeStatus::Parsed,
            ResumeStatus::Failed,
        ] {
            assert_eq!(ResumeStatus::parse(status.as_str()), Some(status));
        }
    }

    #[test]
    fn test_unknown_status_is_none() {
        assert_eq!(ResumeStatus::parse("archived"), None);
    }
}
