use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ResumeRow {
    pub id: Uuid,
    pub user_id: Uuid,
    pub structured_data: Value,
    pub created_at: DateTime<Utc>,
}

/// Structured resume produced by the upstream extraction pipeline.
///
/// Sections are passed to prompts verbatim, so their inner shape is left open.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StructuredResume {
    pub skills: Vec<Value>,
    pub achievements: Vec<Value>,
    pub projects: Vec<Value>,
    pub experience: Vec<Value>,
    pub extracurricular: Vec<Value>,
    pub education: Vec<Value>,
}

/// A resume snapshot owned by one user. Immutable once stored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResumeSnapshot {
    pub id: Uuid,
    pub user_id: Uuid,
    pub structured: StructuredResume,
}

impl TryFrom<ResumeRow> for ResumeSnapshot {
    type Error = anyhow::Error;

    fn try_from(row: ResumeRow) -> Result<Self, Self::Error> {
        let structured = serde_json::from_value(row.structured_data).map_err(|e| {
            anyhow::anyhow!("resume {} has malformed structured data: {e}", row.id)
        })?;
        Ok(ResumeSnapshot {
            id: row.id,
            user_id: row.user_id,
            structured,
        })
    }
}
