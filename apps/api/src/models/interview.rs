use chrono::{DateTime, Utc};
use serde_json::Value;
use sqlx::FromRow;
use uuid::Uuid;

use crate::interview::session::InterviewSession;

/// Raw `interview_sessions` row. Converted into `InterviewSession` with
/// validation; never handed to callers directly.
#[derive(Debug, Clone, FromRow)]
pub struct InterviewSessionRow {
    pub id: Uuid,
    pub user_id: Uuid,
    pub resume_id: Uuid,
    pub interview_type: String,
    pub subscription_tier: String,
    pub jd_info: Option<String>,
    pub turns: Value,
    pub final_report: Option<Value>,
    pub status: String,
    pub end_reason: Option<String>,
    pub version: i32,
    pub created_at: DateTime<Utc>,
    pub ended_at: Option<DateTime<Utc>>,
}

impl TryFrom<&InterviewSession> for InterviewSessionRow {
    type Error = anyhow::Error;

    fn try_from(session: &InterviewSession) -> Result<Self, Self::Error> {
        let turns = serde_json::to_value(&session.turns)
            .map_err(|e| anyhow::anyhow!("session {} turns failed to serialize: {e}", session.id))?;
        let final_report = session
            .final_report
            .as_ref()
            .map(serde_json::to_value)
            .transpose()
            .map_err(|e| {
                anyhow::anyhow!("session {} final report failed to serialize: {e}", session.id)
            })?;

        Ok(Self {
            id: session.id,
            user_id: session.user_id,
            resume_id: session.resume_id,
            interview_type: session.interview_type.as_str().to_string(),
            subscription_tier: session.subscription_tier.as_str().to_string(),
            jd_info: session.jd_info.clone(),
            turns,
            final_report,
            status: session.status.as_str().to_string(),
            end_reason: session.end_reason.map(|r| r.as_str().to_string()),
            version: session.version,
            created_at: session.created_at,
            ended_at: session.ended_at,
        })
    }
}
