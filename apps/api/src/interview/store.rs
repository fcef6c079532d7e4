//! Session persistence. Every engine mutation is a single insert or a single
//! version-guarded update, so a failed or cancelled call never leaves a
//! half-written turn behind.

use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use crate::errors::AppError;
use crate::interview::session::InterviewSession;
use crate::models::interview::InterviewSessionRow;

#[async_trait]
pub trait SessionStore: Send + Sync {
    async fn insert(&self, session: &InterviewSession) -> Result<(), AppError>;

    /// Loads a session only if it belongs to `user_id`.
    async fn find(
        &self,
        session_id: Uuid,
        user_id: Uuid,
    ) -> Result<Option<InterviewSession>, AppError>;

    /// Writes `session` if the stored version still equals `session.version`,
    /// bumping the stored version. A stale copy yields `AppError::Conflict`.
    async fn save(&self, session: &InterviewSession) -> Result<(), AppError>;

    /// All of the user's sessions, newest first.
    async fn list_for_user(&self, user_id: Uuid) -> Result<Vec<InterviewSession>, AppError>;
}

pub struct PgSessionStore {
    pool: PgPool,
}

impl PgSessionStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SessionStore for PgSessionStore {
    async fn insert(&self, session: &InterviewSession) -> Result<(), AppError> {
        let row = InterviewSessionRow::try_from(session)?;
        sqlx::query(
            r#"
            INSERT INTO interview_sessions
                (id, user_id, resume_id, interview_type, subscription_tier, jd_info,
                 turns, final_report, status, end_reason, version, created_at, ended_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
            "#,
        )
        .bind(row.id)
        .bind(row.user_id)
        .bind(row.resume_id)
        .bind(&row.interview_type)
        .bind(&row.subscription_tier)
        .bind(&row.jd_info)
        .bind(&row.turns)
        .bind(&row.final_report)
        .bind(&row.status)
        .bind(&row.end_reason)
        .bind(row.version)
        .bind(row.created_at)
        .bind(row.ended_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn find(
        &self,
        session_id: Uuid,
        user_id: Uuid,
    ) -> Result<Option<InterviewSession>, AppError> {
        let row = sqlx::query_as::<_, InterviewSessionRow>(
            "SELECT * FROM interview_sessions WHERE id = $1 AND user_id = $2",
        )
        .bind(session_id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(InterviewSession::try_from)
            .transpose()
            .map_err(AppError::Internal)
    }

    async fn save(&self, session: &InterviewSession) -> Result<(), AppError> {
        let row = InterviewSessionRow::try_from(session)?;
        let result = sqlx::query(
            r#"
            UPDATE interview_sessions
            SET turns = $1, final_report = $2, status = $3, end_reason = $4,
                ended_at = $5, version = version + 1
            WHERE id = $6 AND user_id = $7 AND version = $8
            "#,
        )
        .bind(&row.turns)
        .bind(&row.final_report)
        .bind(&row.status)
        .bind(&row.end_reason)
        .bind(row.ended_at)
        .bind(row.id)
        .bind(row.user_id)
        .bind(row.version)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::Conflict(format!(
                "session {} changed since version {}",
                session.id, session.version
            )));
        }
        Ok(())
    }

    async fn list_for_user(&self, user_id: Uuid) -> Result<Vec<InterviewSession>, AppError> {
        let rows = sqlx::query_as::<_, InterviewSessionRow>(
            "SELECT * FROM interview_sessions WHERE user_id = $1 ORDER BY created_at DESC",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter()
            .map(InterviewSession::try_from)
            .collect::<Result<Vec<_>, _>>()
            .map_err(AppError::Internal)
    }
}
