//! Resume snapshot lookup. Parsing and structuring resumes happens upstream;
//! this side only reads the stored structured data.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use sqlx::PgPool;
use tracing::warn;
use uuid::Uuid;

use crate::cache::Cache;
use crate::errors::AppError;
use crate::models::resume::{ResumeRow, ResumeSnapshot};

#[async_trait]
pub trait ResumeStore: Send + Sync {
    /// The user's most recently uploaded resume, if any.
    async fn latest_for_user(&self, user_id: Uuid) -> Result<Option<ResumeSnapshot>, AppError>;

    /// A specific snapshot, only if it belongs to `user_id`.
    async fn find(&self, resume_id: Uuid, user_id: Uuid)
        -> Result<Option<ResumeSnapshot>, AppError>;
}

pub struct PgResumeStore {
    pool: PgPool,
}

impl PgResumeStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ResumeStore for PgResumeStore {
    async fn latest_for_user(&self, user_id: Uuid) -> Result<Option<ResumeSnapshot>, AppError> {
        let row = sqlx::query_as::<_, ResumeRow>(
            "SELECT * FROM resumes WHERE user_id = $1 ORDER BY created_at DESC LIMIT 1",
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(ResumeSnapshot::try_from)
            .transpose()
            .map_err(AppError::Internal)
    }

    async fn find(
        &self,
        resume_id: Uuid,
        user_id: Uuid,
    ) -> Result<Option<ResumeSnapshot>, AppError> {
        let row = sqlx::query_as::<_, ResumeRow>(
            "SELECT * FROM resumes WHERE id = $1 AND user_id = $2",
        )
        .bind(resume_id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(ResumeSnapshot::try_from)
            .transpose()
            .map_err(AppError::Internal)
    }
}

/// Caches snapshots by id. Snapshots never change after upload, so only the
/// "latest" lookup bypasses the cache. Cache failures fall through to the
/// inner store.
pub struct CachedResumeStore<S> {
    inner: S,
    cache: Arc<dyn Cache>,
    ttl: Duration,
}

impl<S: ResumeStore> CachedResumeStore<S> {
    pub fn new(inner: S, cache: Arc<dyn Cache>, ttl: Duration) -> Self {
        Self { inner, cache, ttl }
    }

    fn key(resume_id: Uuid) -> String {
        format!("resume:{resume_id}")
    }

    async fn cached(&self, resume_id: Uuid) -> Option<ResumeSnapshot> {
        match self.cache.get(&Self::key(resume_id)).await {
            Ok(Some(raw)) => serde_json::from_str(&raw)
                .map_err(|e| warn!("Discarding unreadable cached resume {resume_id}: {e}"))
                .ok(),
            Ok(None) => None,
            Err(e) => {
                warn!("Resume cache read failed for {resume_id}: {e}");
                None
            }
        }
    }

    async fn remember(&self, snapshot: &ResumeSnapshot) {
        let Ok(raw) = serde_json::to_string(snapshot) else {
            return;
        };
        if let Err(e) = self.cache.set(&Self::key(snapshot.id), &raw, self.ttl).await {
            warn!("Resume cache write failed for {}: {e}", snapshot.id);
        }
    }
}

#[async_trait]
impl<S: ResumeStore> ResumeStore for CachedResumeStore<S> {
    async fn latest_for_user(&self, user_id: Uuid) -> Result<Option<ResumeSnapshot>, AppError> {
        let latest = self.inner.latest_for_user(user_id).await?;
        if let Some(snapshot) = &latest {
            self.remember(snapshot).await;
        }
        Ok(latest)
    }

    async fn find(
        &self,
        resume_id: Uuid,
        user_id: Uuid,
    ) -> Result<Option<ResumeSnapshot>, AppError> {
        if let Some(snapshot) = self.cached(resume_id).await {
            // Ownership is re-checked on every hit; keys are not user-scoped.
            if snapshot.user_id == user_id {
                return Ok(Some(snapshot));
            }
            return Ok(None);
        }

        let found = self.inner.find(resume_id, user_id).await?;
        if let Some(snapshot) = &found {
            self.remember(snapshot).await;
        }
        Ok(found)
    }
}
