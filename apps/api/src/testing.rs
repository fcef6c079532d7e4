//! In-memory collaborators for unit tests.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::json;
use uuid::Uuid;

use crate::accounts::entitlement::{Entitlement, EntitlementService};
use crate::accounts::resumes::ResumeStore;
use crate::cache::{Cache, CacheError};
use crate::errors::AppError;
use crate::interview::session::InterviewSession;
use crate::interview::store::SessionStore;
use crate::llm_client::{LlmError, OutputFormat, TextGenerator};
use crate::models::resume::{ResumeSnapshot, StructuredResume};
use crate::storage::{StorageError, VideoStorage, VideoUpload};

pub fn sample_resume() -> StructuredResume {
    StructuredResume {
        skills: vec![json!("Rust"), json!("PostgreSQL"), json!("Redis")],
        achievements: vec![json!("Cut p99 checkout latency from 900ms to 120ms")],
        projects: vec![json!({
            "name": "ledger-rs",
            "description": "Double-entry ledger service with idempotent transfers",
        })],
        experience: vec![json!({
            "company": "Northwind Payments",
            "role": "Backend Engineer",
        })],
        extracurricular: vec![],
        education: vec![json!({ "degree": "BSc Computer Science" })],
    }
}

pub fn sample_snapshot(user_id: Uuid) -> ResumeSnapshot {
    ResumeSnapshot {
        id: Uuid::new_v4(),
        user_id,
        structured: sample_resume(),
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Sessions
// ────────────────────────────────────────────────────────────────────────────

/// Session store with the same version semantics as the Postgres store.
#[derive(Default)]
pub struct InMemorySessionStore {
    sessions: Mutex<HashMap<Uuid, InterviewSession>>,
    /// Written over the stored copy right before the next save, as if another
    /// request had committed first.
    racing_write: Mutex<Option<InterviewSession>>,
}

impl InMemorySessionStore {
    /// Stores `session` as-is, bypassing version checks.
    pub fn put(&self, session: InterviewSession) {
        self.sessions.lock().unwrap().insert(session.id, session);
    }

    pub fn get(&self, session_id: Uuid) -> Option<InterviewSession> {
        self.sessions.lock().unwrap().get(&session_id).cloned()
    }

    pub fn len(&self) -> usize {
        self.sessions.lock().unwrap().len()
    }

    pub fn race_next_save(&self, concurrent: InterviewSession) {
        *self.racing_write.lock().unwrap() = Some(concurrent);
    }
}

#[async_trait]
impl SessionStore for InMemorySessionStore {
    async fn insert(&self, session: &InterviewSession) -> Result<(), AppError> {
        self.put(session.clone());
        Ok(())
    }

    async fn find(
        &self,
        session_id: Uuid,
        user_id: Uuid,
    ) -> Result<Option<InterviewSession>, AppError> {
        Ok(self.get(session_id).filter(|s| s.user_id == user_id))
    }

    async fn save(&self, session: &InterviewSession) -> Result<(), AppError> {
        if let Some(mut concurrent) = self.racing_write.lock().unwrap().take() {
            concurrent.version += 1;
            self.put(concurrent);
        }

        let mut sessions = self.sessions.lock().unwrap();
        match sessions.get(&session.id) {
            Some(stored) if stored.version == session.version => {
                let mut saved = session.clone();
                saved.version += 1;
                sessions.insert(saved.id, saved);
                Ok(())
            }
            _ => Err(AppError::Conflict(format!(
                "session {} changed since version {}",
                session.id, session.version
            ))),
        }
    }

    async fn list_for_user(&self, user_id: Uuid) -> Result<Vec<InterviewSession>, AppError> {
        let mut sessions: Vec<InterviewSession> = self
            .sessions
            .lock()
            .unwrap()
            .values()
            .filter(|s| s.user_id == user_id)
            .cloned()
            .collect();
        sessions.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(sessions)
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Resumes, entitlements
// ────────────────────────────────────────────────────────────────────────────

#[derive(Clone, Default)]
pub struct InMemoryResumeStore {
    snapshots: Arc<Mutex<Vec<ResumeSnapshot>>>,
    lookups: Arc<AtomicUsize>,
}

impl InMemoryResumeStore {
    pub fn with(snapshots: Vec<ResumeSnapshot>) -> Self {
        Self {
            snapshots: Arc::new(Mutex::new(snapshots)),
            lookups: Arc::default(),
        }
    }

    pub fn lookups(&self) -> usize {
        self.lookups.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ResumeStore for InMemoryResumeStore {
    async fn latest_for_user(&self, user_id: Uuid) -> Result<Option<ResumeSnapshot>, AppError> {
        self.lookups.fetch_add(1, Ordering::SeqCst);
        let snapshots = self.snapshots.lock().unwrap();
        Ok(snapshots.iter().rev().find(|s| s.user_id == user_id).cloned())
    }

    async fn find(
        &self,
        resume_id: Uuid,
        user_id: Uuid,
    ) -> Result<Option<ResumeSnapshot>, AppError> {
        self.lookups.fetch_add(1, Ordering::SeqCst);
        let snapshots = self.snapshots.lock().unwrap();
        Ok(snapshots
            .iter()
            .find(|s| s.id == resume_id && s.user_id == user_id)
            .cloned())
    }
}

pub struct StaticEntitlements(pub Entitlement);

#[async_trait]
impl EntitlementService for StaticEntitlements {
    async fn entitlement(&self, _user_id: Uuid) -> Result<Entitlement, AppError> {
        Ok(self.0.clone())
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Text generation, video storage, cache
// ────────────────────────────────────────────────────────────────────────────

/// Replays canned responses in order and records every prompt it was given.
/// Runs dry with `LlmError::EmptyContent`.
#[derive(Default)]
pub struct ScriptedGenerator {
    responses: Mutex<VecDeque<Result<String, LlmError>>>,
    prompts: Mutex<Vec<String>>,
}

impl ScriptedGenerator {
    pub fn new(responses: Vec<Result<String, LlmError>>) -> Self {
        Self {
            responses: Mutex::new(responses.into()),
            prompts: Mutex::default(),
        }
    }

    pub fn push(&self, response: Result<String, LlmError>) {
        self.responses.lock().unwrap().push_back(response);
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }
}

#[async_trait]
impl TextGenerator for ScriptedGenerator {
    async fn generate(
        &self,
        prompt: &str,
        _system: &str,
        _format: OutputFormat,
    ) -> Result<String, LlmError> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(Err(LlmError::EmptyContent))
    }
}

#[derive(Default)]
pub struct StubVideoStorage {
    fail: bool,
    uploads: Mutex<Vec<(Uuid, usize)>>,
}

impl StubVideoStorage {
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    /// `(session_id, turn_index)` for every successful upload.
    pub fn uploads(&self) -> Vec<(Uuid, usize)> {
        self.uploads.lock().unwrap().clone()
    }
}

#[async_trait]
impl VideoStorage for StubVideoStorage {
    async fn upload_answer_video(
        &self,
        video: &VideoUpload,
        owner_id: Uuid,
        session_id: Uuid,
        turn_index: usize,
    ) -> Result<String, StorageError> {
        if self.fail {
            return Err(StorageError::Upload("bucket unreachable".to_string()));
        }
        self.uploads.lock().unwrap().push((session_id, turn_index));
        Ok(format!(
            "https://videos.test/{owner_id}/{session_id}/q{turn_index}.{}",
            video.extension()
        ))
    }
}

#[derive(Default)]
pub struct InMemoryCache {
    fail: bool,
    values: Mutex<HashMap<String, String>>,
    counters: Mutex<HashMap<String, u64>>,
}

impl InMemoryCache {
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    /// Drops every key, as if all TTLs had elapsed.
    pub fn expire_all(&self) {
        self.values.lock().unwrap().clear();
        self.counters.lock().unwrap().clear();
    }

    fn check(&self) -> Result<(), CacheError> {
        if self.fail {
            return Err(CacheError::Redis(redis::RedisError::from((
                redis::ErrorKind::IoError,
                "connection refused",
            ))));
        }
        Ok(())
    }
}

#[async_trait]
impl Cache for InMemoryCache {
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
        self.check()?;
        Ok(self.values.lock().unwrap().get(key).cloned())
    }

    async fn set(&self, key: &str, value: &str, _ttl: Duration) -> Result<(), CacheError> {
        self.check()?;
        self.values
            .lock()
            .unwrap()
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn increment(&self, key: &str, _window: Duration) -> Result<u64, CacheError> {
        self.check()?;
        let mut counters = self.counters.lock().unwrap();
        let count = counters.entry(key.to_string()).or_insert(0);
        *count += 1;
        Ok(*count)
    }
}

/// Router state over in-memory collaborators. Every user gets a free tier with
/// `interviews_remaining` left this month.
pub fn app_state(
    resumes: Vec<ResumeSnapshot>,
    interviews_remaining: u32,
) -> (crate::state::AppState, Arc<ScriptedGenerator>) {
    use crate::accounts::rate_limit::RateLimiter;
    use crate::interview::engine::{EngineSettings, InterviewEngine};
    use crate::interview::questions::QuestionGenerator;
    use crate::models::user::SubscriptionTier;

    let llm = Arc::new(ScriptedGenerator::default());
    let resumes: Arc<dyn ResumeStore> = Arc::new(InMemoryResumeStore::with(resumes));
    let engine = InterviewEngine::new(
        Arc::new(InMemorySessionStore::default()),
        resumes.clone(),
        QuestionGenerator::new(llm.clone()),
        Arc::new(StubVideoStorage::default()),
        EngineSettings::default(),
    );
    let state = crate::state::AppState {
        engine: Arc::new(engine),
        resumes,
        entitlements: Arc::new(StaticEntitlements(Entitlement {
            subscription_tier: SubscriptionTier::Free,
            interviews_remaining_this_month: interviews_remaining,
        })),
        rate_limiter: RateLimiter::new(Arc::new(InMemoryCache::default()), 100),
    };
    (state, llm)
}
