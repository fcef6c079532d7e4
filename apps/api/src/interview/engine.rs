//! Session lifecycle: create, answer, end, and the read projections.
//!
//! Every mutating call loads the session, applies the whole change in memory,
//! then commits it with one store write. A failure anywhere before the write
//! leaves the stored session exactly as it was, so clients may retry.

use std::sync::Arc;

use chrono::{Duration, Utc};
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::accounts::resumes::ResumeStore;
use crate::errors::AppError;
use crate::interview::analysis::{analyze, clamp_score, AnswerAnalysisReport};
use crate::interview::dashboard::{summarize, Dashboard};
use crate::interview::prompts::DEFAULT_FEEDBACK;
use crate::interview::questions::{FollowUpRequest, QuestionGenerator};
use crate::interview::session::{
    AnswerResult, EndReason, EndResult, InterviewSession, InterviewType, SessionReport,
    SessionRuntime, SessionSummary, TurnResponse,
};
use crate::interview::store::SessionStore;
use crate::models::resume::ResumeSnapshot;
use crate::models::user::SubscriptionTier;
use crate::storage::{VideoStorage, VideoUpload};

pub const MAX_JD_INFO_CHARS: usize = 3000;

const MAX_EXPIRE_ATTEMPTS: usize = 3;

#[derive(Debug, Clone)]
pub struct EngineSettings {
    /// Wall-clock cap for free-tier sessions, measured from creation.
    pub free_tier_session: Duration,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            free_tier_session: Duration::minutes(5),
        }
    }
}

pub struct NewSession {
    pub user_id: Uuid,
    pub resume: ResumeSnapshot,
    pub interview_type: InterviewType,
    pub jd_info: Option<String>,
    pub subscription_tier: SubscriptionTier,
}

pub struct AnswerSubmission {
    pub session_id: Uuid,
    pub user_id: Uuid,
    pub transcript: String,
    pub video: Option<VideoUpload>,
}

pub struct EndRequest {
    pub session_id: Uuid,
    pub user_id: Uuid,
    pub reason: EndReason,
    pub transcript: Option<String>,
    pub video: Option<VideoUpload>,
}

pub struct InterviewEngine {
    sessions: Arc<dyn SessionStore>,
    resumes: Arc<dyn ResumeStore>,
    questions: QuestionGenerator,
    videos: Arc<dyn VideoStorage>,
    settings: EngineSettings,
}

impl InterviewEngine {
    pub fn new(
        sessions: Arc<dyn SessionStore>,
        resumes: Arc<dyn ResumeStore>,
        questions: QuestionGenerator,
        videos: Arc<dyn VideoStorage>,
        settings: EngineSettings,
    ) -> Self {
        Self {
            sessions,
            resumes,
            questions,
            videos,
            settings,
        }
    }

    /// Opens a session with one generated question. Nothing is stored unless
    /// generation succeeds.
    pub async fn create_session(&self, new: NewSession) -> Result<SessionSummary, AppError> {
        let jd_info = normalize_jd_info(new.jd_info)?;

        let first_question = self
            .questions
            .opening_question(&new.resume.structured, new.interview_type, jd_info.as_deref())
            .await?;

        let session = InterviewSession::start(
            new.user_id,
            new.resume.id,
            new.interview_type,
            new.subscription_tier,
            jd_info,
            first_question,
            Utc::now(),
        );
        self.sessions.insert(&session).await?;

        info!(
            session_id = %session.id,
            user_id = %session.user_id,
            "Interview session created ({}, {} tier)",
            session.interview_type.as_str(),
            session.subscription_tier
        );

        Ok(SessionSummary::from(&session))
    }

    /// Records the answer to the pending question and asks the next one.
    pub async fn submit_answer(&self, submission: AnswerSubmission) -> Result<AnswerResult, AppError> {
        let transcript = submission.transcript.trim();
        if transcript.is_empty() {
            return Err(AppError::Validation("Transcript is required.".to_string()));
        }

        let mut session = self.load(submission.session_id, submission.user_id).await?;
        session.ensure_active()?;

        if session.free_tier_expired(Utc::now(), self.settings.free_tier_session) {
            self.expire(session).await?;
            return Err(AppError::TimeLimitReached);
        }

        let turn_index = session.current_turn_index();
        let resume = self.resume_for(&session).await?;

        let video_url = self
            .upload(&session, submission.video.as_ref(), turn_index)
            .await?;

        let analysis = analyze(transcript, session.interview_type);

        let follow_up = self
            .questions
            .follow_up(FollowUpRequest {
                structured_resume: &resume.structured,
                previous_question: session.current_question(),
                answer_transcript: transcript,
                interview_type: session.interview_type,
                jd_info: session.jd_info.as_deref(),
            })
            .await?;

        session.answer_current_turn(TurnResponse {
            transcript: transcript.to_string(),
            video_url: video_url.clone(),
            score: follow_up.score,
            feedback: follow_up.feedback.clone(),
            analysis: analysis.clone(),
        })?;
        session.push_question(follow_up.follow_up_question.clone())?;
        self.sessions.save(&session).await?;

        info!(
            session_id = %session.id,
            turn = turn_index,
            "Answer recorded (score {})",
            follow_up.score
        );

        Ok(AnswerResult {
            session_id: session.id,
            score: follow_up.score,
            feedback: follow_up.feedback,
            follow_up_question: follow_up.follow_up_question,
            video_url,
            question_index: turn_index + 1,
            analysis,
        })
    }

    /// Ends the session and computes the final report. Repeat calls return the
    /// stored outcome unchanged.
    pub async fn end_session(&self, request: EndRequest) -> Result<EndResult, AppError> {
        let mut session = self.load(request.session_id, request.user_id).await?;
        if session.is_ended() {
            return Ok(EndResult::from(&session));
        }

        let transcript = request
            .transcript
            .as_deref()
            .map(str::trim)
            .filter(|t| !t.is_empty());

        if let (Some(transcript), false) = (transcript, session.current_turn_answered()) {
            let turn_index = session.current_turn_index();
            let video_url = self
                .upload(&session, request.video.as_ref(), turn_index)
                .await?;
            let analysis = analyze(transcript, session.interview_type);

            session.answer_current_turn(TurnResponse {
                transcript: transcript.to_string(),
                video_url,
                score: derived_score(&analysis),
                feedback: derived_feedback(&analysis),
                analysis,
            })?;
        }

        session.finish(request.reason, Utc::now())?;

        match self.sessions.save(&session).await {
            Ok(()) => {}
            Err(AppError::Conflict(msg)) => {
                // Another request may have ended it first; that outcome stands.
                let current = self.load(session.id, session.user_id).await?;
                if current.is_ended() {
                    return Ok(EndResult::from(&current));
                }
                return Err(AppError::Conflict(msg));
            }
            Err(e) => return Err(e),
        }

        info!(
            session_id = %session.id,
            answered = session.analyses().count(),
            "Interview session ended ({})",
            request.reason
        );

        Ok(EndResult::from(&session))
    }

    pub async fn get_report(&self, session_id: Uuid, user_id: Uuid) -> Result<SessionReport, AppError> {
        let session = self.load(session_id, user_id).await?;
        if session.final_report.is_none() {
            return Err(AppError::NotFound(
                "Interview report is not available yet.".to_string(),
            ));
        }
        Ok(SessionReport::from(&session))
    }

    pub async fn get_runtime(&self, session_id: Uuid, user_id: Uuid) -> Result<SessionRuntime, AppError> {
        let session = self.load(session_id, user_id).await?;
        let remaining_seconds = match session.ended_at {
            Some(ended_at) => session.remaining_seconds(ended_at, self.settings.free_tier_session),
            None => session.remaining_seconds(Utc::now(), self.settings.free_tier_session),
        };

        Ok(SessionRuntime {
            id: session.id,
            interview_type: session.interview_type,
            questions: session.turns.iter().map(|t| t.question.clone()).collect(),
            subscription_tier: session.subscription_tier,
            status: session.status,
            created_at: session.created_at,
            remaining_seconds,
        })
    }

    pub async fn get_dashboard(&self, user_id: Uuid) -> Result<Dashboard, AppError> {
        let sessions = self.sessions.list_for_user(user_id).await?;
        Ok(summarize(&sessions))
    }

    // ── helpers ─────────────────────────────────────────────────────────────

    async fn load(&self, session_id: Uuid, user_id: Uuid) -> Result<InterviewSession, AppError> {
        self.sessions
            .find(session_id, user_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Interview session not found.".to_string()))
    }

    async fn resume_for(&self, session: &InterviewSession) -> Result<ResumeSnapshot, AppError> {
        self.resumes
            .find(session.resume_id, session.user_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Resume not found.".to_string()))
    }

    /// Ends an over-time free-tier session. A lost race reloads and retries, so
    /// this only succeeds once the stored session has ended.
    async fn expire(&self, mut session: InterviewSession) -> Result<(), AppError> {
        for _ in 0..MAX_EXPIRE_ATTEMPTS {
            if session.is_ended() {
                return Ok(());
            }
            session.finish(EndReason::AutoTimeLimit, Utc::now())?;
            match self.sessions.save(&session).await {
                Ok(()) => {
                    info!(
                        session_id = %session.id,
                        "Free-tier time limit reached; session ended ({})",
                        EndReason::AutoTimeLimit
                    );
                    return Ok(());
                }
                Err(AppError::Conflict(msg)) => {
                    warn!("Session {} changed while expiring it: {msg}", session.id);
                    session = self.load(session.id, session.user_id).await?;
                }
                Err(e) => return Err(e),
            }
        }
        Err(AppError::Conflict(format!(
            "session {} kept changing while expiring it",
            session.id
        )))
    }

    async fn upload(
        &self,
        session: &InterviewSession,
        video: Option<&VideoUpload>,
        turn_index: usize,
    ) -> Result<Option<String>, AppError> {
        let Some(video) = video else {
            return Ok(None);
        };
        self.videos
            .upload_answer_video(video, session.user_id, session.id, turn_index)
            .await
            .map(Some)
            .map_err(|e| {
                error!(
                    session_id = %session.id,
                    turn = turn_index,
                    "Answer video upload failed: {e}"
                );
                AppError::VideoUploadFailed(e.to_string())
            })
    }
}

fn normalize_jd_info(jd_info: Option<String>) -> Result<Option<String>, AppError> {
    let Some(jd) = jd_info.map(|s| s.trim().to_string()).filter(|s| !s.is_empty()) else {
        return Ok(None);
    };
    if jd.chars().count() > MAX_JD_INFO_CHARS {
        return Err(AppError::Validation(format!(
            "jdInfo must be at most {MAX_JD_INFO_CHARS} characters."
        )));
    }
    Ok(Some(jd))
}

/// Score for an answer given while ending, without a generation call.
pub fn derived_score(analysis: &AnswerAnalysisReport) -> u8 {
    let sum = f64::from(analysis.confidence_score)
        + f64::from(analysis.domain_depth)
        + f64::from(analysis.sentence_clarity);
    clamp_score(sum / 3.0)
}

pub fn derived_feedback(analysis: &AnswerAnalysisReport) -> String {
    let feedback = analysis
        .improvement_suggestions
        .iter()
        .take(2)
        .map(String::as_str)
        .collect::<Vec<_>>()
        .join(" ");
    if feedback.is_empty() {
        DEFAULT_FEEDBACK.to_string()
    } else {
        feedback
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interview::session::SessionStatus;
    use crate::llm_client::LlmError;
    use crate::testing::{
        sample_snapshot, InMemoryResumeStore, InMemorySessionStore, ScriptedGenerator,
        StubVideoStorage,
    };
    use bytes::Bytes;

    const ANSWER: &str = "I led the migration to a partitioned database and latency improved.";
    const FOLLOW_UP_JSON: &str =
        r#"{"score": 78, "feedback": "Good detail on partitioning.", "followUpQuestion": "How did you pick the partition key?"}"#;

    struct Harness {
        engine: InterviewEngine,
        sessions: Arc<InMemorySessionStore>,
        llm: Arc<ScriptedGenerator>,
        videos: Arc<StubVideoStorage>,
        user_id: Uuid,
        resume: ResumeSnapshot,
    }

    fn harness_with(videos: StubVideoStorage) -> Harness {
        let user_id = Uuid::new_v4();
        let resume = sample_snapshot(user_id);
        let sessions = Arc::new(InMemorySessionStore::default());
        let llm = Arc::new(ScriptedGenerator::default());
        let videos = Arc::new(videos);
        let engine = InterviewEngine::new(
            sessions.clone(),
            Arc::new(InMemoryResumeStore::with(vec![resume.clone()])),
            QuestionGenerator::new(llm.clone()),
            videos.clone(),
            EngineSettings::default(),
        );
        Harness {
            engine,
            sessions,
            llm,
            videos,
            user_id,
            resume,
        }
    }

    fn harness() -> Harness {
        harness_with(StubVideoStorage::default())
    }

    fn video() -> VideoUpload {
        VideoUpload {
            bytes: Bytes::from_static(b"webm-bytes"),
            content_type: Some("video/webm".to_string()),
            file_name: Some("answer.webm".to_string()),
        }
    }

    impl Harness {
        async fn create(&self, tier: SubscriptionTier) -> SessionSummary {
            self.llm.push(Ok("Tell me about ledger-rs.".to_string()));
            self.engine
                .create_session(NewSession {
                    user_id: self.user_id,
                    resume: self.resume.clone(),
                    interview_type: InterviewType::Technical,
                    jd_info: Some("  Backend engineer, payments  ".to_string()),
                    subscription_tier: tier,
                })
                .await
                .unwrap()
        }

        fn submission(&self, session_id: Uuid, transcript: &str) -> AnswerSubmission {
            AnswerSubmission {
                session_id,
                user_id: self.user_id,
                transcript: transcript.to_string(),
                video: None,
            }
        }

        fn end_request(&self, session_id: Uuid, reason: EndReason) -> EndRequest {
            EndRequest {
                session_id,
                user_id: self.user_id,
                reason,
                transcript: None,
                video: None,
            }
        }
    }

    #[tokio::test]
    async fn test_create_session_persists_one_pending_turn() {
        let h = harness();
        let summary = h.create(SubscriptionTier::Free).await;

        assert_eq!(summary.questions, vec!["Tell me about ledger-rs.".to_string()]);
        assert_eq!(summary.jd_info.as_deref(), Some("Backend engineer, payments"));

        let stored = h.sessions.get(summary.id).unwrap();
        assert_eq!(stored.turns.len(), 1);
        assert_eq!(stored.status, SessionStatus::Active);
        assert_eq!(stored.resume_id, h.resume.id);
    }

    #[tokio::test]
    async fn test_create_session_generation_failure_persists_nothing() {
        let h = harness();
        h.llm.push(Err(LlmError::Api {
            status: 529,
            message: "overloaded".to_string(),
        }));
        let result = h
            .engine
            .create_session(NewSession {
                user_id: h.user_id,
                resume: h.resume.clone(),
                interview_type: InterviewType::Hr,
                jd_info: None,
                subscription_tier: SubscriptionTier::Pro,
            })
            .await;

        assert!(matches!(result, Err(AppError::GenerationUnavailable(_))));
        assert_eq!(h.sessions.len(), 0);
    }

    #[tokio::test]
    async fn test_create_session_rejects_oversized_jd() {
        let h = harness();
        let result = h
            .engine
            .create_session(NewSession {
                user_id: h.user_id,
                resume: h.resume.clone(),
                interview_type: InterviewType::Technical,
                jd_info: Some("x".repeat(MAX_JD_INFO_CHARS + 1)),
                subscription_tier: SubscriptionTier::Pro,
            })
            .await;
        assert!(matches!(result, Err(AppError::Validation(_))));
        assert!(h.llm.prompts().is_empty());
    }

    #[tokio::test]
    async fn test_submit_answer_commits_full_turn() {
        let h = harness();
        let summary = h.create(SubscriptionTier::Pro).await;
        h.llm.push(Ok(FOLLOW_UP_JSON.to_string()));

        let mut submission = h.submission(summary.id, ANSWER);
        submission.video = Some(video());
        let result = h.engine.submit_answer(submission).await.unwrap();

        assert_eq!(result.score, 78);
        assert_eq!(result.follow_up_question, "How did you pick the partition key?");
        assert_eq!(result.question_index, 1);
        assert!(result.video_url.as_deref().unwrap().ends_with("/q0.webm"));
        assert_eq!(h.videos.uploads(), vec![(summary.id, 0)]);

        let stored = h.sessions.get(summary.id).unwrap();
        assert_eq!(stored.turns.len(), 2);
        let answered = stored.turns[0].response.as_ref().unwrap();
        assert_eq!(answered.transcript, ANSWER);
        assert_eq!(answered.analysis, result.analysis);
        assert!(stored.turns[1].response.is_none());
        assert_eq!(stored.current_question(), "How did you pick the partition key?");

        let follow_up_prompt = &h.llm.prompts()[1];
        assert!(follow_up_prompt.contains("Tell me about ledger-rs."));
        assert!(follow_up_prompt.contains(ANSWER));
        assert!(follow_up_prompt.contains("Backend engineer, payments"));
    }

    #[tokio::test]
    async fn test_submit_answer_generation_failure_is_atomic() {
        let h = harness();
        let summary = h.create(SubscriptionTier::Pro).await;
        let before = h.sessions.get(summary.id).unwrap();
        h.llm.push(Ok("no json here".to_string()));

        let result = h.engine.submit_answer(h.submission(summary.id, ANSWER)).await;

        assert!(matches!(result, Err(AppError::GenerationUnavailable(_))));
        assert_eq!(h.sessions.get(summary.id).unwrap(), before);

        // Nothing was committed, so the same answer can be resubmitted.
        h.llm.push(Ok(FOLLOW_UP_JSON.to_string()));
        let retry = h.engine.submit_answer(h.submission(summary.id, ANSWER)).await.unwrap();
        assert_eq!(retry.question_index, 1);
    }

    #[tokio::test]
    async fn test_submit_answer_upload_failure_skips_generation() {
        let h = harness_with(StubVideoStorage::failing());
        let summary = h.create(SubscriptionTier::Pro).await;
        let before = h.sessions.get(summary.id).unwrap();

        let mut submission = h.submission(summary.id, ANSWER);
        submission.video = Some(video());
        let result = h.engine.submit_answer(submission).await;

        assert!(matches!(result, Err(AppError::VideoUploadFailed(_))));
        assert_eq!(h.sessions.get(summary.id).unwrap(), before);
        assert_eq!(h.llm.prompts().len(), 1, "only the opening question was generated");
    }

    #[tokio::test]
    async fn test_submit_answer_requires_transcript() {
        let h = harness();
        let summary = h.create(SubscriptionTier::Pro).await;
        let result = h.engine.submit_answer(h.submission(summary.id, "   ")).await;
        assert!(matches!(result, Err(AppError::Validation(_))));
    }

    #[tokio::test]
    async fn test_foreign_session_is_not_found() {
        let h = harness();
        let summary = h.create(SubscriptionTier::Pro).await;

        let mut submission = h.submission(summary.id, ANSWER);
        submission.user_id = Uuid::new_v4();
        assert!(matches!(
            h.engine.submit_answer(submission).await,
            Err(AppError::NotFound(_))
        ));
        assert!(matches!(
            h.engine.get_runtime(summary.id, Uuid::new_v4()).await,
            Err(AppError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_submit_answer_to_ended_session() {
        let h = harness();
        let summary = h.create(SubscriptionTier::Pro).await;
        h.engine
            .end_session(h.end_request(summary.id, EndReason::Manual))
            .await
            .unwrap();

        let result = h.engine.submit_answer(h.submission(summary.id, ANSWER)).await;
        assert!(matches!(result, Err(AppError::SessionAlreadyEnded)));
    }

    #[tokio::test]
    async fn test_free_tier_expiry_ends_session() {
        let h = harness();
        let summary = h.create(SubscriptionTier::Free).await;
        let mut stored = h.sessions.get(summary.id).unwrap();
        stored.created_at = Utc::now() - Duration::minutes(6);
        h.sessions.put(stored);

        let result = h.engine.submit_answer(h.submission(summary.id, ANSWER)).await;
        assert!(matches!(result, Err(AppError::TimeLimitReached)));

        let ended = h.sessions.get(summary.id).unwrap();
        assert_eq!(ended.status, SessionStatus::Ended);
        assert_eq!(ended.end_reason, Some(EndReason::AutoTimeLimit));
        assert!(ended.final_report.is_some());
        assert_eq!(h.llm.prompts().len(), 1, "no follow-up after expiry");

        let again = h.engine.submit_answer(h.submission(summary.id, ANSWER)).await;
        assert!(matches!(again, Err(AppError::SessionAlreadyEnded)));
    }

    #[tokio::test]
    async fn test_free_tier_expiry_survives_concurrent_answer() {
        let h = harness();
        let summary = h.create(SubscriptionTier::Free).await;
        let mut stored = h.sessions.get(summary.id).unwrap();
        stored.created_at = Utc::now() - Duration::minutes(6);
        h.sessions.put(stored.clone());

        let mut other = stored;
        other
            .answer_current_turn(TurnResponse {
                transcript: "answered from another tab".to_string(),
                video_url: None,
                score: 60,
                feedback: "ok".to_string(),
                analysis: analyze("answered from another tab", InterviewType::Technical),
            })
            .unwrap();
        other.push_question("Another question".to_string()).unwrap();
        h.sessions.race_next_save(other);

        let result = h.engine.submit_answer(h.submission(summary.id, ANSWER)).await;
        assert!(matches!(result, Err(AppError::TimeLimitReached)));

        let ended = h.sessions.get(summary.id).unwrap();
        assert_eq!(ended.status, SessionStatus::Ended);
        assert_eq!(ended.end_reason, Some(EndReason::AutoTimeLimit));
        assert_eq!(ended.turns.len(), 2, "the concurrent answer is kept");
        assert_eq!(ended.final_report.unwrap().timeline_markers.len(), 1);
    }

    #[tokio::test]
    async fn test_pro_sessions_do_not_expire() {
        let h = harness();
        let summary = h.create(SubscriptionTier::Pro).await;
        let mut stored = h.sessions.get(summary.id).unwrap();
        stored.created_at = Utc::now() - Duration::hours(2);
        h.sessions.put(stored);

        h.llm.push(Ok(FOLLOW_UP_JSON.to_string()));
        assert!(h.engine.submit_answer(h.submission(summary.id, ANSWER)).await.is_ok());
    }

    #[tokio::test]
    async fn test_end_session_is_idempotent() {
        let h = harness();
        let summary = h.create(SubscriptionTier::Pro).await;

        let first = h
            .engine
            .end_session(h.end_request(summary.id, EndReason::Manual))
            .await
            .unwrap();
        let report_before = h.sessions.get(summary.id).unwrap().final_report;

        let second = h
            .engine
            .end_session(h.end_request(summary.id, EndReason::AutoTimeLimit))
            .await
            .unwrap();

        assert_eq!(first, second);
        assert_eq!(second.end_reason, Some(EndReason::Manual));
        assert_eq!(h.sessions.get(summary.id).unwrap().final_report, report_before);
    }

    #[tokio::test]
    async fn test_end_session_without_answers_has_empty_report() {
        let h = harness();
        let summary = h.create(SubscriptionTier::Free).await;
        h.engine
            .end_session(h.end_request(summary.id, EndReason::Manual))
            .await
            .unwrap();

        let report = h.engine.get_report(summary.id, h.user_id).await.unwrap();
        let final_report = report.final_report.unwrap();
        assert_eq!(final_report.confidence_score, 0);
        assert!(final_report.timeline_markers.is_empty());
        assert_eq!(final_report.improvement_suggestions.len(), 1);
        assert!(report.scores.is_empty());
    }

    #[tokio::test]
    async fn test_end_session_with_transcript_derives_score_without_generation() {
        let h = harness();
        let summary = h.create(SubscriptionTier::Pro).await;

        let mut request = h.end_request(summary.id, EndReason::Manual);
        request.transcript = Some(ANSWER.to_string());
        request.video = Some(video());
        h.engine.end_session(request).await.unwrap();

        let stored = h.sessions.get(summary.id).unwrap();
        assert_eq!(stored.turns.len(), 1);
        let response = stored.turns[0].response.as_ref().unwrap();
        let expected = analyze(ANSWER, InterviewType::Technical);

        let mean = (f64::from(expected.confidence_score)
            + f64::from(expected.domain_depth)
            + f64::from(expected.sentence_clarity))
            / 3.0;
        assert_eq!(response.score, mean.round() as u8);
        assert_eq!(
            response.feedback,
            expected.improvement_suggestions[..expected.improvement_suggestions.len().min(2)].join(" ")
        );
        assert!(response.video_url.is_some());
        assert_eq!(h.llm.prompts().len(), 1, "ending never asks for a follow-up");
        assert_eq!(stored.final_report.unwrap().timeline_markers.len(), 1);
    }

    #[tokio::test]
    async fn test_end_session_ignores_blank_transcript() {
        let h = harness();
        let summary = h.create(SubscriptionTier::Pro).await;
        let mut request = h.end_request(summary.id, EndReason::Manual);
        request.transcript = Some("  ".to_string());
        h.engine.end_session(request).await.unwrap();

        let stored = h.sessions.get(summary.id).unwrap();
        assert!(stored.turns[0].response.is_none());
    }

    #[tokio::test]
    async fn test_end_session_lost_race_returns_winner() {
        let h = harness();
        let summary = h.create(SubscriptionTier::Pro).await;

        let mut winner = h.sessions.get(summary.id).unwrap();
        winner.finish(EndReason::AutoTimeLimit, Utc::now()).unwrap();
        h.sessions.race_next_save(winner);

        let result = h
            .engine
            .end_session(h.end_request(summary.id, EndReason::Manual))
            .await
            .unwrap();
        assert_eq!(result.end_reason, Some(EndReason::AutoTimeLimit));
    }

    #[tokio::test]
    async fn test_concurrent_answer_is_a_conflict() {
        let h = harness();
        let summary = h.create(SubscriptionTier::Pro).await;

        h.llm.push(Ok(FOLLOW_UP_JSON.to_string()));
        let mut other = h.sessions.get(summary.id).unwrap();
        other
            .answer_current_turn(TurnResponse {
                transcript: "first writer".to_string(),
                video_url: None,
                score: 50,
                feedback: "ok".to_string(),
                analysis: analyze("first writer", InterviewType::Technical),
            })
            .unwrap();
        other.push_question("Another question".to_string()).unwrap();
        h.sessions.race_next_save(other);

        let result = h.engine.submit_answer(h.submission(summary.id, ANSWER)).await;
        assert!(matches!(result, Err(AppError::Conflict(_))));
        assert_eq!(h.sessions.get(summary.id).unwrap().turns.len(), 2);
    }

    #[tokio::test]
    async fn test_report_requires_ended_session() {
        let h = harness();
        let summary = h.create(SubscriptionTier::Pro).await;
        assert!(matches!(
            h.engine.get_report(summary.id, h.user_id).await,
            Err(AppError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_runtime_reports_remaining_free_time() {
        let h = harness();
        let free = h.create(SubscriptionTier::Free).await;
        let runtime = h.engine.get_runtime(free.id, h.user_id).await.unwrap();
        let remaining = runtime.remaining_seconds.unwrap();
        assert!((295..=300).contains(&remaining));

        let pro = h.create(SubscriptionTier::Pro).await;
        let runtime = h.engine.get_runtime(pro.id, h.user_id).await.unwrap();
        assert_eq!(runtime.remaining_seconds, None);
    }

    #[tokio::test]
    async fn test_dashboard_only_sees_own_sessions() {
        let h = harness();
        let first = h.create(SubscriptionTier::Pro).await;
        h.create(SubscriptionTier::Pro).await;
        h.engine
            .end_session(h.end_request(first.id, EndReason::Manual))
            .await
            .unwrap();

        let dashboard = h.engine.get_dashboard(h.user_id).await.unwrap();
        assert_eq!(dashboard.total_sessions, 2);
        assert_eq!(dashboard.ended_sessions, 1);
        assert_eq!(dashboard.trend.len(), 1);

        let stranger = h.engine.get_dashboard(Uuid::new_v4()).await.unwrap();
        assert_eq!(stranger.total_sessions, 0);
    }

    #[test]
    fn test_derived_feedback_uses_first_two_tips() {
        let analysis = AnswerAnalysisReport {
            improvement_suggestions: vec!["One.".into(), "Two.".into(), "Three.".into()],
            ..AnswerAnalysisReport::default()
        };
        assert_eq!(derived_feedback(&analysis), "One. Two.");
        assert_eq!(derived_feedback(&AnswerAnalysisReport::default()), DEFAULT_FEEDBACK);
    }

    #[test]
    fn test_derived_score_rounds_mean() {
        let analysis = AnswerAnalysisReport {
            confidence_score: 70,
            domain_depth: 41,
            sentence_clarity: 90,
            ..AnswerAnalysisReport::default()
        };
        // (70 + 41 + 90) / 3 = 67
        assert_eq!(derived_score(&analysis), 67);
    }
}
