//! The interview session aggregate.
//!
//! Turns are stored as one ordered sequence of `Turn` records, so the
//! question/answer/score alignment is structural: every turn but the last is
//! answered while the session is active, and the last turn holds the pending
//! question.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::errors::AppError;
use crate::interview::analysis::{finalize, AnswerAnalysisReport, FinalReport};
use crate::models::interview::InterviewSessionRow;
use crate::models::user::SubscriptionTier;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InterviewType {
    Technical,
    Hr,
}

impl InterviewType {
    pub fn as_str(&self) -> &'static str {
        match self {
            InterviewType::Technical => "technical",
            InterviewType::Hr => "hr",
        }
    }

    pub fn depth_label(&self) -> &'static str {
        match self {
            InterviewType::Technical => "Technical depth",
            InterviewType::Hr => "Behavioral depth",
        }
    }
}

impl FromStr for InterviewType {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "technical" => Ok(InterviewType::Technical),
            "hr" => Ok(InterviewType::Hr),
            other => Err(anyhow::anyhow!("unknown interview type '{other}'")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    Active,
    Ended,
}

impl SessionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionStatus::Active => "active",
            SessionStatus::Ended => "ended",
        }
    }
}

impl FromStr for SessionStatus {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "active" => Ok(SessionStatus::Active),
            "ended" => Ok(SessionStatus::Ended),
            other => Err(anyhow::anyhow!("unknown session status '{other}'")),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EndReason {
    #[default]
    Manual,
    AutoTimeLimit,
}

impl EndReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            EndReason::Manual => "manual",
            EndReason::AutoTimeLimit => "auto_time_limit",
        }
    }
}

impl fmt::Display for EndReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EndReason {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "manual" => Ok(EndReason::Manual),
            "auto_time_limit" => Ok(EndReason::AutoTimeLimit),
            other => Err(anyhow::anyhow!("unknown end reason '{other}'")),
        }
    }
}

/// What the candidate gave for one question, and how it was judged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TurnResponse {
    pub transcript: String,
    pub video_url: Option<String>,
    pub score: u8,
    pub feedback: String,
    pub analysis: AnswerAnalysisReport,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Turn {
    pub question: String,
    #[serde(default)]
    pub response: Option<TurnResponse>,
}

impl Turn {
    fn pending(question: String) -> Self {
        Self {
            question,
            response: None,
        }
    }

    pub fn is_answered(&self) -> bool {
        self.response.is_some()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct InterviewSession {
    pub id: Uuid,
    pub user_id: Uuid,
    pub resume_id: Uuid,
    pub interview_type: InterviewType,
    pub subscription_tier: SubscriptionTier,
    pub jd_info: Option<String>,
    pub turns: Vec<Turn>,
    pub final_report: Option<FinalReport>,
    pub status: SessionStatus,
    pub end_reason: Option<EndReason>,
    pub created_at: DateTime<Utc>,
    pub ended_at: Option<DateTime<Utc>>,
    /// Optimistic-concurrency token; the store rejects saves from a stale copy.
    pub version: i32,
}

impl InterviewSession {
    pub fn start(
        user_id: Uuid,
        resume_id: Uuid,
        interview_type: InterviewType,
        subscription_tier: SubscriptionTier,
        jd_info: Option<String>,
        first_question: String,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id,
            resume_id,
            interview_type,
            subscription_tier,
            jd_info,
            turns: vec![Turn::pending(first_question)],
            final_report: None,
            status: SessionStatus::Active,
            end_reason: None,
            created_at: now,
            ended_at: None,
            version: 0,
        }
    }

    pub fn is_ended(&self) -> bool {
        self.status == SessionStatus::Ended
    }

    pub fn ensure_active(&self) -> Result<(), AppError> {
        if self.is_ended() {
            return Err(AppError::SessionAlreadyEnded);
        }
        Ok(())
    }

    /// Index of the pending (last) question.
    pub fn current_turn_index(&self) -> usize {
        self.turns.len().saturating_sub(1)
    }

    pub fn current_question(&self) -> &str {
        self.turns
            .last()
            .map(|t| t.question.trim())
            .unwrap_or_default()
    }

    pub fn current_turn_answered(&self) -> bool {
        self.turns.last().is_some_and(Turn::is_answered)
    }

    /// Free-tier sessions expire a fixed wall-clock interval after creation.
    pub fn free_tier_expired(&self, now: DateTime<Utc>, limit: Duration) -> bool {
        self.subscription_tier == SubscriptionTier::Free && now - self.created_at >= limit
    }

    /// Seconds left before the free-tier limit, `None` for unlimited tiers.
    pub fn remaining_seconds(&self, now: DateTime<Utc>, limit: Duration) -> Option<i64> {
        match self.subscription_tier {
            SubscriptionTier::Free => Some((limit - (now - self.created_at)).num_seconds().max(0)),
            SubscriptionTier::Pro => None,
        }
    }

    /// Records the answer for the pending turn. Returns the answered turn's index.
    pub fn answer_current_turn(&mut self, response: TurnResponse) -> Result<usize, AppError> {
        self.ensure_active()?;
        let index = self.current_turn_index();
        let turn = self
            .turns
            .last_mut()
            .ok_or_else(|| AppError::Internal(anyhow::anyhow!("session {} has no turns", self.id)))?;
        if turn.is_answered() {
            return Err(AppError::Conflict(format!(
                "turn {index} of session {} is already answered",
                self.id
            )));
        }
        turn.response = Some(response);
        Ok(index)
    }

    /// Opens the next turn. Only valid once the current turn is answered.
    pub fn push_question(&mut self, question: String) -> Result<(), AppError> {
        self.ensure_active()?;
        if !self.current_turn_answered() {
            return Err(AppError::Internal(anyhow::anyhow!(
                "cannot open a new turn in session {} before the current one is answered",
                self.id
            )));
        }
        self.turns.push(Turn::pending(question));
        Ok(())
    }

    pub fn analyses(&self) -> impl Iterator<Item = &AnswerAnalysisReport> {
        self.turns
            .iter()
            .filter_map(|t| t.response.as_ref().map(|r| &r.analysis))
    }

    /// Terminal transition. Computes the final report from recorded analyses.
    pub fn finish(&mut self, reason: EndReason, now: DateTime<Utc>) -> Result<(), AppError> {
        self.ensure_active()?;
        self.final_report = Some(finalize(self.analyses(), self.interview_type));
        self.status = SessionStatus::Ended;
        self.end_reason = Some(reason);
        self.ended_at = Some(now);
        Ok(())
    }
}

impl TryFrom<InterviewSessionRow> for InterviewSession {
    type Error = anyhow::Error;

    fn try_from(row: InterviewSessionRow) -> Result<Self, Self::Error> {
        let turns: Vec<Turn> = serde_json::from_value(row.turns)
            .map_err(|e| anyhow::anyhow!("session {} has malformed turns: {e}", row.id))?;
        if turns.is_empty() {
            anyhow::bail!("session {} has no turns", row.id);
        }
        let final_report = row
            .final_report
            .map(serde_json::from_value)
            .transpose()
            .map_err(|e| anyhow::anyhow!("session {} has a malformed final report: {e}", row.id))?;

        Ok(InterviewSession {
            id: row.id,
            user_id: row.user_id,
            resume_id: row.resume_id,
            interview_type: row.interview_type.parse()?,
            subscription_tier: row.subscription_tier.parse()?,
            jd_info: row.jd_info.filter(|s| !s.is_empty()),
            turns,
            final_report,
            status: row.status.parse()?,
            end_reason: row
                .end_reason
                .as_deref()
                .map(str::parse::<EndReason>)
                .transpose()?,
            created_at: row.created_at,
            ended_at: row.ended_at,
            version: row.version,
        })
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Projections returned to callers
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSummary {
    pub id: Uuid,
    #[serde(rename = "type")]
    pub interview_type: InterviewType,
    pub jd_info: Option<String>,
    pub questions: Vec<String>,
    pub subscription_tier: SubscriptionTier,
    pub created_at: DateTime<Utc>,
}

impl From<&InterviewSession> for SessionSummary {
    fn from(session: &InterviewSession) -> Self {
        Self {
            id: session.id,
            interview_type: session.interview_type,
            jd_info: session.jd_info.clone(),
            questions: session.turns.iter().map(|t| t.question.clone()).collect(),
            subscription_tier: session.subscription_tier,
            created_at: session.created_at,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnswerResult {
    pub session_id: Uuid,
    pub score: u8,
    pub feedback: String,
    pub follow_up_question: String,
    pub video_url: Option<String>,
    pub question_index: usize,
    pub analysis: AnswerAnalysisReport,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EndResult {
    pub session_id: Uuid,
    pub status: SessionStatus,
    pub end_reason: Option<EndReason>,
}

impl From<&InterviewSession> for EndResult {
    fn from(session: &InterviewSession) -> Self {
        Self {
            session_id: session.id,
            status: session.status,
            end_reason: session.end_reason,
        }
    }
}

/// Live view used by the in-progress interview screen.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionRuntime {
    pub id: Uuid,
    #[serde(rename = "type")]
    pub interview_type: InterviewType,
    pub questions: Vec<String>,
    pub subscription_tier: SubscriptionTier,
    pub status: SessionStatus,
    pub created_at: DateTime<Utc>,
    pub remaining_seconds: Option<i64>,
}

/// Full report projection. Per-question lists (`questions`, `transcripts`,
/// `answer_video_urls`) cover every turn; per-answer lists (`scores`,
/// `feedbacks`, `analysis_reports`) cover answered turns only.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionReport {
    pub id: Uuid,
    #[serde(rename = "type")]
    pub interview_type: InterviewType,
    pub questions: Vec<String>,
    pub transcripts: Vec<String>,
    pub answer_video_urls: Vec<String>,
    pub scores: Vec<u8>,
    pub feedbacks: Vec<String>,
    pub analysis_reports: Vec<AnswerAnalysisReport>,
    pub final_report: Option<FinalReport>,
    pub status: SessionStatus,
    pub end_reason: Option<EndReason>,
    pub created_at: DateTime<Utc>,
    pub ended_at: Option<DateTime<Utc>>,
}

impl From<&InterviewSession> for SessionReport {
    fn from(session: &InterviewSession) -> Self {
        let answered = || session.turns.iter().filter_map(|t| t.response.as_ref());
        Self {
            id: session.id,
            interview_type: session.interview_type,
            questions: session.turns.iter().map(|t| t.question.clone()).collect(),
            transcripts: session
                .turns
                .iter()
                .map(|t| t.response.as_ref().map(|r| r.transcript.clone()).unwrap_or_default())
                .collect(),
            answer_video_urls: session
                .turns
                .iter()
                .map(|t| {
                    t.response
                        .as_ref()
                        .and_then(|r| r.video_url.clone())
                        .unwrap_or_default()
                })
                .collect(),
            scores: answered().map(|r| r.score).collect(),
            feedbacks: answered().map(|r| r.feedback.clone()).collect(),
            analysis_reports: answered().map(|r| r.analysis.clone()).collect(),
            final_report: session.final_report.clone(),
            status: session.status,
            end_reason: session.end_reason,
            created_at: session.created_at,
            ended_at: session.ended_at,
        }
    }
}
