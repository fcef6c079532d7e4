//! Per-user performance summary across all of a user's sessions.

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::interview::session::{InterviewSession, InterviewType, SessionStatus};

/// Ended sessions charted in the trend, oldest first.
pub const TREND_POINTS: usize = 8;
pub const RECENT_SESSIONS: usize = 5;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Dashboard {
    pub total_sessions: usize,
    pub ended_sessions: usize,
    pub avg_confidence: u32,
    pub avg_score: u32,
    pub trend: Vec<TrendPoint>,
    pub recent: Vec<RecentSession>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TrendPoint {
    pub label: String,
    pub confidence: u8,
    pub filler_words: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RecentSession {
    pub id: Uuid,
    #[serde(rename = "type")]
    pub interview_type: InterviewType,
    pub status: SessionStatus,
    pub created_at: DateTime<Utc>,
    pub confidence: u8,
}

/// Builds the dashboard from a user's sessions, in any order.
///
/// `avg_score` averages each ended session's mean non-zero answer score; ended
/// sessions without a scored answer count as zero.
pub fn summarize(sessions: &[InterviewSession]) -> Dashboard {
    let mut newest_first: Vec<&InterviewSession> = sessions.iter().collect();
    newest_first.sort_by(|a, b| b.created_at.cmp(&a.created_at));

    let ended: Vec<&InterviewSession> = newest_first
        .iter()
        .copied()
        .filter(|s| s.is_ended())
        .collect();

    let avg_confidence = rounded_mean(ended.iter().map(|s| f64::from(confidence(s))), ended.len());
    let avg_score = rounded_mean(ended.iter().map(|s| mean_scored_answer(s)), ended.len());

    let trend = ended
        .iter()
        .take(TREND_POINTS)
        .rev()
        .enumerate()
        .map(|(i, s)| TrendPoint {
            label: format!("S{}", i + 1),
            confidence: confidence(s),
            filler_words: s
                .final_report
                .as_ref()
                .map(|r| r.filler_words_count)
                .unwrap_or(0),
        })
        .collect();

    let recent = newest_first
        .iter()
        .take(RECENT_SESSIONS)
        .map(|s| RecentSession {
            id: s.id,
            interview_type: s.interview_type,
            status: s.status,
            created_at: s.created_at,
            confidence: confidence(s),
        })
        .collect();

    Dashboard {
        total_sessions: sessions.len(),
        ended_sessions: ended.len(),
        avg_confidence,
        avg_score,
        trend,
        recent,
    }
}

fn confidence(session: &InterviewSession) -> u8 {
    session
        .final_report
        .as_ref()
        .map(|r| r.confidence_score)
        .unwrap_or(0)
}

fn mean_scored_answer(session: &InterviewSession) -> f64 {
    let scores: Vec<f64> = session
        .turns
        .iter()
        .filter_map(|t| t.response.as_ref())
        .map(|r| f64::from(r.score))
        .filter(|score| *score > 0.0)
        .collect();
    if scores.is_empty() {
        return 0.0;
    }
    scores.iter().sum::<f64>() / scores.len() as f64
}

fn rounded_mean(values: impl Iterator<Item = f64>, count: usize) -> u32 {
    if count == 0 {
        return 0;
    }
    (values.sum::<f64>() / count as f64).round() as u32
}
