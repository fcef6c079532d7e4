//! Question generation. Builds interviewer prompts from the structured resume
//! and turns raw model output into questions, scores, and feedback.
//!
//! The adapter does not retry. Transport or parse failures surface as
//! `AppError::GenerationUnavailable`; missing fields inside otherwise valid
//! JSON are defaulted so the turn loop always has a next question.

use std::sync::Arc;

use serde_json::Value;
use tracing::warn;

use crate::errors::AppError;
use crate::interview::analysis::clamp_score;
use crate::interview::prompts::{
    DEFAULT_FEEDBACK, DEFAULT_FOLLOW_UP_QUESTION, FOLLOW_UP_PROMPT_TEMPLATE, HR_MODE,
    INTERVIEWER_SYSTEM, NO_JD_CONTEXT, OPENING_QUESTION_PROMPT_TEMPLATE, TECHNICAL_MODE,
};
use crate::interview::session::InterviewType;
use crate::llm_client::prompts::RESUME_GROUNDING_INSTRUCTION;
use crate::llm_client::{OutputFormat, TextGenerator};
use crate::models::resume::StructuredResume;

/// Score, feedback, and next question for a just-answered turn.
#[derive(Debug, Clone, PartialEq)]
pub struct FollowUp {
    pub score: u8,
    pub feedback: String,
    pub follow_up_question: String,
}

/// Inputs for a follow-up request.
pub struct FollowUpRequest<'a> {
    pub structured_resume: &'a StructuredResume,
    pub previous_question: &'a str,
    pub answer_transcript: &'a str,
    pub interview_type: InterviewType,
    pub jd_info: Option<&'a str>,
}

#[derive(Clone)]
pub struct QuestionGenerator {
    llm: Arc<dyn TextGenerator>,
}

impl QuestionGenerator {
    pub fn new(llm: Arc<dyn TextGenerator>) -> Self {
        Self { llm }
    }

    /// Produces the first question of a session.
    pub async fn opening_question(
        &self,
        structured_resume: &StructuredResume,
        interview_type: InterviewType,
        jd_info: Option<&str>,
    ) -> Result<String, AppError> {
        let prompt = OPENING_QUESTION_PROMPT_TEMPLATE
            .replace("{grounding_instruction}", RESUME_GROUNDING_INSTRUCTION)
            .replace("{mode_instructions}", mode_instructions(interview_type))
            .replace("{jd_context}", &jd_context(jd_info))
            .replace("{resume_json}", &resume_json(structured_resume)?);

        let raw = self
            .llm
            .generate(&prompt, INTERVIEWER_SYSTEM, OutputFormat::Text)
            .await
            .map_err(|e| {
                AppError::GenerationUnavailable(format!("opening question failed: {e}"))
            })?;

        let question = strip_list_marker(&raw);
        if question.is_empty() {
            return Err(AppError::GenerationUnavailable(
                "opening question was empty".to_string(),
            ));
        }
        Ok(question.to_string())
    }

    /// Scores the previous answer and asks the next question.
    pub async fn follow_up(&self, request: FollowUpRequest<'_>) -> Result<FollowUp, AppError> {
        let prompt = FOLLOW_UP_PROMPT_TEMPLATE
            .replace("{grounding_instruction}", RESUME_GROUNDING_INSTRUCTION)
            .replace("{mode_instructions}", mode_instructions(request.interview_type))
            .replace("{jd_context}", &jd_context(request.jd_info))
            .replace("{resume_json}", &resume_json(request.structured_resume)?)
            .replace("{previous_question}", request.previous_question)
            .replace("{answer}", request.answer_transcript);

        let raw = self
            .llm
            .generate(&prompt, INTERVIEWER_SYSTEM, OutputFormat::Json)
            .await
            .map_err(|e| AppError::GenerationUnavailable(format!("follow-up failed: {e}")))?;

        parse_follow_up(&raw)
    }
}

fn mode_instructions(interview_type: InterviewType) -> &'static str {
    match interview_type {
        InterviewType::Technical => TECHNICAL_MODE,
        InterviewType::Hr => HR_MODE,
    }
}

fn jd_context(jd_info: Option<&str>) -> String {
    match jd_info.map(str::trim).filter(|s| !s.is_empty()) {
        Some(jd) => format!("Job description context:\n{jd}"),
        None => NO_JD_CONTEXT.to_string(),
    }
}

fn resume_json(structured_resume: &StructuredResume) -> Result<String, AppError> {
    serde_json::to_string(structured_resume)
        .map_err(|e| AppError::Internal(anyhow::anyhow!("Failed to serialize resume: {e}")))
}

/// Strips a leading "1." / "2)" / "- " / "* " marker and surrounding whitespace.
fn strip_list_marker(raw: &str) -> &str {
    let trimmed = raw.trim();
    let without_number = trimmed.trim_start_matches(|c: char| c.is_ascii_digit());
    let rest = if without_number.len() != trimmed.len() {
        without_number.trim_start_matches(|c: char| matches!(c, ')' | '.' | '-') || c.is_whitespace())
    } else {
        trimmed.trim_start_matches(|c: char| matches!(c, '-' | '*' | '•') || c.is_whitespace())
    };
    rest.trim()
}

/// Parses the follow-up payload out of raw model text.
///
/// The JSON object is taken from the first `{` to the last `}`, which tolerates
/// prose or code fences around it.
pub fn parse_follow_up(raw: &str) -> Result<FollowUp, AppError> {
    let (start, end) = match (raw.find('{'), raw.rfind('}')) {
        (Some(start), Some(end)) if start < end => (start, end),
        _ => {
            return Err(AppError::GenerationUnavailable(
                "follow-up response contained no JSON object".to_string(),
            ))
        }
    };

    let payload: Value = serde_json::from_str(&raw[start..=end]).map_err(|e| {
        AppError::GenerationUnavailable(format!("follow-up response was not valid JSON: {e}"))
    })?;

    if !payload.is_object() {
        return Err(AppError::GenerationUnavailable(
            "follow-up response was not a JSON object".to_string(),
        ));
    }

    let score = coerce_score(payload.get("score"));
    let feedback = non_blank(payload.get("feedback")).unwrap_or_else(|| {
        warn!("Follow-up response had no feedback; using default");
        DEFAULT_FEEDBACK.to_string()
    });
    let follow_up_question = non_blank(payload.get("followUpQuestion")).unwrap_or_else(|| {
        warn!("Follow-up response had no next question; using default probe");
        DEFAULT_FOLLOW_UP_QUESTION.to_string()
    });

    Ok(FollowUp {
        score,
        feedback,
        follow_up_question,
    })
}

/// Numbers and numeric strings are clamped to [0, 100]; anything else is 0.
fn coerce_score(value: Option<&Value>) -> u8 {
    let number = match value {
        Some(Value::Number(n)) => n.as_f64(),
        Some(Value::String(s)) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    number.filter(|n| n.is_finite()).map(clamp_score).unwrap_or(0)
}

fn non_blank(value: Option<&Value>) -> Option<String> {
    value
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}
