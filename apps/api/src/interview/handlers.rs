use axum::{
    extract::{Multipart, Path, State},
    Json,
};
use serde::Deserialize;
use tracing::debug;
use uuid::Uuid;

use crate::accounts::entitlement::Entitlement;
use crate::auth::CurrentUser;
use crate::errors::AppError;
use crate::interview::dashboard::Dashboard;
use crate::interview::engine::{AnswerSubmission, EndRequest, NewSession};
use crate::interview::session::{
    AnswerResult, EndReason, EndResult, InterviewType, SessionReport, SessionRuntime,
    SessionSummary,
};
use crate::state::AppState;
use crate::storage::VideoUpload;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateInterviewRequest {
    #[serde(rename = "type")]
    pub interview_type: String,
    #[serde(default)]
    pub jd_info: Option<String>,
}

/// GET /api/v1/allowance
pub async fn handle_allowance(
    State(state): State<AppState>,
    user: CurrentUser,
) -> Result<Json<Entitlement>, AppError> {
    Ok(Json(state.entitlements.entitlement(user.id).await?))
}

/// GET /api/v1/dashboard
pub async fn handle_dashboard(
    State(state): State<AppState>,
    user: CurrentUser,
) -> Result<Json<Dashboard>, AppError> {
    Ok(Json(state.engine.get_dashboard(user.id).await?))
}

/// POST /api/v1/interviews
pub async fn handle_create_interview(
    State(state): State<AppState>,
    user: CurrentUser,
    Json(req): Json<CreateInterviewRequest>,
) -> Result<Json<SessionSummary>, AppError> {
    state.rate_limiter.check("create", user.id).await?;
    debug!(
        user_id = %user.id,
        email = user.email.as_deref().unwrap_or("unknown"),
        "Interview requested (type {})",
        req.interview_type
    );

    let interview_type: InterviewType = req
        .interview_type
        .trim()
        .parse()
        .map_err(|_| AppError::Validation("type must be 'technical' or 'hr'.".to_string()))?;

    let resume = state.resumes.latest_for_user(user.id).await?.ok_or_else(|| {
        AppError::Validation(
            "No resume found. Upload a resume before starting an interview.".to_string(),
        )
    })?;

    let entitlement = state.entitlements.entitlement(user.id).await?;
    if !entitlement.can_start_interview() {
        return Err(AppError::AllowanceExhausted);
    }

    let summary = state
        .engine
        .create_session(NewSession {
            user_id: user.id,
            resume,
            interview_type,
            jd_info: req.jd_info,
            subscription_tier: entitlement.subscription_tier,
        })
        .await?;
    Ok(Json(summary))
}

/// POST /api/v1/interviews/:id/answer
pub async fn handle_submit_answer(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<Uuid>,
    multipart: Multipart,
) -> Result<Json<AnswerResult>, AppError> {
    state.rate_limiter.check("answer", user.id).await?;
    let form = InterviewForm::read(multipart).await?;

    let result = state
        .engine
        .submit_answer(AnswerSubmission {
            session_id: id,
            user_id: user.id,
            transcript: form.transcript.unwrap_or_default(),
            video: form.video,
        })
        .await?;
    Ok(Json(result))
}

/// POST /api/v1/interviews/:id/end
pub async fn handle_end_interview(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<Uuid>,
    multipart: Multipart,
) -> Result<Json<EndResult>, AppError> {
    state.rate_limiter.check("end", user.id).await?;
    let form = InterviewForm::read(multipart).await?;

    let reason = match form.reason.as_deref().map(str::trim) {
        None | Some("") => EndReason::default(),
        Some(raw) => raw.parse().map_err(|_| {
            AppError::Validation("reason must be 'manual' or 'auto_time_limit'.".to_string())
        })?,
    };

    let result = state
        .engine
        .end_session(EndRequest {
            session_id: id,
            user_id: user.id,
            reason,
            transcript: form.transcript,
            video: form.video,
        })
        .await?;
    Ok(Json(result))
}

/// GET /api/v1/interviews/:id
pub async fn handle_get_interview(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<Uuid>,
) -> Result<Json<SessionRuntime>, AppError> {
    Ok(Json(state.engine.get_runtime(id, user.id).await?))
}

/// GET /api/v1/interviews/:id/report
pub async fn handle_get_report(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<Uuid>,
) -> Result<Json<SessionReport>, AppError> {
    Ok(Json(state.engine.get_report(id, user.id).await?))
}

/// Multipart body shared by the answer and end endpoints. Unknown parts are ignored.
#[derive(Debug, Default)]
struct InterviewForm {
    transcript: Option<String>,
    reason: Option<String>,
    video: Option<VideoUpload>,
}

impl InterviewForm {
    async fn read(mut multipart: Multipart) -> Result<Self, AppError> {
        let mut form = InterviewForm::default();

        while let Some(field) = multipart
            .next_field()
            .await
            .map_err(|e| AppError::Validation(format!("Malformed multipart body: {e}")))?
        {
            let name = field.name().unwrap_or_default().to_string();
            match name.as_str() {
                "transcript" => form.transcript = Some(read_text(field).await?),
                "reason" => form.reason = Some(read_text(field).await?),
                "video" => {
                    let content_type = field.content_type().map(str::to_string);
                    let file_name = field.file_name().map(str::to_string);
                    let bytes = field
                        .bytes()
                        .await
                        .map_err(|e| AppError::Validation(format!("Unreadable video part: {e}")))?;
                    if !bytes.is_empty() {
                        form.video = Some(VideoUpload {
                            bytes,
                            content_type,
                            file_name,
                        });
                    }
                }
                _ => {}
            }
        }

        Ok(form)
    }
}

async fn read_text(field: axum::extract::multipart::Field<'_>) -> Result<String, AppError> {
    field
        .text()
        .await
        .map_err(|e| AppError::Validation(format!("Unreadable form field: {e}")))
}
