use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

/// Application-level error type.
/// Implements `IntoResponse` so Axum handlers can return `Result<T, AppError>`.
#[derive(Debug, Error)]
pub enum AppError {
    /// Missing or foreign resource. Never reveals whether another user owns it.
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Interview session has already ended")]
    SessionAlreadyEnded,

    /// The free-tier wall-clock limit was observed; the session has been ended.
    #[error("Free-tier interview time limit reached")]
    TimeLimitReached,

    #[error("Monthly interview allowance exhausted")]
    AllowanceExhausted,

    #[error("Unauthorized")]
    Unauthorized,

    #[error("Rate limit exceeded")]
    RateLimited,

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Question generation unavailable: {0}")]
    GenerationUnavailable(String),

    #[error("Video upload failed: {0}")]
    VideoUploadFailed(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Internal server error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    fn parts(&self) -> (StatusCode, &'static str, String) {
        match self {
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, "NOT_FOUND", msg.clone()),
            AppError::Validation(msg) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", msg.clone()),
            AppError::SessionAlreadyEnded => (
                StatusCode::BAD_REQUEST,
                "SESSION_ALREADY_ENDED",
                "Interview session has already ended.".to_string(),
            ),
            AppError::TimeLimitReached => (
                StatusCode::FORBIDDEN,
                "TIME_LIMIT_REACHED",
                "Free-tier interview time limit reached. Session ended.".to_string(),
            ),
            AppError::AllowanceExhausted => (
                StatusCode::FORBIDDEN,
                "ALLOWANCE_EXHAUSTED",
                "Free plan monthly interview limit reached. Upgrade to Pro to continue."
                    .to_string(),
            ),
            AppError::Unauthorized => (
                StatusCode::UNAUTHORIZED,
                "UNAUTHORIZED",
                "Authentication required".to_string(),
            ),
            AppError::RateLimited => (
                StatusCode::TOO_MANY_REQUESTS,
                "RATE_LIMITED",
                "Too many requests. Try again shortly.".to_string(),
            ),
            AppError::Conflict(msg) => {
                tracing::warn!("Conflict: {msg}");
                (
                    StatusCode::CONFLICT,
                    "CONFLICT",
                    "The session was modified concurrently. Retry the request.".to_string(),
                )
            }
            AppError::GenerationUnavailable(msg) => {
                tracing::error!("Generation error: {msg}");
                (
                    StatusCode::BAD_GATEWAY,
                    "GENERATION_UNAVAILABLE",
                    "The interviewer is unavailable right now. Please retry.".to_string(),
                )
            }
            AppError::VideoUploadFailed(msg) => {
                tracing::error!("Video upload error: {msg}");
                (
                    StatusCode::BAD_GATEWAY,
                    "VIDEO_UPLOAD_FAILED",
                    "Unable to upload answer video.".to_string(),
                )
            }
            AppError::Database(e) => {
                tracing::error!("Database error: {e}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "DATABASE_ERROR",
                    "A database error occurred".to_string(),
                )
            }
            AppError::Internal(e) => {
                tracing::error!("Internal error: {e:?}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL_ERROR",
                    "An internal server error occurred".to_string(),
                )
            }
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = self.parts();

        let body = Json(json!({
            "error": {
                "code": code,
                "message": message
            }
        }));

        (status, body).into_response()
    }
}
