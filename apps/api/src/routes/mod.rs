pub mod health;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};

use crate::interview::handlers;
use crate::state::AppState;

/// Answer recordings arrive in the multipart body.
const MAX_UPLOAD_BYTES: usize = 100 * 1024 * 1024;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        .route("/api/v1/allowance", get(handlers::handle_allowance))
        .route("/api/v1/dashboard", get(handlers::handle_dashboard))
        .route("/api/v1/interviews", post(handlers::handle_create_interview))
        .route("/api/v1/interviews/:id", get(handlers::handle_get_interview))
        .route(
            "/api/v1/interviews/:id/answer",
            post(handlers::handle_submit_answer),
        )
        .route(
            "/api/v1/interviews/:id/end",
            post(handlers::handle_end_interview),
        )
        .route(
            "/api/v1/interviews/:id/report",
            get(handlers::handle_get_report),
        )
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
        .with_state(state)
}
