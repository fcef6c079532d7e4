use std::sync::Arc;

use crate::accounts::entitlement::EntitlementService;
use crate::accounts::rate_limit::RateLimiter;
use crate::accounts::resumes::ResumeStore;
use crate::interview::engine::InterviewEngine;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<InterviewEngine>,
    /// Resume lookups for session creation. Same cached store the engine uses.
    pub resumes: Arc<dyn ResumeStore>,
    pub entitlements: Arc<dyn EntitlementService>,
    pub rate_limiter: RateLimiter,
}
