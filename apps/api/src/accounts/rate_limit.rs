//! Fixed-window, per-user request limiter backed by the shared cache.

use std::sync::Arc;
use std::time::Duration;

use tracing::warn;
use uuid::Uuid;

use crate::cache::Cache;
use crate::errors::AppError;

const WINDOW: Duration = Duration::from_secs(60);

#[derive(Clone)]
pub struct RateLimiter {
    cache: Arc<dyn Cache>,
    limit_per_window: u32,
}

impl RateLimiter {
    pub fn new(cache: Arc<dyn Cache>, limit_per_window: u32) -> Self {
        Self {
            cache,
            limit_per_window,
        }
    }

    /// Counts one request for `(scope, user_id)`. Fails open when the cache is
    /// unreachable.
    pub async fn check(&self, scope: &str, user_id: Uuid) -> Result<(), AppError> {
        let key = format!("ratelimit:{scope}:{user_id}");
        match self.cache.increment(&key, WINDOW).await {
            Ok(count) if count > u64::from(self.limit_per_window) => {
                warn!("Rate limit hit for user {user_id} on {scope} ({count} requests)");
                Err(AppError::RateLimited)
            }
            Ok(_) => Ok(()),
            Err(e) => {
                warn!("Rate limiter unavailable, allowing request: {e}");
                Ok(())
            }
        }
    }
}
