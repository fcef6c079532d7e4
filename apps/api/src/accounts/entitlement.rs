//! Subscription entitlements: tier plus how many interviews the user may still
//! start this calendar month (UTC).

use async_trait::async_trait;
use chrono::{DateTime, Datelike, TimeZone, Utc};
use serde::Serialize;
use sqlx::PgPool;
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::user::{SubscriptionTier, UserRow};

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Entitlement {
    pub subscription_tier: SubscriptionTier,
    pub interviews_remaining_this_month: u32,
}

impl Entitlement {
    pub fn can_start_interview(&self) -> bool {
        self.interviews_remaining_this_month > 0
    }
}

#[async_trait]
pub trait EntitlementService: Send + Sync {
    async fn entitlement(&self, user_id: Uuid) -> Result<Entitlement, AppError>;
}

pub struct PgEntitlementService {
    pool: PgPool,
    monthly_allowance: u32,
}

impl PgEntitlementService {
    pub fn new(pool: PgPool, monthly_allowance: u32) -> Self {
        Self {
            pool,
            monthly_allowance,
        }
    }
}

#[async_trait]
impl EntitlementService for PgEntitlementService {
    async fn entitlement(&self, user_id: Uuid) -> Result<Entitlement, AppError> {
        let user = sqlx::query_as::<_, UserRow>("SELECT * FROM users WHERE id = $1")
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound("User not found.".to_string()))?;

        let tier: SubscriptionTier = user.subscription_tier.parse().map_err(AppError::Internal)?;

        let used = match tier {
            SubscriptionTier::Pro => 0,
            SubscriptionTier::Free => {
                sqlx::query_scalar::<_, i64>(
                    "SELECT COUNT(*) FROM interview_sessions WHERE user_id = $1 AND created_at >= $2",
                )
                .bind(user_id)
                .bind(month_start(Utc::now()))
                .fetch_one(&self.pool)
                .await?
            }
        };

        Ok(Entitlement {
            subscription_tier: tier,
            interviews_remaining_this_month: remaining_allowance(tier, used, self.monthly_allowance),
        })
    }
}

/// Pro users always see the full allowance; free users lose one per session started.
pub fn remaining_allowance(tier: SubscriptionTier, used: i64, allowance: u32) -> u32 {
    match tier {
        SubscriptionTier::Pro => allowance,
        SubscriptionTier::Free => {
            let remaining = i64::from(allowance) - used.max(0);
            u32::try_from(remaining.max(0)).unwrap_or(0)
        }
    }
}

pub fn month_start(now: DateTime<Utc>) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(now.year(), now.month(), 1, 0, 0, 0)
        .single()
        .unwrap_or(now)
}
