use std::sync::Arc;

use chrono::{Duration, Utc};

use crate::core::error::{AppError, Result};
use crate::features::images::services::ArtifactStore;

/// Who a generation request is counted against
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RateLimitSubject {
    /// Anonymous requests, keyed by requester IP
    Ip(String),
    /// Authenticated requests, keyed by user id
    User(i64),
}

/// Trailing-window generation quota
#[derive(Debug, Clone, Copy)]
pub struct RateLimitPolicy {
    pub window_hours: i64,
    pub quota: i64,
    pub window_label: &'static str,
}

/// Anonymous callers: 10 generations per trailing hour
pub const PUBLIC_RATE_LIMIT: RateLimitPolicy = RateLimitPolicy {
    window_hours: 1,
    quota: 10,
    window_label: "hour",
};

/// Authenticated callers: 50 generations per trailing 24 hours
pub const USER_RATE_LIMIT: RateLimitPolicy = RateLimitPolicy {
    window_hours: 24,
    quota: 50,
    window_label: "day",
};

impl RateLimitSubject {
    pub fn policy(&self) -> RateLimitPolicy {
        match self {
            RateLimitSubject::Ip(_) => PUBLIC_RATE_LIMIT,
            RateLimitSubject::User(_) => USER_RATE_LIMIT,
        }
    }
}

/// Windowed quota check over recorded generations.
///
/// This is a check, not a reservation: the rows a successful generation
/// inserts are what future checks count, so concurrent requests from one
/// subject can overrun the quota by the in-flight amount. Accepted; the
/// quota is an abuse deterrent, not a hard budget.
pub struct GenerationRateLimiter {
    artifacts: Arc<dyn ArtifactStore>,
}

impl GenerationRateLimiter {
    pub fn new(artifacts: Arc<dyn ArtifactStore>) -> Self {
        Self { artifacts }
    }

    pub async fn check(&self, subject: &RateLimitSubject) -> Result<()> {
        let policy = subject.policy();
        let window_start = Utc::now() - Duration::hours(policy.window_hours);

        let count = match subject {
            RateLimitSubject::Ip(ip) => {
                self.artifacts
                    .count_generated_for_ip_since(ip, window_start)
                    .await?
            }
            RateLimitSubject::User(user_id) => {
                self.artifacts
                    .count_generated_for_user_since(*user_id, window_start)
                    .await?
            }
        };

        if count >= policy.quota {
            return Err(AppError::RateLimitExceeded(format!(
                "Rate limit exceeded. Max {} images per {}.",
                policy.quota, policy.window_label
            )));
        }

        Ok(())
    }
}
