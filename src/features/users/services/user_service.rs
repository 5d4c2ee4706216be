use async_trait::async_trait;
use sqlx::PgPool;

use crate::core::error::{AppError, Result};
use crate::features::users::models::User;

/// Read-side contract the generation pipeline uses to confirm a user exists
#[async_trait]
pub trait UserLookup: Send + Sync {
    async fn get_user_by_id(&self, user_id: i64) -> Result<User>;
}

/// Service for user lookups
pub struct UserService {
    pool: PgPool,
}

impl UserService {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserLookup for UserService {
    async fn get_user_by_id(&self, user_id: i64) -> Result<User> {
        sqlx::query_as::<_, User>("SELECT id, email, created_at FROM users WHERE id = $1")
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("User with id {} not found", user_id)))
    }
}
