use chrono::{DateTime, Utc};
use sqlx::FromRow;

/// Database model for storefront customers
#[derive(Debug, Clone, FromRow)]
pub struct User {
    pub id: i64,
    pub email: String,
    pub created_at: DateTime<Utc>,
}
