use chrono::{DateTime, Utc};
use sqlx::FromRow;

/// Database model for one AI-generated output image.
///
/// Exactly one of `user_id` and `ip_address` is set, mirroring whether the
/// request was authenticated. `generation_number` starts at 1 and is the
/// output's position within its provider batch.
#[derive(Debug, Clone, FromRow)]
pub struct GeneratedImage {
    pub id: i64,
    /// Source upload; absent for the anonymous direct-upload flow
    pub uploaded_image_id: Option<i64>,
    pub prompt_id: i64,
    pub user_id: Option<i64>,
    pub ip_address: Option<String>,
    pub generation_number: i32,
    pub filename: String,
    pub created_at: DateTime<Utc>,
}
