use chrono::{DateTime, Utc};
use sqlx::FromRow;
use uuid::Uuid;

/// Database model for a customer-submitted photo.
///
/// Immutable once created; deletion is an administrative concern outside
/// the generation pipeline.
#[derive(Debug, Clone, FromRow)]
pub struct UploadedImage {
    pub id: i64,
    pub uuid: Uuid,
    /// Absent for anonymous submissions
    pub user_id: Option<i64>,
    pub stored_filename: String,
    pub original_filename: String,
    pub content_type: String,
    pub created_at: DateTime<Utc>,
}
