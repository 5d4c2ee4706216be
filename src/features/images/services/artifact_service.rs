use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use tracing::{debug, info};
use uuid::Uuid;

use crate::core::error::{AppError, Result};
use crate::features::images::dtos::ImageUpload;
use crate::features::images::models::{GeneratedImage, UploadedImage};
use crate::modules::storage::{ImageStorage, ImageType};

const UPLOADED_COLUMNS: &str =
    "id, uuid, user_id, stored_filename, original_filename, content_type, created_at";
const GENERATED_COLUMNS: &str =
    "id, uploaded_image_id, prompt_id, user_id, ip_address, generation_number, filename, created_at";

/// Artifact bookkeeping contract consumed by the generation pipeline.
///
/// Counts feed the rate limiter; the save operations write the image file
/// first and record its row only after the write succeeds, so every row is
/// backed by a stored file.
#[async_trait]
pub trait ArtifactStore: Send + Sync {
    async fn count_generated_for_ip_since(&self, ip: &str, since: DateTime<Utc>) -> Result<i64>;

    async fn count_generated_for_user_since(
        &self,
        user_id: i64,
        since: DateTime<Utc>,
    ) -> Result<i64>;

    /// Resolves an upload scoped to its owner. An upload owned by a
    /// different user is reported as not found, so existence of other
    /// users' images is never revealed.
    async fn find_uploaded_for_user(&self, uuid: Uuid, user_id: i64) -> Result<UploadedImage>;

    async fn save_public_generated(
        &self,
        bytes: &[u8],
        prompt_id: i64,
        ip: &str,
        generation_number: i32,
    ) -> Result<GeneratedImage>;

    async fn save_user_generated(
        &self,
        bytes: &[u8],
        uploaded_image_id: i64,
        prompt_id: i64,
        user_id: i64,
        generation_number: i32,
    ) -> Result<GeneratedImage>;
}

/// Postgres-backed artifact store
pub struct ImageArtifactService {
    pool: PgPool,
    storage: Arc<ImageStorage>,
}

impl ImageArtifactService {
    pub fn new(pool: PgPool, storage: Arc<ImageStorage>) -> Self {
        Self { pool, storage }
    }

    /// Store a customer upload under the private namespace and record it.
    /// Validation happens at the handler; this is the ingestion write path.
    pub async fn record_upload(
        &self,
        upload: &ImageUpload,
        user_id: i64,
    ) -> Result<UploadedImage> {
        let stored_filename = self
            .storage
            .store(
                &upload.bytes,
                &upload.original_filename,
                ImageType::Private,
                None,
            )
            .await?;

        let uploaded = sqlx::query_as::<_, UploadedImage>(&format!(
            "INSERT INTO uploaded_images (uuid, user_id, stored_filename, original_filename, content_type)
             VALUES ($1, $2, $3, $4, $5)
             RETURNING {}",
            UPLOADED_COLUMNS
        ))
        .bind(Uuid::new_v4())
        .bind(user_id)
        .bind(&stored_filename)
        .bind(&upload.original_filename)
        .bind(&upload.content_type)
        .fetch_one(&self.pool)
        .await?;

        info!(
            "Recorded upload: uuid={}, user={}, filename={}",
            uploaded.uuid, user_id, stored_filename
        );
        Ok(uploaded)
    }

    /// Resolve a user-facing image name to its bytes and content type.
    ///
    /// Generated images are addressed as `{upload_uuid}_generated_{n}.png`;
    /// anything else is treated as an uploaded image's stored filename.
    /// Both paths are scoped to the requesting user.
    pub async fn load_user_image(
        &self,
        filename: &str,
        user_id: i64,
    ) -> Result<(Vec<u8>, String)> {
        if let Some((upload_uuid, generation_number)) = parse_generated_name(filename) {
            // Newest row wins when several batches share an upload
            let generated = sqlx::query_as::<_, GeneratedImage>(&format!(
                "SELECT {} FROM generated_images g
                 WHERE g.user_id = $1
                   AND g.generation_number = $2
                   AND g.uploaded_image_id = (
                       SELECT id FROM uploaded_images WHERE uuid = $3 AND user_id = $1
                   )
                 ORDER BY g.created_at DESC
                 LIMIT 1",
                generated_columns_qualified()
            ))
            .bind(user_id)
            .bind(generation_number)
            .bind(upload_uuid)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| image_not_found(filename))?;

            let bytes = self
                .storage
                .load(&generated.filename, ImageType::Private)
                .await?;
            return Ok((bytes, "image/png".to_string()));
        }

        let uploaded = sqlx::query_as::<_, UploadedImage>(&format!(
            "SELECT {} FROM uploaded_images WHERE stored_filename = $1 AND user_id = $2",
            UPLOADED_COLUMNS
        ))
        .bind(filename)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| image_not_found(filename))?;

        let bytes = self
            .storage
            .load(&uploaded.stored_filename, ImageType::Private)
            .await?;
        Ok((bytes, uploaded.content_type))
    }

    async fn insert_generated(
        &self,
        uploaded_image_id: Option<i64>,
        prompt_id: i64,
        user_id: Option<i64>,
        ip_address: Option<&str>,
        generation_number: i32,
        filename: &str,
    ) -> Result<GeneratedImage> {
        let generated = sqlx::query_as::<_, GeneratedImage>(&format!(
            "INSERT INTO generated_images
                 (uploaded_image_id, prompt_id, user_id, ip_address, generation_number, filename)
             VALUES ($1, $2, $3, $4, $5, $6)
             RETURNING {}",
            GENERATED_COLUMNS
        ))
        .bind(uploaded_image_id)
        .bind(prompt_id)
        .bind(user_id)
        .bind(ip_address)
        .bind(generation_number)
        .bind(filename)
        .fetch_one(&self.pool)
        .await?;

        Ok(generated)
    }
}

#[async_trait]
impl ArtifactStore for ImageArtifactService {
    async fn count_generated_for_ip_since(&self, ip: &str, since: DateTime<Utc>) -> Result<i64> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM generated_images WHERE ip_address = $1 AND created_at >= $2",
        )
        .bind(ip)
        .bind(since)
        .fetch_one(&self.pool)
        .await?;

        Ok(count)
    }

    async fn count_generated_for_user_since(
        &self,
        user_id: i64,
        since: DateTime<Utc>,
    ) -> Result<i64> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM generated_images WHERE user_id = $1 AND created_at >= $2",
        )
        .bind(user_id)
        .bind(since)
        .fetch_one(&self.pool)
        .await?;

        Ok(count)
    }

    async fn find_uploaded_for_user(&self, uuid: Uuid, user_id: i64) -> Result<UploadedImage> {
        sqlx::query_as::<_, UploadedImage>(&format!(
            "SELECT {} FROM uploaded_images WHERE uuid = $1 AND user_id = $2",
            UPLOADED_COLUMNS
        ))
        .bind(uuid)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Uploaded image {} not found", uuid)))
    }

    async fn save_public_generated(
        &self,
        bytes: &[u8],
        prompt_id: i64,
        ip: &str,
        generation_number: i32,
    ) -> Result<GeneratedImage> {
        let filename = format!("{}_generated_{}.png", Uuid::new_v4(), generation_number);
        self.storage
            .store_named(bytes, &filename, ImageType::Public)
            .await?;

        let generated = self
            .insert_generated(None, prompt_id, None, Some(ip), generation_number, &filename)
            .await?;

        debug!("Saved public generated image: {}", filename);
        Ok(generated)
    }

    async fn save_user_generated(
        &self,
        bytes: &[u8],
        uploaded_image_id: i64,
        prompt_id: i64,
        user_id: i64,
        generation_number: i32,
    ) -> Result<GeneratedImage> {
        let filename = format!("{}_generated_{}.png", Uuid::new_v4(), generation_number);
        self.storage
            .store_named(bytes, &filename, ImageType::Private)
            .await?;

        let generated = self
            .insert_generated(
                Some(uploaded_image_id),
                prompt_id,
                Some(user_id),
                None,
                generation_number,
                &filename,
            )
            .await?;

        debug!("Saved user generated image: {}", filename);
        Ok(generated)
    }
}

fn generated_columns_qualified() -> String {
    GENERATED_COLUMNS
        .split(", ")
        .map(|c| format!("g.{}", c))
        .collect::<Vec<_>>()
        .join(", ")
}

fn image_not_found(filename: &str) -> AppError {
    AppError::NotFound(format!("Image with filename {} not found", filename))
}

/// Parse a user-facing `{upload_uuid}_generated_{n}.png` name.
pub fn parse_generated_name(filename: &str) -> Option<(Uuid, i32)> {
    let stem = filename.strip_suffix(".png")?;
    let (uuid_part, number_part) = stem.split_once("_generated_")?;
    let uuid = Uuid::parse_str(uuid_part).ok()?;
    let number = number_part.parse::<i32>().ok()?;
    (number >= 1).then_some((uuid, number))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_generated_name_valid() {
        let uuid = Uuid::new_v4();
        let parsed = parse_generated_name(&format!("{}_generated_3.png", uuid));
        assert_eq!(parsed, Some((uuid, 3)));
    }

    #[test]
    fn test_parse_generated_name_rejects_malformed() {
        assert_eq!(parse_generated_name("photo.png"), None);
        assert_eq!(parse_generated_name("not-a-uuid_generated_1.png"), None);
        let uuid = Uuid::new_v4();
        assert_eq!(parse_generated_name(&format!("{}_generated_0.png", uuid)), None);
        assert_eq!(parse_generated_name(&format!("{}_generated_x.png", uuid)), None);
        assert_eq!(parse_generated_name(&format!("{}_generated_1.jpg", uuid)), None);
    }
}
