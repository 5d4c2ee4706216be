use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::core::error::{AppError, Result};

/// Maximum accepted image upload size (10MB)
pub const MAX_IMAGE_SIZE: usize = 10 * 1024 * 1024;

/// Content types accepted for image uploads
pub const ALLOWED_IMAGE_CONTENT_TYPES: [&str; 4] =
    ["image/jpeg", "image/jpg", "image/png", "image/webp"];

pub fn is_content_type_allowed(content_type: &str) -> bool {
    let normalized = content_type.to_lowercase();
    ALLOWED_IMAGE_CONTENT_TYPES
        .iter()
        .any(|allowed| *allowed == normalized)
}

/// An image in hand: bytes plus the metadata the provider and storage need.
#[derive(Debug, Clone)]
pub struct ImageUpload {
    pub bytes: Vec<u8>,
    pub original_filename: String,
    pub content_type: String,
}

/// Front-loaded validation for image submissions; nothing is stored before
/// this passes.
pub fn validate_image_upload(upload: &ImageUpload) -> Result<()> {
    if upload.bytes.is_empty() {
        return Err(AppError::Validation("Image file is required".to_string()));
    }
    if upload.bytes.len() > MAX_IMAGE_SIZE {
        return Err(AppError::Validation(format!(
            "Image file size must be less than {}MB",
            MAX_IMAGE_SIZE / (1024 * 1024)
        )));
    }
    if !is_content_type_allowed(&upload.content_type) {
        return Err(AppError::Validation(
            "Invalid image format. Allowed formats: JPEG, PNG, WebP".to_string(),
        ));
    }
    Ok(())
}

/// Response DTO for a recorded upload
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct UploadedImageResponseDto {
    pub uuid: Uuid,
    pub original_filename: String,
    pub content_type: String,
}
