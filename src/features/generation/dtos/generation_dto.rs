use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::modules::storage::CropArea;

/// Request DTO for anonymous image generation.
/// Note: This struct documents the multipart form for Swagger UI.
/// The actual handler reads the multipart fields directly.
#[derive(Debug, ToSchema)]
#[allow(dead_code)]
pub struct PublicGenerationForm {
    /// The source image to edit
    #[schema(format = Binary, content_media_type = "application/octet-stream")]
    pub image: String,
    /// Id of the storefront prompt to apply
    #[schema(example = 7)]
    pub prompt_id: i64,
    /// Optional crop, all four fields or none
    pub crop_x: Option<u32>,
    pub crop_y: Option<u32>,
    pub crop_width: Option<u32>,
    pub crop_height: Option<u32>,
}

/// Parsed anonymous generation request
#[derive(Debug, Clone, Validate)]
pub struct PublicGenerationRequest {
    pub prompt_id: i64,
    #[validate(nested)]
    pub crop_area: Option<CropArea>,
}

/// Request DTO for authenticated image generation against a prior upload
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UserGenerationRequest {
    /// Id of the storefront prompt to apply
    #[schema(example = 7)]
    pub prompt_id: i64,
    /// UUID of a previously uploaded image owned by the caller
    pub uploaded_image_uuid: Uuid,
    /// Optional crop applied to the upload before generation
    #[validate(nested)]
    pub crop_area: Option<CropArea>,
}

/// Response DTO for a completed generation batch.
/// URLs and ids are index-aligned.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct GenerationResponse {
    /// Client-fetchable URLs for the generated variants, in batch order
    pub image_urls: Vec<String>,
    /// Database ids of the recorded variants, in batch order
    pub generated_image_ids: Vec<i64>,
}
