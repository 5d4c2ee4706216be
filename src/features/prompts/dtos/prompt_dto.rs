use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Response DTO for a storefront prompt
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct PromptResponseDto {
    pub id: i64,
    pub title: String,
    /// URL of the admin-curated example image, when one is configured
    pub example_image_url: Option<String>,
}
