use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};

use crate::features::generation::{dtos as generation_dtos, handlers as generation_handlers};
use crate::features::images::{dtos as images_dtos, handlers as images_handlers};
use crate::features::prompts::{dtos as prompts_dtos, handlers as prompts_handlers};
use crate::modules::storage::CropArea;
use crate::shared::types::ApiResponse;

#[derive(OpenApi)]
#[openapi(
    paths(
        // Generation
        generation_handlers::generation_handler::generate_public_image,
        generation_handlers::generation_handler::generate_user_image,
        // Images
        images_handlers::image_handler::upload_image,
        images_handlers::image_handler::get_public_image,
        images_handlers::image_handler::get_user_image,
        // Prompts (public)
        prompts_handlers::prompt_handler::list_prompts,
    ),
    components(
        schemas(
            // Generation
            generation_dtos::PublicGenerationForm,
            generation_dtos::UserGenerationRequest,
            generation_dtos::GenerationResponse,
            CropArea,
            ApiResponse<generation_dtos::GenerationResponse>,
            // Images
            images_dtos::UploadedImageResponseDto,
            ApiResponse<images_dtos::UploadedImageResponseDto>,
            // Prompts
            prompts_dtos::PromptResponseDto,
            ApiResponse<Vec<prompts_dtos::PromptResponseDto>>,
        )
    ),
    tags(
        (name = "generation", description = "AI image generation from customer photos"),
        (name = "images", description = "Image upload and serving"),
        (name = "prompts", description = "Storefront generation prompts (public)"),
    ),
    modifiers(&SecurityAddon),
    info(
        title = "Mugshop API",
        version = "0.1.0",
        description = "Image generation backend for the print-on-demand storefront",
    )
)]
pub struct ApiDoc;

/// Adds Bearer JWT security scheme to OpenAPI spec
struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}
