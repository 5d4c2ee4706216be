use std::sync::Arc;

use axum::{extract::State, Json};

use crate::core::error::Result;
use crate::features::prompts::dtos::PromptResponseDto;
use crate::features::prompts::services::PromptService;
use crate::modules::storage::{ImageStorage, ImageType};
use crate::shared::types::ApiResponse;

#[derive(Clone)]
pub struct PromptState {
    pub prompt_service: Arc<PromptService>,
    pub storage: Arc<ImageStorage>,
}

/// List active prompts for the storefront picker
#[utoipa::path(
    get,
    path = "/api/public/prompts",
    responses(
        (status = 200, description = "List of active prompts", body = ApiResponse<Vec<PromptResponseDto>>),
    ),
    tag = "prompts"
)]
pub async fn list_prompts(
    State(state): State<PromptState>,
) -> Result<Json<ApiResponse<Vec<PromptResponseDto>>>> {
    let prompts = state.prompt_service.list_active().await?;

    let dtos = prompts
        .into_iter()
        .map(|p| PromptResponseDto {
            id: p.id,
            title: p.title,
            example_image_url: p
                .example_image_filename
                .map(|f| state.storage.image_url(ImageType::PromptExample, &f)),
        })
        .collect();

    Ok(Json(ApiResponse::success(Some(dtos), None)))
}
