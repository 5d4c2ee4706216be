use std::sync::Arc;

use tracing::{error, info};
use uuid::Uuid;

use crate::core::error::{AppError, Result};
use crate::features::generation::dtos::{
    GenerationResponse, PublicGenerationRequest, UserGenerationRequest,
};
use crate::features::generation::services::{
    GenerationOptions, GenerationRateLimiter, ImageGenerator, RateLimitSubject,
};
use crate::features::images::dtos::{validate_image_upload, ImageUpload};
use crate::features::images::services::ArtifactStore;
use crate::features::prompts::models::Prompt;
use crate::features::prompts::services::PromptLookup;
use crate::features::users::services::UserLookup;
use crate::modules::storage::{crop_image, CropArea, ImageStorage, ImageType};

/// Number of variants requested from the provider per generation
pub const GENERATION_BATCH_SIZE: u8 = 4;

const PROMPT_UNAVAILABLE_MESSAGE: &str = "The selected prompt is not available";
const OPAQUE_FAILURE_MESSAGE: &str = "Failed to generate image. Please try again later.";

/// Orchestrates one generation request end to end.
///
/// The pipeline is strictly ordered and fail-fast: validation, rate check
/// and prompt check run before any byte is written, and their errors keep
/// their specific kind. Everything after that point is collapsed into one
/// opaque internal error so provider and storage internals never reach
/// clients.
pub struct ImageGenerationService {
    storage: Arc<ImageStorage>,
    artifacts: Arc<dyn ArtifactStore>,
    prompts: Arc<dyn PromptLookup>,
    users: Arc<dyn UserLookup>,
    generator: Arc<dyn ImageGenerator>,
    rate_limiter: GenerationRateLimiter,
}

impl ImageGenerationService {
    pub fn new(
        storage: Arc<ImageStorage>,
        artifacts: Arc<dyn ArtifactStore>,
        prompts: Arc<dyn PromptLookup>,
        users: Arc<dyn UserLookup>,
        generator: Arc<dyn ImageGenerator>,
    ) -> Self {
        let rate_limiter = GenerationRateLimiter::new(artifacts.clone());
        Self {
            storage,
            artifacts,
            prompts,
            users,
            generator,
            rate_limiter,
        }
    }

    /// Anonymous generation from a fresh multipart upload, counted per IP.
    pub async fn generate_public(
        &self,
        request: &PublicGenerationRequest,
        ip: &str,
        upload: ImageUpload,
    ) -> Result<GenerationResponse> {
        validate_image_upload(&upload)?;
        self.rate_limiter
            .check(&RateLimitSubject::Ip(ip.to_string()))
            .await?;
        let prompt = self.require_active_prompt(request.prompt_id).await?;

        info!(
            "Starting public generation: ip={}, prompt={}",
            ip, prompt.id
        );

        self.run_public_pipeline(&prompt, ip, upload, request.crop_area.as_ref())
            .await
            .map_err(|e| opaque_failure("public", e))
    }

    /// Authenticated generation against a previously uploaded image,
    /// counted per user.
    pub async fn generate_for_user(
        &self,
        request: &UserGenerationRequest,
        user_id: i64,
    ) -> Result<GenerationResponse> {
        self.rate_limiter
            .check(&RateLimitSubject::User(user_id))
            .await?;
        let prompt = self.require_active_prompt(request.prompt_id).await?;
        let user = self.users.get_user_by_id(user_id).await?;
        let uploaded = self
            .artifacts
            .find_uploaded_for_user(request.uploaded_image_uuid, user.id)
            .await?;

        info!(
            "Starting user generation: user={}, prompt={}, upload={}",
            user.id, prompt.id, uploaded.uuid
        );

        self.run_user_pipeline(&prompt, user.id, &uploaded, request.crop_area.as_ref())
            .await
            .map_err(|e| opaque_failure("user", e))
    }

    /// Prompt existence and active state collapse into the same
    /// client-facing validation error.
    async fn require_active_prompt(&self, prompt_id: i64) -> Result<Prompt> {
        let prompt = match self.prompts.get_prompt_by_id(prompt_id).await {
            Ok(prompt) => prompt,
            Err(AppError::NotFound(_)) => {
                return Err(AppError::Validation(PROMPT_UNAVAILABLE_MESSAGE.to_string()))
            }
            Err(e) => return Err(e),
        };
        if !prompt.active {
            return Err(AppError::Validation(PROMPT_UNAVAILABLE_MESSAGE.to_string()));
        }
        Ok(prompt)
    }

    async fn run_public_pipeline(
        &self,
        prompt: &Prompt,
        ip: &str,
        upload: ImageUpload,
        crop: Option<&CropArea>,
    ) -> Result<GenerationResponse> {
        let stored_filename = self
            .storage
            .store(
                &upload.bytes,
                &upload.original_filename,
                ImageType::Public,
                crop,
            )
            .await?;
        let source_bytes = self.storage.load(&stored_filename, ImageType::Public).await?;
        let source = provider_input(source_bytes, &stored_filename, crop.is_some(), &upload);

        let outputs = self.invoke_provider(prompt, &source).await?;

        let mut image_urls = Vec::with_capacity(outputs.len());
        let mut generated_image_ids = Vec::with_capacity(outputs.len());
        for (index, bytes) in outputs.iter().enumerate() {
            let row = self
                .artifacts
                .save_public_generated(bytes, prompt.id, ip, (index + 1) as i32)
                .await?;
            image_urls.push(self.storage.image_url(ImageType::Public, &row.filename));
            generated_image_ids.push(row.id);
        }

        info!(
            "Public generation complete: ip={}, prompt={}, variants={}",
            ip,
            prompt.id,
            generated_image_ids.len()
        );
        Ok(GenerationResponse {
            image_urls,
            generated_image_ids,
        })
    }

    async fn run_user_pipeline(
        &self,
        prompt: &Prompt,
        user_id: i64,
        uploaded: &crate::features::images::models::UploadedImage,
        crop: Option<&CropArea>,
    ) -> Result<GenerationResponse> {
        let original_bytes = self
            .storage
            .load(&uploaded.stored_filename, ImageType::Private)
            .await?;

        let source = match crop {
            Some(area) => {
                // The cropped copy is persisted alongside the original so
                // the exact provider input stays reproducible.
                let cropped = crop_image(&original_bytes, area)?;
                let cropped_filename = format!("{}_cropped.png", uploaded.uuid);
                self.storage
                    .store_named(&cropped, &cropped_filename, ImageType::Private)
                    .await?;
                ImageUpload {
                    bytes: cropped,
                    original_filename: cropped_filename,
                    content_type: "image/png".to_string(),
                }
            }
            None => ImageUpload {
                bytes: original_bytes,
                original_filename: uploaded.original_filename.clone(),
                content_type: uploaded.content_type.clone(),
            },
        };

        let outputs = self.invoke_provider(prompt, &source).await?;

        let mut image_urls = Vec::with_capacity(outputs.len());
        let mut generated_image_ids = Vec::with_capacity(outputs.len());
        for (index, bytes) in outputs.iter().enumerate() {
            let generation_number = (index + 1) as i32;
            let row = self
                .artifacts
                .save_user_generated(bytes, uploaded.id, prompt.id, user_id, generation_number)
                .await?;
            // User-facing names derive from the upload uuid, not the
            // storage filename, so clients can address variants without
            // another lookup.
            image_urls.push(user_generated_url(uploaded.uuid, generation_number));
            generated_image_ids.push(row.id);
        }

        info!(
            "User generation complete: user={}, prompt={}, variants={}",
            user_id,
            prompt.id,
            generated_image_ids.len()
        );
        Ok(GenerationResponse {
            image_urls,
            generated_image_ids,
        })
    }

    async fn invoke_provider(&self, prompt: &Prompt, source: &ImageUpload) -> Result<Vec<Vec<u8>>> {
        let options = GenerationOptions {
            n: GENERATION_BATCH_SIZE,
            ..GenerationOptions::default()
        };
        let outputs = self
            .generator
            .generate(source, &prompt.generation_prompt(), &options)
            .await?;
        if outputs.is_empty() {
            return Err(AppError::ExternalServiceError(
                "Image generation returned no images".to_string(),
            ));
        }
        Ok(outputs)
    }
}

fn provider_input(
    bytes: Vec<u8>,
    stored_filename: &str,
    cropped: bool,
    upload: &ImageUpload,
) -> ImageUpload {
    // Cropping re-encodes to PNG; un-cropped bytes keep their upload type
    let content_type = if cropped {
        "image/png".to_string()
    } else {
        upload.content_type.clone()
    };
    ImageUpload {
        bytes,
        original_filename: stored_filename.to_string(),
        content_type,
    }
}

pub(crate) fn user_generated_url(upload_uuid: Uuid, generation_number: i32) -> String {
    format!(
        "/api/user/images/{}_generated_{}.png",
        upload_uuid, generation_number
    )
}

/// Caller mistakes surfaced during input preparation (bad crop rectangle,
/// undecodable image) keep their kind and message; everything else is a
/// server-side fault and collapses into one retry-later error.
fn opaque_failure(flow: &str, source: AppError) -> AppError {
    match source {
        AppError::Validation(_) | AppError::BadRequest(_) => source,
        other => {
            error!("Image generation pipeline failed ({} flow): {}", flow, other);
            AppError::Internal(OPAQUE_FAILURE_MESSAGE.to_string())
        }
    }
}
