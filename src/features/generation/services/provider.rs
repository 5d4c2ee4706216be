use std::time::Duration;

use async_trait::async_trait;
use base64::prelude::*;
use serde::Deserialize;
use tracing::{debug, error, info, warn};

use crate::core::config::OpenAiConfig;
use crate::core::error::{AppError, Result};
use crate::features::images::dtos::ImageUpload;

/// Provider-facing knobs for one generation batch
#[derive(Debug, Clone)]
pub struct GenerationOptions {
    pub n: u8,
    pub size: String,
    pub background: String,
}

impl Default for GenerationOptions {
    fn default() -> Self {
        Self {
            n: 4,
            size: "1536x1024".to_string(),
            background: "auto".to_string(),
        }
    }
}

/// External image generation: source image plus prompt text in, one
/// ordered batch of image buffers out.
#[async_trait]
pub trait ImageGenerator: Send + Sync {
    async fn generate(
        &self,
        source: &ImageUpload,
        prompt_text: &str,
        options: &GenerationOptions,
    ) -> Result<Vec<Vec<u8>>>;
}

#[derive(Debug, Deserialize)]
struct OpenAiResponse {
    data: Option<Vec<OpenAiImage>>,
    error: Option<OpenAiError>,
}

#[derive(Debug, Deserialize)]
struct OpenAiError {
    message: String,
}

#[derive(Debug, Deserialize)]
struct OpenAiImage {
    url: Option<String>,
    b64_json: Option<String>,
}

/// OpenAI image-edit API client
pub struct OpenAiImageClient {
    client: reqwest::Client,
    api_url: String,
    api_key: String,
}

impl OpenAiImageClient {
    pub fn new(config: &OpenAiConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .map_err(|e| AppError::Internal(format!("Failed to create HTTP client: {}", e)))?;

        info!(
            "OpenAI image client initialized: url={}, timeout={}s",
            config.api_url, config.request_timeout_secs
        );

        Ok(Self {
            client,
            api_url: config.api_url.clone(),
            api_key: config.api_key.clone(),
        })
    }

    async fn call_edit_api(
        &self,
        source: &ImageUpload,
        prompt_text: &str,
        options: &GenerationOptions,
    ) -> Result<OpenAiResponse> {
        let image_part = reqwest::multipart::Part::bytes(source.bytes.clone())
            .file_name(source.original_filename.clone())
            .mime_str(&source.content_type)
            .map_err(|e| AppError::BadRequest(format!("Invalid image content type: {}", e)))?;

        let form = reqwest::multipart::Form::new()
            .text("model", "gpt-image-1")
            .part("image", image_part)
            .text("prompt", prompt_text.to_string())
            .text("n", options.n.to_string())
            .text("size", options.size.clone())
            .text("background", options.background.clone());

        let response = self
            .client
            .post(&self.api_url)
            .bearer_auth(&self.api_key)
            .multipart(form)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    error!("OpenAI API call timed out: {}", e);
                } else {
                    error!("OpenAI API call failed: {}", e);
                }
                AppError::ExternalServiceError("Image generation request failed".to_string())
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            error!("OpenAI API returned error status {}: {}", status, body);
            return Err(AppError::ExternalServiceError(format!(
                "Image generation request failed with status {}",
                status
            )));
        }

        let parsed: OpenAiResponse = response.json().await.map_err(|e| {
            error!("Failed to parse OpenAI response: {}", e);
            AppError::ExternalServiceError("Malformed image generation response".to_string())
        })?;

        if let Some(err) = &parsed.error {
            error!("OpenAI API returned error: {}", err.message);
            return Err(AppError::ExternalServiceError(
                "Image generation request failed".to_string(),
            ));
        }
        if parsed.data.as_ref().is_none_or(|d| d.is_empty()) {
            error!("OpenAI API returned no images");
            return Err(AppError::ExternalServiceError(
                "Image generation returned no images".to_string(),
            ));
        }

        Ok(parsed)
    }

    async fn extract_image_bytes(&self, images: Vec<OpenAiImage>) -> Result<Vec<Vec<u8>>> {
        let mut buffers = Vec::with_capacity(images.len());

        for img in images {
            let bytes = match (img.url, img.b64_json) {
                (Some(url), _) => {
                    debug!("Downloading generated image from URL");
                    self.client
                        .get(&url)
                        .send()
                        .await
                        .and_then(|r| r.error_for_status())
                        .map_err(|e| {
                            error!("Failed to download generated image: {}", e);
                            AppError::ExternalServiceError(
                                "Failed to download generated image".to_string(),
                            )
                        })?
                        .bytes()
                        .await
                        .map_err(|e| {
                            error!("Failed to read generated image body: {}", e);
                            AppError::ExternalServiceError(
                                "Failed to download generated image".to_string(),
                            )
                        })?
                        .to_vec()
                }
                (None, Some(b64)) => decode_b64_image(&b64)?,
                (None, None) => {
                    error!("OpenAI response contains neither URL nor base64 data");
                    return Err(AppError::ExternalServiceError(
                        "Malformed image generation response".to_string(),
                    ));
                }
            };
            buffers.push(bytes);
        }

        Ok(buffers)
    }
}

#[async_trait]
impl ImageGenerator for OpenAiImageClient {
    async fn generate(
        &self,
        source: &ImageUpload,
        prompt_text: &str,
        options: &GenerationOptions,
    ) -> Result<Vec<Vec<u8>>> {
        info!("Starting OpenAI image generation, n={}", options.n);

        let response = self.call_edit_api(source, prompt_text, options).await?;
        let data = response.data.unwrap_or_default();
        let buffers = self.extract_image_bytes(data).await?;

        info!("Received {} generated images from OpenAI", buffers.len());
        Ok(buffers)
    }
}

fn decode_b64_image(b64: &str) -> Result<Vec<u8>> {
    BASE64_STANDARD.decode(b64).map_err(|e| {
        error!("Failed to decode base64 image: {}", e);
        AppError::ExternalServiceError("Malformed image generation response".to_string())
    })
}

/// Returns copies of the input image instead of calling the external API.
/// Used for development and testing.
pub struct TestModeImageGenerator;

impl TestModeImageGenerator {
    pub fn new() -> Self {
        warn!("TEST MODE ACTIVE - image generation returns copies of the input image");
        Self
    }
}

impl Default for TestModeImageGenerator {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ImageGenerator for TestModeImageGenerator {
    async fn generate(
        &self,
        source: &ImageUpload,
        _prompt_text: &str,
        options: &GenerationOptions,
    ) -> Result<Vec<Vec<u8>>> {
        info!("TEST MODE: returning {} copies of the input image", options.n);
        Ok((0..options.n).map(|_| source.bytes.clone()).collect())
    }
}
