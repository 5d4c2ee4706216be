use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    extract::{ConnectInfo, Multipart, State},
    http::HeaderMap,
    Json,
};
use tracing::debug;
use validator::Validate;

use crate::core::error::AppError;
use crate::core::extractor::AppJson;
use crate::features::auth::model::AuthenticatedUser;
use crate::features::generation::dtos::{
    GenerationResponse, PublicGenerationForm, PublicGenerationRequest, UserGenerationRequest,
};
use crate::features::generation::services::ImageGenerationService;
use crate::features::images::dtos::ImageUpload;
use crate::modules::storage::CropArea;
use crate::shared::types::ApiResponse;

#[derive(Clone)]
pub struct GenerationState {
    pub generation_service: Arc<ImageGenerationService>,
}

/// Generate image variants from an uploaded photo (anonymous)
///
/// Multipart form: `image` file, `promptId`, and an optional crop given as
/// `cropX`/`cropY`/`cropWidth`/`cropHeight`. Rate limited per client IP.
#[utoipa::path(
    post,
    path = "/api/public/images/generate",
    request_body(content_type = "multipart/form-data", content = PublicGenerationForm),
    responses(
        (status = 200, description = "Generated image URLs and ids", body = ApiResponse<GenerationResponse>),
        (status = 400, description = "Invalid upload or prompt"),
        (status = 429, description = "Rate limit exceeded"),
        (status = 500, description = "Generation failed")
    ),
    tag = "generation"
)]
pub async fn generate_public_image(
    State(state): State<GenerationState>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
    multipart: Multipart,
) -> Result<Json<ApiResponse<GenerationResponse>>, AppError> {
    let ip = client_ip(&headers, addr);
    let (upload, request) = parse_generation_form(multipart).await?;
    request
        .validate()
        .map_err(|e| AppError::Validation(e.to_string()))?;

    let upload =
        upload.ok_or_else(|| AppError::Validation("Image file is required".to_string()))?;
    let response = state
        .generation_service
        .generate_public(&request, &ip, upload)
        .await?;

    Ok(Json(ApiResponse::success(Some(response), None)))
}

/// Generate image variants from a previously uploaded image
///
/// Rate limited per user under the authenticated quota.
#[utoipa::path(
    post,
    path = "/api/user/images/generate",
    request_body = UserGenerationRequest,
    responses(
        (status = 200, description = "Generated image URLs and ids", body = ApiResponse<GenerationResponse>),
        (status = 400, description = "Invalid prompt or request"),
        (status = 401, description = "Authentication required"),
        (status = 404, description = "Uploaded image not found"),
        (status = 429, description = "Rate limit exceeded"),
        (status = 500, description = "Generation failed")
    ),
    security(("bearer_auth" = [])),
    tag = "generation"
)]
pub async fn generate_user_image(
    user: AuthenticatedUser,
    State(state): State<GenerationState>,
    AppJson(request): AppJson<UserGenerationRequest>,
) -> Result<Json<ApiResponse<GenerationResponse>>, AppError> {
    request
        .validate()
        .map_err(|e| AppError::Validation(e.to_string()))?;

    let response = state
        .generation_service
        .generate_for_user(&request, user.user_id)
        .await?;

    Ok(Json(ApiResponse::success(Some(response), None)))
}

/// Client IP resolution: first X-Forwarded-For entry when present (the
/// service sits behind a reverse proxy in production), else the socket peer.
fn client_ip(headers: &HeaderMap, addr: SocketAddr) -> String {
    headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .unwrap_or_else(|| addr.ip().to_string())
}

/// Walk the multipart stream once, collecting the image and the scalar
/// fields the generation request carries.
async fn parse_generation_form(
    mut multipart: Multipart,
) -> Result<(Option<ImageUpload>, PublicGenerationRequest), AppError> {
    let mut upload = None;
    let mut prompt_id: Option<i64> = None;
    let mut crop_x: Option<u32> = None;
    let mut crop_y: Option<u32> = None;
    let mut crop_width: Option<u32> = None;
    let mut crop_height: Option<u32> = None;

    while let Some(field) = multipart.next_field().await.map_err(|e| {
        debug!("Failed to read multipart field: {}", e);
        AppError::BadRequest(format!("Failed to read multipart data: {}", e))
    })? {
        let Some(name) = field.name().map(|s| s.to_string()) else {
            continue;
        };

        if name == "image" {
            let content_type = field
                .content_type()
                .map(|s| s.to_string())
                .unwrap_or_else(|| "application/octet-stream".to_string());
            let original_filename = field
                .file_name()
                .map(|s| s.to_string())
                .unwrap_or_else(|| "unnamed".to_string());
            let bytes = field.bytes().await.map_err(|e| {
                debug!("Failed to read file bytes: {}", e);
                AppError::BadRequest(format!("Failed to read file data: {}", e))
            })?;
            upload = Some(ImageUpload {
                bytes: bytes.to_vec(),
                original_filename,
                content_type,
            });
            continue;
        }

        let value = field.text().await.map_err(|e| {
            AppError::BadRequest(format!("Failed to read form field {}: {}", name, e))
        })?;
        match name.as_str() {
            "promptId" => prompt_id = Some(parse_field(&name, &value)?),
            "cropX" => crop_x = Some(parse_field(&name, &value)?),
            "cropY" => crop_y = Some(parse_field(&name, &value)?),
            "cropWidth" => crop_width = Some(parse_field(&name, &value)?),
            "cropHeight" => crop_height = Some(parse_field(&name, &value)?),
            _ => {}
        }
    }

    let prompt_id =
        prompt_id.ok_or_else(|| AppError::Validation("promptId is required".to_string()))?;
    let crop_area = crop_area_from_fields(crop_x, crop_y, crop_width, crop_height)?;

    Ok((
        upload,
        PublicGenerationRequest {
            prompt_id,
            crop_area,
        },
    ))
}

fn parse_field<T: std::str::FromStr>(name: &str, value: &str) -> Result<T, AppError> {
    value
        .trim()
        .parse()
        .map_err(|_| AppError::Validation(format!("Invalid value for {}", name)))
}

/// Crop fields come as a unit: all four present or none.
fn crop_area_from_fields(
    x: Option<u32>,
    y: Option<u32>,
    width: Option<u32>,
    height: Option<u32>,
) -> Result<Option<CropArea>, AppError> {
    match (x, y, width, height) {
        (Some(x), Some(y), Some(width), Some(height)) => Ok(Some(CropArea {
            x,
            y,
            width,
            height,
        })),
        (None, None, None, None) => Ok(None),
        _ => Err(AppError::Validation(
            "Crop requires cropX, cropY, cropWidth and cropHeight".to_string(),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn header_map(forwarded: Option<&str>) -> HeaderMap {
        let mut headers = HeaderMap::new();
        if let Some(value) = forwarded {
            headers.insert("x-forwarded-for", value.parse().unwrap());
        }
        headers
    }

    #[test]
    fn test_client_ip_prefers_first_forwarded_entry() {
        let addr: SocketAddr = "10.0.0.1:443".parse().unwrap();
        let headers = header_map(Some("203.0.113.5, 10.0.0.2"));
        assert_eq!(client_ip(&headers, addr), "203.0.113.5");
    }

    #[test]
    fn test_client_ip_falls_back_to_peer_address() {
        let addr: SocketAddr = "10.0.0.1:443".parse().unwrap();
        assert_eq!(client_ip(&header_map(None), addr), "10.0.0.1");
        assert_eq!(client_ip(&header_map(Some("   ")), addr), "10.0.0.1");
    }

    #[test]
    fn test_crop_fields_are_all_or_nothing() {
        assert!(crop_area_from_fields(None, None, None, None)
            .unwrap()
            .is_none());

        let area = crop_area_from_fields(Some(1), Some(2), Some(3), Some(4))
            .unwrap()
            .unwrap();
        assert_eq!((area.x, area.y, area.width, area.height), (1, 2, 3, 4));

        assert!(crop_area_from_fields(Some(1), None, Some(3), Some(4)).is_err());
    }

    #[test]
    fn test_parse_field_rejects_garbage() {
        assert_eq!(parse_field::<i64>("promptId", " 7 ").unwrap(), 7);
        assert!(parse_field::<u32>("cropX", "abc").is_err());
        assert!(parse_field::<u32>("cropX", "-1").is_err());
    }
}
