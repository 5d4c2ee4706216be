use std::sync::Arc;

use axum::{
    extract::{Multipart, Path, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use tracing::debug;

use crate::core::error::AppError;
use crate::features::auth::model::AuthenticatedUser;
use crate::features::images::dtos::{
    validate_image_upload, ImageUpload, UploadedImageResponseDto,
};
use crate::features::images::services::ImageArtifactService;
use crate::modules::storage::{ImageStorage, ImageType};
use crate::shared::types::ApiResponse;

#[derive(Clone)]
pub struct ImageState {
    pub artifact_service: Arc<ImageArtifactService>,
    pub storage: Arc<ImageStorage>,
}

/// Read the `image` field out of a multipart form.
pub async fn read_image_field(multipart: &mut Multipart) -> Result<Option<ImageUpload>, AppError> {
    while let Some(field) = multipart.next_field().await.map_err(|e| {
        debug!("Failed to read multipart field: {}", e);
        AppError::BadRequest(format!("Failed to read multipart data: {}", e))
    })? {
        if field.name() != Some("image") {
            continue;
        }

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

        return Ok(Some(ImageUpload {
            bytes: bytes.to_vec(),
            original_filename,
            content_type,
        }));
    }

    Ok(None)
}

/// Upload a photo for later generation
///
/// Accepts multipart/form-data with an `image` field. The stored upload is
/// private to the authenticated user and referenced by uuid when
/// requesting generation.
#[utoipa::path(
    post,
    path = "/api/user/images",
    request_body(content_type = "multipart/form-data", description = "Image file upload"),
    responses(
        (status = 201, description = "Upload recorded", body = ApiResponse<UploadedImageResponseDto>),
        (status = 400, description = "Invalid or missing image file"),
        (status = 401, description = "Authentication required")
    ),
    security(("bearer_auth" = [])),
    tag = "images"
)]
pub async fn upload_image(
    user: AuthenticatedUser,
    State(state): State<ImageState>,
    mut multipart: Multipart,
) -> Result<(StatusCode, Json<ApiResponse<UploadedImageResponseDto>>), AppError> {
    let upload = read_image_field(&mut multipart)
        .await?
        .ok_or_else(|| AppError::Validation("Image file is required".to_string()))?;

    validate_image_upload(&upload)?;

    let uploaded = state
        .artifact_service
        .record_upload(&upload, user.user_id)
        .await?;

    let dto = UploadedImageResponseDto {
        uuid: uploaded.uuid,
        original_filename: uploaded.original_filename,
        content_type: uploaded.content_type,
    };

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::success(Some(dto), None)),
    ))
}

/// Serve a public generated image
#[utoipa::path(
    get,
    path = "/api/public/images/{filename}",
    params(("filename" = String, Path, description = "Stored filename")),
    responses(
        (status = 200, description = "Image bytes"),
        (status = 404, description = "Image not found")
    ),
    tag = "images"
)]
pub async fn get_public_image(
    State(state): State<ImageState>,
    Path(filename): Path<String>,
) -> Result<Response, AppError> {
    let bytes = state.storage.load(&filename, ImageType::Public).await?;
    Ok(image_response(bytes, content_type_for(&filename), &filename))
}

/// Serve one of the caller's images
///
/// Accepts either a `{upload_uuid}_generated_{n}.png` name or an upload's
/// stored filename; both resolve only within the caller's own images.
#[utoipa::path(
    get,
    path = "/api/user/images/{filename}",
    params(("filename" = String, Path, description = "Image name")),
    responses(
        (status = 200, description = "Image bytes"),
        (status = 401, description = "Authentication required"),
        (status = 404, description = "Image not found")
    ),
    security(("bearer_auth" = [])),
    tag = "images"
)]
pub async fn get_user_image(
    user: AuthenticatedUser,
    State(state): State<ImageState>,
    Path(filename): Path<String>,
) -> Result<Response, AppError> {
    let (bytes, content_type) = state
        .artifact_service
        .load_user_image(&filename, user.user_id)
        .await?;
    Ok(image_response(bytes, content_type, &filename))
}

fn image_response(bytes: Vec<u8>, content_type: String, filename: &str) -> Response {
    (
        [
            (header::CONTENT_TYPE, content_type),
            (
                header::CONTENT_DISPOSITION,
                format!("inline; filename=\"{}\"", filename),
            ),
        ],
        bytes,
    )
        .into_response()
}

fn content_type_for(filename: &str) -> String {
    let lowered = filename.to_lowercase();
    let content_type = if lowered.ends_with(".jpg") || lowered.ends_with(".jpeg") {
        "image/jpeg"
    } else if lowered.ends_with(".webp") {
        "image/webp"
    } else {
        "image/png"
    };
    content_type.to_string()
}
