use std::sync::Arc;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};

use crate::features::images::handlers::{
    get_public_image, get_user_image, upload_image, ImageState,
};
use crate::features::images::services::ImageArtifactService;
use crate::modules::storage::ImageStorage;

/// Public image-serving routes (no auth)
pub fn public_routes(
    artifact_service: Arc<ImageArtifactService>,
    storage: Arc<ImageStorage>,
) -> Router {
    let state = ImageState {
        artifact_service,
        storage,
    };

    Router::new()
        .route("/api/public/images/{filename}", get(get_public_image))
        .with_state(state)
}

/// Authenticated upload and serving routes
pub fn protected_routes(
    artifact_service: Arc<ImageArtifactService>,
    storage: Arc<ImageStorage>,
    max_body_size: usize,
) -> Router {
    let state = ImageState {
        artifact_service,
        storage,
    };

    Router::new()
        .route(
            "/api/user/images",
            // Allow body size up to the configured cap + buffer for multipart overhead
            post(upload_image).layer(DefaultBodyLimit::max(max_body_size + 1024 * 1024)),
        )
        .route("/api/user/images/{filename}", get(get_user_image))
        .with_state(state)
}
