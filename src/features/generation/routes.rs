use std::sync::Arc;

use axum::{extract::DefaultBodyLimit, routing::post, Router};

use crate::features::generation::handlers::{
    generate_public_image, generate_user_image, GenerationState,
};
use crate::features::generation::services::ImageGenerationService;

/// Anonymous generation route (rate limited per IP)
pub fn public_routes(generation_service: Arc<ImageGenerationService>, max_body_size: usize) -> Router {
    let state = GenerationState { generation_service };

    Router::new()
        .route(
            "/api/public/images/generate",
            // Allow body size up to the configured cap + buffer for multipart overhead
            post(generate_public_image).layer(DefaultBodyLimit::max(max_body_size + 1024 * 1024)),
        )
        .with_state(state)
}

/// Authenticated generation route (rate limited per user)
pub fn protected_routes(generation_service: Arc<ImageGenerationService>) -> Router {
    let state = GenerationState { generation_service };

    Router::new()
        .route("/api/user/images/generate", post(generate_user_image))
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use std::net::SocketAddr;

    use axum::body::Body;
    use axum::extract::ConnectInfo;
    use axum::http::{Request, StatusCode};
    use tower::ServiceExt;

    use super::*;
    use crate::core::config::StorageConfig;
    use crate::features::generation::services::test_support::{
        FixedPrompts, FixedUsers, InMemoryArtifacts, StubGenerator,
    };
    use crate::modules::storage::ImageStorage;

    async fn generation_service(
        dir: &tempfile::TempDir,
    ) -> Arc<ImageGenerationService> {
        let storage = Arc::new(
            ImageStorage::new(&StorageConfig {
                root: dir.path().to_path_buf(),
            })
            .await
            .unwrap(),
        );
        Arc::new(ImageGenerationService::new(
            storage,
            Arc::new(InMemoryArtifacts::default()),
            Arc::new(FixedPrompts::default()),
            Arc::new(FixedUsers::default()),
            Arc::new(StubGenerator::returning(vec![vec![1]])),
        ))
    }

    fn multipart_request(image_len: usize) -> Request<Body> {
        let boundary = "x-test-boundary";
        let mut body = Vec::new();
        body.extend_from_slice(
            format!(
                "--{boundary}\r\nContent-Disposition: form-data; name=\"promptId\"\r\n\r\n7\r\n"
            )
            .as_bytes(),
        );
        body.extend_from_slice(
            format!(
                "--{boundary}\r\nContent-Disposition: form-data; name=\"image\"; \
                 filename=\"a.png\"\r\nContent-Type: image/png\r\n\r\n"
            )
            .as_bytes(),
        );
        body.resize(body.len() + image_len, 0u8);
        body.extend_from_slice(format!("\r\n--{boundary}--\r\n").as_bytes());

        let addr: SocketAddr = "127.0.0.1:4567".parse().unwrap();
        let mut request = Request::builder()
            .method("POST")
            .uri("/api/public/images/generate")
            .header(
                "content-type",
                format!("multipart/form-data; boundary={boundary}"),
            )
            .body(Body::from(body))
            .unwrap();
        request.extensions_mut().insert(ConnectInfo(addr));
        request
    }

    #[tokio::test]
    async fn test_configured_body_limit_is_enforced() {
        let dir = tempfile::tempdir().unwrap();
        let app = public_routes(generation_service(&dir).await, 1024);

        // Over the 1 KiB cap even after the fixed multipart overhead allowance
        let response = app.oneshot(multipart_request(2 * 1024 * 1024)).await.unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let text = String::from_utf8_lossy(&bytes);
        assert!(text.contains("Failed to read multipart data"));
    }

    #[tokio::test]
    async fn test_generous_body_limit_admits_the_same_request() {
        let dir = tempfile::tempdir().unwrap();
        let app = public_routes(generation_service(&dir).await, 10 * 1024 * 1024);

        let response = app.oneshot(multipart_request(2 * 1024 * 1024)).await.unwrap();

        // Past the body limit; the pipeline answers (no prompt 7 is defined)
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let text = String::from_utf8_lossy(&bytes);
        assert!(text.contains("The selected prompt is not available"));
    }
}
