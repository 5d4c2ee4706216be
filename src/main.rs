mod core;
mod features;
mod modules;
mod shared;

use crate::core::config::Config;
use crate::core::openapi::ApiDoc;
use crate::core::{database, middleware};
use crate::features::auth::JwtValidator;
use crate::features::generation::routes as generation_routes;
use crate::features::generation::services::{
    ImageGenerationService, ImageGenerator, OpenAiImageClient, TestModeImageGenerator,
};
use crate::features::images::routes as images_routes;
use crate::features::images::services::ImageArtifactService;
use crate::features::prompts::{routes as prompts_routes, PromptService};
use crate::features::users::UserService;
use crate::modules::storage::ImageStorage;
use axum::Router;
use std::sync::Arc;
use tower_http::request_id::{PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::trace::{DefaultOnRequest, DefaultOnResponse, TraceLayer};
use tracing::Level;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

fn main() -> anyhow::Result<()> {
    // Build Tokio runtime with configurable worker threads
    let worker_threads = std::env::var("TOKIO_WORKER_THREADS")
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or_else(|| {
            std::thread::available_parallelism()
                .map(|p| p.get())
                .unwrap_or(4)
        });

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(worker_threads)
        .max_blocking_threads(worker_threads * 4)
        .enable_all()
        .build()?;

    runtime.block_on(async_main(worker_threads))
}

async fn async_main(worker_threads: usize) -> anyhow::Result<()> {
    // Load .env file BEFORE initializing logger so RUST_LOG is available
    let _ = dotenvy::dotenv();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env().map_err(|e| anyhow::anyhow!(e))?;

    let available_cpus = std::thread::available_parallelism()
        .map(|p| p.get())
        .unwrap_or(1);
    tracing::info!(
        "System info: available_cpus={}, tokio_worker_threads={}, pid={}",
        available_cpus,
        worker_threads,
        std::process::id()
    );
    tracing::info!("Configuration loaded successfully");

    // Create database connection pool
    let pool = database::create_pool(&config.database).await?;
    tracing::info!("Database connection pool created");

    // Run migrations automatically
    tracing::info!("Running database migrations...");
    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .map_err(|e| anyhow::anyhow!("Migration failed: {}", e))?;
    tracing::info!("Database migrations completed successfully");

    // Initialize auth
    let jwt_validator = Arc::new(JwtValidator::new(
        &config.auth.jwt_secret,
        config.auth.jwt_leeway,
    ));
    tracing::info!("Auth configuration initialized");

    // Initialize filesystem image storage
    let storage = Arc::new(
        ImageStorage::new(&config.storage)
            .await
            .map_err(|e| anyhow::anyhow!("Failed to initialize image storage: {}", e))?,
    );
    tracing::info!("Image storage initialized at {}", config.storage.root.display());

    // Initialize services
    let artifact_service = Arc::new(ImageArtifactService::new(pool.clone(), Arc::clone(&storage)));
    let prompt_service = Arc::new(PromptService::new(pool.clone()));
    let user_service = Arc::new(UserService::new(pool.clone()));
    tracing::info!("Artifact, prompt and user services initialized");

    // Select the image generator backend
    let generator: Arc<dyn ImageGenerator> = if config.openai.test_mode {
        Arc::new(TestModeImageGenerator::new())
    } else {
        Arc::new(
            OpenAiImageClient::new(&config.openai)
                .map_err(|e| anyhow::anyhow!("Failed to initialize OpenAI client: {}", e))?,
        )
    };

    let generation_service = Arc::new(ImageGenerationService::new(
        Arc::clone(&storage),
        artifact_service.clone(),
        prompt_service.clone(),
        user_service,
        generator,
    ));
    tracing::info!("Image generation service initialized");

    // Build swagger router
    let openapi = ApiDoc::openapi();
    let swagger =
        Router::new().merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", openapi));

    // Protected routes (require JWT authentication)
    let protected_routes = Router::new()
        .merge(images_routes::protected_routes(
            Arc::clone(&artifact_service),
            Arc::clone(&storage),
            config.app.max_request_body_size,
        ))
        .merge(generation_routes::protected_routes(Arc::clone(
            &generation_service,
        )))
        .route_layer(axum::middleware::from_fn_with_state(
            jwt_validator.clone(),
            middleware::auth_middleware,
        ));

    // Simple health check endpoint (no auth required)
    async fn health_check() -> axum::http::StatusCode {
        axum::http::StatusCode::OK
    }
    let health_route = Router::new().route("/health", axum::routing::get(health_check));

    // Public routes (no auth required)
    let public_routes = Router::new()
        .merge(images_routes::public_routes(
            Arc::clone(&artifact_service),
            Arc::clone(&storage),
        ))
        .merge(generation_routes::public_routes(
            generation_service,
            config.app.max_request_body_size,
        ))
        .merge(prompts_routes::routes(prompt_service, Arc::clone(&storage)));

    let app = Router::new()
        .merge(swagger)
        .merge(protected_routes)
        .merge(public_routes)
        .merge(health_route)
        .layer(middleware::cors_layer(
            config.app.cors_allowed_origins.clone(),
        ))
        // Propagate X-Request-Id to response headers
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(middleware::MakeSpanWithRequestId)
                .on_request(DefaultOnRequest::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        // Generate X-Request-Id using UUID v7 (or use client-provided one)
        .layer(SetRequestIdLayer::x_request_id(middleware::MakeRequestUuid));

    // Start server
    let addr = config.app.server_address();
    let socket_addr: std::net::SocketAddr = addr
        .parse()
        .map_err(|e| anyhow::anyhow!("Invalid address: {}", e))?;

    // Use socket2 for TCP listener configuration
    let socket = socket2::Socket::new(
        socket2::Domain::for_address(socket_addr),
        socket2::Type::STREAM,
        Some(socket2::Protocol::TCP),
    )?;

    socket.set_reuse_address(true)?;
    #[cfg(unix)]
    socket.set_reuse_port(true)?;
    socket.set_nodelay(true)?;

    socket.set_recv_buffer_size(256 * 1024)?;
    socket.set_send_buffer_size(256 * 1024)?;

    #[cfg(target_os = "linux")]
    {
        let keepalive = socket2::TcpKeepalive::new()
            .with_time(std::time::Duration::from_secs(60))
            .with_interval(std::time::Duration::from_secs(10))
            .with_retries(3);
        socket.set_tcp_keepalive(&keepalive)?;
    }
    #[cfg(not(target_os = "linux"))]
    {
        let keepalive = socket2::TcpKeepalive::new().with_time(std::time::Duration::from_secs(60));
        socket.set_tcp_keepalive(&keepalive)?;
    }

    socket.set_nonblocking(true)?;
    socket.bind(&socket_addr.into())?;
    socket.listen(65535)?;

    let listener = tokio::net::TcpListener::from_std(socket.into())?;
    tracing::info!("Server listening on {}", format!("http://{}", addr));
    tracing::info!(
        "Swagger UI available at {}",
        format!("http://{}/swagger-ui/", addr)
    );

    // Client IP resolution for rate limiting needs the peer address
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<std::net::SocketAddr>(),
    )
    .await?;

    Ok(())
}
