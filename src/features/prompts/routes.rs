use std::sync::Arc;

use axum::{routing::get, Router};

use crate::features::prompts::handlers::{list_prompts, PromptState};
use crate::features::prompts::services::PromptService;
use crate::modules::storage::ImageStorage;

/// Create routes for the prompts feature
pub fn routes(prompt_service: Arc<PromptService>, storage: Arc<ImageStorage>) -> Router {
    let state = PromptState {
        prompt_service,
        storage,
    };

    Router::new()
        .route("/api/public/prompts", get(list_prompts))
        .with_state(state)
}
