use async_trait::async_trait;
use sqlx::PgPool;

use crate::core::error::{AppError, Result};
use crate::features::prompts::models::Prompt;

const PROMPT_COLUMNS: &str =
    "id, title, prompt_text, style_text, active, example_image_filename, created_at";

/// Read-side contract the generation pipeline uses to resolve prompts
#[async_trait]
pub trait PromptLookup: Send + Sync {
    async fn get_prompt_by_id(&self, prompt_id: i64) -> Result<Prompt>;
}

/// Service for prompt queries
pub struct PromptService {
    pool: PgPool,
}

impl PromptService {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Active prompts for the storefront picker, newest first.
    pub async fn list_active(&self) -> Result<Vec<Prompt>> {
        let prompts = sqlx::query_as::<_, Prompt>(&format!(
            "SELECT {} FROM prompts WHERE active = TRUE ORDER BY created_at DESC",
            PROMPT_COLUMNS
        ))
        .fetch_all(&self.pool)
        .await?;

        Ok(prompts)
    }
}

#[async_trait]
impl PromptLookup for PromptService {
    async fn get_prompt_by_id(&self, prompt_id: i64) -> Result<Prompt> {
        sqlx::query_as::<_, Prompt>(&format!(
            "SELECT {} FROM prompts WHERE id = $1",
            PROMPT_COLUMNS
        ))
        .bind(prompt_id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Prompt with id {} not found", prompt_id)))
    }
}
