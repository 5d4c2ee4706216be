//! In-memory fakes used by the generation pipeline tests.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::core::error::{AppError, Result};
use crate::features::generation::services::{GenerationOptions, ImageGenerator};
use crate::features::images::dtos::ImageUpload;
use crate::features::images::models::{GeneratedImage, UploadedImage};
use crate::features::images::services::ArtifactStore;
use crate::features::prompts::models::Prompt;
use crate::features::prompts::services::PromptLookup;
use crate::features::users::models::User;
use crate::features::users::services::UserLookup;

#[derive(Default)]
struct ArtifactState {
    generated: Vec<GeneratedImage>,
    uploads: Vec<UploadedImage>,
    saved_bytes: Vec<Vec<u8>>,
    fail_on_save: Option<usize>,
    next_id: i64,
}

/// ArtifactStore backed by vectors, with seeding helpers that let a test
/// control row timestamps directly.
#[derive(Default)]
pub struct InMemoryArtifacts {
    state: Mutex<ArtifactState>,
}

impl InMemoryArtifacts {
    pub fn seed_public_generated(&self, ip: &str, count: usize, created_at: DateTime<Utc>) {
        let mut state = self.state.lock().unwrap();
        for n in 0..count {
            let id = state.next_id + 1;
            state.next_id = id;
            state.generated.push(GeneratedImage {
                id,
                uploaded_image_id: None,
                prompt_id: 1,
                user_id: None,
                ip_address: Some(ip.to_string()),
                generation_number: (n + 1) as i32,
                filename: format!("{}_generated_{}.png", Uuid::new_v4(), n + 1),
                created_at,
            });
        }
    }

    pub fn seed_user_generated(&self, user_id: i64, count: usize, created_at: DateTime<Utc>) {
        let mut state = self.state.lock().unwrap();
        for n in 0..count {
            let id = state.next_id + 1;
            state.next_id = id;
            state.generated.push(GeneratedImage {
                id,
                uploaded_image_id: Some(1),
                prompt_id: 1,
                user_id: Some(user_id),
                ip_address: None,
                generation_number: (n + 1) as i32,
                filename: format!("{}_generated_{}.png", Uuid::new_v4(), n + 1),
                created_at,
            });
        }
    }

    pub fn seed_upload(&self, uuid: Uuid, user_id: i64, stored_filename: &str) -> UploadedImage {
        let mut state = self.state.lock().unwrap();
        let id = state.next_id + 1;
        state.next_id = id;
        let upload = UploadedImage {
            id,
            uuid,
            user_id: Some(user_id),
            stored_filename: stored_filename.to_string(),
            original_filename: "original.png".to_string(),
            content_type: "image/png".to_string(),
            created_at: Utc::now(),
        };
        state.uploads.push(upload.clone());
        upload
    }

    /// Make the save with the given zero-based index fail.
    pub fn fail_on_save(&self, index: usize) {
        self.state.lock().unwrap().fail_on_save = Some(index);
    }

    pub fn generated_rows(&self) -> Vec<GeneratedImage> {
        self.state.lock().unwrap().generated.clone()
    }

    pub fn saved_bytes(&self) -> Vec<Vec<u8>> {
        self.state.lock().unwrap().saved_bytes.clone()
    }

    fn save(
        &self,
        bytes: &[u8],
        uploaded_image_id: Option<i64>,
        prompt_id: i64,
        user_id: Option<i64>,
        ip_address: Option<String>,
        generation_number: i32,
    ) -> Result<GeneratedImage> {
        let mut state = self.state.lock().unwrap();
        if state.fail_on_save == Some(state.saved_bytes.len()) {
            return Err(AppError::Storage("disk full".to_string()));
        }
        state.saved_bytes.push(bytes.to_vec());
        let id = state.next_id + 1;
        state.next_id = id;
        let row = GeneratedImage {
            id,
            uploaded_image_id,
            prompt_id,
            user_id,
            ip_address,
            generation_number,
            filename: format!("{}_generated_{}.png", Uuid::new_v4(), generation_number),
            created_at: Utc::now(),
        };
        state.generated.push(row.clone());
        Ok(row)
    }
}

#[async_trait]
impl ArtifactStore for InMemoryArtifacts {
    async fn count_generated_for_ip_since(&self, ip: &str, since: DateTime<Utc>) -> Result<i64> {
        let state = self.state.lock().unwrap();
        Ok(state
            .generated
            .iter()
            .filter(|g| g.ip_address.as_deref() == Some(ip) && g.created_at >= since)
            .count() as i64)
    }

    async fn count_generated_for_user_since(
        &self,
        user_id: i64,
        since: DateTime<Utc>,
    ) -> Result<i64> {
        let state = self.state.lock().unwrap();
        Ok(state
            .generated
            .iter()
            .filter(|g| g.user_id == Some(user_id) && g.created_at >= since)
            .count() as i64)
    }

    async fn find_uploaded_for_user(&self, uuid: Uuid, user_id: i64) -> Result<UploadedImage> {
        let state = self.state.lock().unwrap();
        state
            .uploads
            .iter()
            .find(|u| u.uuid == uuid && u.user_id == Some(user_id))
            .cloned()
            .ok_or_else(|| AppError::NotFound("Image not found".to_string()))
    }

    async fn save_public_generated(
        &self,
        bytes: &[u8],
        prompt_id: i64,
        ip: &str,
        generation_number: i32,
    ) -> Result<GeneratedImage> {
        self.save(
            bytes,
            None,
            prompt_id,
            None,
            Some(ip.to_string()),
            generation_number,
        )
    }

    async fn save_user_generated(
        &self,
        bytes: &[u8],
        uploaded_image_id: i64,
        prompt_id: i64,
        user_id: i64,
        generation_number: i32,
    ) -> Result<GeneratedImage> {
        self.save(
            bytes,
            Some(uploaded_image_id),
            prompt_id,
            Some(user_id),
            None,
            generation_number,
        )
    }
}

/// PromptLookup over a fixed set of prompts
#[derive(Default)]
pub struct FixedPrompts {
    prompts: HashMap<i64, Prompt>,
}

impl FixedPrompts {
    pub fn with_prompt(mut self, id: i64, active: bool) -> Self {
        self.prompts.insert(
            id,
            Prompt {
                id,
                title: format!("Prompt {}", id),
                prompt_text: Some("A watercolor painting of".to_string()),
                style_text: Some("soft pastel tones".to_string()),
                active,
                example_image_filename: None,
                created_at: Utc::now(),
            },
        );
        self
    }
}

#[async_trait]
impl PromptLookup for FixedPrompts {
    async fn get_prompt_by_id(&self, prompt_id: i64) -> Result<Prompt> {
        self.prompts
            .get(&prompt_id)
            .cloned()
            .ok_or_else(|| AppError::NotFound("Prompt not found".to_string()))
    }
}

/// UserLookup over a fixed set of users
#[derive(Default)]
pub struct FixedUsers {
    users: HashMap<i64, User>,
}

impl FixedUsers {
    pub fn with_user(mut self, id: i64) -> Self {
        self.users.insert(
            id,
            User {
                id,
                email: format!("user{}@example.com", id),
                created_at: Utc::now(),
            },
        );
        self
    }
}

#[async_trait]
impl UserLookup for FixedUsers {
    async fn get_user_by_id(&self, user_id: i64) -> Result<User> {
        self.users
            .get(&user_id)
            .cloned()
            .ok_or_else(|| AppError::NotFound("User not found".to_string()))
    }
}

struct StubCall {
    source_bytes: Vec<u8>,
    prompt_text: String,
}

/// ImageGenerator that records its input and returns canned output
pub struct StubGenerator {
    outputs: Option<Vec<Vec<u8>>>,
    calls: Mutex<Vec<StubCall>>,
}

impl StubGenerator {
    pub fn returning(outputs: Vec<Vec<u8>>) -> Self {
        Self {
            outputs: Some(outputs),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn failing() -> Self {
        Self {
            outputs: None,
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    pub fn last_source_bytes(&self) -> Option<Vec<u8>> {
        self.calls
            .lock()
            .unwrap()
            .last()
            .map(|c| c.source_bytes.clone())
    }

    pub fn last_prompt_text(&self) -> Option<String> {
        self.calls
            .lock()
            .unwrap()
            .last()
            .map(|c| c.prompt_text.clone())
    }
}

#[async_trait]
impl ImageGenerator for StubGenerator {
    async fn generate(
        &self,
        source: &ImageUpload,
        prompt_text: &str,
        _options: &GenerationOptions,
    ) -> Result<Vec<Vec<u8>>> {
        self.calls.lock().unwrap().push(StubCall {
            source_bytes: source.bytes.clone(),
            prompt_text: prompt_text.to_string(),
        });
        match &self.outputs {
            Some(outputs) => Ok(outputs.clone()),
            None => Err(AppError::ExternalServiceError(
                "Image generation request failed".to_string(),
            )),
        }
    }
}
