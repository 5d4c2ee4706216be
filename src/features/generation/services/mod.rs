mod generation_service;
mod provider;
mod rate_limiter;
#[cfg(test)]
pub mod test_support;

pub use generation_service::{ImageGenerationService, GENERATION_BATCH_SIZE};
pub use provider::{
    GenerationOptions, ImageGenerator, OpenAiImageClient, TestModeImageGenerator,
};
pub use rate_limiter::{
    GenerationRateLimiter, RateLimitPolicy, RateLimitSubject, PUBLIC_RATE_LIMIT, USER_RATE_LIMIT,
};
