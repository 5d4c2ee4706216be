mod prompt_service;

pub use prompt_service::{PromptLookup, PromptService};
