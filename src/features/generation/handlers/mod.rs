pub mod generation_handler;

pub use generation_handler::{generate_public_image, generate_user_image, GenerationState};
