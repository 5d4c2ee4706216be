pub mod generation_dto;

pub use generation_dto::{
    GenerationResponse, PublicGenerationForm, PublicGenerationRequest, UserGenerationRequest,
};
