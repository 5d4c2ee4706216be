mod prompt_dto;

pub use prompt_dto::PromptResponseDto;
