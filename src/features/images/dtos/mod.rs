mod image_dto;

pub use image_dto::{
    is_content_type_allowed, validate_image_upload, ImageUpload, UploadedImageResponseDto,
    ALLOWED_IMAGE_CONTENT_TYPES, MAX_IMAGE_SIZE,
};
