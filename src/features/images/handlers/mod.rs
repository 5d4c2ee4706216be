pub mod image_handler;

pub use image_handler::{
    get_public_image, get_user_image, read_image_field, upload_image, ImageState,
};
