mod generated_image;
mod uploaded_image;

pub use generated_image::GeneratedImage;
pub use uploaded_image::UploadedImage;
