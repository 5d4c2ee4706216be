//! Storage module for image files
//!
//! Provides the filesystem-backed store that uploaded and generated
//! images are persisted to, including crop-on-store and per-type
//! URL mapping.

mod image_store;

pub use image_store::{crop_image, CropArea, ImageStorage, ImageType};
