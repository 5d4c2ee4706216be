//! Filesystem-backed image store
//!
//! Persists uploaded and generated images under a per-type directory
//! layout and maps each type to the URL prefix it is served from.

use std::io::Cursor;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tokio::fs;
use tracing::{debug, info};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::core::config::StorageConfig;
use crate::core::error::{AppError, Result};

/// Logical namespace an image is stored under
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageType {
    /// Generated from anonymous requests; served from a public path
    Public,
    /// Customer uploads and their generated images; served through the
    /// authenticated endpoint only
    Private,
    /// Admin-curated prompt example images; served from a public path
    PromptExample,
}

struct ImageTypeConfig {
    relative_path: &'static str,
    url_path: &'static str,
    publicly_accessible: bool,
}

impl ImageType {
    pub const ALL: [ImageType; 3] = [
        ImageType::Public,
        ImageType::Private,
        ImageType::PromptExample,
    ];

    /// Static path configuration per type; the single place path and URL
    /// policy is defined.
    const fn config(self) -> &'static ImageTypeConfig {
        match self {
            ImageType::Public => &ImageTypeConfig {
                relative_path: "public/images",
                url_path: "/images/public",
                publicly_accessible: true,
            },
            ImageType::Private => &ImageTypeConfig {
                relative_path: "private/images",
                url_path: "/api/user/images",
                publicly_accessible: false,
            },
            ImageType::PromptExample => &ImageTypeConfig {
                relative_path: "public/images/prompt-examples",
                url_path: "/images/prompt-examples",
                publicly_accessible: true,
            },
        }
    }

    pub fn is_publicly_accessible(self) -> bool {
        self.config().publicly_accessible
    }
}

/// Rectangular sub-region of a source image, in pixel coordinates
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Validate, ToSchema)]
pub struct CropArea {
    pub x: u32,
    pub y: u32,
    #[validate(range(min = 1))]
    pub width: u32,
    #[validate(range(min = 1))]
    pub height: u32,
}

/// Filesystem image store addressed by `(ImageType, filename)`
pub struct ImageStorage {
    root: PathBuf,
}

impl ImageStorage {
    /// Create the store and ensure every per-type directory exists.
    pub async fn new(config: &StorageConfig) -> Result<Self> {
        let root = config.root.clone();

        for image_type in ImageType::ALL {
            let dir = root.join(image_type.config().relative_path);
            fs::create_dir_all(&dir).await.map_err(|e| {
                AppError::Storage(format!(
                    "Failed to create storage directory {}: {}",
                    dir.display(),
                    e
                ))
            })?;
        }

        info!("Image storage initialized at {}", root.display());
        Ok(Self { root })
    }

    fn physical_path(&self, image_type: ImageType) -> PathBuf {
        self.root.join(image_type.config().relative_path)
    }

    fn physical_file_path(&self, image_type: ImageType, filename: &str) -> Result<PathBuf> {
        // Filenames are path components, never paths
        if filename.is_empty()
            || filename.contains('/')
            || filename.contains('\\')
            || filename.contains("..")
        {
            return Err(AppError::BadRequest(format!(
                "Invalid filename: {}",
                filename
            )));
        }
        Ok(self.physical_path(image_type).join(filename))
    }

    /// Store image bytes under a fresh collision-resistant filename,
    /// cropping first when a crop area is supplied. Cropped output is
    /// re-encoded as PNG.
    pub async fn store(
        &self,
        bytes: &[u8],
        original_filename: &str,
        image_type: ImageType,
        crop: Option<&CropArea>,
    ) -> Result<String> {
        let (data, extension) = match crop {
            Some(area) => (crop_image(bytes, area)?, ".png".to_string()),
            None => (bytes.to_vec(), file_extension(original_filename)),
        };

        let stored_filename = format!("{}{}", Uuid::new_v4(), extension);
        self.write(&stored_filename, image_type, &data).await?;

        debug!(
            "Stored image: type={:?}, filename={}, bytes={}",
            image_type,
            stored_filename,
            data.len()
        );
        Ok(stored_filename)
    }

    /// Store image bytes under a caller-chosen filename (generated outputs
    /// carry their batch sequence in the name).
    pub async fn store_named(
        &self,
        bytes: &[u8],
        filename: &str,
        image_type: ImageType,
    ) -> Result<()> {
        self.write(filename, image_type, bytes).await
    }

    async fn write(&self, filename: &str, image_type: ImageType, data: &[u8]) -> Result<()> {
        let path = self.physical_file_path(image_type, filename)?;
        fs::write(&path, data).await.map_err(|e| {
            AppError::Storage(format!("Failed to write {}: {}", path.display(), e))
        })
    }

    pub async fn load(&self, filename: &str, image_type: ImageType) -> Result<Vec<u8>> {
        let path = self.physical_file_path(image_type, filename)?;

        if !fs::try_exists(&path).await.unwrap_or(false) {
            return Err(AppError::NotFound(format!(
                "Image with filename {} not found",
                filename
            )));
        }

        fs::read(&path)
            .await
            .map_err(|e| AppError::Storage(format!("Failed to read {}: {}", path.display(), e)))
    }

    pub async fn exists(&self, filename: &str, image_type: ImageType) -> bool {
        match self.physical_file_path(image_type, filename) {
            Ok(path) => fs::try_exists(&path).await.unwrap_or(false),
            Err(_) => false,
        }
    }

    /// Deterministic client-facing URL for a stored image. Whether the URL
    /// is reachable without authentication is the type's policy, not a
    /// runtime decision.
    pub fn image_url(&self, image_type: ImageType, filename: &str) -> String {
        let url_path = image_type.config().url_path;
        if url_path.ends_with('/') {
            format!("{}{}", url_path, filename)
        } else {
            format!("{}/{}", url_path, filename)
        }
    }
}

/// Crop a decoded image to the given area and re-encode as PNG.
///
/// The area must lie entirely within the source bounds; anything else is a
/// caller error and nothing is written.
pub fn crop_image(bytes: &[u8], area: &CropArea) -> Result<Vec<u8>> {
    if area.width == 0 || area.height == 0 {
        return Err(AppError::BadRequest(
            "Crop area must have a non-zero width and height".to_string(),
        ));
    }

    let source = image::load_from_memory(bytes)
        .map_err(|e| AppError::BadRequest(format!("Unable to decode image: {}", e)))?;

    let (src_width, src_height) = (source.width(), source.height());
    let within_bounds = area
        .x
        .checked_add(area.width)
        .is_some_and(|right| right <= src_width)
        && area
            .y
            .checked_add(area.height)
            .is_some_and(|bottom| bottom <= src_height);
    if !within_bounds {
        return Err(AppError::BadRequest(format!(
            "Crop area {}x{} at ({}, {}) exceeds image bounds {}x{}",
            area.width, area.height, area.x, area.y, src_width, src_height
        )));
    }

    let cropped = source.crop_imm(area.x, area.y, area.width, area.height);

    let mut out = Cursor::new(Vec::new());
    cropped
        .write_to(&mut out, image::ImageFormat::Png)
        .map_err(|e| AppError::Storage(format!("Failed to encode cropped image: {}", e)))?;

    Ok(out.into_inner())
}

fn file_extension(original_filename: &str) -> String {
    Path::new(original_filename)
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| format!(".{}", ext.to_lowercase()))
        .unwrap_or_else(|| ".png".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::StorageConfig;
    use tempfile::TempDir;

    fn png_bytes(width: u32, height: u32) -> Vec<u8> {
        let img = image::RgbaImage::from_pixel(width, height, image::Rgba([10, 20, 30, 255]));
        let mut out = Cursor::new(Vec::new());
        image::DynamicImage::ImageRgba8(img)
            .write_to(&mut out, image::ImageFormat::Png)
            .unwrap();
        out.into_inner()
    }

    async fn storage(dir: &TempDir) -> ImageStorage {
        ImageStorage::new(&StorageConfig {
            root: dir.path().to_path_buf(),
        })
        .await
        .unwrap()
    }

    #[tokio::test]
    async fn test_store_and_load_round_trip() {
        let dir = TempDir::new().unwrap();
        let storage = storage(&dir).await;
        let bytes = png_bytes(4, 4);

        let filename = storage
            .store(&bytes, "photo.png", ImageType::Private, None)
            .await
            .unwrap();

        assert!(storage.exists(&filename, ImageType::Private).await);
        let loaded = storage.load(&filename, ImageType::Private).await.unwrap();
        // Without a crop the original bytes are stored unchanged
        assert_eq!(loaded, bytes);
    }

    #[tokio::test]
    async fn test_store_with_crop_yields_cropped_dimensions() {
        let dir = TempDir::new().unwrap();
        let storage = storage(&dir).await;
        let bytes = png_bytes(200, 200);
        let crop = CropArea {
            x: 10,
            y: 10,
            width: 100,
            height: 100,
        };

        let filename = storage
            .store(&bytes, "photo.png", ImageType::Public, Some(&crop))
            .await
            .unwrap();

        let stored = storage.load(&filename, ImageType::Public).await.unwrap();
        let decoded = image::load_from_memory(&stored).unwrap();
        assert_eq!(decoded.width(), 100);
        assert_eq!(decoded.height(), 100);
    }

    #[tokio::test]
    async fn test_crop_out_of_bounds_is_rejected_without_write() {
        let dir = TempDir::new().unwrap();
        let storage = storage(&dir).await;
        let bytes = png_bytes(50, 50);
        let crop = CropArea {
            x: 40,
            y: 40,
            width: 100,
            height: 100,
        };

        let result = storage
            .store(&bytes, "photo.png", ImageType::Public, Some(&crop))
            .await;

        assert!(matches!(result, Err(AppError::BadRequest(_))));
        let mut entries = tokio::fs::read_dir(dir.path().join("public/images"))
            .await
            .unwrap();
        let mut files = 0;
        while let Some(entry) = entries.next_entry().await.unwrap() {
            if entry.file_type().await.unwrap().is_file() {
                files += 1;
            }
        }
        assert_eq!(files, 0);
    }

    #[tokio::test]
    async fn test_zero_size_crop_is_rejected() {
        let crop = CropArea {
            x: 0,
            y: 0,
            width: 0,
            height: 10,
        };
        assert!(matches!(
            crop_image(&png_bytes(10, 10), &crop),
            Err(AppError::BadRequest(_))
        ));
    }

    #[tokio::test]
    async fn test_undecodable_bytes_are_rejected() {
        let crop = CropArea {
            x: 0,
            y: 0,
            width: 1,
            height: 1,
        };
        assert!(matches!(
            crop_image(b"not an image", &crop),
            Err(AppError::BadRequest(_))
        ));
    }

    #[tokio::test]
    async fn test_load_missing_file_is_not_found() {
        let dir = TempDir::new().unwrap();
        let storage = storage(&dir).await;

        let result = storage.load("missing.png", ImageType::Private).await;
        assert!(matches!(result, Err(AppError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_path_traversal_filename_is_rejected() {
        let dir = TempDir::new().unwrap();
        let storage = storage(&dir).await;

        let result = storage.load("../secret.png", ImageType::Private).await;
        assert!(matches!(result, Err(AppError::BadRequest(_))));
    }

    #[tokio::test]
    async fn test_stored_filenames_are_unique() {
        let dir = TempDir::new().unwrap();
        let storage = storage(&dir).await;
        let bytes = png_bytes(2, 2);

        let a = storage
            .store(&bytes, "a.png", ImageType::Public, None)
            .await
            .unwrap();
        let b = storage
            .store(&bytes, "a.png", ImageType::Public, None)
            .await
            .unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn test_image_url_mapping() {
        let storage = ImageStorage {
            root: PathBuf::from("storage"),
        };

        assert_eq!(
            storage.image_url(ImageType::Public, "a.png"),
            "/images/public/a.png"
        );
        assert_eq!(
            storage.image_url(ImageType::Private, "b.png"),
            "/api/user/images/b.png"
        );
        assert!(ImageType::Public.is_publicly_accessible());
        assert!(!ImageType::Private.is_publicly_accessible());
    }
}
