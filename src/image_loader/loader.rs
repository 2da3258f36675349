use crate::crop::RasterImage;
use crate::errors::{CropError, Result};
use image::GenericImageView;
use std::path::Path;

pub const SUPPORTED_EXTENSIONS: &[&str] = &[
    "jpg", "jpeg", "png", "gif", "bmp", "tiff", "tif", "webp", "ico", "pnm", "pbm", "pgm", "ppm",
    "tga", "qoi",
];

/// Largest file accepted for decoding
pub const MAX_FILE_SIZE: u64 = 500 * 1024 * 1024;
/// Largest decoded image accepted, in megapixels
pub const MAX_MEGAPIXELS: u64 = 100;

pub fn is_supported_image(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| SUPPORTED_EXTENSIONS.contains(&e.to_lowercase().as_str()))
        .unwrap_or(false)
}

pub fn load_image(path: &Path) -> Result<RasterImage> {
    if !path.exists() {
        return Err(CropError::source_unavailable(format!(
            "file not found: {}",
            path.display()
        )));
    }
    if !is_supported_image(path) {
        return Err(CropError::source_unavailable(format!(
            "unsupported image type: {}",
            path.display()
        )));
    }

    // Refuse extremely large files before reading them
    let file_size = std::fs::metadata(path)?.len();
    if file_size > MAX_FILE_SIZE {
        return Err(CropError::source_unavailable(format!(
            "file too large: {}MB (max {}MB)",
            file_size / (1024 * 1024),
            MAX_FILE_SIZE / (1024 * 1024)
        )));
    }

    log::debug!("Decoding image: {:?}", path);
    let bytes = std::fs::read(path)?;
    let image = decode_bytes(&bytes).map_err(|e| {
        log::error!("Failed to decode {:?}: {}", path, e);
        e
    })?;
    log::info!(
        "Loaded image {:?} ({}x{})",
        path,
        image.natural_size().width,
        image.natural_size().height
    );
    Ok(image)
}

/// Decode an in-memory file (PNG, JPEG, ...) into a raster.
pub fn decode_bytes(bytes: &[u8]) -> Result<RasterImage> {
    let image =
        image::load_from_memory(bytes).map_err(|e| CropError::source_unavailable(e.to_string()))?;

    let (width, height) = image.dimensions();
    let megapixels = (width as u64 * height as u64) / 1_000_000;
    if megapixels > MAX_MEGAPIXELS {
        return Err(CropError::source_unavailable(format!(
            "image too large: {}MP (max {}MP)",
            megapixels, MAX_MEGAPIXELS
        )));
    }

    RasterImage::from_dynamic(image)
}
