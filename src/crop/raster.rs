use super::types::NaturalSize;
use crate::errors::{CropError, Result};
use image::{DynamicImage, RgbaImage};

/// Decoded source image. Read-only once constructed.
#[derive(Debug, Clone)]
pub struct RasterImage {
    pixels: RgbaImage,
}

impl RasterImage {
    pub fn from_rgba(width: u32, height: u32, data: Vec<u8>) -> Result<Self> {
        let expected = width as usize * height as usize * 4;
        if data.len() != expected {
            return Err(CropError::source_unavailable(format!(
                "pixel buffer has {} bytes, expected {} for {}x{} RGBA",
                data.len(),
                expected,
                width,
                height
            )));
        }
        let pixels = RgbaImage::from_raw(width, height, data)
            .ok_or_else(|| CropError::source_unavailable("failed to create image buffer"))?;
        Self::from_buffer(pixels)
    }

    pub fn from_buffer(pixels: RgbaImage) -> Result<Self> {
        if pixels.width() == 0 || pixels.height() == 0 {
            return Err(CropError::source_unavailable(format!(
                "image has no pixels ({}x{})",
                pixels.width(),
                pixels.height()
            )));
        }
        Ok(Self { pixels })
    }

    pub fn from_dynamic(image: DynamicImage) -> Result<Self> {
        Self::from_buffer(image.into_rgba8())
    }

    pub fn natural_size(&self) -> NaturalSize {
        NaturalSize::new(self.pixels.width(), self.pixels.height())
    }

    pub fn pixels(&self) -> &RgbaImage {
        &self.pixels
    }
}
