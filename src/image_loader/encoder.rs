use crate::errors::{CropError, Result};
use crate::settings::OutputFormat;
use image::buffer::ConvertBuffer;
use image::{ImageFormat, RgbImage, RgbaImage};
use std::io::Cursor;

/// Encode an RGBA buffer. `quality` (1-100) only applies to JPEG; PNG and
/// WebP are written losslessly.
pub fn encode_rgba(pixels: &RgbaImage, format: OutputFormat, quality: u8) -> Result<Vec<u8>> {
    let mut buffer = Vec::new();

    match format {
        OutputFormat::Jpeg => {
            let (width, height) = pixels.dimensions();
            if width > u16::MAX as u32 || height > u16::MAX as u32 {
                return Err(CropError::Encode {
                    format: format.name().to_string(),
                    message: format!("{}x{} exceeds the JPEG size limit", width, height),
                });
            }

            // JPEG has no alpha; transparent areas come out black
            let rgb: RgbImage = pixels.convert();
            let encoder = jpeg_encoder::Encoder::new(&mut buffer, quality.clamp(1, 100));
            encoder
                .encode(&rgb, width as u16, height as u16, jpeg_encoder::ColorType::Rgb)
                .map_err(|e| encode_error(format, e))?;
        }
        OutputFormat::Png => {
            pixels
                .write_to(&mut Cursor::new(&mut buffer), ImageFormat::Png)
                .map_err(|e| encode_error(format, e))?;
        }
        OutputFormat::WebP => {
            pixels
                .write_to(&mut Cursor::new(&mut buffer), ImageFormat::WebP)
                .map_err(|e| encode_error(format, e))?;
        }
    }

    Ok(buffer)
}

fn encode_error(format: OutputFormat, error: impl std::fmt::Display) -> CropError {
    CropError::Encode {
        format: format.name().to_string(),
        message: error.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    fn checker(width: u32, height: u32) -> RgbaImage {
        RgbaImage::from_fn(width, height, |x, y| {
            if (x / 4 + y / 4) % 2 == 0 {
                Rgba([255, 255, 255, 255])
            } else {
                Rgba([0, 0, 0, 128])
            }
        })
    }

    #[test]
    fn test_png_is_lossless() {
        let pixels = checker(16, 16);
        let bytes = encode_rgba(&pixels, OutputFormat::Png, 50).unwrap();
        let decoded = image::load_from_memory_with_format(&bytes, ImageFormat::Png)
            .unwrap()
            .to_rgba8();
        assert_eq!(decoded, pixels);
    }

    #[test]
    fn test_webp_is_lossless() {
        let pixels = checker(16, 16);
        let bytes = encode_rgba(&pixels, OutputFormat::WebP, 95).unwrap();
        let decoded = image::load_from_memory_with_format(&bytes, ImageFormat::WebP)
            .unwrap()
            .to_rgba8();
        assert_eq!(decoded, pixels);
    }

    #[test]
    fn test_jpeg_quality_changes_size() {
        let pixels = RgbaImage::from_fn(64, 64, |x, y| {
            Rgba([(x * 4) as u8, (y * 4) as u8, ((x * y) % 256) as u8, 255])
        });
        let high = encode_rgba(&pixels, OutputFormat::Jpeg, 95).unwrap();
        let low = encode_rgba(&pixels, OutputFormat::Jpeg, 10).unwrap();
        assert!(low.len() < high.len());

        let decoded = image::load_from_memory_with_format(&high, ImageFormat::Jpeg).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (64, 64));
    }
}
