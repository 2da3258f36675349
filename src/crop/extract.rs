use super::raster::RasterImage;
use super::types::{EncodedRaster, NaturalSize, NativeRect, OutputSpec};
use crate::errors::{CropError, Result};
use crate::image_loader;
use image::{imageops, Rgba, RgbaImage};
use imageproc::geometric_transformations::{warp_with, Interpolation};
use rayon::prelude::*;

/// Values this close to an integer are treated as that integer before
/// floor/ceil, so float noise cannot grow a region by a pixel.
const SNAP_EPSILON: f64 = 1e-6;

/// Side of the square buffer that holds the image at any rotation without
/// clipping a corner.
pub fn safe_area_side(natural: NaturalSize) -> u32 {
    let max_size = natural.width.max(natural.height) as f64;
    2 * (max_size / 2.0 * std::f64::consts::SQRT_2).ceil() as u32
}

/// Crop, rotate and resample without encoding.
pub fn extract_pixels(
    image: &RasterImage,
    rect: &NativeRect,
    output: &OutputSpec,
    rotation_degrees: f64,
) -> Result<RgbaImage> {
    let source = image.pixels();
    if source.width() == 0 || source.height() == 0 {
        return Err(CropError::source_unavailable("source image has no pixels"));
    }
    if output.width == 0 || output.height == 0 {
        return Err(CropError::invalid_dimensions(format!(
            "output size {}x{} must be positive",
            output.width, output.height
        )));
    }
    if !rotation_degrees.is_finite() {
        return Err(CropError::invalid_dimensions(format!(
            "rotation {} is not a finite angle",
            rotation_degrees
        )));
    }

    let degrees = rotation_degrees % 360.0;
    let region = if degrees == 0.0 {
        let (x, y, width, height) = pixel_bounds(rect, source.width(), source.height())?;
        imageops::crop_imm(source, x, y, width, height).to_image()
    } else {
        let (canvas, offset_x, offset_y) = rotate_into_safe_area(source, degrees);
        let shifted = NativeRect {
            x: rect.x + offset_x as f64,
            y: rect.y + offset_y as f64,
            ..*rect
        };
        let (x, y, width, height) = pixel_bounds(&shifted, canvas.width(), canvas.height())?;
        imageops::crop_imm(&canvas, x, y, width, height).to_image()
    };

    tracing::debug!(
        "Extracted {}x{} region, resampling to {}x{}",
        region.width(),
        region.height(),
        output.width,
        output.height
    );

    if region.dimensions() == (output.width, output.height) {
        return Ok(region);
    }
    Ok(imageops::resize(
        &region,
        output.width,
        output.height,
        output.filter.filter_type(),
    ))
}

/// Crop `rect` out of `image`, resample it to the output size and encode it.
pub fn extract_crop(
    image: &RasterImage,
    rect: &NativeRect,
    output: &OutputSpec,
    rotation_degrees: f64,
) -> Result<EncodedRaster> {
    let pixels = extract_pixels(image, rect, output, rotation_degrees)?;
    let bytes = image_loader::encode_rgba(&pixels, output.format, output.quality)?;

    tracing::info!(
        "Cropped to {}x{} {} ({} bytes)",
        output.width,
        output.height,
        output.format.name(),
        bytes.len()
    );

    Ok(EncodedRaster {
        bytes,
        width: output.width,
        height: output.height,
        format: output.format,
    })
}

/// Render several outputs (e.g. logo and favicon) from one crop in parallel.
pub fn extract_variants(
    image: &RasterImage,
    rect: &NativeRect,
    outputs: &[OutputSpec],
    rotation_degrees: f64,
) -> Vec<Result<EncodedRaster>> {
    outputs
        .par_iter()
        .map(|output| extract_crop(image, rect, output, rotation_degrees))
        .collect()
}

/// Draw the source centered on a transparent square canvas and rotate it
/// clockwise about the image center. Returns the canvas and the offset of the
/// unrotated image's top-left corner within it.
fn rotate_into_safe_area(source: &RgbaImage, degrees: f64) -> (RgbaImage, u32, u32) {
    let (width, height) = source.dimensions();
    let side = safe_area_side(NaturalSize::new(width, height));
    let offset_x = (side - width) / 2;
    let offset_y = (side - height) / 2;

    let mut canvas = RgbaImage::new(side, side);
    imageops::replace(&mut canvas, source, offset_x as i64, offset_y as i64);

    // Pixel centers sit on integer coordinates, so the middle of a w-wide
    // image is at (w - 1) / 2
    let center_x = offset_x as f64 + (width as f64 - 1.0) / 2.0;
    let center_y = offset_y as f64 + (height as f64 - 1.0) / 2.0;
    let theta = degrees.to_radians();
    let (sin, cos) = (snap(theta.sin()), snap(theta.cos()));
    tracing::debug!(
        "Rotating {}x{} by {} degrees in {}px safe area",
        width,
        height,
        degrees,
        side
    );

    // Pre-image of each output pixel: the inverse clockwise rotation
    let rotated = warp_with(
        &canvas,
        move |x, y| {
            let dx = x as f64 - center_x;
            let dy = y as f64 - center_y;
            (
                (cos * dx + sin * dy + center_x) as f32,
                (cos * dy - sin * dx + center_y) as f32,
            )
        },
        Interpolation::Bilinear,
        Rgba([0, 0, 0, 0]),
    );
    (rotated, offset_x, offset_y)
}

/// Integer pixel bounds for `rect`: floor the origin, ceil the far edge,
/// clamp to the buffer.
fn pixel_bounds(
    rect: &NativeRect,
    buffer_width: u32,
    buffer_height: u32,
) -> Result<(u32, u32, u32, u32)> {
    let finite = rect.x.is_finite()
        && rect.y.is_finite()
        && rect.width.is_finite()
        && rect.height.is_finite();
    if !finite || rect.width <= 0.0 || rect.height <= 0.0 {
        return Err(CropError::EmptyRegion {
            width: rect.width,
            height: rect.height,
        });
    }

    let left = snap(rect.x).floor().max(0.0);
    let top = snap(rect.y).floor().max(0.0);
    let right = snap(rect.x + rect.width).ceil().min(buffer_width as f64);
    let bottom = snap(rect.y + rect.height).ceil().min(buffer_height as f64);

    if right <= left || bottom <= top {
        return Err(CropError::EmptyRegion {
            width: (right - left).max(0.0),
            height: (bottom - top).max(0.0),
        });
    }

    Ok((left as u32, top as u32, (right - left) as u32, (bottom - top) as u32))
}

fn snap(value: f64) -> f64 {
    let rounded = value.round();
    if (value - rounded).abs() < SNAP_EPSILON {
        rounded
    } else {
        value
    }
}
