use super::types::{AspectRatio, CropRect, DisplayGeometry, NaturalSize, Size};
use crate::errors::{CropError, Result};

/// Fit an image into the viewport, constrained by whichever side is limiting,
/// and center it.
pub fn compute_display_geometry(
    natural: NaturalSize,
    viewport: Size,
    fit_margin: f64,
) -> Result<DisplayGeometry> {
    if natural.width == 0 || natural.height == 0 {
        return Err(CropError::invalid_dimensions(format!(
            "image size {}x{} must be positive",
            natural.width, natural.height
        )));
    }
    if !(viewport.width.is_finite() && viewport.height.is_finite())
        || viewport.width <= 0.0
        || viewport.height <= 0.0
    {
        return Err(CropError::invalid_dimensions(format!(
            "viewport size {}x{} must be positive",
            viewport.width, viewport.height
        )));
    }
    if !(fit_margin > 0.0 && fit_margin <= 1.0) {
        return Err(CropError::invalid_dimensions(format!(
            "fit margin {} must be in (0, 1]",
            fit_margin
        )));
    }

    let image_ratio = natural.aspect();
    let viewport_ratio = viewport.width / viewport.height;

    let (display_width, display_height) = if image_ratio > viewport_ratio {
        // Relatively wider than the viewport
        let width = viewport.width * fit_margin;
        (width, width / image_ratio)
    } else {
        let height = viewport.height * fit_margin;
        (height * image_ratio, height)
    };

    Ok(DisplayGeometry {
        display_width,
        display_height,
        offset_x: (viewport.width - display_width) / 2.0,
        offset_y: (viewport.height - display_height) / 2.0,
    })
}

/// Default crop area: `crop_fill` of the smaller display side along the
/// dominant axis, centered on the displayed image.
pub fn compute_initial_crop_rect(
    display: &DisplayGeometry,
    aspect: AspectRatio,
    crop_fill: f64,
) -> CropRect {
    let crop_fill = if crop_fill.is_nan() {
        1.0
    } else {
        crop_fill.clamp(f64::MIN_POSITIVE, 1.0)
    };
    let ratio = aspect.value();
    let crop_size = display.display_width.min(display.display_height) * crop_fill;

    let (width, height) = if ratio >= 1.0 {
        (crop_size, crop_size / ratio)
    } else {
        (crop_size * ratio, crop_size)
    };

    CropRect {
        x: display.offset_x + (display.display_width - width) / 2.0,
        y: display.offset_y + (display.display_height - height) / 2.0,
        width,
        height,
    }
}
