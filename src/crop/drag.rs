use super::types::{DisplayGeometry, Point, Size};

/// Clamp a proposed crop origin so a `crop_size` rectangle stays on the
/// displayed image. When the rectangle is larger than the display the origin
/// pins to the lower bound.
pub fn clamp_crop_position(proposed: Point, crop_size: Size, display: &DisplayGeometry) -> Point {
    Point {
        x: clamp_axis(
            proposed.x,
            display.offset_x,
            display.offset_x + display.display_width - crop_size.width,
        ),
        y: clamp_axis(
            proposed.y,
            display.offset_y,
            display.offset_y + display.display_height - crop_size.height,
        ),
    }
}

fn clamp_axis(value: f64, lower: f64, upper: f64) -> f64 {
    // f64::clamp panics on an inverted range and propagates NaN
    if value.is_nan() || upper.is_nan() || upper < lower {
        return lower;
    }
    value.clamp(lower, upper)
}
