use super::types::{CropRect, DisplayGeometry, NaturalSize, NativeRect};

/// Map a display-space crop rectangle onto the image's native pixel grid.
pub fn display_rect_to_native_rect(
    rect: &CropRect,
    display: &DisplayGeometry,
    natural: NaturalSize,
) -> NativeRect {
    let scale_x = natural.width as f64 / display.display_width;
    let scale_y = natural.height as f64 / display.display_height;

    NativeRect {
        x: (rect.x - display.offset_x) * scale_x,
        y: (rect.y - display.offset_y) * scale_y,
        width: rect.width * scale_x,
        height: rect.height * scale_y,
    }
}

/// Inverse of [`display_rect_to_native_rect`].
pub fn native_rect_to_display_rect(
    rect: &NativeRect,
    display: &DisplayGeometry,
    natural: NaturalSize,
) -> CropRect {
    let scale_x = display.display_width / natural.width as f64;
    let scale_y = display.display_height / natural.height as f64;

    CropRect {
        x: rect.x * scale_x + display.offset_x,
        y: rect.y * scale_y + display.offset_y,
        width: rect.width * scale_x,
        height: rect.height * scale_y,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crop::layout::{compute_display_geometry, compute_initial_crop_rect};
    use crate::crop::types::{AspectRatio, Size};

    const EPS: f64 = 1e-6;

    #[test]
    fn test_square_crop_maps_to_native() {
        let natural = NaturalSize::new(1600, 900);
        let display = compute_display_geometry(natural, Size::new(800.0, 600.0), 0.9).unwrap();
        let rect = compute_initial_crop_rect(&display, AspectRatio::SQUARE, 0.8);

        let native = display_rect_to_native_rect(&rect, &display, natural);
        // 1600 / 720 = 20/9
        assert!((native.x - 198.0 * 20.0 / 9.0).abs() < EPS);
        assert!((native.y - 40.5 * 20.0 / 9.0).abs() < EPS);
        assert!((native.width - 720.0).abs() < EPS);
        assert!((native.height - 720.0).abs() < EPS);
    }

    #[test]
    fn test_full_display_maps_to_full_image() {
        let natural = NaturalSize::new(333, 777);
        let display = compute_display_geometry(natural, Size::new(640.0, 480.0), 0.9).unwrap();
        let rect = CropRect::new(
            display.offset_x,
            display.offset_y,
            display.display_width,
            display.display_height,
        );

        let native = display_rect_to_native_rect(&rect, &display, natural);
        assert!(native.x.abs() < EPS && native.y.abs() < EPS);
        assert!((native.width - 333.0).abs() < EPS);
        assert!((native.height - 777.0).abs() < EPS);
    }

    #[test]
    fn test_roundtrip_recovers_display_rect() {
        let natural = NaturalSize::new(4032, 3024);
        let display = compute_display_geometry(natural, Size::new(800.0, 600.0), 0.9).unwrap();
        let rects = [
            CropRect::new(display.offset_x, display.offset_y, 10.0, 10.0),
            CropRect::new(123.456, 78.9, 250.0, 187.5),
            CropRect::new(display.right() - 1.0, display.bottom() - 1.0, 1.0, 1.0),
        ];

        for rect in rects {
            let native = display_rect_to_native_rect(&rect, &display, natural);
            let back = native_rect_to_display_rect(&native, &display, natural);
            assert!((back.x - rect.x).abs() < EPS);
            assert!((back.y - rect.y).abs() < EPS);
            assert!((back.width - rect.width).abs() < EPS);
            assert!((back.height - rect.height).abs() < EPS);
        }
    }
}
