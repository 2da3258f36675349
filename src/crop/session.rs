use super::drag::clamp_crop_position;
use super::extract::extract_crop;
use super::layout::{compute_display_geometry, compute_initial_crop_rect};
use super::raster::RasterImage;
use super::transform::{display_rect_to_native_rect, native_rect_to_display_rect};
use super::types::{
    AspectMode, CropRect, DisplayGeometry, EncodedRaster, NaturalSize, NativeRect, OutputSpec,
    Point, Size,
};
use crate::errors::{CropError, Result};
use crate::settings::CropSettings;

/// Pointer distance from a corner that still grabs its resize handle.
pub const HANDLE_RADIUS: f64 = 8.0;
/// Smallest side a free-aspect resize can shrink the crop area to.
pub const MIN_CROP_SIZE: f64 = 10.0;

/// Clamp a zoom factor into `min..=max`. NaN maps to `min`, and an inverted
/// range collapses to `min`.
pub fn clamp_zoom(zoom: f64, min: f64, max: f64) -> f64 {
    if zoom.is_nan() {
        return min;
    }
    zoom.clamp(min, max.max(min))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DragHandle {
    #[default]
    Move,
    TopLeft,
    TopRight,
    BottomLeft,
    BottomRight,
}

impl DragHandle {
    fn is_left(self) -> bool {
        matches!(self, DragHandle::TopLeft | DragHandle::BottomLeft)
    }

    fn is_top(self) -> bool {
        matches!(self, DragHandle::TopLeft | DragHandle::TopRight)
    }
}

#[derive(Debug, Clone, Copy)]
struct DragState {
    handle: DragHandle,
    /// Pointer position relative to the crop origin when the drag started
    grab_offset: Point,
    /// Corner that stays fixed during a resize
    anchor: Point,
}

/// Layout parameters a session is created with.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SessionParams {
    pub viewport: Size,
    pub fit_margin: f64,
    pub crop_fill: f64,
    pub aspect: AspectMode,
    pub min_zoom: f64,
    pub max_zoom: f64,
    /// Increment used by `zoom_in` and `zoom_out`
    pub zoom_step: f64,
}

impl From<&CropSettings> for SessionParams {
    fn from(settings: &CropSettings) -> Self {
        Self {
            viewport: settings.viewport(),
            fit_margin: settings.fit_margin,
            crop_fill: settings.crop_fill,
            aspect: settings.aspect,
            min_zoom: settings.min_zoom,
            max_zoom: settings.max_zoom,
            zoom_step: settings.zoom_step,
        }
    }
}

impl Default for SessionParams {
    fn default() -> Self {
        Self::from(&CropSettings::default())
    }
}

/// State of one crop interaction: the image's size, where it is displayed,
/// the current crop area, zoom and rotation.
///
/// Every change goes through the pure layout functions, so the crop area
/// never leaves the displayed image.
#[derive(Debug, Clone)]
pub struct CropSession {
    natural: NaturalSize,
    params: SessionParams,
    display: DisplayGeometry,
    /// Crop area size at zoom 1
    base_size: Size,
    crop_rect: CropRect,
    zoom: f64,
    rotation: f64,
    drag: Option<DragState>,
}

impl CropSession {
    pub fn new(natural: NaturalSize, params: SessionParams) -> Result<Self> {
        if !(params.min_zoom > 0.0 && params.max_zoom >= params.min_zoom) {
            return Err(CropError::invalid_dimensions(format!(
                "zoom range {}..{} is invalid",
                params.min_zoom, params.max_zoom
            )));
        }
        let geometry = compute_display_geometry(natural, params.viewport, params.fit_margin)?;
        let crop_rect = compute_initial_crop_rect(
            &geometry,
            params.aspect.initial_ratio(&geometry),
            params.crop_fill,
        );

        tracing::debug!(
            "Crop session for {}x{}: display {:.1}x{:.1}, crop {:.1}x{:.1}",
            natural.width,
            natural.height,
            geometry.display_width,
            geometry.display_height,
            crop_rect.width,
            crop_rect.height
        );

        Ok(Self {
            natural,
            params,
            display: geometry,
            base_size: crop_rect.size(),
            crop_rect,
            zoom: 1.0,
            rotation: 0.0,
            drag: None,
        })
    }

    pub fn from_settings(natural: NaturalSize, settings: &CropSettings) -> Result<Self> {
        Self::new(natural, SessionParams::from(settings))
    }

    pub fn natural_size(&self) -> NaturalSize {
        self.natural
    }

    pub fn display(&self) -> &DisplayGeometry {
        &self.display
    }

    pub fn crop_rect(&self) -> CropRect {
        self.crop_rect
    }

    pub fn aspect(&self) -> AspectMode {
        self.params.aspect
    }

    pub fn zoom(&self) -> f64 {
        self.zoom
    }

    pub fn rotation(&self) -> f64 {
        self.rotation
    }

    pub fn is_dragging(&self) -> bool {
        self.drag.is_some()
    }

    /// Back to the centered default area, zoom 1 and no rotation.
    pub fn reset(&mut self) {
        let ratio = self.params.aspect.initial_ratio(&self.display);
        self.crop_rect = compute_initial_crop_rect(&self.display, ratio, self.params.crop_fill);
        self.base_size = self.crop_rect.size();
        self.zoom = 1.0;
        self.rotation = 0.0;
        self.drag = None;
    }

    pub fn set_aspect(&mut self, aspect: AspectMode) {
        self.params.aspect = aspect;
        self.reset();
    }

    /// Re-fit the image into a resized viewport, keeping the same native
    /// region selected.
    pub fn relayout(&mut self, viewport: Size) -> Result<()> {
        let display = compute_display_geometry(self.natural, viewport, self.params.fit_margin)?;
        let native = self.native_rect();
        let mapped = native_rect_to_display_rect(&native, &display, self.natural);

        let scale = display.display_width / self.display.display_width;
        self.base_size = Size::new(
            (self.base_size.width * scale).min(display.display_width),
            (self.base_size.height * scale).min(display.display_height),
        );
        let size = Size::new(
            mapped.width.min(display.display_width),
            mapped.height.min(display.display_height),
        );
        let origin = clamp_crop_position(mapped.origin(), size, &display);

        self.params.viewport = viewport;
        self.display = display;
        self.crop_rect = CropRect::new(origin.x, origin.y, size.width, size.height);
        self.drag = None;
        Ok(())
    }

    /// Start a drag at `pointer`. Returns false when the pointer misses the
    /// crop area. Corner handles only resize in free-aspect mode.
    pub fn begin_drag(&mut self, pointer: Point) -> bool {
        let rect = self.crop_rect;
        let handle = if self.params.aspect.is_free() {
            self.handle_at(pointer)
        } else {
            None
        };

        let handle = match handle {
            Some(handle) => handle,
            None if rect.contains(pointer) => DragHandle::Move,
            None => return false,
        };

        let anchor_x = if handle.is_left() {
            rect.x + rect.width
        } else {
            rect.x
        };
        let anchor_y = if handle.is_top() {
            rect.y + rect.height
        } else {
            rect.y
        };
        let anchor = Point::new(anchor_x, anchor_y);
        self.drag = Some(DragState {
            handle,
            grab_offset: Point::new(pointer.x - rect.x, pointer.y - rect.y),
            anchor,
        });
        true
    }

    /// Follow the pointer during a drag. Ignored when no drag is active.
    pub fn drag_to(&mut self, pointer: Point) -> CropRect {
        let Some(drag) = self.drag else {
            return self.crop_rect;
        };

        self.crop_rect = match drag.handle {
            DragHandle::Move => {
                let proposed =
                    Point::new(pointer.x - drag.grab_offset.x, pointer.y - drag.grab_offset.y);
                let origin = clamp_crop_position(proposed, self.crop_rect.size(), &self.display);
                CropRect::new(origin.x, origin.y, self.crop_rect.width, self.crop_rect.height)
            }
            handle => {
                let resized = self.resize_from(handle, drag.anchor, pointer);
                self.base_size = Size::new(resized.width * self.zoom, resized.height * self.zoom);
                resized
            }
        };
        self.crop_rect
    }

    pub fn end_drag(&mut self) {
        self.drag = None;
    }

    /// Shift the crop area by a delta, e.g. from arrow keys.
    pub fn move_by(&mut self, dx: f64, dy: f64) -> CropRect {
        let proposed = Point::new(self.crop_rect.x + dx, self.crop_rect.y + dy);
        let origin = clamp_crop_position(proposed, self.crop_rect.size(), &self.display);
        self.crop_rect.x = origin.x;
        self.crop_rect.y = origin.y;
        self.crop_rect
    }

    /// Zoom into the image around the crop center. Zooming in shrinks the
    /// selected region; the result is clamped to the configured range.
    pub fn set_zoom(&mut self, zoom: f64) -> CropRect {
        let zoom = clamp_zoom(zoom, self.params.min_zoom, self.params.max_zoom);
        let center = self.crop_rect.center();
        let size = Size::new(
            (self.base_size.width / zoom).min(self.display.display_width),
            (self.base_size.height / zoom).min(self.display.display_height),
        );
        let proposed = Point::new(center.x - size.width / 2.0, center.y - size.height / 2.0);
        let origin = clamp_crop_position(proposed, size, &self.display);

        self.zoom = zoom;
        self.crop_rect = CropRect::new(origin.x, origin.y, size.width, size.height);
        self.crop_rect
    }

    /// One slider step in.
    pub fn zoom_in(&mut self) -> CropRect {
        self.set_zoom(self.zoom + self.params.zoom_step)
    }

    /// One slider step out.
    pub fn zoom_out(&mut self) -> CropRect {
        self.set_zoom(self.zoom - self.params.zoom_step)
    }

    pub fn set_rotation(&mut self, degrees: f64) {
        self.rotation = if degrees.is_finite() {
            degrees % 360.0
        } else {
            0.0
        };
    }

    pub fn native_rect(&self) -> NativeRect {
        display_rect_to_native_rect(&self.crop_rect, &self.display, self.natural)
    }

    /// Produce the final raster for this session.
    pub fn commit(&mut self, image: &RasterImage, output: &OutputSpec) -> Result<EncodedRaster> {
        self.drag = None;
        if image.natural_size() != self.natural {
            let size = image.natural_size();
            return Err(CropError::invalid_dimensions(format!(
                "image is {}x{} but the session was laid out for {}x{}",
                size.width, size.height, self.natural.width, self.natural.height
            )));
        }
        extract_crop(image, &self.native_rect(), output, self.rotation)
    }

    fn handle_at(&self, pointer: Point) -> Option<DragHandle> {
        let rect = self.crop_rect;
        let corners = [
            (DragHandle::TopLeft, Point::new(rect.x, rect.y)),
            (DragHandle::TopRight, Point::new(rect.x + rect.width, rect.y)),
            (DragHandle::BottomLeft, Point::new(rect.x, rect.y + rect.height)),
            (DragHandle::BottomRight, Point::new(rect.x + rect.width, rect.y + rect.height)),
        ];
        corners
            .into_iter()
            .find(|(_, corner)| {
                (pointer.x - corner.x).abs() <= HANDLE_RADIUS
                    && (pointer.y - corner.y).abs() <= HANDLE_RADIUS
            })
            .map(|(handle, _)| handle)
    }

    fn resize_from(&self, handle: DragHandle, anchor: Point, pointer: Point) -> CropRect {
        let display = &self.display;
        let px = if pointer.x.is_nan() {
            anchor.x
        } else {
            pointer.x
        };
        let py = if pointer.y.is_nan() {
            anchor.y
        } else {
            pointer.y
        };

        let (left, right) = if handle.is_left() {
            (px.min(anchor.x - MIN_CROP_SIZE).max(display.offset_x), anchor.x)
        } else {
            (anchor.x, px.max(anchor.x + MIN_CROP_SIZE).min(display.right()))
        };
        let (top, bottom) = if handle.is_top() {
            (py.min(anchor.y - MIN_CROP_SIZE).max(display.offset_y), anchor.y)
        } else {
            (anchor.y, py.max(anchor.y + MIN_CROP_SIZE).min(display.bottom()))
        };

        CropRect::new(left, top, right - left, bottom - top)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crop::types::AspectRatio;
    use crate::settings::OutputFormat;
    use image::{Rgba, RgbaImage};

    const EPS: f64 = 1e-6;

    fn session(aspect: AspectMode) -> CropSession {
        let params = SessionParams {
            aspect,
            ..SessionParams::default()
        };
        CropSession::new(NaturalSize::new(1600, 900), params).unwrap()
    }

    #[test]
    fn test_initial_state() {
        let session = session(AspectMode::Fixed(AspectRatio::SQUARE));
        let rect = session.crop_rect();
        assert!((rect.x - 238.0).abs() < EPS);
        assert!((rect.y - 138.0).abs() < EPS);
        assert!((rect.width - 324.0).abs() < EPS);
        assert_eq!(session.zoom(), 1.0);
        assert!(!session.is_dragging());
    }

    #[test]
    fn test_drag_moves_and_clamps() {
        let mut session = session(AspectMode::Fixed(AspectRatio::SQUARE));
        assert!(session.begin_drag(Point::new(250.0, 150.0)));

        let rect = session.drag_to(Point::new(262.0, 140.0));
        assert!((rect.x - 250.0).abs() < EPS);
        assert!((rect.y - 128.0).abs() < EPS);

        let rect = session.drag_to(Point::new(-1000.0, 5000.0));
        assert!((rect.x - 40.0).abs() < EPS);
        assert!((rect.y - (97.5 + 405.0 - 324.0)).abs() < EPS);
        assert!(rect.is_within(session.display(), EPS));

        session.end_drag();
        let unchanged = session.drag_to(Point::new(400.0, 300.0));
        assert_eq!(unchanged, rect);
    }

    #[test]
    fn test_drag_outside_crop_is_ignored() {
        let mut session = session(AspectMode::Fixed(AspectRatio::SQUARE));
        assert!(!session.begin_drag(Point::new(5.0, 5.0)));
        assert!(!session.is_dragging());
    }

    #[test]
    fn test_fixed_aspect_corners_only_move() {
        let mut session = session(AspectMode::Fixed(AspectRatio::SQUARE));
        let rect = session.crop_rect();
        assert!(session.begin_drag(Point::new(rect.x + 1.0, rect.y + 1.0)));
        let moved = session.drag_to(Point::new(rect.x + 21.0, rect.y + 21.0));
        assert!((moved.width - rect.width).abs() < EPS);
        assert!((moved.x - (rect.x + 20.0)).abs() < EPS);
    }

    #[test]
    fn test_free_aspect_resize_from_corner() {
        let mut session = session(AspectMode::Free);
        let rect = session.crop_rect();
        // Free mode follows the image ratio
        assert!((rect.width / rect.height - 16.0 / 9.0).abs() < EPS);

        assert!(session.begin_drag(Point::new(rect.x + rect.width, rect.y + rect.height)));
        let resized = session.drag_to(Point::new(rect.x + 50.0, rect.y + 400.0));
        assert!((resized.x - rect.x).abs() < EPS);
        assert!((resized.width - 50.0).abs() < EPS);
        // Clamped to the bottom of the displayed image
        assert!((resized.y + resized.height - session.display().bottom()).abs() < EPS);

        let shrunk = session.drag_to(Point::new(rect.x - 100.0, rect.y - 100.0));
        assert!((shrunk.width - MIN_CROP_SIZE).abs() < EPS);
        assert!((shrunk.height - MIN_CROP_SIZE).abs() < EPS);
    }

    #[test]
    fn test_free_aspect_top_left_keeps_bottom_right() {
        let mut session = session(AspectMode::Free);
        let rect = session.crop_rect();
        assert!(session.begin_drag(Point::new(rect.x, rect.y)));
        let resized = session.drag_to(Point::new(0.0, 0.0));
        let display = *session.display();
        assert!((resized.x - display.offset_x).abs() < EPS);
        assert!((resized.y - display.offset_y).abs() < EPS);
        assert!((resized.x + resized.width - (rect.x + rect.width)).abs() < EPS);
        assert!((resized.y + resized.height - (rect.y + rect.height)).abs() < EPS);
    }

    #[test]
    fn test_zoom_shrinks_around_center_and_clamps() {
        let mut session = session(AspectMode::Fixed(AspectRatio::SQUARE));
        let center = session.crop_rect().center();

        let rect = session.set_zoom(2.0);
        assert!((rect.width - 162.0).abs() < EPS);
        assert!((rect.center().x - center.x).abs() < EPS);

        let rect = session.set_zoom(10.0);
        assert_eq!(session.zoom(), 3.0);
        assert!((rect.width - 108.0).abs() < EPS);

        let rect = session.set_zoom(0.1);
        assert_eq!(session.zoom(), 1.0);
        assert!((rect.width - 324.0).abs() < EPS);
        assert!(rect.is_within(session.display(), EPS));
    }

    #[test]
    fn test_relayout_keeps_native_region() {
        let mut session = session(AspectMode::Fixed(AspectRatio::SQUARE));
        session.move_by(-30.0, 12.0);
        let before = session.native_rect();

        session.relayout(Size::new(400.0, 300.0)).unwrap();
        let after = session.native_rect();
        assert!((before.x - after.x).abs() < 1e-6);
        assert!((before.y - after.y).abs() < 1e-6);
        assert!((before.width - after.width).abs() < 1e-6);
        assert!(session.crop_rect().is_within(session.display(), EPS));

        assert!(session.relayout(Size::new(0.0, 300.0)).is_err());
    }

    #[test]
    fn test_set_aspect_resets_area() {
        let mut session = session(AspectMode::Fixed(AspectRatio::SQUARE));
        session.set_zoom(2.0);
        session.set_aspect(AspectMode::Fixed(AspectRatio::new(2.0).unwrap()));
        let rect = session.crop_rect();
        assert_eq!(session.zoom(), 1.0);
        assert!((rect.width / rect.height - 2.0).abs() < EPS);
    }

    #[test]
    fn test_rotation_is_normalised() {
        let mut session = session(AspectMode::Free);
        session.set_rotation(450.0);
        assert_eq!(session.rotation(), 90.0);
        session.set_rotation(f64::INFINITY);
        assert_eq!(session.rotation(), 0.0);
    }

    #[test]
    fn test_commit_produces_output() {
        let pixels = RgbaImage::from_pixel(160, 90, Rgba([0, 0, 255, 255]));
        let image = RasterImage::from_buffer(pixels).unwrap();
        let mut session = CropSession::new(image.natural_size(), SessionParams::default()).unwrap();

        let output = OutputSpec::new(40, 40).unwrap().with_format(OutputFormat::Png, 95);
        let raster = session.commit(&image, &output).unwrap();
        assert_eq!((raster.width, raster.height), (40, 40));
    }

    #[test]
    fn test_commit_rejects_other_image() {
        let image = RasterImage::from_buffer(RgbaImage::new(10, 10)).unwrap();
        let mut session = session(AspectMode::Free);
        let err = session.commit(&image, &OutputSpec::new(10, 10).unwrap()).unwrap_err();
        assert_eq!(err.error_code(), "INVALID_DIMENSIONS");
    }

    #[test]
    fn test_invalid_zoom_range() {
        let params = SessionParams {
            min_zoom: 0.0,
            ..SessionParams::default()
        };
        assert!(CropSession::new(NaturalSize::new(10, 10), params).is_err());
    }

    #[test]
    fn test_zoom_steps_stay_in_range() {
        let mut session = session(AspectMode::Fixed(AspectRatio::SQUARE));
        session.zoom_in();
        assert!((session.zoom() - 1.1).abs() < EPS);

        for _ in 0..40 {
            session.zoom_in();
        }
        assert_eq!(session.zoom(), 3.0);

        for _ in 0..40 {
            session.zoom_out();
        }
        assert_eq!(session.zoom(), 1.0);
        assert!((session.crop_rect().width - 324.0).abs() < EPS);
    }

    #[test]
    fn test_clamp_zoom_edges() {
        assert_eq!(clamp_zoom(2.0, 1.0, 3.0), 2.0);
        assert_eq!(clamp_zoom(f64::NAN, 1.0, 3.0), 1.0);
        assert_eq!(clamp_zoom(0.5, 1.0, 3.0), 1.0);
        // Inverted range does not panic
        assert_eq!(clamp_zoom(5.0, 2.0, 1.0), 2.0);
    }

    #[test]
    fn test_session_logs_at_debug_level() {
        let subscriber = tracing_subscriber::fmt()
            .with_max_level(tracing::Level::DEBUG)
            .with_test_writer()
            .finish();
        tracing::subscriber::with_default(subscriber, || {
            let session = session(AspectMode::Free);
            assert!(session.crop_rect().is_within(session.display(), EPS));
        });
    }
}
