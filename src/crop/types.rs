use crate::errors::{CropError, Result};
use crate::settings::{OutputFormat, ResampleFilter};
use serde::{Deserialize, Serialize};

/// A width/height pair in floating point (viewport or display space).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Size {
    pub width: f64,
    pub height: f64,
}

impl Size {
    pub fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }
}

/// Native pixel dimensions of a raster.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NaturalSize {
    pub width: u32,
    pub height: u32,
}

impl NaturalSize {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    pub fn aspect(&self) -> f64 {
        self.width as f64 / self.height as f64
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// Placement of a fitted image inside the viewport.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DisplayGeometry {
    pub display_width: f64,
    pub display_height: f64,
    pub offset_x: f64,
    pub offset_y: f64,
}

impl DisplayGeometry {
    pub fn right(&self) -> f64 {
        self.offset_x + self.display_width
    }

    pub fn bottom(&self) -> f64 {
        self.offset_y + self.display_height
    }
}

/// Crop rectangle in viewport space.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CropRect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl CropRect {
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self { x, y, width, height }
    }

    pub fn origin(&self) -> Point {
        Point::new(self.x, self.y)
    }

    pub fn size(&self) -> Size {
        Size::new(self.width, self.height)
    }

    pub fn center(&self) -> Point {
        Point::new(self.x + self.width / 2.0, self.y + self.height / 2.0)
    }

    pub fn contains(&self, point: Point) -> bool {
        point.x >= self.x
            && point.x <= self.x + self.width
            && point.y >= self.y
            && point.y <= self.y + self.height
    }

    /// True when the rectangle lies within the displayed image, allowing `tolerance`.
    pub fn is_within(&self, display: &DisplayGeometry, tolerance: f64) -> bool {
        self.x >= display.offset_x - tolerance
            && self.y >= display.offset_y - tolerance
            && self.x + self.width <= display.right() + tolerance
            && self.y + self.height <= display.bottom() + tolerance
    }
}

/// Rectangle in native pixel space. Still floating point; extraction rounds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NativeRect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl NativeRect {
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self { x, y, width, height }
    }

    pub fn full(natural: NaturalSize) -> Self {
        Self::new(0.0, 0.0, natural.width as f64, natural.height as f64)
    }
}

/// Width / height ratio, always positive and finite.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
#[serde(try_from = "f64", into = "f64")]
pub struct AspectRatio(f64);

impl AspectRatio {
    pub const SQUARE: AspectRatio = AspectRatio(1.0);

    pub fn new(ratio: f64) -> Result<Self> {
        if ratio.is_finite() && ratio > 0.0 {
            Ok(Self(ratio))
        } else {
            Err(CropError::invalid_dimensions(format!("aspect ratio {} must be positive", ratio)))
        }
    }

    pub fn from_size(width: f64, height: f64) -> Result<Self> {
        Self::new(width / height)
    }

    pub fn value(self) -> f64 {
        self.0
    }
}

impl TryFrom<f64> for AspectRatio {
    type Error = CropError;

    fn try_from(value: f64) -> Result<Self> {
        Self::new(value)
    }
}

impl From<AspectRatio> for f64 {
    fn from(ratio: AspectRatio) -> f64 {
        ratio.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum AspectMode {
    Fixed(AspectRatio),
    /// The crop area follows the image's own ratio and may be resized freely
    Free,
}

impl AspectMode {
    /// Ratio the initial rectangle is built with.
    pub fn initial_ratio(&self, display: &DisplayGeometry) -> AspectRatio {
        match self {
            AspectMode::Fixed(ratio) => *ratio,
            AspectMode::Free => {
                AspectRatio::from_size(display.display_width, display.display_height)
                    .unwrap_or(AspectRatio::SQUARE)
            }
        }
    }

    pub fn is_free(&self) -> bool {
        matches!(self, AspectMode::Free)
    }
}

/// Pixel size and encoding of the produced raster.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OutputSpec {
    pub width: u32,
    pub height: u32,
    pub format: OutputFormat,
    pub quality: u8,
    pub filter: ResampleFilter,
}

impl OutputSpec {
    pub fn new(width: u32, height: u32) -> Result<Self> {
        if width == 0 || height == 0 {
            return Err(CropError::invalid_dimensions(format!(
                "output size {}x{} must be positive",
                width, height
            )));
        }
        Ok(Self {
            width,
            height,
            format: OutputFormat::default(),
            quality: 95,
            filter: ResampleFilter::default(),
        })
    }

    /// `base` wide, `base / aspect` tall.
    pub fn from_base_size(base: u32, aspect: AspectRatio) -> Result<Self> {
        let height = (base as f64 / aspect.value()).round().max(1.0);
        if height > u32::MAX as f64 {
            return Err(CropError::invalid_dimensions(format!(
                "output height {} overflows",
                height
            )));
        }
        Self::new(base, height as u32)
    }

    pub fn with_format(mut self, format: OutputFormat, quality: u8) -> Self {
        self.format = format;
        self.quality = quality.clamp(1, 100);
        self
    }

    pub fn with_filter(mut self, filter: ResampleFilter) -> Self {
        self.filter = filter;
        self
    }
}

/// Encoded crop output.
#[derive(Debug, Clone, PartialEq)]
pub struct EncodedRaster {
    pub bytes: Vec<u8>,
    pub width: u32,
    pub height: u32,
    pub format: OutputFormat,
}

impl EncodedRaster {
    pub fn to_data_url(&self) -> String {
        use base64::Engine;
        format!(
            "data:{};base64,{}",
            self.format.mime_type(),
            base64::engine::general_purpose::STANDARD.encode(&self.bytes)
        )
    }
}
