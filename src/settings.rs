use crate::crop::{AspectMode, AspectRatio, OutputSpec, Size};
use crate::errors::Result;
use image::imageops::FilterType;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::str::FromStr;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CropSettings {
    // Crop viewport
    pub viewport_width: f64,
    pub viewport_height: f64,
    /// Fraction of the viewport the fitted image may occupy
    pub fit_margin: f64,
    /// Fraction of the smaller display side used by the initial crop area
    pub crop_fill: f64,

    // Aspect
    pub aspect: AspectMode,

    // Zoom slider
    pub min_zoom: f64,
    pub max_zoom: f64,
    pub zoom_step: f64,

    // Output
    pub output_base_size: u32,
    pub output_format: OutputFormat,
    pub quality: u8,
    pub resample_filter: ResampleFilter,
}

impl Default for CropSettings {
    fn default() -> Self {
        Self {
            viewport_width: 800.0,
            viewport_height: 600.0,
            fit_margin: 0.9,
            crop_fill: 0.8,

            aspect: AspectMode::Fixed(AspectRatio::SQUARE),

            min_zoom: 1.0,
            max_zoom: 3.0,
            zoom_step: 0.1,

            output_base_size: 400,
            output_format: OutputFormat::Jpeg,
            quality: 95,
            resample_filter: ResampleFilter::Lanczos3,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum OutputFormat {
    #[default]
    Jpeg,
    Png,
    WebP,
}

impl OutputFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            OutputFormat::Jpeg => "jpg",
            OutputFormat::Png => "png",
            OutputFormat::WebP => "webp",
        }
    }

    pub fn mime_type(&self) -> &'static str {
        match self {
            OutputFormat::Jpeg => "image/jpeg",
            OutputFormat::Png => "image/png",
            OutputFormat::WebP => "image/webp",
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            OutputFormat::Jpeg => "JPEG",
            OutputFormat::Png => "PNG",
            OutputFormat::WebP => "WebP",
        }
    }

    /// Only JPEG output honours the quality setting
    pub fn is_lossy(&self) -> bool {
        matches!(self, OutputFormat::Jpeg)
    }
}

impl FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "jpg" | "jpeg" => Ok(OutputFormat::Jpeg),
            "png" => Ok(OutputFormat::Png),
            "webp" => Ok(OutputFormat::WebP),
            other => Err(format!("unsupported output format '{}'", other)),
        }
    }
}

/// Continuous resampling filters. Nearest-neighbour is deliberately absent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum ResampleFilter {
    Triangle,
    CatmullRom,
    #[default]
    Lanczos3,
}

impl ResampleFilter {
    pub fn filter_type(self) -> FilterType {
        match self {
            ResampleFilter::Triangle => FilterType::Triangle,
            ResampleFilter::CatmullRom => FilterType::CatmullRom,
            ResampleFilter::Lanczos3 => FilterType::Lanczos3,
        }
    }
}

impl CropSettings {
    pub fn viewport(&self) -> Size {
        Size::new(self.viewport_width, self.viewport_height)
    }

    /// Output spec for the configured aspect. Free aspect crops keep the
    /// base size on both sides unless a ratio is supplied.
    pub fn output_spec(&self, free_ratio: Option<AspectRatio>) -> Result<OutputSpec> {
        let aspect = match self.aspect {
            AspectMode::Fixed(ratio) => ratio,
            AspectMode::Free => free_ratio.unwrap_or(AspectRatio::SQUARE),
        };
        let spec = OutputSpec::from_base_size(self.output_base_size, aspect)?;
        Ok(spec
            .with_format(self.output_format, self.quality)
            .with_filter(self.resample_filter))
    }

    pub fn load() -> Self {
        if let Some(proj_dirs) = directories::ProjectDirs::from("com", "brandcrop", "brandcrop") {
            let config_path = proj_dirs.config_dir().join("settings.json");
            if config_path.exists() {
                match Self::load_from(&config_path) {
                    Ok(settings) => return settings,
                    Err(e) => tracing::warn!("Ignoring settings at {:?}: {}", config_path, e),
                }
            }
        }
        Self::default()
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let settings = serde_json::from_str(&content)?;
        Ok(settings)
    }

    pub fn save(&self) {
        if let Some(proj_dirs) = directories::ProjectDirs::from("com", "brandcrop", "brandcrop") {
            let config_path = proj_dirs.config_dir().join("settings.json");
            if let Err(e) = self.save_to(&config_path) {
                tracing::warn!("Failed to save settings to {:?}: {}", config_path, e);
            }
        }
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(dir) = path.parent() {
            std::fs::create_dir_all(dir)?;
        }
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }
}
