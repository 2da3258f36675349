//! Crop engine for brand assets (logos, favicons, backgrounds) and the
//! footer text converter that ships with it.
//!
//! The crop side fits an image into a viewport, keeps a crop rectangle inside
//! the displayed image, maps it back to native pixels and renders it at a
//! fixed output size. Everything in [`crop`] except [`crop::CropSession`] is a
//! pure function of its inputs.

pub mod crop;
pub mod errors;
pub mod image_loader;
pub mod logging;
pub mod markup;
pub mod settings;
pub mod storage;

pub use crop::{CropSession, EncodedRaster, NativeRect, OutputSpec, RasterImage};
pub use errors::{CropError, Result};
pub use settings::CropSettings;
