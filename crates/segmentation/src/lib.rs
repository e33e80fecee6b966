//! Image segmentation over fetched WMS rasters.
//!
//! The model itself is an injected collaborator behind
//! [`SegmentationModel`]; this crate only prepares its input tensor and turns
//! its scores back into a per-pixel class map at the raster's original size.

pub mod adapter;
pub mod model;
pub mod palette;

pub use adapter::{
    ResizeFilter, SegmentationAdapter, SegmentationConfig, SegmentationResult, MODEL_INPUT_SIZE,
};
pub use model::{ModelError, SegmentationModel, ThresholdModel, ThresholdModelError};
pub use palette::ClassPalette;
