//! Raster to tensor to class map, around an injected model.

use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::time::Instant;

use image::imageops::{self, FilterType};
use image::{ImageBuffer, Luma, Rgb, RgbImage};
use ndarray::{Array4, ArrayView1, Axis};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use wms_common::{RasterImage, WmsError, WmsResult};

use crate::model::SegmentationModel;
use crate::palette::ClassPalette;

/// Side length of the square model input.
pub const MODEL_INPUT_SIZE: u32 = 256;

type ClassMap = ImageBuffer<Luma<u16>, Vec<u16>>;

/// Resampling filter used to bring the raster down to the model input size.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResizeFilter {
    Nearest,
    #[default]
    Bilinear,
    Bicubic,
    Lanczos3,
}

impl ResizeFilter {
    fn filter_type(self) -> FilterType {
        match self {
            ResizeFilter::Nearest => FilterType::Nearest,
            ResizeFilter::Bilinear => FilterType::Triangle,
            ResizeFilter::Bicubic => FilterType::CatmullRom,
            ResizeFilter::Lanczos3 => FilterType::Lanczos3,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SegmentationConfig {
    pub input_size: u32,
    pub filter: ResizeFilter,
    /// Cut-off applied to single-channel (sigmoid) outputs
    pub foreground_threshold: f32,
    pub palette: ClassPalette,
}

impl Default for SegmentationConfig {
    fn default() -> Self {
        Self {
            input_size: MODEL_INPUT_SIZE,
            filter: ResizeFilter::Bilinear,
            foreground_threshold: 0.5,
            palette: ClassPalette::binary(),
        }
    }
}

/// Per-pixel class labels at the size of the source raster.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SegmentationResult {
    pub width: u32,
    pub height: u32,
    /// Number of classes the model scored
    pub num_classes: usize,
    /// Row-major class ids, `width * height` long
    pub classes: Vec<u16>,
}

impl SegmentationResult {
    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    pub fn class_at(&self, x: u32, y: u32) -> Option<u16> {
        if x >= self.width || y >= self.height {
            return None;
        }
        self.classes
            .get(y as usize * self.width as usize + x as usize)
            .copied()
    }

    /// Fraction of pixels labelled `class`.
    pub fn coverage(&self, class: u16) -> f64 {
        if self.classes.is_empty() {
            return 0.0;
        }
        let hits = self.classes.iter().filter(|&&c| c == class).count();
        hits as f64 / self.classes.len() as f64
    }
}

/// Runs an injected [`SegmentationModel`] over fetched rasters.
///
/// The adapter owns preprocessing and postprocessing only; it never loads
/// weights and keeps no state between calls.
#[derive(Debug, Clone, Default)]
pub struct SegmentationAdapter {
    config: SegmentationConfig,
}

impl SegmentationAdapter {
    pub fn new(config: SegmentationConfig) -> WmsResult<Self> {
        if config.input_size == 0 {
            return Err(WmsError::Config(
                "segmentation input_size must be positive".to_string(),
            ));
        }
        if !(0.0..=1.0).contains(&config.foreground_threshold) {
            return Err(WmsError::Config(format!(
                "foreground_threshold must be within [0, 1], got {}",
                config.foreground_threshold
            )));
        }
        Ok(Self { config })
    }

    pub fn config(&self) -> &SegmentationConfig {
        &self.config
    }

    /// Grayscale, resize, scale to `[0, 1]`, shape `[1, S, S, 1]`.
    pub fn preprocess(&self, image: &RasterImage) -> Array4<f32> {
        let size = self.config.input_size;
        let luma = image.to_luma8();
        let resized = imageops::resize(&luma, size, size, self.config.filter.filter_type());

        let side = size as usize;
        Array4::from_shape_fn((1, side, side, 1), |(_, y, x, _)| {
            f32::from(resized.get_pixel(x as u32, y as u32)[0]) / 255.0
        })
    }

    /// Segment `image` with `model`, returning labels at the image's size.
    pub fn segment(
        &self,
        model: Option<&dyn SegmentationModel>,
        image: &RasterImage,
    ) -> WmsResult<SegmentationResult> {
        let model = model.ok_or(WmsError::ModelNotLoaded)?;
        let (width, height) = image.dimensions();
        if width == 0 || height == 0 {
            return Err(WmsError::validation("image", "image has no pixels"));
        }

        let start = Instant::now();
        let input = self.preprocess(image);
        let output = panic::catch_unwind(AssertUnwindSafe(|| model.predict(input.view())))
            .map_err(|payload| {
                let message = panic_message(payload.as_ref());
                warn!(model = model.name(), error = %message, "Model panicked");
                WmsError::Inference(format!("model panicked: {}", message))
            })?
            .map_err(|e| {
                warn!(model = model.name(), error = %e, "Model prediction failed");
                WmsError::Inference(e.to_string())
            })?;

        let (labels, num_classes) = self.classify(&output)?;
        let classes = imageops::resize(&labels, width, height, FilterType::Nearest).into_raw();

        debug!(
            model = model.name(),
            width,
            height,
            num_classes,
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Segmented image"
        );

        Ok(SegmentationResult {
            width,
            height,
            num_classes,
            classes,
        })
    }

    /// [`segment`](Self::segment) on the blocking thread pool.
    pub async fn segment_async(
        &self,
        model: Option<Arc<dyn SegmentationModel>>,
        image: RasterImage,
    ) -> WmsResult<SegmentationResult> {
        let model = model.ok_or(WmsError::ModelNotLoaded)?;
        let adapter = self.clone();
        tokio::task::spawn_blocking(move || adapter.segment(Some(model.as_ref()), &image))
            .await
            .map_err(|e| WmsError::Inference(format!("inference task failed: {}", e)))?
    }

    /// Color a class map with the configured palette.
    pub fn render(&self, result: &SegmentationResult) -> RasterImage {
        let palette = &self.config.palette;
        let image = RgbImage::from_fn(result.width, result.height, |x, y| {
            Rgb(palette.color(result.class_at(x, y).unwrap_or(0)))
        });
        RasterImage::from_rgb(image)
    }

    fn classify(&self, output: &Array4<f32>) -> WmsResult<(ClassMap, usize)> {
        let side = self.config.input_size as usize;
        let (batch, height, width, channels) = output.dim();
        if batch != 1 || height != side || width != side || channels == 0 {
            return Err(WmsError::Inference(format!(
                "unexpected output shape {:?}, expected [1, {}, {}, C]",
                output.shape(),
                side,
                side
            )));
        }
        if channels > usize::from(u16::MAX) + 1 {
            return Err(WmsError::Inference(format!(
                "model produced {} classes",
                channels
            )));
        }
        if output.iter().any(|v| !v.is_finite()) {
            return Err(WmsError::Inference(
                "model produced non-finite scores".to_string(),
            ));
        }

        let threshold = self.config.foreground_threshold;
        let labels: Vec<u16> = output
            .index_axis(Axis(0), 0)
            .lanes(Axis(2))
            .into_iter()
            .map(|scores| {
                if channels == 1 {
                    u16::from(scores[0] >= threshold)
                } else {
                    argmax(scores)
                }
            })
            .collect();

        let map = ClassMap::from_raw(side as u32, side as u32, labels)
            .ok_or_else(|| WmsError::Inference("class map size mismatch".to_string()))?;
        // A sigmoid head still describes two classes
        Ok((map, channels.max(2)))
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

/// First index holding the highest score.
fn argmax(scores: ArrayView1<'_, f32>) -> u16 {
    let mut best = 0usize;
    for (i, &v) in scores.iter().enumerate().skip(1) {
        if v > scores[best] {
            best = i;
        }
    }
    best as u16
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::arr1;

    #[test]
    fn test_argmax_prefers_first_tie() {
        assert_eq!(argmax(arr1(&[0.1, 0.7, 0.2]).view()), 1);
        assert_eq!(argmax(arr1(&[0.5, 0.5]).view()), 0);
        assert_eq!(argmax(arr1(&[0.9]).view()), 0);
    }

    #[test]
    fn test_preprocess_shape_and_range() {
        let adapter = SegmentationAdapter::default();
        let image = RasterImage::from_gray(test_utils::split_gray_image(40, 20));
        let tensor = adapter.preprocess(&image);

        assert_eq!(tensor.dim(), (1, 256, 256, 1));
        assert!(tensor.iter().all(|v| (0.0..=1.0).contains(v)));
        // Left half dark, right half bright
        assert!(tensor[[0, 128, 10, 0]] < 0.2);
        assert!(tensor[[0, 128, 245, 0]] > 0.8);
    }

    #[test]
    fn test_sigmoid_output_thresholded() {
        let adapter = SegmentationAdapter::new(SegmentationConfig {
            input_size: 2,
            ..Default::default()
        })
        .unwrap();
        let output = Array4::from_shape_vec((1, 2, 2, 1), vec![0.1, 0.5, 0.49, 0.99]).unwrap();
        let (map, classes) = adapter.classify(&output).unwrap();
        assert_eq!(map.into_raw(), vec![0, 1, 0, 1]);
        assert_eq!(classes, 2);
    }

    #[test]
    fn test_classify_rejects_bad_shape() {
        let adapter = SegmentationAdapter::default();
        let output = Array4::<f32>::zeros((1, 128, 128, 2));
        let err = adapter.classify(&output).unwrap_err();
        assert_eq!(err.kind(), "InferenceError");

        let output = Array4::<f32>::zeros((2, 256, 256, 2));
        assert!(adapter.classify(&output).is_err());

        let output = Array4::<f32>::zeros((1, 256, 256, 0));
        assert!(adapter.classify(&output).is_err());
    }

    #[test]
    fn test_classify_rejects_nan() {
        let adapter = SegmentationAdapter::new(SegmentationConfig {
            input_size: 1,
            ..Default::default()
        })
        .unwrap();
        let output = Array4::from_shape_vec((1, 1, 1, 2), vec![f32::NAN, 0.2]).unwrap();
        assert_eq!(adapter.classify(&output).unwrap_err().kind(), "InferenceError");
    }

    #[test]
    fn test_invalid_config() {
        let zero = SegmentationConfig {
            input_size: 0,
            ..Default::default()
        };
        assert_eq!(SegmentationAdapter::new(zero).unwrap_err().kind(), "ConfigError");

        let threshold = SegmentationConfig {
            foreground_threshold: 2.0,
            ..Default::default()
        };
        assert!(SegmentationAdapter::new(threshold).is_err());
    }

    #[test]
    fn test_result_accessors() {
        let result = SegmentationResult {
            width: 2,
            height: 2,
            num_classes: 2,
            classes: vec![0, 1, 1, 1],
        };
        assert_eq!(result.class_at(1, 0), Some(1));
        assert_eq!(result.class_at(0, 0), Some(0));
        assert_eq!(result.class_at(2, 0), None);
        assert!((result.coverage(1) - 0.75).abs() < 1e-12);
    }
}
