//! The model capability consumed by the adapter.

use ndarray::{Array4, ArrayView4, Axis};
use thiserror::Error;

/// Error type a model implementation may return from [`SegmentationModel::predict`].
pub type ModelError = Box<dyn std::error::Error + Send + Sync>;

/// A loaded segmentation model.
///
/// `predict` takes a `[1, H, W, 1]` tensor of grayscale intensities in
/// `[0, 1]` and returns `[1, H, W, C]` per-class scores. A single-channel
/// output is read as the probability of class 1.
pub trait SegmentationModel: Send + Sync {
    fn predict(&self, input: ArrayView4<'_, f32>) -> Result<Array4<f32>, ModelError>;

    /// Short identifier used in logs.
    fn name(&self) -> &str {
        "model"
    }
}

#[derive(Debug, Error)]
pub enum ThresholdModelError {
    #[error("expected a single input channel, got {0}")]
    Channels(usize),

    #[error("threshold must be within [0, 1], got {0}")]
    Threshold(f32),
}

/// Intensity threshold as a two-class model.
///
/// Pixels at or above `threshold` score as class 1, the rest as class 0.
/// Scores are soft: the distance from the threshold is squashed through a
/// logistic curve so the output resembles a real softmax head.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ThresholdModel {
    threshold: f32,
    sharpness: f32,
}

impl ThresholdModel {
    pub fn new(threshold: f32) -> Result<Self, ThresholdModelError> {
        if !(0.0..=1.0).contains(&threshold) {
            return Err(ThresholdModelError::Threshold(threshold));
        }
        Ok(Self {
            threshold,
            sharpness: 40.0,
        })
    }

    pub fn threshold(&self) -> f32 {
        self.threshold
    }

    fn foreground_probability(&self, value: f32) -> f32 {
        1.0 / (1.0 + (-(value - self.threshold) * self.sharpness).exp())
    }
}

impl Default for ThresholdModel {
    fn default() -> Self {
        Self {
            threshold: 0.5,
            sharpness: 40.0,
        }
    }
}

impl SegmentationModel for ThresholdModel {
    fn predict(&self, input: ArrayView4<'_, f32>) -> Result<Array4<f32>, ModelError> {
        let (batch, height, width, channels) = input.dim();
        if channels != 1 {
            return Err(Box::new(ThresholdModelError::Channels(channels)));
        }

        let plane = input.index_axis(Axis(3), 0);
        let output = Array4::from_shape_fn((batch, height, width, 2), |(b, y, x, c)| {
            let fg = self.foreground_probability(plane[[b, y, x]]);
            if c == 1 {
                fg
            } else {
                1.0 - fg
            }
        });
        Ok(output)
    }

    fn name(&self) -> &str {
        "threshold"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_threshold_scores() {
        let model = ThresholdModel::default();
        let input = Array4::from_shape_vec((1, 1, 3, 1), vec![0.0, 0.49, 0.9]).unwrap();
        let out = model.predict(input.view()).unwrap();

        assert_eq!(out.dim(), (1, 1, 3, 2));
        assert!(out[[0, 0, 0, 0]] > out[[0, 0, 0, 1]]);
        assert!(out[[0, 0, 1, 0]] > out[[0, 0, 1, 1]]);
        assert!(out[[0, 0, 2, 1]] > out[[0, 0, 2, 0]]);
        for v in out.iter() {
            assert!((0.0..=1.0).contains(v));
        }
    }

    #[test]
    fn test_rejects_multichannel_input() {
        let model = ThresholdModel::default();
        let input = Array4::<f32>::zeros((1, 2, 2, 3));
        let err = model.predict(input.view()).unwrap_err();
        assert!(err.to_string().contains("single input channel"));
    }

    #[test]
    fn test_threshold_range() {
        assert!(ThresholdModel::new(0.3).is_ok());
        assert!(ThresholdModel::new(1.5).is_err());
        assert!(ThresholdModel::new(f32::NAN).is_err());
    }
}
