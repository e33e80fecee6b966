//! Interactive view state: the current bounding box and zoom level.

use serde::{Deserialize, Serialize};

use crate::bbox::BoundingBox;
use crate::error::{WmsError, WmsResult};

/// Zoom factor applied by a single zoom-in / zoom-out step.
pub const ZOOM_STEP: f64 = 1.2;

/// Current map extent plus cumulative zoom.
///
/// Values are immutable; every zoom returns a fresh state whose bbox replaces
/// the old one wholesale.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ViewState {
    bbox: BoundingBox,
    zoom_level: f64,
}

impl ViewState {
    /// Start a view at `bbox` with zoom level 1.0.
    pub fn new(bbox: BoundingBox) -> WmsResult<Self> {
        if !bbox.has_positive_area() {
            return Err(WmsError::validation(
                "bbox",
                format!("view extent {} must have a positive span", bbox),
            ));
        }
        if !bbox.is_geographic() {
            return Err(WmsError::validation(
                "bbox",
                format!("view extent {} is outside geographic range", bbox),
            ));
        }
        Ok(Self {
            bbox,
            zoom_level: 1.0,
        })
    }

    pub fn bbox(&self) -> BoundingBox {
        self.bbox
    }

    pub fn zoom_level(&self) -> f64 {
        self.zoom_level
    }

    /// Zoom about the bbox center.
    ///
    /// `factor > 1` zooms in (spans shrink by `factor`), `0 < factor < 1`
    /// zooms out. Edges are clamped to [-180, 180] / [-90, 90], so zooming
    /// out past the world is lossy.
    pub fn zoom(&self, factor: f64) -> WmsResult<ViewState> {
        if !factor.is_finite() || factor <= 0.0 {
            return Err(WmsError::validation(
                "factor",
                format!("zoom factor must be a positive number, got {}", factor),
            ));
        }

        let (cx, cy) = self.bbox.center();
        let half_w = self.bbox.width() / factor / 2.0;
        let half_h = self.bbox.height() / factor / 2.0;

        let next =
            BoundingBox::new(cx - half_w, cy - half_h, cx + half_w, cy + half_h).clamp_geographic();

        if !next.has_positive_area() {
            return Err(WmsError::validation(
                "factor",
                format!("zoom factor {} collapses the view extent", factor),
            ));
        }

        tracing::debug!(factor, from = %self.bbox, to = %next, "zoom");

        Ok(ViewState {
            bbox: next,
            zoom_level: self.zoom_level * factor,
        })
    }

    pub fn zoom_in(&self) -> WmsResult<ViewState> {
        self.zoom(ZOOM_STEP)
    }

    pub fn zoom_out(&self) -> WmsResult<ViewState> {
        self.zoom(1.0 / ZOOM_STEP)
    }
}

impl Default for ViewState {
    fn default() -> Self {
        Self {
            bbox: BoundingBox::WORLD,
            zoom_level: 1.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zoom_in_halves_world() {
        let view = ViewState::default().zoom(2.0).unwrap();
        assert_eq!(view.bbox(), BoundingBox::new(-90.0, -45.0, 90.0, 45.0));
        assert_eq!(view.zoom_level(), 2.0);
    }

    #[test]
    fn test_zoom_out_clamps_to_world() {
        let view = ViewState::default().zoom(2.0).unwrap().zoom(0.5).unwrap();
        assert_eq!(view.bbox(), BoundingBox::WORLD);

        let further = view.zoom(0.5).unwrap();
        assert_eq!(further.bbox(), BoundingBox::WORLD);
        assert_eq!(further.zoom_level(), 0.5);
    }

    #[test]
    fn test_rejects_non_positive_factor() {
        let view = ViewState::default();
        for factor in [0.0, -1.0, f64::NAN, f64::INFINITY] {
            let err = view.zoom(factor).unwrap_err();
            assert_eq!(err.field(), Some("factor"));
        }
    }

    #[test]
    fn test_new_rejects_degenerate() {
        assert!(ViewState::new(BoundingBox::new(0.0, 0.0, 0.0, 10.0)).is_err());
        assert!(ViewState::new(BoundingBox::new(0.0, 0.0, 10.0, 100.0)).is_err());
    }
}
