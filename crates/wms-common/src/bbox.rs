//! Bounding box types and operations.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Longitude range of a geographic CRS.
pub const LON_RANGE: (f64, f64) = (-180.0, 180.0);

/// Latitude range of a geographic CRS.
pub const LAT_RANGE: (f64, f64) = (-90.0, 90.0);

/// A geographic bounding box in degrees: minx (lon), miny (lat), maxx, maxy.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub min_x: f64,
    pub min_y: f64,
    pub max_x: f64,
    pub max_y: f64,
}

impl BoundingBox {
    /// The whole world in EPSG:4326, also the GetMap default.
    pub const WORLD: BoundingBox = BoundingBox {
        min_x: -180.0,
        min_y: -90.0,
        max_x: 180.0,
        max_y: 90.0,
    };

    /// Create a new bounding box from corner coordinates.
    pub fn new(min_x: f64, min_y: f64, max_x: f64, max_y: f64) -> Self {
        Self {
            min_x,
            min_y,
            max_x,
            max_y,
        }
    }

    /// Parse a WMS BBOX parameter string: "minx,miny,maxx,maxy"
    ///
    /// Whitespace around each component is ignored. Range and ordering are
    /// not checked here; see [`BboxPolicy::accepts`].
    pub fn from_wms_string(s: &str) -> Result<Self, BboxParseError> {
        let parts: Vec<&str> = s.split(',').map(str::trim).collect();
        if parts.len() != 4 {
            return Err(BboxParseError::InvalidFormat(s.to_string()));
        }

        let mut values = [0.0f64; 4];
        for (slot, part) in values.iter_mut().zip(&parts) {
            *slot = part
                .parse()
                .map_err(|_| BboxParseError::InvalidNumber(part.to_string()))?;
        }

        let [min_x, min_y, max_x, max_y] = values;
        Ok(Self::new(min_x, min_y, max_x, max_y))
    }

    /// Width of the bounding box in coordinate units.
    pub fn width(&self) -> f64 {
        self.max_x - self.min_x
    }

    /// Height of the bounding box in coordinate units.
    pub fn height(&self) -> f64 {
        self.max_y - self.min_y
    }

    /// Geometric center as (x, y).
    pub fn center(&self) -> (f64, f64) {
        (
            (self.min_x + self.max_x) / 2.0,
            (self.min_y + self.max_y) / 2.0,
        )
    }

    /// True when both spans are strictly positive and finite.
    pub fn has_positive_area(&self) -> bool {
        let (w, h) = (self.width(), self.height());
        w.is_finite() && h.is_finite() && w > 0.0 && h > 0.0
    }

    /// True when every edge lies inside the geographic lon/lat ranges.
    pub fn is_geographic(&self) -> bool {
        within(self.min_x, LON_RANGE)
            && within(self.max_x, LON_RANGE)
            && within(self.min_y, LAT_RANGE)
            && within(self.max_y, LAT_RANGE)
    }

    /// Clamp every edge into the geographic lon/lat ranges.
    pub fn clamp_geographic(&self) -> BoundingBox {
        BoundingBox {
            min_x: self.min_x.clamp(LON_RANGE.0, LON_RANGE.1),
            min_y: self.min_y.clamp(LAT_RANGE.0, LAT_RANGE.1),
            max_x: self.max_x.clamp(LON_RANGE.0, LON_RANGE.1),
            max_y: self.max_y.clamp(LAT_RANGE.0, LAT_RANGE.1),
        }
    }

    /// The four components in WMS order.
    pub fn to_array(&self) -> [f64; 4] {
        [self.min_x, self.min_y, self.max_x, self.max_y]
    }
}

impl Default for BoundingBox {
    fn default() -> Self {
        Self::WORLD
    }
}

/// Formats as a WMS BBOX value, e.g. `-180,-90,180,90`.
impl fmt::Display for BoundingBox {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{},{},{},{}",
            self.min_x, self.min_y, self.max_x, self.max_y
        )
    }
}

fn within(v: f64, (lo, hi): (f64, f64)) -> bool {
    v >= lo && v <= hi
}

/// Range check applied to user-supplied bounding boxes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BboxPolicy {
    /// Every component must lie in [-180, 180], latitude included.
    #[default]
    Legacy,
    /// Longitude in [-180, 180], latitude in [-90, 90].
    Geographic,
}

impl BboxPolicy {
    /// Whether `bbox` is acceptable under this policy.
    ///
    /// Both policies also require `min <= max` on each axis.
    pub fn accepts(&self, bbox: &BoundingBox) -> bool {
        let ordered = bbox.min_x <= bbox.max_x && bbox.min_y <= bbox.max_y;
        let in_range = match self {
            BboxPolicy::Legacy => bbox.to_array().iter().all(|v| within(*v, LON_RANGE)),
            BboxPolicy::Geographic => bbox.is_geographic(),
        };
        ordered && in_range
    }
}

#[derive(Debug, thiserror::Error)]
pub enum BboxParseError {
    #[error("Invalid BBOX format: {0}. Expected 'minx,miny,maxx,maxy'")]
    InvalidFormat(String),

    #[error("Invalid number in BBOX: {0}")]
    InvalidNumber(String),
}
