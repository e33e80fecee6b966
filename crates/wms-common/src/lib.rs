//! Common types shared across the WMS fetch pipeline crates.

pub mod bbox;
pub mod error;
pub mod layer;
pub mod raster;
pub mod view;

pub use bbox::{BboxPolicy, BoundingBox};
pub use error::{WmsError, WmsResult};
pub use layer::Layer;
pub use raster::{ChannelMode, RasterImage};
pub use view::{ViewState, ZOOM_STEP};
