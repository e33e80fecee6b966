//! OGC WMS client-side protocol support.
//!
//! Supports:
//! - GetCapabilities layer catalog parsing (WMS 1.3.0 namespace)
//! - GetMap / GetCapabilities URL construction for WMS 1.1.x and 1.3.0

pub mod capabilities;
pub mod getmap;
pub mod version;

pub use capabilities::{parse_layers, parse_service_exception, WMS_NAMESPACE};
pub use getmap::{
    build_get_capabilities_url, build_get_capabilities_url_for, build_get_map_url, BuildWarning,
    GetMapDefaults, GetMapParams, GetMapUrl,
};
pub use version::WmsVersion;
