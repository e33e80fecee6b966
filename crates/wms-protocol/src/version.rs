//! WMS protocol versions and their parameter naming differences.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use wms_common::WmsError;

/// A WMS protocol version understood by the request builder.
///
/// WMS 1.1.x names the coordinate system parameter `SRS`; 1.3.0 renamed it
/// to `CRS`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum WmsVersion {
    #[serde(rename = "1.1.0")]
    V1_1_0,
    #[serde(rename = "1.1.1")]
    V1_1_1,
    #[default]
    #[serde(rename = "1.3.0")]
    V1_3_0,
}

impl WmsVersion {
    pub fn as_str(&self) -> &'static str {
        match self {
            WmsVersion::V1_1_0 => "1.1.0",
            WmsVersion::V1_1_1 => "1.1.1",
            WmsVersion::V1_3_0 => "1.3.0",
        }
    }

    /// Query parameter carrying the coordinate system identifier.
    pub fn crs_param(&self) -> &'static str {
        match self {
            WmsVersion::V1_1_0 | WmsVersion::V1_1_1 => "srs",
            WmsVersion::V1_3_0 => "crs",
        }
    }
}

impl FromStr for WmsVersion {
    type Err = WmsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "1.1.0" => Ok(WmsVersion::V1_1_0),
            "1.1.1" => Ok(WmsVersion::V1_1_1),
            "1.3.0" => Ok(WmsVersion::V1_3_0),
            other => Err(WmsError::validation(
                "version",
                format!("unsupported WMS version '{}' (expected 1.1.0, 1.1.1 or 1.3.0)", other),
            )),
        }
    }
}

impl fmt::Display for WmsVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
