//! GetMap and GetCapabilities URL construction.
//!
//! Building is pure: the same parameters and defaults always yield the same
//! URL, and nothing here performs I/O.

use std::fmt;

use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use wms_common::{BboxPolicy, BoundingBox, WmsError, WmsResult};

use crate::version::WmsVersion;

/// Characters left unescaped in query values. Besides the RFC 3986
/// unreserved set this keeps `,` `:` `/` so bbox lists, EPSG codes and MIME
/// types read the same as the unencoded form.
const QUERY_VALUE: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'.')
    .remove(b'_')
    .remove(b'~')
    .remove(b',')
    .remove(b':')
    .remove(b'/');

/// A single entry of the `layers` list, where `,` is the separator.
const LAYER_NAME: &AsciiSet = &QUERY_VALUE.add(b',');

fn encode(value: &str) -> String {
    utf8_percent_encode(value, QUERY_VALUE).to_string()
}

/// User-supplied GetMap parameters. `None` or blank optional fields fall
/// back to [`GetMapDefaults`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GetMapParams {
    pub base_url: String,
    /// Selected layers, in the order they should be drawn
    pub layers: Vec<String>,
    /// Raw `minx,miny,maxx,maxy` text
    pub bbox: Option<String>,
    pub crs: Option<String>,
    pub format: Option<String>,
    pub version: Option<String>,
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub transparent: Option<bool>,
}

impl GetMapParams {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            ..Default::default()
        }
    }

    pub fn with_layers<I, S>(mut self, layers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.layers = layers.into_iter().map(Into::into).collect();
        self
    }

    /// Use a typed extent, e.g. the current view's bbox.
    pub fn with_bbox(mut self, bbox: BoundingBox) -> Self {
        self.bbox = Some(bbox.to_string());
        self
    }
}

/// Values applied when a [`GetMapParams`] field is missing or blank.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GetMapDefaults {
    pub bbox: BoundingBox,
    pub crs: String,
    pub format: String,
    pub version: WmsVersion,
    pub width: u32,
    pub height: u32,
    pub transparent: bool,
    pub bbox_policy: BboxPolicy,
}

impl Default for GetMapDefaults {
    fn default() -> Self {
        Self {
            bbox: BoundingBox::WORLD,
            crs: "EPSG:4326".to_string(),
            format: "image/png".to_string(),
            version: WmsVersion::V1_3_0,
            width: 800,
            height: 600,
            transparent: false,
            bbox_policy: BboxPolicy::Legacy,
        }
    }
}

/// Non-fatal adjustments made while building a URL.
#[derive(Debug, Clone, PartialEq)]
pub enum BuildWarning {
    /// The supplied bbox was unusable and the default was sent instead.
    BboxReplaced { input: String, reason: String },
}

impl fmt::Display for BuildWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BuildWarning::BboxReplaced { input, reason } => {
                write!(f, "bbox '{}' ignored ({}), using default", input, reason)
            }
        }
    }
}

/// A built GetMap URL plus the resolved values that went into it.
#[derive(Debug, Clone, PartialEq)]
pub struct GetMapUrl {
    pub url: String,
    pub version: WmsVersion,
    pub bbox: BoundingBox,
    pub layers: Vec<String>,
    pub warnings: Vec<BuildWarning>,
}

impl GetMapUrl {
    pub fn bbox_replaced(&self) -> bool {
        self.warnings
            .iter()
            .any(|w| matches!(w, BuildWarning::BboxReplaced { .. }))
    }
}

impl fmt::Display for GetMapUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.url)
    }
}

fn non_blank(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

fn require_base_url(base_url: &str) -> WmsResult<&str> {
    let base = base_url.trim();
    if base.is_empty() {
        return Err(WmsError::validation("base_url", "base WMS URL is required"));
    }
    Ok(base)
}

/// Append a query string to a base URL that may already carry one.
fn join_query(base: &str, query: &str) -> String {
    if base.ends_with('?') || base.ends_with('&') {
        format!("{}{}", base, query)
    } else if base.contains('?') {
        format!("{}&{}", base, query)
    } else {
        format!("{}?{}", base, query)
    }
}

/// Ordered, de-duplicated, non-blank layer names.
fn selected_layers(layers: &[String]) -> Vec<String> {
    let mut out: Vec<String> = Vec::with_capacity(layers.len());
    for layer in layers.iter().map(|l| l.trim()).filter(|l| !l.is_empty()) {
        if !out.iter().any(|seen| seen == layer) {
            out.push(layer.to_string());
        }
    }
    out
}

fn resolve_bbox(
    input: Option<&str>,
    defaults: &GetMapDefaults,
    warnings: &mut Vec<BuildWarning>,
) -> BoundingBox {
    let Some(text) = input else {
        return defaults.bbox;
    };

    let reason = match BoundingBox::from_wms_string(text) {
        Ok(bbox) if defaults.bbox_policy.accepts(&bbox) => return bbox,
        Ok(_) => format!("outside the {:?} range or inverted", defaults.bbox_policy),
        Err(e) => e.to_string(),
    };

    warn!(input = %text, reason = %reason, "Invalid bbox, substituting default");
    warnings.push(BuildWarning::BboxReplaced {
        input: text.to_string(),
        reason,
    });
    defaults.bbox
}

fn positive(field: &str, value: u32) -> WmsResult<u32> {
    if value == 0 {
        return Err(WmsError::validation(field, "must be a positive integer"));
    }
    Ok(value)
}

/// Build a GetMap request URL.
///
/// `base_url` and at least one layer are required. A bbox that does not
/// parse as four numbers within the configured policy is replaced by the
/// default and reported in [`GetMapUrl::warnings`] instead of failing.
pub fn build_get_map_url(params: &GetMapParams, defaults: &GetMapDefaults) -> WmsResult<GetMapUrl> {
    let base = require_base_url(&params.base_url)?;

    let layers = selected_layers(&params.layers);
    if layers.is_empty() {
        return Err(WmsError::validation(
            "layers",
            "at least one layer must be selected",
        ));
    }

    let version = match non_blank(&params.version) {
        Some(v) => v.parse::<WmsVersion>()?,
        None => defaults.version,
    };
    let crs = non_blank(&params.crs).unwrap_or(defaults.crs.as_str());
    let format = non_blank(&params.format).unwrap_or(defaults.format.as_str());
    let width = positive("width", params.width.unwrap_or(defaults.width))?;
    let height = positive("height", params.height.unwrap_or(defaults.height))?;
    let transparent = params.transparent.unwrap_or(defaults.transparent);

    let mut warnings = Vec::new();
    let bbox = resolve_bbox(non_blank(&params.bbox), defaults, &mut warnings);

    let layer_list = layers
        .iter()
        .map(|l| utf8_percent_encode(l, LAYER_NAME).to_string())
        .collect::<Vec<_>>()
        .join(",");

    let mut query = format!(
        "service=WMS&version={}&request=GetMap&layers={}&bbox={}&width={}&height={}&{}={}&format={}",
        version,
        layer_list,
        encode(&bbox.to_string()),
        width,
        height,
        version.crs_param(),
        encode(crs),
        encode(format),
    );
    if transparent {
        query.push_str("&transparent=true");
    }

    let url = join_query(base, &query);
    debug!(url = %url, "Built GetMap URL");

    Ok(GetMapUrl {
        url,
        version,
        bbox,
        layers,
        warnings,
    })
}

/// Build a GetCapabilities URL for the default version (1.3.0).
pub fn build_get_capabilities_url(base_url: &str) -> WmsResult<String> {
    build_get_capabilities_url_for(base_url, WmsVersion::default())
}

/// Build a GetCapabilities URL for a specific version.
pub fn build_get_capabilities_url_for(base_url: &str, version: WmsVersion) -> WmsResult<String> {
    let base = require_base_url(base_url)?;
    Ok(join_query(
        base,
        &format!("service=WMS&version={}&request=GetCapabilities", version),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_keeps_safe_values() {
        assert_eq!(encode("EPSG:4326"), "EPSG:4326");
        assert_eq!(encode("image/png"), "image/png");
        assert_eq!(encode("-180,-90,180,90"), "-180,-90,180,90");
        assert_eq!(encode("topp:states"), "topp:states");
    }

    #[test]
    fn test_encode_escapes_reserved() {
        assert_eq!(encode("a b"), "a%20b");
        assert_eq!(encode("x&y=z"), "x%26y%3Dz");
        assert_eq!(encode("image/png; mode=8bit"), "image/png%3B%20mode%3D8bit");
    }

    #[test]
    fn test_join_query() {
        assert_eq!(join_query("http://h/wms", "a=1"), "http://h/wms?a=1");
        assert_eq!(join_query("http://h/wms?", "a=1"), "http://h/wms?a=1");
        assert_eq!(join_query("http://h/wms?map=x", "a=1"), "http://h/wms?map=x&a=1");
        assert_eq!(join_query("http://h/wms?map=x&", "a=1"), "http://h/wms?map=x&a=1");
    }

    #[test]
    fn test_selected_layers_dedup_keeps_order() {
        let input: Vec<String> = ["b", " a ", "", "b", "c"].iter().map(|s| s.to_string()).collect();
        assert_eq!(selected_layers(&input), vec!["b", "a", "c"]);
    }
}
