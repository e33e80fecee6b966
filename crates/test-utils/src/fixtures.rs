//! Canned WMS documents for parser and client tests.

/// WMS 1.3.0 namespace URI.
pub const WMS_NS: &str = "http://www.opengis.net/wms";

/// A realistic WMS 1.3.0 capabilities document.
///
/// Data layers, in document order: `topp:states`, `sf:roads`, `sf:streams`,
/// `ne:coastlines`. `Boundaries` is an unnamed group and the root layer's
/// own name (`root`) is not a data layer.
pub const CAPABILITIES_130: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<WMS_Capabilities version="1.3.0" xmlns="http://www.opengis.net/wms" xmlns:xlink="http://www.w3.org/1999/xlink">
  <Service>
    <Name>WMS</Name>
    <Title>Test Map Server</Title>
  </Service>
  <Capability>
    <Request>
      <GetMap>
        <Format>image/png</Format>
        <Format>image/jpeg</Format>
      </GetMap>
    </Request>
    <Layer>
      <Name>root</Name>
      <Title>Root Layer</Title>
      <CRS>EPSG:4326</CRS>
      <Layer queryable="1">
        <Name>topp:states</Name>
        <Title>USA Population</Title>
        <Abstract>States of the USA</Abstract>
        <CRS>EPSG:4326</CRS>
        <CRS>EPSG:3857</CRS>
      </Layer>
      <Layer>
        <Title>Boundaries</Title>
        <Layer>
          <Name>sf:roads</Name>
          <Title>Roads</Title>
        </Layer>
        <Layer>
          <Name>  sf:streams  </Name>
        </Layer>
      </Layer>
      <Layer>
        <Name>ne:coastlines</Name>
        <Title>Coastlines &amp; Shores</Title>
      </Layer>
    </Layer>
  </Capability>
</WMS_Capabilities>
"#;

/// Layer names in [`CAPABILITIES_130`], in document order.
pub const CAPABILITIES_130_LAYERS: [&str; 4] =
    ["topp:states", "sf:roads", "sf:streams", "ne:coastlines"];

/// The same structure as [`CAPABILITIES_130`] but with no namespace, as a
/// WMS 1.1.1 server would send it.
pub const CAPABILITIES_NO_NAMESPACE: &str = r#"<?xml version="1.0"?>
<WMT_MS_Capabilities version="1.1.1">
  <Capability>
    <Layer>
      <Name>root</Name>
      <Layer><Name>topp:states</Name></Layer>
    </Layer>
  </Capability>
</WMT_MS_Capabilities>
"#;

/// Well-formed capabilities with only the root layer.
pub const CAPABILITIES_ROOT_ONLY: &str = r#"<WMS_Capabilities xmlns="http://www.opengis.net/wms" version="1.3.0">
  <Capability>
    <Layer><Name>root</Name><Title>Nothing here</Title></Layer>
  </Capability>
</WMS_Capabilities>"#;

/// Truncated document: the root element is never closed.
pub const MALFORMED_UNCLOSED: &str = r#"<WMS_Capabilities xmlns="http://www.opengis.net/wms">
  <Capability>
    <Layer><Layer><Name>a</Name></Layer>"#;

/// Mismatched end tag.
pub const MALFORMED_MISMATCHED: &str = r#"<WMS_Capabilities xmlns="http://www.opengis.net/wms">
  <Capability><Layer><Layer><Name>a</Title></Layer></Layer></Capability>
</WMS_Capabilities>"#;

/// An OGC service exception, as returned instead of an image on error.
pub const SERVICE_EXCEPTION: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<ServiceExceptionReport version="1.3.0" xmlns="http://www.opengis.net/ogc">
  <ServiceException code="LayerNotDefined">
    Could not find layer nope:missing
  </ServiceException>
</ServiceExceptionReport>
"#;

/// Build a namespaced capabilities document with one nested layer per name.
pub fn capabilities_with_layers(names: &[&str]) -> String {
    let mut xml = format!(
        "<?xml version=\"1.0\"?>\n<WMS_Capabilities version=\"1.3.0\" xmlns=\"{}\">\n<Capability>\n<Layer>\n<Title>root</Title>\n",
        WMS_NS
    );
    for name in names {
        xml.push_str(&format!("  <Layer><Name>{}</Name></Layer>\n", name));
    }
    xml.push_str("</Layer>\n</Capability>\n</WMS_Capabilities>\n");
    xml
}

/// Same as [`capabilities_with_layers`] but using a `wms:` prefix instead of
/// a default namespace.
pub fn prefixed_capabilities_with_layers(names: &[&str]) -> String {
    let mut xml = format!(
        "<wms:WMS_Capabilities version=\"1.3.0\" xmlns:wms=\"{}\"><wms:Capability><wms:Layer>",
        WMS_NS
    );
    for name in names {
        xml.push_str(&format!(
            "<wms:Layer><wms:Name>{}</wms:Name></wms:Layer>",
            name
        ));
    }
    xml.push_str("</wms:Layer></wms:Capability></wms:WMS_Capabilities>");
    xml
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generated_capabilities_lists_names() {
        let xml = capabilities_with_layers(&["a", "b"]);
        assert!(xml.contains("<Name>a</Name>"));
        assert!(xml.contains("<Name>b</Name>"));
        assert!(xml.contains(WMS_NS));
    }
}
