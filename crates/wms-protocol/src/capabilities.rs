//! GetCapabilities parsing.
//!
//! Only the layer tree is read. A layer is reported when it sits inside at
//! least one other `Layer` (the outermost one is the service root) and has a
//! non-blank direct `Name` child. Results follow start-tag document order.

use quick_xml::events::Event;
use quick_xml::name::{Namespace, ResolveResult};
use quick_xml::reader::{NsReader, Reader};
use tracing::debug;
use wms_common::{Layer, WmsError, WmsResult};

/// Namespace of WMS 1.3.0 capabilities documents.
pub const WMS_NAMESPACE: &[u8] = b"http://www.opengis.net/wms";

#[derive(Debug, Clone, Copy)]
enum Field {
    Name,
    Title,
    Abstract,
    Crs,
}

#[derive(Debug)]
enum Frame {
    Layer,
    Field { field: Field, slot: usize },
    Other,
}

#[derive(Debug, Default)]
struct PendingLayer {
    nesting: usize,
    name: Option<String>,
    title: Option<String>,
    description: Option<String>,
    crs: Vec<String>,
}

impl PendingLayer {
    fn into_layer(self) -> Option<Layer> {
        if self.nesting == 0 {
            return None;
        }
        let name = self.name?;
        Some(Layer {
            name,
            title: self.title,
            description: self.description,
            crs: self.crs,
        })
    }
}

fn is_wms(ns: &ResolveResult) -> bool {
    matches!(ns, ResolveResult::Bound(Namespace(uri)) if *uri == WMS_NAMESPACE)
}

fn non_blank(text: &str) -> Option<String> {
    let trimmed = text.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

/// Parse a GetCapabilities response into its data layers.
///
/// Fails with [`WmsError::Parse`] on any well-formedness problem; an empty
/// vector means the document was valid but advertised no named layers.
pub fn parse_layers(xml: &[u8]) -> WmsResult<Vec<Layer>> {
    let mut reader = NsReader::from_reader(xml);
    let mut buf = Vec::new();

    let mut stack: Vec<Frame> = Vec::new();
    let mut pending: Vec<PendingLayer> = Vec::new();
    // Index into `pending` for each open Layer frame.
    let mut open_layers: Vec<usize> = Vec::new();
    let mut text = String::new();
    let mut saw_root = false;

    loop {
        // Resolve the namespace up front so no borrow of the reader outlives
        // this call.
        match reader
            .read_resolved_event_into(&mut buf)
            .map(|(ns, event)| (is_wms(&ns), event))
        {
            Ok((in_wms, Event::Start(e))) => {
                if stack.is_empty() {
                    if saw_root {
                        return Err(parse_error(&reader, "content after the root element"));
                    }
                    saw_root = true;
                }

                let local = e.local_name();
                let frame = match in_wms.then_some(local.as_ref()) {
                    Some(b"Layer") => {
                        pending.push(PendingLayer {
                            nesting: open_layers.len(),
                            ..Default::default()
                        });
                        open_layers.push(pending.len() - 1);
                        Frame::Layer
                    }
                    Some(tag) if matches!(stack.last(), Some(Frame::Layer)) => {
                        let field = match tag {
                            b"Name" => Some(Field::Name),
                            b"Title" => Some(Field::Title),
                            b"Abstract" => Some(Field::Abstract),
                            b"CRS" | b"SRS" => Some(Field::Crs),
                            _ => None,
                        };
                        match (field, open_layers.last()) {
                            (Some(field), Some(&slot)) => {
                                text.clear();
                                Frame::Field { field, slot }
                            }
                            _ => Frame::Other,
                        }
                    }
                    _ => Frame::Other,
                };
                stack.push(frame);
            }
            Ok((_, Event::Empty(_))) => {
                if stack.is_empty() {
                    if saw_root {
                        return Err(parse_error(&reader, "content after the root element"));
                    }
                    saw_root = true;
                }
            }
            Ok((_, Event::Text(t))) => {
                if matches!(stack.last(), Some(Frame::Field { .. })) {
                    let unescaped = t
                        .unescape()
                        .map_err(|e| parse_error(&reader, &e.to_string()))?;
                    text.push_str(&unescaped);
                } else if stack.is_empty() {
                    let raw = String::from_utf8_lossy(&t);
                    if !raw.trim().is_empty() {
                        return Err(parse_error(&reader, "text outside the root element"));
                    }
                }
            }
            Ok((_, Event::CData(c))) => {
                if matches!(stack.last(), Some(Frame::Field { .. })) {
                    text.push_str(&String::from_utf8_lossy(&c));
                }
            }
            Ok((_, Event::End(_))) => match stack.pop() {
                Some(Frame::Layer) => {
                    open_layers.pop();
                }
                Some(Frame::Field { field, slot }) => {
                    let layer = &mut pending[slot];
                    let value = non_blank(&text);
                    match field {
                        Field::Name => layer.name = value,
                        Field::Title => layer.title = value,
                        Field::Abstract => layer.description = value,
                        Field::Crs => layer.crs.extend(value),
                    }
                    text.clear();
                }
                Some(Frame::Other) => {}
                None => return Err(parse_error(&reader, "unexpected closing tag")),
            },
            Ok((_, Event::Eof)) => break,
            Ok(_) => {}
            Err(e) => return Err(parse_error(&reader, &e.to_string())),
        }
        buf.clear();
    }

    if !saw_root {
        return Err(WmsError::Parse("document has no root element".to_string()));
    }
    if !stack.is_empty() {
        return Err(WmsError::Parse(format!(
            "unexpected end of document with {} unclosed element(s)",
            stack.len()
        )));
    }

    let layers: Vec<Layer> = pending
        .into_iter()
        .filter_map(PendingLayer::into_layer)
        .collect();
    debug!(count = layers.len(), "parsed capabilities layers");
    Ok(layers)
}

fn parse_error<R>(reader: &NsReader<R>, message: &str) -> WmsError {
    WmsError::Parse(format!(
        "XML error at position {}: {}",
        reader.buffer_position(),
        message
    ))
}

/// Extract the message of an OGC `ServiceExceptionReport`.
///
/// Returns `None` when the payload is not a service exception (or not XML at
/// all). Multiple exceptions are joined with `"; "`, each prefixed by its
/// `code` attribute when present.
pub fn parse_service_exception(xml: &[u8]) -> Option<String> {
    let mut reader = Reader::from_reader(xml);
    let mut buf = Vec::new();

    let mut messages = Vec::new();
    let mut current: Option<(Option<String>, String)> = None;

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) if e.local_name().as_ref() == b"ServiceException" => {
                let code = e
                    .try_get_attribute("code")
                    .ok()
                    .flatten()
                    .and_then(|a| a.unescape_value().ok().map(|v| v.into_owned()));
                current = Some((code, String::new()));
            }
            Ok(Event::Empty(e)) if e.local_name().as_ref() == b"ServiceException" => {
                let code = e
                    .try_get_attribute("code")
                    .ok()
                    .flatten()
                    .and_then(|a| a.unescape_value().ok().map(|v| v.into_owned()));
                messages.push(code.unwrap_or_else(|| "ServiceException".to_string()));
            }
            Ok(Event::Text(t)) => {
                if let Some((_, text)) = current.as_mut() {
                    text.push_str(&t.unescape().ok()?);
                }
            }
            Ok(Event::CData(c)) => {
                if let Some((_, text)) = current.as_mut() {
                    text.push_str(&String::from_utf8_lossy(&c));
                }
            }
            Ok(Event::End(e)) if e.local_name().as_ref() == b"ServiceException" => {
                if let Some((code, text)) = current.take() {
                    let text = text.trim();
                    messages.push(match code {
                        Some(code) if text.is_empty() => code,
                        Some(code) => format!("{}: {}", code, text),
                        None => text.to_string(),
                    });
                }
            }
            Ok(Event::Eof) => break,
            Ok(_) => {}
            Err(_) => return None,
        }
        buf.clear();
    }

    (!messages.is_empty()).then(|| messages.join("; "))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(layers: &[Layer]) -> Vec<&str> {
        layers.iter().map(|l| l.name.as_str()).collect()
    }

    #[test]
    fn test_root_layer_is_not_reported() {
        let xml = br#"<WMS_Capabilities xmlns="http://www.opengis.net/wms">
            <Capability><Layer><Name>root</Name>
                <Layer><Name>a</Name></Layer>
            </Layer></Capability></WMS_Capabilities>"#;
        let layers = parse_layers(xml).unwrap();
        assert_eq!(names(&layers), vec!["a"]);
    }

    #[test]
    fn test_name_must_be_direct_child() {
        let xml = br#"<WMS_Capabilities xmlns="http://www.opengis.net/wms">
            <Capability><Layer>
                <Layer><Style><Name>default</Name></Style></Layer>
            </Layer></Capability></WMS_Capabilities>"#;
        assert!(parse_layers(xml).unwrap().is_empty());
    }

    #[test]
    fn test_parent_before_children() {
        let xml = br#"<WMS_Capabilities xmlns="http://www.opengis.net/wms">
            <Capability><Layer>
                <Layer><Name>group</Name>
                    <Layer><Name>child</Name></Layer>
                </Layer>
                <Layer><Name>sibling</Name></Layer>
            </Layer></Capability></WMS_Capabilities>"#;
        let layers = parse_layers(xml).unwrap();
        assert_eq!(names(&layers), vec!["group", "child", "sibling"]);
    }

    #[test]
    fn test_foreign_namespace_ignored() {
        let xml = br#"<WMS_Capabilities xmlns="http://www.opengis.net/wms" xmlns:x="urn:other">
            <Capability><Layer>
                <x:Layer><x:Name>foreign</x:Name></x:Layer>
                <Layer><Name>ok</Name></Layer>
            </Layer></Capability></WMS_Capabilities>"#;
        let layers = parse_layers(xml).unwrap();
        assert_eq!(names(&layers), vec!["ok"]);
    }

    #[test]
    fn test_text_outside_root_is_error() {
        let err = parse_layers(b"this is not xml").unwrap_err();
        assert_eq!(err.kind(), "ParseError");
    }

    #[test]
    fn test_empty_input_is_error() {
        assert_eq!(parse_layers(b"").unwrap_err().kind(), "ParseError");
        assert_eq!(parse_layers(b"   \n").unwrap_err().kind(), "ParseError");
    }

    #[test]
    fn test_service_exception_without_code() {
        let xml = br#"<ServiceExceptionReport><ServiceException>boom</ServiceException></ServiceExceptionReport>"#;
        assert_eq!(parse_service_exception(xml).as_deref(), Some("boom"));
    }

    #[test]
    fn test_non_exception_xml() {
        let xml = br#"<WMS_Capabilities/>"#;
        assert!(parse_service_exception(xml).is_none());
        assert!(parse_service_exception(b"\x89PNG\r\n").is_none());
    }
}
