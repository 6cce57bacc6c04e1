//! XML namespace stripping and node lookup helpers.

use crate::error::ReportError;
use quick_xml::Reader;
use quick_xml::Writer;
use quick_xml::events::{BytesEnd, BytesStart, Event};
use quick_xml::name::QName;
use roxmltree::Node;

/// Rewrites a document so every element and attribute name loses its
/// namespace prefix and all `xmlns` declarations are dropped.
///
/// Unqualified lookups (`Ntry`, `RuleDesc`, ...) then match regardless of the
/// prefixes the server picked. Idempotent, and a no-op on documents without
/// namespaces.
pub fn strip_namespaces(xml: &str) -> Result<String, ReportError> {
    let mut reader = Reader::from_str(xml);
    let mut writer = Writer::new(Vec::new());

    loop {
        match reader.read_event().map_err(quick_xml::Error::from)? {
            Event::Start(e) => writer.write_event(Event::Start(strip_element(&e)?))?,
            Event::Empty(e) => writer.write_event(Event::Empty(strip_element(&e)?))?,
            Event::End(e) => {
                writer.write_event(Event::End(BytesEnd::new(local_name(e.name())?)))?;
            }
            Event::Eof => break,
            other => writer.write_event(other)?,
        }
    }

    Ok(String::from_utf8(writer.into_inner())?)
}

/// Copies an opening element, stripping prefixes and `xmlns` declarations.
fn strip_element(element: &BytesStart<'_>) -> Result<BytesStart<'static>, ReportError> {
    let mut stripped = BytesStart::new(local_name(element.name())?);
    for attribute in element.attributes() {
        let attribute = attribute.map_err(quick_xml::Error::from)?;
        let key = attribute.key.as_ref();
        if key == b"xmlns" || key.starts_with(b"xmlns:") {
            continue;
        }
        let key = local_name(attribute.key)?;
        let value = attribute.unescape_value().map_err(quick_xml::Error::from)?;
        stripped.push_attribute((key.as_str(), value.as_ref()));
    }
    Ok(stripped)
}

/// Local part of a possibly prefixed name.
fn local_name(name: QName<'_>) -> Result<String, ReportError> {
    Ok(String::from_utf8(name.local_name().as_ref().to_vec())?)
}

/// First direct child element with the given tag name.
pub(crate) fn child<'a, 'i>(node: Node<'a, 'i>, name: &str) -> Option<Node<'a, 'i>> {
    node.children().find(|n| n.has_tag_name(name))
}

/// Text of the first direct child element with the given tag name.
pub(crate) fn child_text<'a>(node: Node<'a, '_>, name: &str) -> Option<&'a str> {
    child(node, name).and_then(|n| n.text())
}

/// First descendant element with the given tag name, in document order.
pub(crate) fn descendant<'a, 'i>(node: Node<'a, 'i>, name: &str) -> Option<Node<'a, 'i>> {
    node.descendants().find(|n| n.has_tag_name(name))
}
