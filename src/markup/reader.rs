//! Parse a package part into an [`Element`] tree with quick-xml.

use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

use super::ns::canonical_prefix;
use super::{Element, Node};
use crate::error::DocumentError;

/// Prefix bindings introduced by one element: source prefix -> prefix used in
/// the tree. The empty string stands for the default namespace.
type Bindings = Vec<(String, Option<String>)>;

struct Frame {
    element: Element,
    bindings: Bindings,
}

/// Parse `bytes` (the content of part `part_name`) into its root element.
pub fn parse(part_name: &str, bytes: &[u8]) -> Result<Element, DocumentError> {
    let bytes = bytes.strip_prefix(b"\xEF\xBB\xBF").unwrap_or(bytes);
    let xml =
        std::str::from_utf8(bytes).map_err(|_| DocumentError::Encoding(part_name.to_string()))?;

    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(false); // w:t content is whitespace-significant

    let mut stack: Vec<Frame> = Vec::new();
    let mut root: Option<Element> = None;

    loop {
        match reader.read_event()? {
            Event::Start(ref e) => {
                let (element, bindings) = open_element(e, &stack)?;
                stack.push(Frame { element, bindings });
            }
            Event::Empty(ref e) => {
                let (element, _) = open_element(e, &stack)?;
                attach(&mut stack, &mut root, element, part_name)?;
            }
            Event::End(_) => {
                let frame = stack
                    .pop()
                    .ok_or_else(|| DocumentError::Unbalanced(part_name.to_string()))?;
                attach(&mut stack, &mut root, frame.element, part_name)?;
            }
            Event::Text(ref e) => {
                if let Some(frame) = stack.last_mut() {
                    let text = e.unescape()?;
                    push_text(&mut frame.element, &text);
                }
            }
            Event::CData(e) => {
                if let Some(frame) = stack.last_mut() {
                    let raw = e.into_inner();
                    push_text(&mut frame.element, &String::from_utf8_lossy(&raw));
                }
            }
            Event::Eof => break,
            // Declarations, comments and processing instructions are not kept
            _ => {}
        }
    }

    if !stack.is_empty() {
        return Err(DocumentError::Unbalanced(part_name.to_string()));
    }
    root.ok_or_else(|| DocumentError::Unbalanced(part_name.to_string()))
}

fn attach(
    stack: &mut [Frame],
    root: &mut Option<Element>,
    element: Element,
    part_name: &str,
) -> Result<(), DocumentError> {
    match stack.last_mut() {
        Some(parent) => parent.element.push(element),
        None if root.is_none() => *root = Some(element),
        None => return Err(DocumentError::Unbalanced(part_name.to_string())),
    }
    Ok(())
}

fn push_text(element: &mut Element, text: &str) {
    if let Some(Node::Text(existing)) = element.children.last_mut() {
        existing.push_str(text);
    } else {
        element.push_text(text);
    }
}

fn open_element(start: &BytesStart, stack: &[Frame]) -> Result<(Element, Bindings), DocumentError> {
    let mut raw = Vec::new();
    for attr in start.attributes() {
        let attr = attr?;
        let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
        let value = attr.unescape_value()?.into_owned();
        raw.push((key, value));
    }

    // Namespace declarations first: they bind prefixes for this element too
    let mut bindings: Bindings = Vec::new();
    let mut attributes: Vec<(String, String)> = Vec::new();
    for (key, value) in &raw {
        let declared = if key == "xmlns" {
            Some("")
        } else {
            key.strip_prefix("xmlns:")
        };
        let Some(source_prefix) = declared else {
            continue;
        };
        let canonical = canonical_prefix(value);
        bindings.push((source_prefix.to_string(), canonical.map(str::to_string)));
        let out_key = match (canonical, source_prefix) {
            (Some(c), _) => format!("xmlns:{c}"),
            (None, "") => "xmlns".to_string(),
            (None, p) => format!("xmlns:{p}"),
        };
        if !attributes.iter().any(|(k, _)| *k == out_key) {
            attributes.push((out_key, value.clone()));
        }
    }

    let resolve = |prefix: &str| -> Option<String> {
        bindings
            .iter()
            .rev()
            .chain(stack.iter().rev().flat_map(|f| f.bindings.iter().rev()))
            .find(|(p, _)| p == prefix)
            .and_then(|(_, canonical)| canonical.clone())
    };

    let raw_name = String::from_utf8_lossy(start.name().as_ref()).into_owned();
    let name = match raw_name.split_once(':') {
        Some((prefix, local)) => match resolve(prefix) {
            Some(canonical) => format!("{canonical}:{local}"),
            None => raw_name.clone(),
        },
        None => match resolve("") {
            Some(canonical) => format!("{canonical}:{raw_name}"),
            None => raw_name.clone(),
        },
    };

    for (key, value) in raw {
        if key == "xmlns" || key.starts_with("xmlns:") {
            continue;
        }
        let key = match key.split_once(':') {
            Some(("xml", _)) => key,
            Some((prefix, local)) => match resolve(prefix) {
                Some(canonical) => format!("{canonical}:{local}"),
                None => key,
            },
            None => key,
        };
        attributes.push((key, value));
    }

    Ok((
        Element {
            name,
            attributes,
            children: Vec::new(),
        },
        bindings,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::markup::ns;

    #[test]
    fn test_parse_keeps_whitespace_text() {
        let xml = format!(
            r#"<?xml version="1.0"?><w:document xmlns:w="{}"><w:body><w:p><w:r><w:t xml:space="preserve"> a &amp; b </w:t></w:r></w:p></w:body></w:document>"#,
            ns::W
        );
        let root = parse("word/document.xml", xml.as_bytes()).unwrap();
        let t = root.find("w:t").unwrap();
        assert_eq!(t.text(), " a & b ");
        assert_eq!(t.attr("xml:space"), Some("preserve"));
    }

    #[test]
    fn test_foreign_prefixes_are_normalized() {
        let xml = format!(
            r#"<ns0:document xmlns:ns0="{}" xmlns:rel="{}"><ns0:body><ns0:hyperlink rel:id="rId4"/></ns0:body></ns0:document>"#,
            ns::W,
            ns::R
        );
        let root = parse("word/document.xml", xml.as_bytes()).unwrap();
        assert_eq!(root.name, "w:document");
        assert_eq!(root.attr("xmlns:w"), Some(ns::W));
        let link = root.find("w:hyperlink").unwrap();
        assert_eq!(link.attr("r:id"), Some("rId4"));
    }

    #[test]
    fn test_default_namespace_of_known_uri_gets_prefix() {
        let xml = format!(r#"<document xmlns="{}"><body/></document>"#, ns::W);
        let root = parse("word/document.xml", xml.as_bytes()).unwrap();
        assert_eq!(root.name, "w:document");
        assert!(root.child("w:body").is_some());
    }

    #[test]
    fn test_unknown_default_namespace_is_left_alone() {
        let xml = format!(
            r#"<Relationships xmlns="{}"><Relationship Id="rId1" Target="media/a.png"/></Relationships>"#,
            ns::PACKAGE_RELATIONSHIPS
        );
        let root = parse("word/_rels/document.xml.rels", xml.as_bytes()).unwrap();
        assert_eq!(root.name, "Relationships");
        assert_eq!(root.children_named("Relationship").count(), 1);
    }

    #[test]
    fn test_unbalanced_input_is_rejected() {
        assert!(parse("x.xml", b"<a><b></a>").is_err());
        assert!(parse("x.xml", b"").is_err());
    }
}
