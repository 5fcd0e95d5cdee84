//! quick-xml event loop building the element tree.

use std::path::Path;

use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use thiserror::Error;

use crate::element::MetadataElement;

#[derive(Debug, Error)]
pub enum ParseError {
    #[error("XML syntax error: {0}")]
    Syntax(String),

    #[error("Document has no root element")]
    EmptyDocument,

    #[error("Failed to read file: {0}")]
    Io(#[from] std::io::Error),
}

/// Parse a metadata document from a file. Returns the root element.
pub fn parse_file<P: AsRef<Path>>(path: P) -> Result<MetadataElement, ParseError> {
    let raw = std::fs::read_to_string(path)?;
    parse_str(&raw)
}

/// Parse a metadata document from a string. Returns the root element.
pub fn parse_str(xml: &str) -> Result<MetadataElement, ParseError> {
    let mut reader = Reader::from_str(xml);
    reader.trim_text(true);

    // Stack of open elements; the bottom entry becomes the root.
    let mut stack: Vec<(String, MetadataElement)> = Vec::new();
    let mut root: Option<MetadataElement> = None;

    loop {
        match reader.read_event() {
            Ok(Event::Start(start)) => {
                let element = element_from_start(&start)?;
                stack.push((local_name(start.name().as_ref()), element));
            }
            Ok(Event::Empty(start)) => {
                let element = element_from_start(&start)?;
                let name = local_name(start.name().as_ref());
                attach(&mut stack, &mut root, name, element);
            }
            Ok(Event::Text(text)) => {
                let fragment = text
                    .unescape()
                    .map_err(|e| ParseError::Syntax(e.to_string()))?;
                if let Some((_, element)) = stack.last_mut() {
                    element.append_text(&fragment);
                }
            }
            Ok(Event::CData(cdata)) => {
                let bytes = cdata.into_inner();
                let fragment = String::from_utf8_lossy(&bytes);
                if let Some((_, element)) = stack.last_mut() {
                    element.append_text(&fragment);
                }
            }
            Ok(Event::End(_)) => {
                let Some((name, element)) = stack.pop() else {
                    return Err(ParseError::Syntax("unbalanced end tag".to_string()));
                };
                attach(&mut stack, &mut root, name, element);
            }
            Ok(Event::Eof) => break,
            // Prolog, comments and processing instructions carry no record content
            Ok(_) => {}
            Err(e) => return Err(ParseError::Syntax(e.to_string())),
        }
    }

    root.ok_or(ParseError::EmptyDocument)
}

fn attach(
    stack: &mut [(String, MetadataElement)],
    root: &mut Option<MetadataElement>,
    name: String,
    element: MetadataElement,
) {
    if let Some((_, parent)) = stack.last_mut() {
        parent.push_child(name, element);
    } else if root.is_none() {
        *root = Some(element);
    }
}

fn element_from_start(start: &BytesStart) -> Result<MetadataElement, ParseError> {
    let mut element = MetadataElement::new();
    for attr in start.attributes() {
        let attr = attr.map_err(|e| ParseError::Syntax(e.to_string()))?;
        let value = attr
            .unescape_value()
            .map_err(|e| ParseError::Syntax(e.to_string()))?;
        element.push_attr(local_name(attr.key.as_ref()), value.into_owned());
    }
    Ok(element)
}

/// Strip any namespace prefix: `mmd:title` -> `title`, `xml:lang` -> `lang`.
fn local_name(name: &[u8]) -> String {
    let name = String::from_utf8_lossy(name);
    match name.rsplit_once(':') {
        Some((_, local)) => local.to_string(),
        None => name.into_owned(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_scalar_field() {
        let record = parse_str("<m:mmd xmlns:m=\"x\"><m:title>Ice</m:title></m:mmd>").unwrap();
        assert_eq!(record.child_text("title"), Some("Ice"));
    }

    #[test]
    fn test_parse_attributed_field() {
        let record =
            parse_str("<mmd><title xml:lang=\"en\">Ice extent</title></mmd>").unwrap();
        let title = record.child("title").unwrap();
        assert_eq!(title.attr("lang"), Some("en"));
        assert_eq!(title.text(), "Ice extent");
    }

    #[test]
    fn test_parse_repeated_field() {
        let record = parse_str(
            "<mmd><collection>ADC</collection><collection>NSDN</collection></mmd>",
        )
        .unwrap();
        let collections = record.children_named("collection");
        assert_eq!(collections.len(), 2);
        assert_eq!(collections[0].text(), "ADC");
    }

    #[test]
    fn test_parse_nested_structure() {
        let record = parse_str(
            "<mmd><geographic_extent><rectangle srsName=\"EPSG:4326\">\
             <north>80</north><south>60</south></rectangle></geographic_extent></mmd>",
        )
        .unwrap();
        let rect = record
            .child("geographic_extent")
            .and_then(|e| e.child("rectangle"))
            .unwrap();
        assert_eq!(rect.attr("srsName"), Some("EPSG:4326"));
        assert_eq!(rect.child_text("north"), Some("80"));
    }

    #[test]
    fn test_parse_self_closing_and_entities() {
        let record =
            parse_str("<mmd><end_date/><title>Fram &amp; Nansen</title></mmd>").unwrap();
        assert!(record.child("end_date").unwrap().is_blank());
        assert_eq!(record.child_text("title"), Some("Fram & Nansen"));
    }

    #[test]
    fn test_parse_cdata() {
        let record = parse_str("<mmd><abstract><![CDATA[a < b]]></abstract></mmd>").unwrap();
        assert_eq!(record.child_text("abstract"), Some("a < b"));
    }

    #[test]
    fn test_empty_document_is_an_error() {
        assert!(matches!(parse_str("  "), Err(ParseError::EmptyDocument)));
    }
}
