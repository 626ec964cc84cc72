//! The element stream a schema document is read into.
//!
//! The generator never looks at markup directly. A loader turns the document into
//! a flat list of [`Event`]s, strictly nested, each element carrying its
//! attributes as strings. [`parse_xml`] is the loader for the XML form; the JSON
//! form lives in [`crate::serde`] behind the `serde` feature.

use std::collections::BTreeMap;

use log::warn;
use quick_xml::events::{BytesStart, Event as XmlEvent};
use quick_xml::Reader;

use crate::errors::{DocumentError, SchemaError};

/// The kinds of element a schema document is made of.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ElementKind {
    /// The root element, whatever its tag.
    Document,
    Struct,
    Field,
    Enum,
    Value,
}

impl ElementKind {
    /// Tag name used in diagnostics.
    pub fn tag(self) -> &'static str {
        match self {
            ElementKind::Document => "document",
            ElementKind::Struct => "struct",
            ElementKind::Field => "field",
            ElementKind::Enum => "enum",
            ElementKind::Value => "value",
        }
    }

    /// Maps a nested tag to its kind. The root is always [`ElementKind::Document`].
    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag {
            "struct" => Some(ElementKind::Struct),
            "field" => Some(ElementKind::Field),
            "enum" => Some(ElementKind::Enum),
            "value" => Some(ElementKind::Value),
            _ => None,
        }
    }
}

/// String-keyed attributes of one element.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Attributes(BTreeMap<String, String>);

impl Attributes {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds or replaces an attribute. Returns `self` for chaining.
    pub fn with(mut self, key: &str, value: &str) -> Self {
        self.insert(key, value);
        self
    }

    pub fn insert(&mut self, key: &str, value: &str) {
        self.0.insert(key.to_string(), value.to_string());
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    /// Looks up an attribute that must be present on `element`.
    pub fn require(&self, element: ElementKind, key: &'static str) -> Result<&str, SchemaError> {
        self.get(key).ok_or(SchemaError::MissingAttribute {
            element: element.tag(),
            attribute: key,
        })
    }
}

impl FromIterator<(String, String)> for Attributes {
    fn from_iter<I: IntoIterator<Item = (String, String)>>(iter: I) -> Self {
        Attributes(iter.into_iter().collect())
    }
}

/// One step of the document traversal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    Open { kind: ElementKind, attrs: Attributes },
    Close(ElementKind),
}

/// Reads an XML schema document into an event stream.
///
/// Self-closing elements produce an open and a close. Elements with an unknown
/// tag are skipped together with everything inside them.
pub fn parse_xml(text: &str) -> Result<Vec<Event>, DocumentError> {
    let mut reader = Reader::from_str(text);
    reader.config_mut().trim_text(true);

    let mut events = Vec::new();
    // Open tags; `None` marks an element being skipped.
    let mut open: Vec<Option<ElementKind>> = Vec::new();
    let mut skip_depth = 0usize;

    loop {
        match reader.read_event()? {
            XmlEvent::Start(start) => {
                let kind = open_element(&start, &mut open, &mut skip_depth)?;
                if let Some((kind, attrs)) = kind {
                    events.push(Event::Open { kind, attrs });
                }
            }
            XmlEvent::Empty(start) => {
                let kind = open_element(&start, &mut open, &mut skip_depth)?;
                if let Some((kind, attrs)) = kind {
                    events.push(Event::Open { kind, attrs });
                }
                if let Some(kind) = close_element(&mut open, &mut skip_depth) {
                    events.push(Event::Close(kind));
                }
            }
            XmlEvent::End(_) => {
                if let Some(kind) = close_element(&mut open, &mut skip_depth) {
                    events.push(Event::Close(kind));
                }
            }
            XmlEvent::Eof => break,
            _ => {}
        }
    }

    if events.is_empty() {
        return Err(DocumentError::Empty);
    }

    Ok(events)
}

fn open_element(
    start: &BytesStart<'_>,
    open: &mut Vec<Option<ElementKind>>,
    skip_depth: &mut usize,
) -> Result<Option<(ElementKind, Attributes)>, DocumentError> {
    let tag = String::from_utf8_lossy(start.name().as_ref()).into_owned();

    if *skip_depth > 0 {
        *skip_depth += 1;
        open.push(None);
        return Ok(None);
    }

    let kind = if open.is_empty() {
        Some(ElementKind::Document)
    } else {
        ElementKind::from_tag(&tag)
    };

    let Some(kind) = kind else {
        warn!("skipping unknown element <{tag}>");
        *skip_depth = 1;
        open.push(None);
        return Ok(None);
    };

    let mut attrs = Attributes::new();
    for attr in start.attributes() {
        let attr = attr?;
        let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
        let value = attr.unescape_value()?;
        attrs.insert(&key, &value);
    }

    open.push(Some(kind));
    Ok(Some((kind, attrs)))
}

fn close_element(
    open: &mut Vec<Option<ElementKind>>,
    skip_depth: &mut usize,
) -> Option<ElementKind> {
    if *skip_depth > 0 {
        *skip_depth -= 1;
    }

    open.pop().flatten()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_xml_nesting() {
        let events = parse_xml(
            r#"<panxml>
                 <enum name="Color"><value name="RED" value="0"/></enum>
                 <struct name="Desc" size="1">
                   <field name="A" start="0" size="1" type="bool"/>
                 </struct>
               </panxml>"#,
        )
        .unwrap();

        let kinds: Vec<_> = events
            .iter()
            .map(|e| match e {
                Event::Open { kind, .. } => (true, *kind),
                Event::Close(kind) => (false, *kind),
            })
            .collect();

        assert_eq!(
            kinds,
            vec![
                (true, ElementKind::Document),
                (true, ElementKind::Enum),
                (true, ElementKind::Value),
                (false, ElementKind::Value),
                (false, ElementKind::Enum),
                (true, ElementKind::Struct),
                (true, ElementKind::Field),
                (false, ElementKind::Field),
                (false, ElementKind::Struct),
                (false, ElementKind::Document),
            ]
        );
    }

    #[test]
    fn test_parse_xml_attributes() {
        let events = parse_xml(r#"<doc><struct name="A &amp; B" size="2"/></doc>"#).unwrap();
        let Event::Open { attrs, .. } = &events[1] else {
            panic!("expected struct open");
        };
        assert_eq!(attrs.get("name"), Some("A & B"));
        assert_eq!(attrs.get("size"), Some("2"));
        assert_eq!(attrs.get("with_opaque"), None);
    }

    #[test]
    fn test_parse_xml_skips_unknown_subtree() {
        let events = parse_xml(
            r#"<doc><import file="x"><struct name="Hidden"/></import><enum name="E"/></doc>"#,
        )
        .unwrap();
        assert_eq!(events.len(), 4);
        assert!(matches!(
            &events[1],
            Event::Open {
                kind: ElementKind::Enum,
                ..
            }
        ));
    }

    #[test]
    fn test_parse_xml_rejects_malformed() {
        assert!(parse_xml("<doc><struct></doc>").is_err());
        assert!(matches!(parse_xml(""), Err(DocumentError::Empty)));
    }

    #[test]
    fn test_require_attribute() {
        let attrs = Attributes::new().with("name", "x");
        assert_eq!(attrs.require(ElementKind::Field, "name"), Ok("x"));
        assert_eq!(
            attrs.require(ElementKind::Field, "start"),
            Err(SchemaError::MissingAttribute {
                element: "field",
                attribute: "start"
            })
        );
    }
}
