//! JSON form of a schema document.
//!
//! The JSON form mirrors the XML one element for element: every element has a
//! kind, a flat attribute map and children. Attribute values may be written as
//! strings, integers or booleans; they are read back exactly as the XML loader
//! would see them.
//!
//! ```json
//! {
//!   "children": [
//!     { "kind": "struct", "attrs": { "name": "Desc", "size": 1 }, "children": [
//!       { "kind": "field", "attrs": { "name": "A", "start": 0, "size": 1, "type": "bool" } }
//!     ] }
//!   ]
//! }
//! ```

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::{
    document::{Attributes, ElementKind, Event},
    errors::DocumentError,
};

/// Kind of a nested element.
#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ElementKindDef {
    Struct,
    Field,
    Enum,
    Value,
}

/// An attribute value as written in JSON.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(untagged)]
pub enum AttrValueDef {
    Text(String),
    Integer(i64),
    Flag(bool),
}

/// Top-level document: the root element's attributes and its children.
#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct DocumentDef {
    #[serde(default)]
    pub attrs: BTreeMap<String, AttrValueDef>,
    #[serde(default)]
    pub children: Vec<ElementDef>,
}

/// One element below the root.
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ElementDef {
    pub kind: ElementKindDef,
    #[serde(default)]
    pub attrs: BTreeMap<String, AttrValueDef>,
    #[serde(default)]
    pub children: Vec<ElementDef>,
}

impl From<ElementKindDef> for ElementKind {
    fn from(value: ElementKindDef) -> Self {
        match value {
            ElementKindDef::Struct => ElementKind::Struct,
            ElementKindDef::Field => ElementKind::Field,
            ElementKindDef::Enum => ElementKind::Enum,
            ElementKindDef::Value => ElementKind::Value,
        }
    }
}

impl AttrValueDef {
    /// The value as the XML loader would have read it.
    pub fn to_text(&self) -> String {
        match self {
            AttrValueDef::Text(text) => text.clone(),
            AttrValueDef::Integer(n) => n.to_string(),
            AttrValueDef::Flag(b) => b.to_string(),
        }
    }
}

fn attributes(attrs: &BTreeMap<String, AttrValueDef>) -> Attributes {
    attrs
        .iter()
        .map(|(key, value)| (key.clone(), value.to_text()))
        .collect()
}

impl DocumentDef {
    /// Lowers the document to the event stream the XML loader would produce.
    pub fn into_events(self) -> Vec<Event> {
        let mut events = vec![Event::Open {
            kind: ElementKind::Document,
            attrs: attributes(&self.attrs),
        }];
        for child in &self.children {
            child.lower(&mut events);
        }
        events.push(Event::Close(ElementKind::Document));
        events
    }
}

impl ElementDef {
    fn lower(&self, events: &mut Vec<Event>) {
        let kind = ElementKind::from(self.kind);
        events.push(Event::Open {
            kind,
            attrs: attributes(&self.attrs),
        });
        for child in &self.children {
            child.lower(events);
        }
        events.push(Event::Close(kind));
    }
}

/// Reads the JSON form of a document into an event stream.
pub fn parse_json(text: &str) -> Result<Vec<Event>, DocumentError> {
    let document: DocumentDef = serde_json::from_str(text)?;
    Ok(document.into_events())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::parse_xml;

    #[test]
    fn test_json_matches_xml() {
        let json = r#"{
            "children": [
                { "kind": "enum", "attrs": { "name": "Color" }, "children": [
                    { "kind": "value", "attrs": { "name": "RED", "value": 0 } }
                ] },
                { "kind": "struct", "attrs": { "name": "Desc", "size": 1, "with_opaque": true }, "children": [
                    { "kind": "field", "attrs": { "name": "A", "start": "0", "size": 1, "type": "bool" } }
                ] }
            ]
        }"#;
        let xml = r#"<doc>
            <enum name="Color"><value name="RED" value="0"/></enum>
            <struct name="Desc" size="1" with_opaque="true">
              <field name="A" start="0" size="1" type="bool"/>
            </struct>
          </doc>"#;

        assert_eq!(parse_json(json).unwrap(), parse_xml(xml).unwrap());
    }

    #[test]
    fn test_json_rejects_unknown_kind() {
        let json = r#"{ "children": [ { "kind": "import" } ] }"#;
        assert!(matches!(parse_json(json), Err(DocumentError::Json(_))));
    }
}
