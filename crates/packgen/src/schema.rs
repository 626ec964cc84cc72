//! Schema: the structs and enums of one document, in declaration order.
//!
//! A [`Schema`] is normally produced by [`crate::builder::SchemaBuilder`] and is
//! read-only afterwards; layout and emission only borrow it.

use std::collections::BTreeMap;

use crate::{
    errors::SchemaError,
    field::{Field, Value},
    names,
};

/// An output variant requested for a struct. Each variant is emitted by its own call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Variant {
    /// Field-level value holder with pack, unpack and print. Always present.
    Plain,
    /// Holder whose embedded structs are kept as already-packed words.
    Opaque,
}

/// A struct: fields in declaration order plus its length information.
#[derive(Debug, Clone, PartialEq)]
pub struct Group {
    /// Name as written in the document.
    pub name: String,
    /// 0 for a variable-length trailer, 1 for a scalar, more for a fixed array.
    pub count: u32,
    /// Length in bytes from the document's `size` attribute.
    pub declared_length: Option<usize>,
    pub fields: Vec<Field>,
    pub variants: Vec<Variant>,
}

impl Group {
    /// A scalar group with no fields and only the plain variant.
    pub fn new(name: &str) -> Self {
        Group {
            name: name.to_string(),
            count: 1,
            declared_length: None,
            fields: Vec::new(),
            variants: vec![Variant::Plain],
        }
    }

    pub fn type_ident(&self) -> String {
        names::type_ident(&self.name)
    }

    pub fn has_variant(&self, variant: Variant) -> bool {
        self.variants.contains(&variant)
    }

    /// Fields the caller supplies values for, i.e. everything without `exact`.
    pub fn value_fields(&self) -> impl Iterator<Item = &Field> {
        self.fields.iter().filter(|f| f.exact.is_none())
    }
}

/// An enumeration: members in declaration order, looked up by number.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Enum {
    pub name: String,
    pub prefix: Option<String>,
    pub values: Vec<Value>,
}

impl Enum {
    pub fn new(name: &str) -> Self {
        Enum {
            name: name.to_string(),
            prefix: None,
            values: Vec::new(),
        }
    }

    pub fn type_ident(&self) -> String {
        names::type_ident(&self.name)
    }

    /// Constant identifier for one member.
    pub fn member_const(&self, global_prefix: &str, member: &str) -> String {
        names::enum_member(global_prefix, &self.name, self.prefix.as_deref(), member)
    }

    /// Name of the first member declared with `number`.
    pub fn lookup(&self, number: i64) -> Option<&str> {
        self.values
            .iter()
            .find(|v| v.value == number)
            .map(|v| v.name.as_str())
    }
}

/// Position of a declaration in the document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Item {
    Struct(usize),
    Enum(usize),
}

/// All declarations of one document.
#[derive(Debug, Clone, Default)]
pub struct Schema {
    structs: Vec<Group>,
    enums: Vec<Enum>,
    items: Vec<Item>,
    by_name: BTreeMap<String, Item>,
}

impl Schema {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a struct. Struct and enum names share one namespace.
    pub fn add_struct(&mut self, group: Group) -> Result<(), SchemaError> {
        let item = Item::Struct(self.structs.len());
        self.register(&group.name, item)?;
        self.structs.push(group);
        self.items.push(item);
        Ok(())
    }

    /// Appends an enum. Struct and enum names share one namespace.
    pub fn add_enum(&mut self, e: Enum) -> Result<(), SchemaError> {
        let item = Item::Enum(self.enums.len());
        self.register(&e.name, item)?;
        self.enums.push(e);
        self.items.push(item);
        Ok(())
    }

    fn register(&mut self, name: &str, item: Item) -> Result<(), SchemaError> {
        if self.by_name.contains_key(name) {
            return Err(SchemaError::DuplicateName {
                kind: "type",
                name: name.to_string(),
            });
        }
        self.by_name.insert(name.to_string(), item);
        Ok(())
    }

    pub fn structs(&self) -> &[Group] {
        &self.structs
    }

    pub fn enums(&self) -> &[Enum] {
        &self.enums
    }

    /// Declarations in document order.
    pub fn items(&self) -> &[Item] {
        &self.items
    }

    pub fn group(&self, name: &str) -> Option<&Group> {
        match self.by_name.get(name)? {
            Item::Struct(index) => self.structs.get(*index),
            Item::Enum(_) => None,
        }
    }

    pub fn enumeration(&self, name: &str) -> Option<&Enum> {
        match self.by_name.get(name)? {
            Item::Enum(index) => self.enums.get(*index),
            Item::Struct(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn color() -> Enum {
        let mut e = Enum::new("Color");
        for (name, value) in [("RED", 0), ("GREEN", 1), ("BLUE", 2), ("LIME", 1)] {
            e.values.push(Value {
                name: name.to_string(),
                value,
            });
        }
        e
    }

    #[test]
    fn test_enum_lookup() {
        let e = color();
        assert_eq!(e.lookup(1), Some("GREEN"));
        assert_eq!(e.lookup(2), Some("BLUE"));
        assert_eq!(e.lookup(9), None);
        assert_eq!(e.member_const("mali", "GREEN"), "MALI_COLOR_GREEN");
    }

    #[test]
    fn test_schema_lookup() {
        let mut schema = Schema::new();
        schema.add_enum(color()).unwrap();
        schema.add_struct(Group::new("Draw")).unwrap();

        assert!(schema.enumeration("Color").is_some());
        assert!(schema.group("Color").is_none());
        assert!(schema.group("Draw").is_some());
        assert_eq!(schema.items(), &[Item::Enum(0), Item::Struct(0)]);
    }

    #[test]
    fn test_schema_duplicate_names() {
        let mut schema = Schema::new();
        schema.add_struct(Group::new("Draw")).unwrap();
        assert_eq!(
            schema.add_enum(Enum::new("Draw")),
            Err(SchemaError::DuplicateName {
                kind: "type",
                name: "Draw".to_string()
            })
        );
    }
}
