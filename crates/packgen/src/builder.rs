//! Builds a [`Schema`] from the element stream of a document.
//!
//! The builder keeps an explicit stack of open elements: [`SchemaBuilder::open`]
//! pushes one, [`SchemaBuilder::close`] pops and finalizes it into its parent.
//! Attributes are parsed as soon as an element opens, but field types are only
//! resolved in [`SchemaBuilder::finish`], once every struct and enum of the
//! document is known. Forward references therefore resolve, and an unknown type
//! name is reported instead of silently treated as something else.

use log::trace;

use crate::{
    document::{Attributes, ElementKind, Event},
    errors::SchemaError,
    field::{self, Field, FieldDefault, FieldType, Modifier, Value},
    names,
    schema::{Enum, Group, Schema, Variant},
};

/// A field as declared, before its type is resolved.
#[derive(Debug, Clone)]
struct FieldDecl {
    label: String,
    start: u32,
    width: u32,
    type_name: String,
    prefix: Option<String>,
    exact: Option<i64>,
    default: Option<String>,
    modifier: Option<Modifier>,
    values: Vec<Value>,
}

#[derive(Debug, Clone)]
struct StructDecl {
    name: String,
    declared_length: Option<usize>,
    opaque: bool,
    fields: Vec<FieldDecl>,
}

#[derive(Debug, Clone)]
enum Decl {
    Struct(StructDecl),
    Enum(Enum),
}

/// An element that has been opened but not closed yet.
#[derive(Debug, Clone)]
enum Open {
    Document,
    Struct(StructDecl),
    Field(FieldDecl),
    Enum(Enum),
    Value(Value),
}

impl Open {
    fn kind(&self) -> ElementKind {
        match self {
            Open::Document => ElementKind::Document,
            Open::Struct(_) => ElementKind::Struct,
            Open::Field(_) => ElementKind::Field,
            Open::Enum(_) => ElementKind::Enum,
            Open::Value(_) => ElementKind::Value,
        }
    }
}

/// Incrementally builds a [`Schema`] from [`Event`]s.
#[derive(Debug)]
pub struct SchemaBuilder {
    prefix: String,
    stack: Vec<Open>,
    decls: Vec<Decl>,
    seen_document: bool,
}

impl SchemaBuilder {
    /// `prefix` is the global prefix enum member constants are named with.
    pub fn new(prefix: &str) -> Self {
        SchemaBuilder {
            prefix: prefix.to_string(),
            stack: Vec::new(),
            decls: Vec::new(),
            seen_document: false,
        }
    }

    /// Feeds a whole event stream and resolves the result.
    pub fn build<I>(prefix: &str, events: I) -> Result<Schema, SchemaError>
    where
        I: IntoIterator<Item = Event>,
    {
        let mut builder = SchemaBuilder::new(prefix);
        for event in events {
            match event {
                Event::Open { kind, attrs } => builder.open(kind, &attrs)?,
                Event::Close(kind) => builder.close(kind)?,
            }
        }
        builder.finish()
    }

    /// Opens an element nested in the current one.
    pub fn open(&mut self, kind: ElementKind, attrs: &Attributes) -> Result<(), SchemaError> {
        let parent = self.stack.last().map(Open::kind);
        let allowed = match kind {
            ElementKind::Document => parent.is_none() && !self.seen_document,
            ElementKind::Struct => parent == Some(ElementKind::Document),
            ElementKind::Field => parent == Some(ElementKind::Struct),
            ElementKind::Enum => matches!(
                parent,
                Some(ElementKind::Document) | Some(ElementKind::Struct)
            ),
            ElementKind::Value => {
                matches!(parent, Some(ElementKind::Enum) | Some(ElementKind::Field))
            }
        };

        if !allowed {
            return Err(SchemaError::UnexpectedElement {
                element: kind.tag(),
                parent: parent.map_or("document", ElementKind::tag),
            });
        }

        let open = match kind {
            ElementKind::Document => {
                self.seen_document = true;
                Open::Document
            }
            ElementKind::Struct => Open::Struct(parse_struct(attrs)?),
            ElementKind::Field => Open::Field(parse_field(attrs)?),
            ElementKind::Enum => {
                let mut e = Enum::new(attrs.require(kind, "name")?);
                e.prefix = attrs.get("prefix").map(str::to_string);
                Open::Enum(e)
            }
            ElementKind::Value => Open::Value(Value {
                name: attrs.require(kind, "name")?.to_string(),
                value: field::parse_int(attrs.require(kind, "value")?)?,
            }),
        };

        self.stack.push(open);
        Ok(())
    }

    /// Closes the innermost element and hands it to its parent.
    pub fn close(&mut self, kind: ElementKind) -> Result<(), SchemaError> {
        let unbalanced = SchemaError::UnbalancedElement {
            element: kind.tag(),
        };

        let open = match self.stack.pop() {
            Some(open) if open.kind() == kind => open,
            _ => return Err(unbalanced),
        };

        match (open, self.stack.last_mut()) {
            (Open::Document, None) => {}
            (Open::Struct(decl), Some(Open::Document)) => {
                trace!("closed struct `{}` with {} fields", decl.name, decl.fields.len());
                self.decls.push(Decl::Struct(decl));
            }
            (Open::Field(decl), Some(Open::Struct(parent))) => parent.fields.push(decl),
            (Open::Enum(e), Some(_)) => self.decls.push(Decl::Enum(e)),
            (Open::Value(value), Some(Open::Enum(parent))) => parent.values.push(value),
            (Open::Value(value), Some(Open::Field(parent))) => parent.values.push(value),
            _ => return Err(unbalanced),
        }

        Ok(())
    }

    /// Resolves every field type against all declarations and returns the schema.
    pub fn finish(self) -> Result<Schema, SchemaError> {
        if let Some(open) = self.stack.last() {
            return Err(SchemaError::UnbalancedElement {
                element: open.kind().tag(),
            });
        }

        let enum_named = |name: &str| {
            self.decls.iter().find_map(|d| match d {
                Decl::Enum(e) if e.name == name => Some(e),
                _ => None,
            })
        };
        let is_struct = |name: &str| {
            self.decls
                .iter()
                .any(|d| matches!(d, Decl::Struct(s) if s.name == name))
        };

        let mut schema = Schema::new();

        for decl in &self.decls {
            match decl {
                Decl::Enum(e) => {
                    check_enum(e)?;
                    schema.add_enum(e.clone())?;
                }
                Decl::Struct(decl) => {
                    let mut group = Group::new(&decl.name);
                    group.declared_length = decl.declared_length;
                    if decl.opaque {
                        group.variants.push(Variant::Opaque);
                    }

                    for f in &decl.fields {
                        let ty = if let Some(ty) = FieldType::primitive(&f.type_name) {
                            ty
                        } else if enum_named(&f.type_name).is_some() {
                            FieldType::Enum(f.type_name.clone())
                        } else if is_struct(&f.type_name) {
                            FieldType::Struct(f.type_name.clone())
                        } else {
                            return Err(SchemaError::UnknownType {
                                field: f.label.clone(),
                                type_name: f.type_name.clone(),
                            });
                        };

                        let default = match (&ty, &f.default) {
                            (_, None) => None,
                            (FieldType::Enum(name), Some(member)) => {
                                let e = enum_named(name).ok_or_else(|| SchemaError::UnknownType {
                                    field: f.label.clone(),
                                    type_name: name.clone(),
                                })?;
                                if !e.values.iter().any(|v| &v.name == member) {
                                    return Err(SchemaError::InvalidDefault {
                                        field: f.label.clone(),
                                        default: member.clone(),
                                    });
                                }
                                Some(FieldDefault::EnumMember(
                                    e.member_const(&self.prefix, member),
                                ))
                            }
                            (FieldType::Struct(_), Some(default)) => {
                                return Err(SchemaError::InvalidDefault {
                                    field: f.label.clone(),
                                    default: default.clone(),
                                });
                            }
                            (_, Some(literal)) => Some(FieldDefault::Literal(literal.clone())),
                        };

                        let field = resolve_field(f, ty, default)?;

                        if field.exact.is_none()
                            && group
                                .value_fields()
                                .any(|other| other.name == field.name)
                        {
                            return Err(SchemaError::DuplicateName {
                                kind: "field",
                                name: field.label,
                            });
                        }

                        group.fields.push(field);
                    }

                    schema.add_struct(group)?;
                }
            }
        }

        Ok(schema)
    }
}

fn parse_struct(attrs: &Attributes) -> Result<StructDecl, SchemaError> {
    let name = attrs.require(ElementKind::Struct, "name")?.to_string();

    let declared_length = match attrs.get("size") {
        Some(words) => {
            let words = field::parse_int(words)?;
            let words = usize::try_from(words).map_err(|_| SchemaError::InvalidInteger {
                literal: words.to_string(),
            })?;
            Some(words * 4)
        }
        None => None,
    };

    let opaque = matches!(attrs.get("with_opaque"), Some("true") | Some("1"));

    Ok(StructDecl {
        name,
        declared_length,
        opaque,
        fields: Vec::new(),
    })
}

fn parse_field(attrs: &Attributes) -> Result<FieldDecl, SchemaError> {
    let kind = ElementKind::Field;
    let label = attrs.require(kind, "name")?.to_string();
    let start = field::parse_start(attrs.require(kind, "start")?)?;

    let width = field::parse_int(attrs.require(kind, "size")?)?;
    let width = u32::try_from(width)
        .ok()
        .filter(|w| *w > 0 && start.checked_add(*w).is_some())
        .ok_or_else(|| SchemaError::InvalidWidth {
            field: label.clone(),
            width: width.clamp(0, u32::MAX as i64) as u32,
        })?;

    let exact = attrs.get("exact").map(field::parse_int).transpose()?;
    let modifier = attrs
        .get("modifier")
        .map(|m| Modifier::parse(&label, m))
        .transpose()?;

    if exact.is_some() && modifier.is_some() {
        return Err(SchemaError::ExactWithModifier { field: label });
    }

    Ok(FieldDecl {
        type_name: attrs.require(kind, "type")?.to_string(),
        prefix: attrs.get("prefix").map(str::to_string),
        default: attrs.get("default").map(str::to_string),
        label,
        start,
        width,
        exact,
        modifier,
        values: Vec::new(),
    })
}

/// Checks the per-type constraints that need the resolved type.
fn resolve_field(
    decl: &FieldDecl,
    ty: FieldType,
    default: Option<FieldDefault>,
) -> Result<Field, SchemaError> {
    let is_struct = matches!(ty, FieldType::Struct(_));

    if ty == FieldType::Bool && decl.width != 1 {
        return Err(SchemaError::BoolWidth {
            field: decl.label.clone(),
            width: decl.width,
        });
    }

    if !is_struct && decl.width > 64 {
        return Err(SchemaError::InvalidWidth {
            field: decl.label.clone(),
            width: decl.width,
        });
    }

    if decl.modifier.is_some()
        && !matches!(
            ty,
            FieldType::Uint | FieldType::Int | FieldType::Address | FieldType::Padded
        )
    {
        return Err(SchemaError::ModifierNotSupported {
            field: decl.label.clone(),
            type_name: ty.name().to_string(),
        });
    }

    if is_struct && decl.exact.is_some() {
        return Err(SchemaError::InvalidDefault {
            field: decl.label.clone(),
            default: "exact".to_string(),
        });
    }

    let mut field = Field::new(&decl.label, decl.start, decl.width, ty);
    field.prefix = decl.prefix.as_deref().map(names::safe_name);
    field.exact = decl.exact;
    field.default = default;
    field.modifier = decl.modifier;
    field.values = decl.values.clone();
    Ok(field)
}

fn check_enum(e: &Enum) -> Result<(), SchemaError> {
    let mut seen: Vec<&str> = Vec::with_capacity(e.values.len());

    for value in &e.values {
        if u32::try_from(value.value).is_err() {
            return Err(SchemaError::EnumValueRange {
                enum_name: e.name.clone(),
                value: value.value,
            });
        }
        if seen.contains(&value.name.as_str()) {
            return Err(SchemaError::DuplicateName {
                kind: "enum value",
                name: value.name.clone(),
            });
        }
        seen.push(&value.name);
    }

    Ok(())
}
