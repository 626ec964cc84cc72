//! Error types for document loading, schema building, layout and emission.
//!
//! Every stage has its own enum so callers can tell a malformed document from a
//! schema that parses but cannot be laid out. [`Error`] wraps them all and is what
//! the public entry points return. Any error aborts the whole generation run.

use thiserror::Error;

/// Errors produced while turning a document's text into an element stream.
#[derive(Error, Debug)]
pub enum DocumentError {
    /// The XML reader rejected the input.
    #[error("malformed XML document: {0}")]
    Xml(#[from] quick_xml::Error),
    /// An attribute could not be read or unescaped.
    #[error("malformed attribute: {0}")]
    Attribute(#[from] quick_xml::events::attributes::AttrError),
    /// The document contains no element at all.
    #[error("document has no root element")]
    Empty,
    /// The JSON form of the document does not have the expected shape.
    #[cfg(feature = "serde")]
    #[error("malformed JSON document: {0}")]
    Json(#[from] serde_json::Error),
}

/// Structural problems in the schema itself.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SchemaError {
    /// A required attribute is absent.
    #[error("<{element}> is missing required attribute `{attribute}`")]
    MissingAttribute {
        element: &'static str,
        attribute: &'static str,
    },
    /// Integer literal is not decimal or `0x` hexadecimal, or has a leading zero.
    #[error("invalid integer literal `{literal}`")]
    InvalidInteger { literal: String },
    /// `start` is neither a bit number nor a `word:bit` pair.
    #[error("invalid start `{literal}`")]
    InvalidStart { literal: String },
    /// Field type names no primitive, enum or struct.
    #[error("field `{field}` has unknown type `{type_name}`")]
    UnknownType { field: String, type_name: String },
    /// Modifier is not `shr(n)` or `minus(k)`.
    #[error("field `{field}` has invalid modifier `{modifier}`")]
    InvalidModifier { field: String, modifier: String },
    /// A modifier was given on a type it cannot transform.
    #[error("field `{field}` of type `{type_name}` cannot take a modifier")]
    ModifierNotSupported { field: String, type_name: String },
    /// `exact` and `modifier` are mutually exclusive.
    #[error("field `{field}` has both `exact` and `modifier`")]
    ExactWithModifier { field: String },
    /// Element appears somewhere it cannot be nested.
    #[error("<{element}> cannot appear inside <{parent}>")]
    UnexpectedElement {
        element: &'static str,
        parent: &'static str,
    },
    /// A close does not match the innermost open element.
    #[error("unbalanced </{element}>")]
    UnbalancedElement { element: &'static str },
    /// Two structs, two enums, or two fields of one struct share a name.
    #[error("duplicate {kind} `{name}`")]
    DuplicateName { kind: &'static str, name: String },
    /// Bool fields are exactly one bit wide.
    #[error("field `{field}` has bool type but is {width} bits wide")]
    BoolWidth { field: String, width: u32 },
    /// Field width is zero or larger than 64 bits.
    #[error("field `{field}` has unsupported width {width}")]
    InvalidWidth { field: String, width: u32 },
    /// Default value cannot be read for the field's type.
    #[error("field `{field}` has invalid default `{default}`")]
    InvalidDefault { field: String, default: String },
    /// Enum member value does not fit the 32-bit enum representation.
    #[error("enum `{enum_name}` value `{value}` does not fit in 32 bits")]
    EnumValueRange { enum_name: String, value: i64 },
}

/// Problems found when mapping a struct's fields onto words.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LayoutError {
    /// The declared size cannot hold the fields.
    #[error("struct `{name}` declares {declared} bytes but its fields need {required}")]
    LengthTooSmall {
        name: String,
        declared: usize,
        required: usize,
    },
    /// Two fields claim the same bit.
    #[error("struct `{name}`: fields `{first}` and `{second}` overlap")]
    Overlap {
        name: String,
        first: String,
        second: String,
    },
    /// Embedded structs start on a word boundary.
    #[error("struct `{name}`: embedded field `{field}` does not start on a word boundary")]
    UnalignedStruct { name: String, field: String },
    /// Embedded struct field width differs from the embedded struct's length.
    #[error("struct `{name}`: embedded field `{field}` is {width} bits but `{type_name}` is {expected}")]
    StructSize {
        name: String,
        field: String,
        type_name: String,
        width: u32,
        expected: u32,
    },
    /// Floats always occupy bits 0..=31 of one word.
    #[error("struct `{name}`: float field `{field}` does not span a whole word")]
    FloatPlacement { name: String, field: String },
    /// Padded encodings are exactly eight bits.
    #[error("struct `{name}`: padded field `{field}` is {width} bits wide, expected 8")]
    PaddedWidth {
        name: String,
        field: String,
        width: u32,
    },
    /// A struct contains itself, directly or through other structs.
    #[error("struct `{name}` embeds itself")]
    RecursiveEmbedding { name: String },
}

/// A constant in the schema cannot be expressed in its field.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RepresentError {
    /// `exact` value is outside the field's range.
    #[error("struct `{name}`: exact value {value} does not fit field `{field}` ({width} bits)")]
    ExactOutOfRange {
        name: String,
        field: String,
        value: i64,
        width: u32,
    },
    /// Padded constant is not of the form `(2 * odd + 1) << shift` with `odd <= 7`.
    #[error("struct `{name}`: {value} is not representable in padded field `{field}`")]
    NotPadded {
        name: String,
        field: String,
        value: i64,
    },
    /// Default value is outside the field's range.
    #[error("struct `{name}`: default {value} does not fit field `{field}` ({width} bits)")]
    DefaultOutOfRange {
        name: String,
        field: String,
        value: i64,
        width: u32,
    },
}

/// Top-level error returned by the generator.
#[derive(Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Document(#[from] DocumentError),
    #[error(transparent)]
    Schema(#[from] SchemaError),
    #[error(transparent)]
    Layout(#[from] LayoutError),
    #[error(transparent)]
    Represent(#[from] RepresentError),
    /// Writing into the output buffer failed.
    #[error("formatting generated code failed")]
    Fmt(#[from] std::fmt::Error),
}
