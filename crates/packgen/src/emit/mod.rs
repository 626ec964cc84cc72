//! Rust source emission.
//!
//! Each submodule writes one kind of item into a [`CodeWriter`]: value holders
//! and their defaults ([`holder`]), pack routines ([`pack`]), unpack routines
//! ([`unpack`]), printers ([`print`]) and enum tables ([`enums`]). All of them
//! read the same [`Layout`](crate::layout::Layout) so the routines they produce
//! agree bit for bit.

use std::fmt::{self, Write};

use crate::{
    field::{Field, FieldType, Modifier},
    names,
    schema::{Group, Schema, Variant},
};

/// Writes one indented line, formatted like `format!`.
macro_rules! emit {
    ($w:expr, $($arg:tt)*) => {
        $w.line(format_args!($($arg)*))?
    };
}

pub mod enums;
pub mod holder;
pub mod pack;
pub mod print;
pub mod unpack;

const INDENT: &str = "    ";

/// Accumulates generated source with block indentation.
#[derive(Debug, Default)]
pub struct CodeWriter {
    out: String,
    depth: usize,
}

impl CodeWriter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Writes `args` on its own line at the current depth. Empty lines carry no
    /// indentation.
    pub fn line(&mut self, args: fmt::Arguments<'_>) -> fmt::Result {
        if args.as_str() != Some("") {
            for _ in 0..self.depth {
                self.out.push_str(INDENT);
            }
        }
        self.out.write_fmt(args)?;
        self.out.push('\n');
        Ok(())
    }

    /// Copies `text` unchanged.
    pub fn raw(&mut self, text: &str) {
        self.out.push_str(text);
    }

    pub fn indent(&mut self) {
        self.depth += 1;
    }

    pub fn dedent(&mut self) {
        self.depth = self.depth.saturating_sub(1);
    }

    /// Writes `header` and opens a `{` block.
    pub fn open(&mut self, header: fmt::Arguments<'_>) -> fmt::Result {
        self.line(format_args!("{header} {{"))?;
        self.indent();
        Ok(())
    }

    /// Closes the innermost block with `}` followed by `suffix`.
    pub fn close(&mut self, suffix: &str) -> fmt::Result {
        self.dedent();
        self.line(format_args!("}}{suffix}"))
    }

    pub fn finish(self) -> String {
        self.out
    }
}

/// What every emitter needs besides the item it emits.
#[derive(Debug, Clone, Copy)]
pub struct EmitContext<'a> {
    pub schema: &'a Schema,
    /// Global prefix of enum member constants.
    pub prefix: &'a str,
}

/// Type name of the value holder for `variant`.
pub fn holder_name(group: &Group, variant: Variant) -> String {
    match variant {
        Variant::Plain => group.type_ident(),
        Variant::Opaque => format!("{}Opaque", group.type_ident()),
    }
}

/// Type name of the packed-words form of a struct.
pub fn packed_name(type_name: &str) -> String {
    format!("{}Packed", names::type_ident(type_name))
}

/// Bits of the integer a numeric field is held in.
pub fn holder_bits(field: &Field) -> u32 {
    match field.ty {
        FieldType::Uint | FieldType::Int if field.width() <= 32 => 32,
        FieldType::Enum(_) => 32,
        FieldType::Bool => 1,
        _ => 64,
    }
}

/// Rust type of `field` in the value holder of `variant`.
pub fn holder_type(field: &Field, variant: Variant) -> String {
    match &field.ty {
        FieldType::Uint if field.width() <= 32 => "u32".to_string(),
        FieldType::Uint | FieldType::Address | FieldType::Padded => "u64".to_string(),
        FieldType::Int if field.width() <= 32 => "i32".to_string(),
        FieldType::Int => "i64".to_string(),
        FieldType::Bool => "bool".to_string(),
        FieldType::Float => "f32".to_string(),
        FieldType::Enum(name) => names::type_ident(name),
        FieldType::Struct(name) => match variant {
            Variant::Plain => names::type_ident(name),
            Variant::Opaque => packed_name(name),
        },
    }
}

/// Debug-quoted label, usable as a string literal in generated code.
pub fn label_literal(field: &Field) -> String {
    format!("{:?}", field.label)
}

/// Expression widening the holder field to `u64`, or `i64` for signed fields.
pub fn widened(field: &Field) -> String {
    match field.ty {
        FieldType::Int => format!("i64::from(self.{})", field.name),
        FieldType::Enum(_) => format!("u64::from(self.{}.0)", field.name),
        FieldType::Float => format!("u64::from(self.{}.to_bits())", field.name),
        _ => format!("u64::from(self.{})", field.name),
    }
}

/// Expression of the value actually stored in the bits, modifier applied.
pub fn stored_value(field: &Field) -> String {
    let value = widened(field);
    match field.modifier {
        Some(Modifier::Shr(n)) => format!("({value} >> {n})"),
        Some(Modifier::Minus(k)) => format!("{value}.wrapping_sub({k})"),
        None => value,
    }
}

/// Start and end of `field` relative to the first word it touches.
pub fn local_range(field: &Field) -> (u32, u32) {
    let base = field.first_word() as u32 * 32;
    (field.start - base, field.end - base)
}

pub fn unsigned_max(bits: u32) -> i128 {
    (1i128 << bits) - 1
}

/// Lowest and highest value a `bits`-wide two's complement field holds.
pub fn signed_range(bits: u32) -> (i128, i128) {
    (-(1i128 << (bits - 1)), (1i128 << (bits - 1)) - 1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_code_writer_blocks() -> fmt::Result {
        let mut w = CodeWriter::new();
        w.open(format_args!("impl Foo"))?;
        emit!(w, "pub const X: u32 = {};", 3);
        emit!(w, "");
        w.close("")?;

        assert_eq!(w.finish(), "impl Foo {\n    pub const X: u32 = 3;\n\n}\n");
        Ok(())
    }

    #[test]
    fn test_holder_types() {
        let narrow = Field::new("n", 0, 32, FieldType::Uint);
        let wide = Field::new("w", 0, 33, FieldType::Uint);
        let int = Field::new("i", 0, 40, FieldType::Int);
        let inner = Field::new("s", 0, 32, FieldType::Struct("Inner State".to_string()));

        assert_eq!(holder_type(&narrow, Variant::Plain), "u32");
        assert_eq!(holder_type(&wide, Variant::Plain), "u64");
        assert_eq!(holder_type(&int, Variant::Plain), "i64");
        assert_eq!(holder_type(&inner, Variant::Plain), "InnerState");
        assert_eq!(holder_type(&inner, Variant::Opaque), "InnerStatePacked");
        assert_eq!(holder_bits(&narrow), 32);
        assert_eq!(holder_bits(&wide), 64);
    }

    #[test]
    fn test_stored_value() {
        let mut field = Field::new("Count", 0, 8, FieldType::Uint);
        assert_eq!(stored_value(&field), "u64::from(self.count)");

        field.modifier = Some(Modifier::Minus(1));
        assert_eq!(stored_value(&field), "u64::from(self.count).wrapping_sub(1)");

        field.modifier = Some(Modifier::Shr(4));
        assert_eq!(stored_value(&field), "(u64::from(self.count) >> 4)");
    }

    #[test]
    fn test_local_range() {
        let field = Field::new("x", 40, 8, FieldType::Uint);
        assert_eq!(local_range(&field), (8, 15));
    }
}
