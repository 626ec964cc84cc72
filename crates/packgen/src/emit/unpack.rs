//! Unpack routines.
//!
//! Before any field is decoded, each word is compared against the union of the
//! bits its fields claim. Stray bits are reported as warnings and decoding goes
//! on. Words belonging to an embedded struct are checked by that struct's own
//! routine, with word indices kept relative to the outermost buffer.

use crate::{
    errors::Error,
    field::{Field, FieldType, Modifier},
    layout::Layout,
    names,
    schema::{Group, Variant},
};

use super::{holder_name, holder_type, packed_name, CodeWriter, EmitContext};

/// Emits `unpack` and `unpack_into` for the holder of `variant`.
pub fn emit_unpack(
    w: &mut CodeWriter,
    _ctx: &EmitContext<'_>,
    group: &Group,
    layout: &Layout,
    variant: Variant,
) -> Result<(), Error> {
    let name = holder_name(group, variant);

    w.open(format_args!("impl {name}"))?;

    emit!(w, "/// Unpacks the first `LENGTH` bytes of `cl`.");
    emit!(w, "///");
    emit!(w, "/// # Panics");
    emit!(w, "///");
    emit!(w, "/// Panics if `cl` is shorter than `LENGTH`.");
    w.open(format_args!("pub fn unpack(cl: &[u8]) -> Unpacked<Self>"))?;
    emit!(w, "let mut warnings = Vec::new();");
    emit!(w, "let value = Self::unpack_into(cl, 0, &mut warnings);");
    emit!(w, "Unpacked {{ value, warnings }}");
    w.close("")?;
    emit!(w, "");

    w.open(format_args!(
        "fn unpack_into(cl: &[u8], base_word: usize, warnings: &mut Vec<UnpackWarning>) -> Self"
    ))?;
    if layout.word_count() == 0 {
        emit!(w, "let _ = (cl, base_word, warnings);");
    }
    for word in 0..layout.word_count() {
        let embedded = layout
            .fields_in_word(word)
            .iter()
            .any(|&i| matches!(group.fields[i].ty, FieldType::Struct(_)));
        if !embedded {
            emit!(
                w,
                "check_residual(cl, {word}, 0x{:08x}, base_word, warnings);",
                layout.claimed_mask(group, word)
            );
        }
    }

    w.open(format_args!("{name}"))?;
    for field in group.value_fields() {
        emit!(w, "{}: {},", field.name, decode(field, variant));
    }
    w.close("")?;
    w.close("")?;

    w.close("")?;
    emit!(w, "");

    Ok(())
}

/// Expression reading `field` back into its holder type.
fn decode(field: &Field, variant: Variant) -> String {
    let (start, end) = (field.start, field.end);
    let raw = format!("unpack_uint(cl, {start}, {end})");

    match &field.ty {
        FieldType::Bool => format!("{raw} != 0"),
        FieldType::Float => format!("unpack_float(cl, {start})"),
        FieldType::Enum(name) => format!("{}({raw} as u32)", names::type_ident(name)),
        FieldType::Struct(name) => {
            let offset = start / 8;
            match variant {
                Variant::Plain => format!(
                    "{}::unpack_into(&cl[{offset}..], base_word + {}, warnings)",
                    names::type_ident(name),
                    start / 32
                ),
                Variant::Opaque => {
                    format!("{}::from_bytes(&cl[{offset}..])", packed_name(name))
                }
            }
        }
        FieldType::Uint | FieldType::Int | FieldType::Address | FieldType::Padded => {
            let base = match field.ty {
                FieldType::Int => format!("unpack_sint(cl, {start}, {end})"),
                FieldType::Padded => format!("unpack_padded(cl, {start}, {end})"),
                _ => raw,
            };
            let value = match field.modifier {
                Some(Modifier::Shr(n)) => format!("({base} << {n})"),
                Some(Modifier::Minus(k)) => format!("{base}.wrapping_add({k})"),
                None => base,
            };
            match holder_type(field, variant).as_str() {
                narrow @ ("u32" | "i32") => format!("{value} as {narrow}"),
                _ => value,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::Schema;

    #[test]
    fn test_unpack_fields_and_residual_masks() {
        let mut group = Group::new("Desc");
        let mut tag = Field::new("Tag", 9, 3, FieldType::Uint);
        tag.exact = Some(5);
        let mut count = Field::new("Count", 32, 8, FieldType::Uint);
        count.modifier = Some(Modifier::Minus(1));
        group.fields = vec![
            Field::new("A", 0, 1, FieldType::Bool),
            Field::new("B", 1, 8, FieldType::Int),
            tag,
            count,
            Field::new("Mode", 40, 2, FieldType::Enum("Blend Mode".to_string())),
            Field::new("Base", 64, 48, FieldType::Address),
        ];

        let schema = Schema::new();
        let ctx = EmitContext {
            schema: &schema,
            prefix: "mali",
        };
        let layout = Layout::compute(&group, &schema).unwrap();
        let mut w = CodeWriter::new();
        emit_unpack(&mut w, &ctx, &group, &layout, Variant::Plain).unwrap();
        let out = w.finish();

        assert!(out.contains("check_residual(cl, 0, 0x00000fff, base_word, warnings);"));
        assert!(out.contains("check_residual(cl, 1, 0x000003ff, base_word, warnings);"));
        assert!(out.contains("check_residual(cl, 3, 0x0000ffff, base_word, warnings);"));
        assert!(out.contains("a: unpack_uint(cl, 0, 0) != 0,"));
        assert!(out.contains("b: unpack_sint(cl, 1, 8) as i32,"));
        assert!(out.contains("count: unpack_uint(cl, 32, 39).wrapping_add(1) as u32,"));
        assert!(out.contains("mode: BlendMode(unpack_uint(cl, 40, 41) as u32),"));
        assert!(out.contains("base: unpack_uint(cl, 64, 111),"));
        assert!(!out.contains("tag:"));
    }

    #[test]
    fn test_unpack_embedded() {
        let mut schema = Schema::new();
        let mut inner = Group::new("Inner");
        inner.declared_length = Some(4);
        schema.add_struct(inner).unwrap();

        let mut group = Group::new("Outer");
        group.fields = vec![
            Field::new("X", 0, 4, FieldType::Uint),
            Field::new("Inner", 64, 32, FieldType::Struct("Inner".to_string())),
        ];
        let ctx = EmitContext {
            schema: &schema,
            prefix: "mali",
        };
        let layout = Layout::compute(&group, &schema).unwrap();
        let mut w = CodeWriter::new();
        emit_unpack(&mut w, &ctx, &group, &layout, Variant::Plain).unwrap();
        emit_unpack(&mut w, &ctx, &group, &layout, Variant::Opaque).unwrap();
        let out = w.finish();

        assert!(out.contains("check_residual(cl, 1, 0x00000000, base_word, warnings);"));
        assert!(!out.contains("check_residual(cl, 2,"));
        assert!(out.contains("inner: Inner::unpack_into(&cl[8..], base_word + 2, warnings),"));
        assert!(out.contains("inner: InnerPacked::from_bytes(&cl[8..]),"));
    }
}
