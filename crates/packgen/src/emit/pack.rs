//! Pack routines: contract checks and word assembly.
//!
//! Every word of the struct is written exactly once. A word's value is the OR of
//! one term per field touching it; a field that started in an earlier word
//! contributes its packed value shifted right by 32 bits per word crossed. Words
//! no field touches are written as zero. Embedded structs are packed in place by
//! their own routine, or copied from their packed words for the opaque variant.

use log::trace;

use crate::{
    errors::{Error, RepresentError},
    field::{Field, FieldType, Modifier},
    layout::Layout,
    runtime,
    schema::{Group, Variant},
};

use super::{
    holder_bits, holder_name, label_literal, local_range, packed_name, signed_range,
    stored_value, unsigned_max, CodeWriter, EmitContext,
};

/// Emits the `<Name>Packed` words type of `group`.
pub fn emit_packed_type(
    w: &mut CodeWriter,
    _ctx: &EmitContext<'_>,
    group: &Group,
    layout: &Layout,
) -> Result<(), Error> {
    let name = packed_name(&group.name);
    let words = layout.word_count();

    emit!(w, "/// Packed words of `{}`.", group.name);
    emit!(w, "#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]");
    emit!(w, "pub struct {name}(pub [u32; {words}]);");
    emit!(w, "");

    w.open(format_args!("impl {name}"))?;
    emit!(w, "pub const ZERO: Self = {name}([0; {words}]);");
    emit!(w, "");
    emit!(w, "/// Reads the packed words from the start of `cl`.");
    w.open(format_args!("pub fn from_bytes(cl: &[u8]) -> Self"))?;
    emit!(w, "let mut words = [0u32; {words}];");
    w.open(format_args!("for (i, word) in words.iter_mut().enumerate()"))?;
    emit!(w, "*word = read_word(cl, i);");
    w.close("")?;
    emit!(w, "{name}(words)");
    w.close("")?;
    emit!(w, "");
    emit!(w, "/// Copies the packed words to the start of `cl`.");
    w.open(format_args!("pub fn write_to(&self, cl: &mut [u8])"))?;
    w.open(format_args!("for (i, word) in self.0.iter().enumerate()"))?;
    emit!(w, "write_word(cl, i, *word);");
    w.close("")?;
    w.close("")?;
    w.close("")?;
    emit!(w, "");

    w.open(format_args!("impl Default for {name}"))?;
    w.open(format_args!("fn default() -> Self"))?;
    emit!(w, "Self::ZERO");
    w.close("")?;
    w.close("")?;
    emit!(w, "");

    Ok(())
}

/// Emits `validate`, `pack`, `try_pack`, `pack_with`, `packed` and the word
/// assembly of the holder of `variant`.
pub fn emit_pack(
    w: &mut CodeWriter,
    _ctx: &EmitContext<'_>,
    group: &Group,
    layout: &Layout,
    variant: Variant,
) -> Result<(), Error> {
    let name = holder_name(group, variant);

    w.open(format_args!("impl {name}"))?;

    emit!(w, "/// Checks every field against its width, encoding and modifier.");
    w.open(format_args!(
        "pub fn validate(&self) -> Result<(), PackError>"
    ))?;
    for field in group.value_fields() {
        for check in validation(field, variant) {
            emit!(w, "{check}");
        }
    }
    emit!(w, "Ok(())");
    w.close("")?;
    emit!(w, "");

    emit!(w, "/// Packs into the first `LENGTH` bytes of `cl`.");
    emit!(w, "///");
    emit!(w, "/// Debug builds panic on a value [`Self::validate`] rejects; release builds");
    emit!(w, "/// truncate it to its field.");
    w.open(format_args!("pub fn pack(&self, cl: &mut [u8])"))?;
    w.open(format_args!("if cfg!(debug_assertions)"))?;
    w.open(format_args!("if let Err(err) = self.validate()"))?;
    emit!(w, "panic!(\"{name}: {{err}}\");");
    w.close("")?;
    w.close("")?;
    emit!(w, "self.pack_unchecked(cl);");
    w.close("")?;
    emit!(w, "");

    emit!(w, "/// Checked form of [`Self::pack`].");
    w.open(format_args!(
        "pub fn try_pack(&self, cl: &mut [u8]) -> Result<(), PackError>"
    ))?;
    w.open(format_args!("if cl.len() < Self::LENGTH"))?;
    emit!(w, "return Err(PackError::BufferTooSmall {{ needed: Self::LENGTH, got: cl.len() }});");
    w.close("")?;
    emit!(w, "self.validate()?;");
    emit!(w, "self.pack_unchecked(cl);");
    emit!(w, "Ok(())");
    w.close("")?;
    emit!(w, "");

    emit!(w, "/// Starts from [`Self::HEADER`], lets `build` fill in fields and packs the result.");
    w.open(format_args!(
        "pub fn pack_with(cl: &mut [u8], build: impl FnOnce(&mut Self))"
    ))?;
    emit!(w, "let mut value = Self::HEADER;");
    emit!(w, "build(&mut value);");
    emit!(w, "value.pack(cl);");
    w.close("")?;
    emit!(w, "");

    let packed = packed_name(&group.name);
    w.open(format_args!("pub fn packed(&self) -> {packed}"))?;
    emit!(w, "let mut cl = [0u8; {}];", layout.length);
    emit!(w, "self.pack(&mut cl);");
    emit!(w, "{packed}::from_bytes(&cl)");
    w.close("")?;
    emit!(w, "");

    w.open(format_args!("fn pack_unchecked(&self, cl: &mut [u8])"))?;
    if layout.word_count() == 0 {
        emit!(w, "let _ = cl;");
    }

    let mut word = 0;
    while word < layout.word_count() {
        let fields = layout.fields_in_word(word);
        trace!("{}: word {word} from {} fields", group.name, fields.len());

        if let Some(field) = fields
            .iter()
            .map(|&i| &group.fields[i])
            .find(|f| matches!(f.ty, FieldType::Struct(_)))
        {
            let offset = field.start / 8;
            match variant {
                Variant::Plain => {
                    emit!(w, "self.{}.pack_unchecked(&mut cl[{offset}..]);", field.name)
                }
                Variant::Opaque => emit!(w, "self.{}.write_to(&mut cl[{offset}..]);", field.name),
            }
            word = field.last_word() + 1;
            continue;
        }

        if fields.is_empty() {
            emit!(w, "write_word(cl, {word}, 0);");
        } else {
            let terms = fields
                .iter()
                .map(|&i| term(group, &group.fields[i], word))
                .collect::<Result<Vec<_>, _>>()?;
            emit!(w, "let w{word} = {};", terms.join("\n            | "));
            emit!(w, "write_word(cl, {word}, w{word} as u32);");
        }
        word += 1;
    }
    w.close("")?;

    w.close("")?;
    emit!(w, "");

    Ok(())
}

/// Contract checks of one field, as statements.
fn validation(field: &Field, variant: Variant) -> Vec<String> {
    let label = label_literal(field);
    let width = field.width();
    let narrower = width < holder_bits(field);
    let stored = stored_value(field);
    let wide = format!("i128::from(self.{})", field.name);

    let mut checks = Vec::new();
    match field.modifier {
        Some(Modifier::Shr(n)) => checks.push(format!("check_shr({label}, {wide}, {n})?;")),
        Some(Modifier::Minus(k)) => checks.push(format!("check_minus({label}, {wide}, {k})?;")),
        None => {}
    }

    match &field.ty {
        FieldType::Uint | FieldType::Address | FieldType::Enum(_) if narrower => {
            checks.push(format!("check_uint({label}, {stored}, {width})?;"));
        }
        FieldType::Int if narrower || field.modifier.is_some() => {
            checks.push(format!("check_sint({label}, {stored}, {width})?;"));
        }
        FieldType::Padded => checks.push(format!("check_padded({label}, {stored})?;")),
        FieldType::Struct(_) if variant == Variant::Plain => {
            checks.push(format!("self.{}.validate()?;", field.name));
        }
        _ => {}
    }

    checks
}

/// Contribution of `field` to `word`.
fn term(group: &Group, field: &Field, word: usize) -> Result<String, RepresentError> {
    let (start, end) = local_range(field);
    let value = match field.exact {
        Some(exact) => exact_literal(group, field, exact)?,
        None => stored_value(field),
    };

    let packed = match field.ty {
        FieldType::Int => format!("pack_sint({value}, {start}, {end})"),
        FieldType::Padded => format!("pack_padded({value}, {start}, {end})"),
        _ => format!("pack_uint({value}, {start}, {end})"),
    };

    match word - field.first_word() {
        0 => Ok(packed),
        k => Ok(format!("({packed} >> {})", 32 * k)),
    }
}

/// Literal an `exact` field always packs, after checking it fits.
fn exact_literal(group: &Group, field: &Field, value: i64) -> Result<String, RepresentError> {
    let width = field.width();
    let out_of_range = || RepresentError::ExactOutOfRange {
        name: group.name.clone(),
        field: field.label.clone(),
        value,
        width,
    };

    match field.ty {
        FieldType::Int => {
            let (min, max) = signed_range(width);
            if !(min..=max).contains(&i128::from(value)) {
                return Err(out_of_range());
            }
            Ok(format!("({value}i64)"))
        }
        FieldType::Padded => u64::try_from(value)
            .ok()
            .and_then(runtime::encode_padded)
            .map(|_| format!("{value}u64"))
            .ok_or_else(|| RepresentError::NotPadded {
                name: group.name.clone(),
                field: field.label.clone(),
                value,
            }),
        FieldType::Float => Ok(format!("{}u64", (value as f32).to_bits())),
        _ => {
            if !(0..=unsigned_max(width)).contains(&i128::from(value)) {
                return Err(out_of_range());
            }
            Ok(format!("{value}u64"))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::Schema;

    fn emit(group: &Group) -> Result<String, Error> {
        let schema = Schema::new();
        let ctx = EmitContext {
            schema: &schema,
            prefix: "mali",
        };
        let layout = Layout::compute(group, &schema)?;
        let mut w = CodeWriter::new();
        emit_pack(&mut w, &ctx, group, &layout, Variant::Plain)?;
        Ok(w.finish())
    }

    #[test]
    fn test_word_assembly() {
        let mut group = Group::new("Desc");
        group.fields = vec![
            Field::new("A", 0, 1, FieldType::Bool),
            Field::new("B", 1, 8, FieldType::Uint),
            Field::new("Addr", 48, 64, FieldType::Address),
        ];
        group.declared_length = Some(20);
        let out = emit(&group).unwrap();

        assert!(out.contains(
            "let w0 = pack_uint(u64::from(self.a), 0, 0)\n            | pack_uint(u64::from(self.b), 1, 8);"
        ));
        assert!(out.contains("let w1 = pack_uint(u64::from(self.addr), 16, 79);"));
        assert!(out.contains("let w2 = (pack_uint(u64::from(self.addr), 16, 79) >> 32);"));
        assert!(out.contains("let w3 = (pack_uint(u64::from(self.addr), 16, 79) >> 64);"));
        assert!(out.contains("write_word(cl, 4, 0);"));
        assert!(out.contains("check_uint(\"B\", u64::from(self.b), 8)?;"));
        assert!(!out.contains("check_uint(\"Addr\""));
    }

    #[test]
    fn test_modifier_checks() {
        let mut group = Group::new("Desc");
        let mut count = Field::new("Count", 0, 8, FieldType::Uint);
        count.modifier = Some(Modifier::Minus(1));
        let mut offset = Field::new("Offset", 8, 8, FieldType::Int);
        offset.modifier = Some(Modifier::Shr(2));
        let mut scale = Field::new("Scale", 16, 8, FieldType::Padded);
        scale.modifier = Some(Modifier::Shr(4));
        group.fields = vec![count, offset, scale];
        let out = emit(&group).unwrap();

        assert!(out.contains("check_minus(\"Count\", i128::from(self.count), 1)?;"));
        assert!(out.contains("check_uint(\"Count\", u64::from(self.count).wrapping_sub(1), 8)?;"));
        assert!(out.contains("check_shr(\"Offset\", i128::from(self.offset), 2)?;"));
        assert!(out.contains("check_sint(\"Offset\", (i64::from(self.offset) >> 2), 8)?;"));
        assert!(out.contains("check_padded(\"Scale\", (u64::from(self.scale) >> 4))?;"));
        assert!(out.contains("pack_padded((u64::from(self.scale) >> 4), 16, 23)"));
    }

    #[test]
    fn test_signed_minus_checks_lower_bound() {
        let mut group = Group::new("Desc");
        let mut delta = Field::new("Delta", 0, 8, FieldType::Int);
        delta.modifier = Some(Modifier::Minus(4));
        group.fields.push(delta);
        let out = emit(&group).unwrap();

        assert!(out.contains(
            "check_minus(\"Delta\", i128::from(self.delta), 4)?;\n        check_sint(\"Delta\", i64::from(self.delta).wrapping_sub(4), 8)?;"
        ));
    }

    #[test]
    fn test_exact_fields() {
        let mut group = Group::new("Desc");
        let mut tag = Field::new("Tag", 0, 4, FieldType::Uint);
        tag.exact = Some(5);
        let mut bias = Field::new("Bias", 4, 4, FieldType::Int);
        bias.exact = Some(-3);
        group.fields = vec![tag, bias];
        let out = emit(&group).unwrap();

        assert!(out.contains("let w0 = pack_uint(5u64, 0, 3)\n            | pack_sint((-3i64), 4, 7);"));

        group.fields[0].exact = Some(16);
        assert!(matches!(
            emit(&group),
            Err(Error::Represent(RepresentError::ExactOutOfRange { value: 16, width: 4, .. }))
        ));
    }

    #[test]
    fn test_exact_padded_must_encode() {
        let mut group = Group::new("Desc");
        let mut scale = Field::new("Scale", 0, 8, FieldType::Padded);
        scale.exact = Some(17);
        group.fields.push(scale);

        assert!(matches!(
            emit(&group),
            Err(Error::Represent(RepresentError::NotPadded { value: 17, .. }))
        ));
    }

    #[test]
    fn test_embedded_struct() {
        let mut schema = Schema::new();
        let mut inner = Group::new("Inner");
        inner.declared_length = Some(8);
        schema.add_struct(inner).unwrap();

        let mut group = Group::new("Outer");
        group.fields = vec![
            Field::new("Flag", 0, 1, FieldType::Bool),
            Field::new("Inner", 32, 64, FieldType::Struct("Inner".to_string())),
        ];
        let ctx = EmitContext {
            schema: &schema,
            prefix: "mali",
        };
        let layout = Layout::compute(&group, &schema).unwrap();

        let mut w = CodeWriter::new();
        emit_pack(&mut w, &ctx, &group, &layout, Variant::Plain).unwrap();
        emit_pack(&mut w, &ctx, &group, &layout, Variant::Opaque).unwrap();
        let out = w.finish();

        assert!(out.contains("self.inner.validate()?;"));
        assert!(out.contains("self.inner.pack_unchecked(&mut cl[4..]);"));
        assert!(out.contains("self.inner.write_to(&mut cl[4..]);"));
        assert!(!out.contains("write_word(cl, 2"));
    }
}
