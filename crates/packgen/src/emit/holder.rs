//! Value holders, field-local constants and the `HEADER` default of a struct.

use crate::{
    errors::{Error, RepresentError, SchemaError},
    field::{self, Field, FieldDefault, FieldType, Modifier},
    layout::Layout,
    names, runtime,
    schema::{Group, Variant},
};

use super::{holder_bits, holder_name, holder_type, packed_name, signed_range, unsigned_max};
use super::{CodeWriter, EmitContext};

/// Emits the value-holder struct of `variant`, plus the field-local constants
/// and array alias with the plain variant.
pub fn emit_holder(
    w: &mut CodeWriter,
    _ctx: &EmitContext<'_>,
    group: &Group,
    layout: &Layout,
    variant: Variant,
) -> Result<(), Error> {
    let name = holder_name(group, variant);

    match variant {
        Variant::Plain => emit!(w, "/// `{}`, {} bytes packed.", group.name, layout.length),
        Variant::Opaque => emit!(
            w,
            "/// `{}` with embedded structs kept as packed words.",
            group.name
        ),
    }
    emit!(w, "#[derive(Debug, Clone, Copy, PartialEq)]");
    w.open(format_args!("pub struct {name}"))?;
    for field in group.value_fields() {
        emit!(w, "pub {}: {},", field.name, holder_type(field, variant));
    }
    w.close("")?;
    emit!(w, "");

    if variant == Variant::Opaque {
        return Ok(());
    }

    for field in &group.fields {
        for value in &field.values {
            emit!(
                w,
                "pub const {}: {} = {};",
                value_const_name(field, &value.name),
                value_const_type(field, value.value),
                value.value
            );
        }
        if !field.values.is_empty() {
            emit!(w, "");
        }
    }

    match group.count {
        1 => {}
        0 => {
            emit!(w, "// `{name}` is followed by a variable number of entries.");
            emit!(w, "");
        }
        count => {
            emit!(w, "pub type {name}Array = [{name}; {count}];");
            emit!(w, "");
        }
    }

    Ok(())
}

/// Emits `LENGTH`, `HEADER` and `Default` for the holder of `variant`.
pub fn emit_header(
    w: &mut CodeWriter,
    _ctx: &EmitContext<'_>,
    group: &Group,
    layout: &Layout,
    variant: Variant,
) -> Result<(), Error> {
    let name = holder_name(group, variant);

    w.open(format_args!("impl {name}"))?;
    emit!(w, "/// Length of the packed form in bytes.");
    emit!(w, "pub const LENGTH: usize = {};", layout.length);
    emit!(w, "");
    emit!(w, "/// Declared defaults; everything else packs as zero bits.");
    w.open(format_args!("pub const HEADER: Self = {name}"))?;
    for field in group.value_fields() {
        emit!(w, "{}: {},", field.name, default_expr(group, field, variant)?);
    }
    w.close(";")?;
    w.close("")?;
    emit!(w, "");

    w.open(format_args!("impl Default for {name}"))?;
    w.open(format_args!("fn default() -> Self"))?;
    emit!(w, "Self::HEADER");
    w.close("")?;
    w.close("")?;
    emit!(w, "");

    Ok(())
}

/// Module-level names the holder of `group` defines.
pub fn item_names(group: &Group) -> Vec<String> {
    let mut items = vec![group.type_ident(), packed_name(&group.name)];
    if group.has_variant(Variant::Opaque) {
        items.push(holder_name(group, Variant::Opaque));
    }
    if group.count > 1 {
        items.push(format!("{}Array", group.type_ident()));
    }
    for field in &group.fields {
        for value in &field.values {
            items.push(value_const_name(field, &value.name));
        }
    }
    items
}

fn value_const_name(field: &Field, value: &str) -> String {
    names::prefixed_upper(field.prefix.as_deref(), value)
}

/// Holder type when the constant fits it, else `i64`.
fn value_const_type(field: &Field, value: i64) -> String {
    let numeric = matches!(
        field.ty,
        FieldType::Uint | FieldType::Int | FieldType::Address | FieldType::Padded
    );
    if numeric && holder_range(field).contains(&i128::from(value)) {
        holder_type(field, Variant::Plain)
    } else {
        "i64".to_string()
    }
}

fn holder_range(field: &Field) -> std::ops::RangeInclusive<i128> {
    let bits = holder_bits(field);
    if field.ty == FieldType::Int {
        let (min, max) = signed_range(bits);
        min..=max
    } else {
        0..=unsigned_max(bits)
    }
}

/// Holder value whose stored bits are all zero.
fn zero_bits_value(field: &Field) -> i128 {
    let decoded = if field.ty == FieldType::Padded { 1 } else { 0 };
    match field.modifier {
        Some(Modifier::Shr(n)) => decoded << n,
        Some(Modifier::Minus(k)) => decoded + i128::from(k),
        None => decoded,
    }
}

/// Stored bits of `value` once the modifier is applied, if it survives intact.
fn stored(field: &Field, value: i128) -> Option<i128> {
    match field.modifier {
        Some(Modifier::Shr(n)) if value & ((1i128 << n) - 1) == 0 => Some(value >> n),
        Some(Modifier::Minus(k)) if value >= i128::from(k) => Some(value - i128::from(k)),
        Some(_) => None,
        None => Some(value),
    }
}

fn default_expr(group: &Group, field: &Field, variant: Variant) -> Result<String, Error> {
    let invalid = |literal: &str| SchemaError::InvalidDefault {
        field: field.label.clone(),
        default: literal.to_string(),
    };

    let literal = match (&field.ty, &field.default) {
        (FieldType::Struct(name), _) => {
            return Ok(match variant {
                Variant::Plain => format!("{}::HEADER", names::type_ident(name)),
                Variant::Opaque => format!("{}::ZERO", packed_name(name)),
            });
        }
        (_, Some(FieldDefault::EnumMember(member))) => return Ok(member.clone()),
        (_, Some(FieldDefault::Literal(literal))) => literal,
        (FieldType::Bool, None) => return Ok("false".to_string()),
        (FieldType::Float, None) => return Ok("0.0".to_string()),
        (FieldType::Enum(name), None) => return Ok(format!("{}(0)", names::type_ident(name))),
        (_, None) => {
            let value = zero_bits_value(field);
            if !holder_range(field).contains(&value) {
                return Err(RepresentError::DefaultOutOfRange {
                    name: group.name.clone(),
                    field: field.label.clone(),
                    value: value as i64,
                    width: holder_bits(field),
                }
                .into());
            }
            return Ok(value.to_string());
        }
    };

    match &field.ty {
        FieldType::Bool => match literal.as_str() {
            "true" | "1" => Ok("true".to_string()),
            "false" | "0" => Ok("false".to_string()),
            _ => Err(invalid(literal).into()),
        },
        FieldType::Float => match literal.parse::<f32>() {
            Ok(value) if value.is_finite() => Ok(format!("{value:?}")),
            _ => Err(invalid(literal).into()),
        },
        FieldType::Enum(name) => {
            let value = field::parse_int(literal)?;
            u32::try_from(value)
                .map(|v| format!("{}({v})", names::type_ident(name)))
                .map_err(|_| invalid(literal).into())
        }
        _ => {
            let value = field::parse_int(literal)?;
            check_default(group, field, value)?;
            Ok(value.to_string())
        }
    }
}

fn check_default(group: &Group, field: &Field, value: i64) -> Result<(), RepresentError> {
    let out_of_range = |width| RepresentError::DefaultOutOfRange {
        name: group.name.clone(),
        field: field.label.clone(),
        value,
        width,
    };

    let wide = i128::from(value);
    if !holder_range(field).contains(&wide) {
        return Err(out_of_range(holder_bits(field)));
    }

    let width = field.width();
    let bits = stored(field, wide).ok_or_else(|| out_of_range(width))?;

    let fits = match field.ty {
        FieldType::Int => {
            let (min, max) = signed_range(width);
            (min..=max).contains(&bits)
        }
        FieldType::Padded => {
            return match u64::try_from(bits).ok().and_then(runtime::encode_padded) {
                Some(_) => Ok(()),
                None => Err(RepresentError::NotPadded {
                    name: group.name.clone(),
                    field: field.label.clone(),
                    value,
                }),
            };
        }
        _ => (0..=unsigned_max(width)).contains(&bits),
    };

    if fits { Ok(()) } else { Err(out_of_range(width)) }
}
