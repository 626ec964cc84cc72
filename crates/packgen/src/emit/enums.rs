//! Enum newtypes, member constants and name tables.
//!
//! An enum is a `u32` newtype rather than a Rust `enum` so that any number read
//! from hardware round-trips, declared or not. Names are looked up through
//! `as_str`, which falls back to [`INVALID_ENUM`](crate::runtime::INVALID_ENUM).

use crate::{errors::Error, schema::Enum};

use super::{CodeWriter, EmitContext};

pub fn emit_enum(w: &mut CodeWriter, ctx: &EmitContext<'_>, e: &Enum) -> Result<(), Error> {
    let name = e.type_ident();

    emit!(w, "/// `{}` enumeration.", e.name);
    emit!(w, "#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]");
    emit!(w, "pub struct {name}(pub u32);");
    emit!(w, "");

    for value in &e.values {
        emit!(
            w,
            "pub const {}: {name} = {name}({});",
            e.member_const(ctx.prefix, &value.name),
            value.value
        );
    }
    if !e.values.is_empty() {
        emit!(w, "");
    }

    w.open(format_args!("impl {name}"))?;
    emit!(w, "/// Declared members in declaration order.");
    emit!(w, "pub const VALUES: &'static [(&'static str, {name})] = &[");
    w.indent();
    for value in &e.values {
        emit!(
            w,
            "({:?}, {}),",
            value.name,
            e.member_const(ctx.prefix, &value.name)
        );
    }
    w.dedent();
    emit!(w, "];");
    emit!(w, "");

    emit!(w, "/// Declared name of the value, the first one declared for duplicates.");
    w.open(format_args!("pub fn as_str(self) -> &'static str"))?;
    w.open(format_args!("match self.0"))?;
    let mut seen = Vec::with_capacity(e.values.len());
    for value in &e.values {
        if seen.contains(&value.value) {
            continue;
        }
        seen.push(value.value);
        emit!(w, "{} => {:?},", value.value, value.name);
    }
    emit!(w, "_ => INVALID_ENUM,");
    w.close("")?;
    w.close("")?;
    w.close("")?;
    emit!(w, "");

    w.open(format_args!("impl fmt::Display for {name}"))?;
    w.open(format_args!(
        "fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result"
    ))?;
    emit!(w, "f.write_str(self.as_str())");
    w.close("")?;
    w.close("")?;
    emit!(w, "");

    Ok(())
}

/// Module-level names `e` defines.
pub fn item_names(ctx: &EmitContext<'_>, e: &Enum) -> Vec<String> {
    let mut items = vec![e.type_ident()];
    items.extend(e.values.iter().map(|v| e.member_const(ctx.prefix, &v.name)));
    items
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{field::Value, schema::Schema};

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
    fn test_emit_enum() {
        let schema = Schema::new();
        let ctx = EmitContext {
            schema: &schema,
            prefix: "mali",
        };
        let mut w = CodeWriter::new();
        emit_enum(&mut w, &ctx, &color()).unwrap();
        let out = w.finish();

        assert!(out.contains("pub struct Color(pub u32);"));
        assert!(out.contains("pub const MALI_COLOR_GREEN: Color = Color(1);"));
        assert!(out.contains("pub const MALI_COLOR_LIME: Color = Color(1);"));
        assert!(out.contains("        (\"LIME\", MALI_COLOR_LIME),\n    ];"));
        assert!(out.contains("1 => \"GREEN\","));
        assert!(!out.contains("1 => \"LIME\","));
        assert!(out.contains("_ => INVALID_ENUM,"));
    }

    #[test]
    fn test_enum_prefix_and_items() {
        let schema = Schema::new();
        let ctx = EmitContext {
            schema: &schema,
            prefix: "mali",
        };
        let mut e = color();
        e.prefix = Some("rgb".to_string());

        assert_eq!(
            item_names(&ctx, &e),
            vec!["Color", "RGB_RED", "RGB_GREEN", "RGB_BLUE", "RGB_LIME"]
        );
    }
}
