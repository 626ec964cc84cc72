//! Human-readable printers.

use crate::{
    errors::Error,
    field::{Field, FieldType},
    schema::{Group, Variant},
};

use super::{holder_name, label_literal, CodeWriter, EmitContext};

/// Emits `print` for the plain holder of `group`.
pub fn emit_print(w: &mut CodeWriter, _ctx: &EmitContext<'_>, group: &Group) -> Result<(), Error> {
    let name = holder_name(group, Variant::Plain);

    w.open(format_args!("impl {name}"))?;
    emit!(w, "/// Writes one `label: value` line per field, starting `indent` columns in.");
    emit!(w, "/// Embedded structs follow their label, two columns further in.");
    w.open(format_args!(
        "pub fn print(&self, fp: &mut dyn Write, indent: usize) -> io::Result<()>"
    ))?;
    if group.value_fields().next().is_none() {
        emit!(w, "let _ = (fp, indent);");
    }
    for field in group.value_fields() {
        let label = label_literal(field);
        match &field.ty {
            FieldType::Struct(_) => {
                emit!(w, "write_heading(fp, indent, {label})?;");
                emit!(w, "self.{}.print(fp, indent + 2)?;", field.name);
            }
            _ => emit!(
                w,
                "write_field(fp, indent, {label}, format_args!({}))?;",
                print_args(field)
            ),
        }
    }
    emit!(w, "Ok(())");
    w.close("")?;
    w.close("")?;
    emit!(w, "");

    Ok(())
}

/// Format string and argument printing `field`.
fn print_args(field: &Field) -> String {
    let value = format!("self.{}", field.name);
    match field.ty {
        FieldType::Address => format!("\"0x{{:x}}\", {value}"),
        FieldType::Uint if field.width() > 32 => format!("\"0x{{:x}}\", {value}"),
        FieldType::Float => format!("\"{{:.6}}\", {value}"),
        FieldType::Enum(_) => format!("\"{{}}\", {value}.as_str()"),
        _ => format!("\"{{}}\", {value}"),
    }
}
