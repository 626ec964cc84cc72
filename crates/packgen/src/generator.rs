//! One generation run: document in, Rust source out.
//!
//! Every struct is laid out before anything is written, so a schema that cannot
//! be laid out produces no partial output. Items are then emitted in document
//! order after the banner and the runtime prelude.

use std::collections::BTreeSet;

use log::debug;

use crate::{
    builder::SchemaBuilder,
    document::{self, Event},
    emit::{self, CodeWriter, EmitContext},
    errors::{Error, SchemaError},
    layout::{self, Layout},
    runtime,
    schema::{Group, Item, Schema, Variant},
};

/// Global prefix used when none is configured.
pub const DEFAULT_PREFIX: &str = "mali";

/// Names the runtime prelude defines in every artifact, plus the imported and
/// std-prelude names generated code refers to unqualified.
const PRELUDE_ITEMS: &[&str] = &[
    "PackError",
    "UnpackWarning",
    "Unpacked",
    "INVALID_ENUM",
    "fmt",
    "io",
    "Write",
    "Default",
    "From",
    "FnOnce",
    "Iterator",
    "IntoIterator",
    "Option",
    "Some",
    "None",
    "Result",
    "Ok",
    "Err",
    "Self",
    "Vec",
];

/// Settings of a generation run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratorConfig {
    prefix: String,
    source_name: Option<String>,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        GeneratorConfig {
            prefix: DEFAULT_PREFIX.to_string(),
            source_name: None,
        }
    }
}

impl GeneratorConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the global prefix enum member constants are named with.
    pub fn set_prefix(&mut self, prefix: &str) -> &mut Self {
        self.prefix = prefix.to_string();
        self
    }

    /// Sets the document name recorded in the banner of the artifact.
    pub fn set_source_name(&mut self, name: &str) -> &mut Self {
        self.source_name = Some(name.to_string());
        self
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    pub fn source_name(&self) -> Option<&str> {
        self.source_name.as_deref()
    }
}

/// Turns schema documents into Rust source.
#[derive(Debug, Clone, Default)]
pub struct Generator {
    config: GeneratorConfig,
}

impl Generator {
    pub fn new(config: GeneratorConfig) -> Self {
        Generator { config }
    }

    pub fn config(&self) -> &GeneratorConfig {
        &self.config
    }

    /// Generates from an XML document.
    pub fn generate_xml(&self, text: &str) -> Result<String, Error> {
        self.generate_events(document::parse_xml(text)?)
    }

    /// Generates from the JSON form of a document.
    #[cfg(feature = "serde")]
    pub fn generate_json(&self, text: &str) -> Result<String, Error> {
        self.generate_events(crate::serde::parse_json(text)?)
    }

    /// Generates from an already loaded element stream.
    pub fn generate_events<I>(&self, events: I) -> Result<String, Error>
    where
        I: IntoIterator<Item = Event>,
    {
        let schema = SchemaBuilder::build(&self.config.prefix, events)?;
        self.generate_schema(&schema)
    }

    /// Generates from a built schema.
    pub fn generate_schema(&self, schema: &Schema) -> Result<String, Error> {
        layout::check_embedding(schema)?;
        let layouts = schema
            .structs()
            .iter()
            .map(|group| Layout::compute(group, schema))
            .collect::<Result<Vec<_>, _>>()?;
        self.check_item_names(schema)?;

        let ctx = EmitContext {
            schema,
            prefix: &self.config.prefix,
        };
        let mut w = CodeWriter::new();

        let banner = match self.config.source_name() {
            Some(name) => format!("// Generated by packgen from {name}. Do not edit."),
            None => "// Generated by packgen. Do not edit.".to_string(),
        };
        emit_line(&mut w, &banner)?;
        emit_line(&mut w, "")?;
        w.raw(runtime::SOURCE);
        emit_line(&mut w, "")?;

        for item in schema.items() {
            match *item {
                Item::Enum(index) => {
                    let e = &schema.enums()[index];
                    debug!("enum `{}`: {} values", e.name, e.values.len());
                    emit::enums::emit_enum(&mut w, &ctx, e)?;
                }
                Item::Struct(index) => {
                    let group = &schema.structs()[index];
                    let layout = &layouts[index];
                    debug!(
                        "struct `{}`: {} bytes, {} fields",
                        group.name,
                        layout.length,
                        group.fields.len()
                    );
                    emit_struct(&mut w, &ctx, group, layout)?;
                }
            }
        }

        Ok(w.finish())
    }

    /// Rejects two items that would define the same name in the artifact.
    fn check_item_names(&self, schema: &Schema) -> Result<(), SchemaError> {
        let ctx = EmitContext {
            schema,
            prefix: &self.config.prefix,
        };
        let mut seen: BTreeSet<String> = PRELUDE_ITEMS.iter().map(|s| s.to_string()).collect();

        for item in schema.items() {
            let names = match *item {
                Item::Enum(index) => emit::enums::item_names(&ctx, &schema.enums()[index]),
                Item::Struct(index) => emit::holder::item_names(&schema.structs()[index]),
            };
            for name in names {
                if !seen.insert(name.clone()) {
                    return Err(SchemaError::DuplicateName { kind: "item", name });
                }
            }
        }

        Ok(())
    }
}

fn emit_line(w: &mut CodeWriter, text: &str) -> std::fmt::Result {
    w.line(format_args!("{text}"))
}

/// Emits every item of one struct, in a fixed order.
fn emit_struct(
    w: &mut CodeWriter,
    ctx: &EmitContext<'_>,
    group: &Group,
    layout: &Layout,
) -> Result<(), Error> {
    let variants = &group.variants;

    for &variant in variants {
        emit::holder::emit_holder(w, ctx, group, layout, variant)?;
    }
    for &variant in variants {
        emit::holder::emit_header(w, ctx, group, layout, variant)?;
    }
    emit::pack::emit_packed_type(w, ctx, group, layout)?;
    for &variant in variants {
        emit::pack::emit_pack(w, ctx, group, layout, variant)?;
    }
    for &variant in variants {
        emit::unpack::emit_unpack(w, ctx, group, layout, variant)?;
    }
    if group.has_variant(Variant::Plain) {
        emit::print::emit_print(w, ctx, group)?;
    }

    Ok(())
}
