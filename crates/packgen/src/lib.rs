//! # packgen
//!
//! Generates pack, unpack and print routines for bit-packed hardware
//! descriptors from a declarative schema.
//!
//! A schema document lists structs made of named fields, each a bit range of a
//! sequence of little-endian 32-bit words, plus enumerations the fields can
//! refer to. The generator lays every struct out, checks the layout, and writes
//! one self-contained Rust source file with a value type, a packed-words type,
//! pack/unpack/print routines and enum name tables for each declaration.
//!
//! ## Example
//!
//! ```
//! use packgen::{Generator, GeneratorConfig};
//!
//! let xml = r#"<panxml>
//!   <struct name="Desc" size="2">
//!     <field name="Enable" start="0" size="1" type="bool" default="true"/>
//!     <field name="Count" start="1:0" size="8" type="uint"/>
//!   </struct>
//! </panxml>"#;
//!
//! let source = Generator::new(GeneratorConfig::new()).generate_xml(xml).unwrap();
//! assert!(source.contains("pub struct Desc {"));
//! assert!(source.contains("pub const LENGTH: usize = 8;"));
//! ```

pub mod builder;
pub mod document;
pub mod emit;
pub mod errors;
pub mod field;
pub mod generator;
pub mod layout;
pub mod names;
pub mod runtime;
pub mod schema;
#[cfg(feature = "serde")]
pub mod serde;

pub use errors::Error;
pub use generator::{DEFAULT_PREFIX, Generator, GeneratorConfig};
