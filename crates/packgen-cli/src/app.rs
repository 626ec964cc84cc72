use std::path::PathBuf;

use clap::Parser;
use packgen::DEFAULT_PREFIX;

/// packgen - generate pack/unpack/print code for bit-packed descriptors
#[derive(Debug, Parser)]
#[command(name = "packgen", version, about, long_about = None)]
pub struct Cli {
    /// Schema document, XML or (with a `.json` extension) JSON.
    #[arg(value_name = "FILE")]
    pub input: PathBuf,

    /// Write the generated source here instead of stdout.
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Global prefix of enum member constants.
    #[arg(long, default_value = DEFAULT_PREFIX)]
    pub prefix: String,

    /// Check the schema without writing anything.
    #[arg(long)]
    pub check: bool,

    /// Enable verbose (debug-level) logging output.
    #[arg(short, long)]
    pub verbose: bool,
}

/// Input document formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    Xml,
    Json,
}

impl Format {
    /// Picks the format from the file extension; anything but `.json` is XML.
    pub fn of(path: &std::path::Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("json") => Format::Json,
            _ => Format::Xml,
        }
    }
}
