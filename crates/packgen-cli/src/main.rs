mod app;

use std::{fs, io::Write};

use anyhow::Context;
use clap::Parser;
use log::info;
use packgen::{Generator, GeneratorConfig};

use crate::app::{Cli, Format};

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // packgen warnings on stderr; --verbose enables debug; RUST_LOG overrides
    let level = if cli.verbose {
        log::LevelFilter::Debug
    } else {
        log::LevelFilter::Warn
    };
    env_logger::Builder::new()
        .filter_module("packgen", level)
        .parse_default_env()
        .target(env_logger::Target::Stderr)
        .format_timestamp(None)
        .format_module_path(false)
        .format_target(false)
        .init();

    let text = fs::read_to_string(&cli.input)
        .with_context(|| format!("failed to read {}", cli.input.display()))?;

    let mut config = GeneratorConfig::new();
    config.set_prefix(&cli.prefix);
    if let Some(name) = cli.input.file_name().and_then(|n| n.to_str()) {
        config.set_source_name(name);
    }
    let generator = Generator::new(config);

    let source = match Format::of(&cli.input) {
        Format::Xml => generator.generate_xml(&text),
        Format::Json => generator.generate_json(&text),
    }
    .with_context(|| format!("{}", cli.input.display()))?;

    if cli.check {
        info!("{}: ok", cli.input.display());
        return Ok(());
    }

    // Nothing is written unless generation succeeded.
    match &cli.output {
        Some(path) => fs::write(path, &source)
            .with_context(|| format!("failed to write {}", path.display()))?,
        None => std::io::stdout()
            .lock()
            .write_all(source.as_bytes())
            .context("failed to write to stdout")?,
    }

    Ok(())
}
