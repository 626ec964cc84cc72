use std::{env, fs, path::Path};

use packgen::{Generator, GeneratorConfig};

const SCHEMAS: &[&str] = &["demo"];

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let out_dir = env::var("OUT_DIR")?;
    println!("cargo:rerun-if-changed=build.rs");

    for name in SCHEMAS {
        let path = format!("schemas/{name}.xml");
        println!("cargo:rerun-if-changed={path}");

        let text = fs::read_to_string(&path)?;
        let mut config = GeneratorConfig::new();
        config.set_source_name(&format!("{name}.xml"));
        let source = Generator::new(config).generate_xml(&text)?;

        fs::write(Path::new(&out_dir).join(format!("{name}.rs")), source)?;
    }

    Ok(())
}
