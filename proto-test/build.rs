use std::env;
use std::error::Error;
use std::fs::read_to_string;
use std::fs::write;
use std::path::Path;
use std::process::Command;

fn main() -> Result<(), Box<dyn Error>> {

    // Obtain schema path from evar
    let schema = env::var("PROTOBITMAP_SCHEMA_PATH")
        .unwrap_or_else(|_| "example.proto".to_string());

    let txt = read_to_string(&schema)?;
    let transformed = protobitmap_codegen::transform(&txt)?;
    let code = protobitmap_codegen::generate_from(&transformed)?;

    let out_dir = env::var("OUT_DIR")?;
    write(Path::new(&out_dir).join("example.proto"), &transformed.text)?;
    let path = Path::new(&out_dir).join("codegen.rs");
    write(&path, code)?;

    // rustfmt, the unformatted output compiles as well
    let _ = Command::new("rustfmt")
        .arg(&path)
        .output();

    println!("cargo:rerun-if-changed={}", schema);
    println!("cargo:rerun-if-env-changed=PROTOBITMAP_SCHEMA_PATH");
    Ok(())
}
