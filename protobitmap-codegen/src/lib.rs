pub mod desc;
pub mod error;
pub mod lexer;
pub mod parser;
pub mod scope;
pub mod transform;
mod gen;

pub use desc::TransformReport;
pub use error::{Error, Result};
pub use transform::{transform, Transformed};

const GENERATED_HEADER: &str = "// @generated by protobitmap-codegen, do not edit\n";

/// Rewrites bitmap enums in `.proto` text, see [`transform`]
pub fn transform_text(src: &str) -> Result<String> {
    Ok(transform(src)?.text)
}

pub fn report(src: &str) -> Result<TransformReport> {
    Ok(transform(src)?.report)
}

/// Rust accessors for the transformed schema
pub fn generate(src: &str) -> Result<String> {
    let transformed = transform(src)?;
    generate_from(&transformed)
}

pub fn generate_from(transformed: &Transformed) -> Result<String> {
    let code = gen::gen(&transformed.file)?;
    Ok(format!("{}{}\n", GENERATED_HEADER, code))
}
