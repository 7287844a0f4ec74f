mod args;

use std::fs;
use std::io::{self, Read, Write};
use std::process;

use log::{debug, error, info, LevelFilter};
use simple_logger::SimpleLogger;
use thiserror::Error;

use args::{Args, Emit};

#[derive(Debug, Error)]
enum CliError {
    #[error("cannot read {path}: {source}")]
    Read {
        path: String,
        source: io::Error,
    },

    #[error("cannot write {path}: {source}")]
    Write {
        path: String,
        source: io::Error,
    },

    #[error(transparent)]
    Codegen(#[from] protobitmap_codegen::Error),

    #[error("cannot encode report: {0}")]
    Json(#[from] serde_json::Error),
}

fn main() {
    let args = args::parse();

    let level = match args.verbosity {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        2 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    };
    if let Err(e) = SimpleLogger::new().without_timestamps().with_level(level).init() {
        eprintln!("logger: {}", e);
    }

    if let Err(e) = run(&args) {
        error!("{}", e);
        process::exit(1);
    }
}

fn run(args: &Args) -> Result<(), CliError> {
    let src = read_input(args.input.as_deref())?;
    debug!("read {} bytes", src.len());

    let out = render(&src, args.emit)?;

    write_output(args.output.as_deref(), &out)
}

fn render(src: &str, emit: Emit) -> Result<String, CliError> {
    let transformed = protobitmap_codegen::transform(src)?;
    for b in &transformed.report.bitmaps {
        info!("{}: {} flag(s) as {}", b.full_name, b.flags.len(), b.width);
    }

    let out = match emit {
        Emit::Proto => transformed.text,
        Emit::Report => transformed.report.to_json()? + "\n",
        Emit::Rust => protobitmap_codegen::generate_from(&transformed)?,
    };
    Ok(out)
}

fn read_input(path: Option<&str>) -> Result<String, CliError> {
    match path {
        Some(path) => fs::read_to_string(path).map_err(|source| CliError::Read {
            path: path.to_string(),
            source,
        }),
        None => {
            let mut src = String::new();
            io::stdin().read_to_string(&mut src).map_err(|source| CliError::Read {
                path: "<stdin>".to_string(),
                source,
            })?;
            Ok(src)
        }
    }
}

fn write_output(path: Option<&str>, out: &str) -> Result<(), CliError> {
    let res = match path {
        Some(path) => fs::write(path, out),
        None => io::stdout().write_all(out.as_bytes()),
    };
    res.map_err(|source| CliError::Write {
        path: path.unwrap_or("<stdout>").to_string(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const SRC: &str = "package riscv;\nmessage Privileged {\n  enum Mode {\n    option (bitmap) = true;\n    M = 0;\n    S = 1;\n  }\n  Mode modes = 1;\n}\n";

    #[test]
    fn renders_proto() {
        let out = render(SRC, Emit::Proto).unwrap();
        assert_eq!(out, "package riscv;\nmessage Privileged {\n  enum Mode {\n    None = 0;\n    M = 1;\n    S = 2;\n  }\n  uint32 modes = 1;\n}\n");
    }

    #[test]
    fn renders_report() {
        let out = render(SRC, Emit::Report).unwrap();
        let v: serde_json::Value = serde_json::from_str(&out).unwrap();
        assert_eq!(v["bitmaps"][0]["full_name"], "riscv.Privileged.Mode");
        assert_eq!(v["bitmaps"][0]["width"], "uint32");
        assert_eq!(v["retyped"][0]["field"], "modes");
    }

    #[test]
    fn renders_rust() {
        let out = render(SRC, Emit::Rust).unwrap();
        assert!(out.contains("pub struct Privileged"));
    }

    #[test]
    fn reports_parse_errors() {
        let err = render("message {", Emit::Proto).unwrap_err();
        assert_eq!(err.to_string(), "1:9: expected message name, found `{`");
    }

    #[test]
    fn missing_input() {
        let err = read_input(Some("/nonexistent/schema.proto")).unwrap_err();
        assert!(err.to_string().starts_with("cannot read /nonexistent/schema.proto: "));
    }
}
