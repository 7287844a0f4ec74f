use clap::{App, Arg, ArgMatches};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Emit {
    /// Rewritten `.proto` text
    Proto,
    /// JSON description of the rewrite
    Report,
    /// Rust accessors
    Rust,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Args {
    /// `None` or `-` reads stdin
    pub input: Option<String>,
    /// `None` writes stdout
    pub output: Option<String>,
    pub emit: Emit,
    pub verbosity: u64,
}

pub fn app() -> App<'static, 'static> {
    App::new("protoc-bitmap")
        .version("0.1")
        .about("Rewrites `option (bitmap)` enums of a .proto schema into flag sets")
        .arg(Arg::with_name("output")
            .short("o")
            .long("output")
            .value_name("FILE")
            .takes_value(true)
            .help("write to FILE instead of stdout")
        )
        .arg(Arg::with_name("emit")
            .long("emit")
            .takes_value(true)
            .possible_values(&["proto", "report", "rust"])
            .default_value("proto")
            .help("what to produce")
        )
        .arg(Arg::with_name("verbose")
            .short("v")
            .multiple(true)
            .help("more logging, repeat for more")
        )
        .arg(Arg::with_name("input")
            .index(1)
            .value_name("INPUT")
            .help("schema to read, stdin when absent or -")
        )
}

pub fn parse() -> Args {
    from_matches(&app().get_matches())
}

fn from_matches(m: &ArgMatches) -> Args {
    let emit = match m.value_of("emit") {
        Some("report") => Emit::Report,
        Some("rust") => Emit::Rust,
        _ => Emit::Proto,
    };

    Args {
        input: m.value_of("input").filter(|p| *p != "-").map(str::to_string),
        output: m.value_of("output").map(str::to_string),
        emit,
        verbosity: m.occurrences_of("verbose"),
    }
}
