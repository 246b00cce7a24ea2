#![forbid(unsafe_code)]

use std::env;
use std::fs;
use std::io::{self, Read};
use std::process::exit;
use tracing::debug;
use tracing_subscriber::EnvFilter;
use wastir_ir::Errors;
use wastir_text::{parse_wast, parse_wat, Features, ParseOptions};

const USAGE: &str = "\
Usage: wastir [OPTIONS] [FILE]

Parses a WebAssembly script (.wast) or module (.wat), reconciles function types and resolves
names. Reads stdin when FILE is omitted or `-`.

Options:
    --wat                 Parse a single module instead of a script
    --dump                Print the resolved tree
    --enable-<feature>    Enable a proposal (e.g. --enable-tail-call)
    --disable-<feature>   Disable a proposal
    --enable-all          Enable all proposals
    --dedup-func-types    Reuse identical function types instead of appending new ones
    -h, --help            Print this help

Set WASTIR_LOG (e.g. WASTIR_LOG=debug) to see logs on stderr.";

struct Options {
    help: bool,
    wat: bool,
    dump: bool,
    file: Option<String>,
    parse: ParseOptions,
}

fn parse_options() -> Result<Options, String> {
    let mut opts = Options {
        help: false,
        wat: false,
        dump: false,
        file: None,
        parse: ParseOptions::default(),
    };

    for arg in env::args().skip(1) {
        match arg.as_str() {
            "-h" | "--help" => {
                opts.help = true;
                break;
            }
            "--wat" => opts.wat = true,
            "--dump" => opts.dump = true,
            "--enable-all" => opts.parse.features = Features::all(),
            "--dedup-func-types" => opts.parse.dedup_func_types = true,
            "-" => opts.file = None,
            _ => {
                if let Some(name) = arg.strip_prefix("--enable-") {
                    if !opts.parse.features.enable(name) {
                        return Err(format!("unknown feature {:?}", name));
                    }
                } else if let Some(name) = arg.strip_prefix("--disable-") {
                    if !opts.parse.features.disable(name) {
                        return Err(format!("unknown feature {:?}", name));
                    }
                } else if arg.starts_with('-') {
                    return Err(format!("unknown option {:?}", arg));
                } else {
                    opts.file = Some(arg);
                }
            }
        }
    }

    Ok(opts)
}

fn read_source(file: Option<&str>) -> io::Result<String> {
    match file {
        Some(path) => fs::read_to_string(path),
        None => {
            let mut source = String::new();
            io::stdin().read_to_string(&mut source)?;
            Ok(source)
        }
    }
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_env("WASTIR_LOG").unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(io::stderr)
        .init();

    let opts = match parse_options() {
        Ok(opts) => opts,
        Err(msg) => {
            eprintln!("{}\n\n{}", msg, USAGE);
            exit(1);
        }
    };
    if opts.help {
        println!("{}", USAGE);
        exit(0);
    }

    let file = opts.file.as_deref();
    let source = match read_source(file) {
        Ok(source) => source,
        Err(e) => {
            eprintln!("{}: {}", file.unwrap_or("<stdin>"), e);
            exit(1);
        }
    };
    debug!(file, bytes = source.len(), wat = opts.wat, "read source");

    let mut errors = Errors::new();
    let dump = if opts.wat {
        parse_wat(&source, file, &opts.parse, &mut errors)
            .map(|m| opts.dump.then(|| format!("{:#?}", m)))
    } else {
        parse_wast(&source, file, &opts.parse, &mut errors)
            .map(|s| opts.dump.then(|| format!("{:#?}", s)))
    };

    for diag in &errors {
        eprintln!("{}", diag);
    }
    match dump {
        Ok(Some(tree)) => println!("{}", tree),
        Ok(None) => {}
        Err(_) => exit(1),
    }
}
