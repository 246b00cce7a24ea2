// Front end for the WebAssembly text format: lexes and parses .wat modules and .wast scripts into
// `wastir_ir` trees, then reconciles function types and resolves names.

#![forbid(unsafe_code)]
#![allow(clippy::cognitive_complexity)]

mod literal;

pub mod lexer;
pub mod options;
pub mod parser;
pub mod reconcile;
pub mod resolve;

pub use lexer::{Lexer, TokenSource};
pub use options::{Features, ParseOptions};
pub use parser::{Parse, Parser};
pub use reconcile::ReconcileOptions;

use tracing::debug;
use wastir_ir::{Errors, Failed, Module, Script};

// Parses a single module and runs both passes over it. The tree is returned only when no pass
// reported an error. Diagnostics of all stages are appended to `errors` in the order they were
// found.
pub fn parse_wat(
    source: &str,
    file: Option<&str>,
    options: &ParseOptions,
    errors: &mut Errors,
) -> Result<Module, Failed> {
    let before = errors.error_count();
    let mut parser = Parser::from_source(source, file, options.features);
    let mut module = parser.parse_module();
    errors.append(parser.into_errors());
    let parsed = errors.pass_result(before);

    // The passes still run on a broken tree so that one invocation reports as much as possible
    let reconciled = reconcile::reconcile_module(&mut module, &options.reconcile_options(), errors);
    let resolved = resolve::resolve_module(&mut module, errors);

    debug!(
        file,
        fields = module.fields.len(),
        errors = errors.error_count() - before,
        "parsed wat"
    );
    parsed.and(reconciled).and(resolved)?;
    Ok(module)
}

pub fn parse_wast(
    source: &str,
    file: Option<&str>,
    options: &ParseOptions,
    errors: &mut Errors,
) -> Result<Script, Failed> {
    let before = errors.error_count();
    let mut parser = Parser::from_source(source, file, options.features);
    let mut script = parser.parse_script();
    errors.append(parser.into_errors());
    let parsed = errors.pass_result(before);

    let resolved = resolve::resolve_script(&mut script, &options.reconcile_options(), errors);

    debug!(
        file,
        commands = script.commands.len(),
        errors = errors.error_count() - before,
        "parsed wast"
    );
    parsed.and(resolved)?;
    Ok(script)
}
