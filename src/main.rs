// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Heir - command line interface and REPL.
//!
//! ## Features
//!
//! - Run a source file or an inline snippet
//! - Dump the syntax tree or the bytecode listing
//! - Interactive REPL with highlighting, completion and history

mod config;
mod repl;

use anyhow::Context;
use clap::Parser;
use config::Config;
use heir_core::diagnostics::DiagnosticBag;
use heir_core::{Diagnostic, Engine};
use owo_colors::OwoColorize;
use std::io::Write;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(
    name = "heir",
    about = "The Heir language: bytecode compiler and virtual machine",
    version,
    author = "Pegasus Heavy Industries"
)]
pub struct Cli {
    /// Source file to execute
    file: Option<PathBuf>,

    /// Evaluate code from the command line
    #[arg(short = 'e', long = "eval", value_name = "CODE")]
    eval: Option<String>,

    /// Start the REPL after running FILE or CODE
    #[arg(short = 'i', long = "interactive", alias = "repl")]
    interactive: bool,

    /// Print the bytecode listing before running
    #[arg(long)]
    dump_bytecode: bool,

    /// Print the syntax tree before running
    #[arg(long)]
    dump_ast: bool,

    /// Enable verbose logging
    #[arg(long)]
    verbose: bool,

    /// Maximum function call depth
    #[arg(long, env = "HEIR_MAX_CALL_DEPTH", value_name = "N")]
    max_call_depth: Option<usize>,

    /// Abort after executing this many instructions
    #[arg(long, env = "HEIR_STEP_LIMIT", value_name = "N")]
    step_limit: Option<u64>,

    /// REPL history file
    #[arg(long, env = "HEIR_HISTORY", value_name = "PATH")]
    history: Option<PathBuf>,
}

fn main() -> anyhow::Result<ExitCode> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let config = Config::from(&cli);
    tracing::debug!(?config, "configuration resolved");

    let mut engine = Engine::with_options(config.vm);
    let mut failed = false;
    let mut stdout = std::io::stdout().lock();

    if let Some(code) = &cli.eval {
        failed |= run_source(&mut engine, code, &config, &mut stdout)?;
    } else if let Some(path) = &cli.file {
        let source = std::fs::read_to_string(path)
            .with_context(|| format!("cannot read {}", path.display()))?;
        failed |= run_source(&mut engine, &source, &config, &mut stdout)?;
    }
    drop(stdout);

    if cli.interactive || (cli.eval.is_none() && cli.file.is_none()) {
        let mut repl = repl::Repl::new(engine, &config).context("failed to initialize the REPL")?;
        repl.run().context("REPL error")?;
    }

    Ok(if failed {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    })
}

/// Installs the stderr subscriber. `HEIR_LOG` overrides the default filter.
fn init_logging(verbose: bool) {
    let default = if verbose {
        "heir=debug,heir_core=debug"
    } else {
        "heir=warn,heir_core=warn"
    };
    let filter = EnvFilter::try_from_env("HEIR_LOG").unwrap_or_else(|_| EnvFilter::new(default));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

/// Runs `source`, writing dumps and the result value to `out` and
/// diagnostics to stderr. Returns true if any error was reported.
fn run_source(
    engine: &mut Engine,
    source: &str,
    config: &Config,
    out: &mut impl Write,
) -> std::io::Result<bool> {
    if config.dump_ast {
        let tree = heir_core::parser::Parser::new(source, DiagnosticBag::new()).parse();
        writeln!(out, "{:#?}", tree)?;
    }
    if config.dump_bytecode {
        write!(out, "{}", engine.compile(source).disassemble())?;
    }

    let result = engine.eval(source);
    print_diagnostics(&result.diagnostics, source);

    writeln!(out, "{}", result.value)?;
    Ok(result.has_errors())
}

/// Prints diagnostics to stderr with `line:column` locations.
pub fn print_diagnostics(diagnostics: &[Diagnostic], source: &str) {
    for diagnostic in diagnostics {
        let rendered = diagnostic.render(source);
        if diagnostic.is_error() {
            eprintln!("{}", rendered.red());
        } else {
            eprintln!("{}", rendered.yellow());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(args: &[&str], source: &str) -> (String, bool) {
        let config = Config::from(&Cli::parse_from(args));
        let mut engine = Engine::with_options(config.vm);
        let mut out = Vec::new();
        let failed = run_source(&mut engine, source, &config, &mut out).unwrap();
        (String::from_utf8(out).unwrap(), failed)
    }

    #[test]
    fn test_prints_result() {
        let (out, failed) = run(&["heir"], "let x = 6; x * 7");
        assert_eq!(out, "42\n");
        assert!(!failed);
    }

    #[test]
    fn test_prints_none() {
        let (out, _) = run(&["heir"], "let x = 1;");
        assert_eq!(out, "none\n");
    }

    #[test]
    fn test_dump_bytecode_precedes_result() {
        let (out, _) = run(&["heir", "--dump-bytecode"], "1 + 2");
        assert!(out.starts_with("0000  PUSH"));
        assert!(out.ends_with("3\n"));
    }

    #[test]
    fn test_reports_failure() {
        let (_, failed) = run(&["heir"], "let x: int = \"no\";");
        assert!(failed);
    }
}
