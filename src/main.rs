use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing::debug;
use tracing_subscriber::EnvFilter;

use loxvm::error::ScanErrors;
use loxvm::{compile_source, parse, scan, Error, Vm};

/// Scans, parses, compiles and runs programs written in a small expression language.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the token stream of a source file, one token per line
    Tokenize(Input),
    /// Print the syntax tree of a source file, one statement per line
    Parse(Input),
    /// Compile a source file to bytecode and execute it
    Compile(Input),
    /// Execute a source file
    Run {
        file: PathBuf,
    },
}

#[derive(clap::Args, Debug)]
struct Input {
    file: PathBuf,

    /// Dump the intermediate form, followed by a blank line
    #[arg(short, long)]
    debug: bool,
}

fn read_source(path: &Path) -> Result<String, ExitCode> {
    fs::read_to_string(path).map_err(|e| {
        eprintln!("Error reading file {}: {e}", path.display());
        ExitCode::FAILURE
    })
}

fn tokenize(source: &str, debug: bool, out: &mut impl Write) -> Result<(), Error> {
    let scanned = scan(source);
    for token in &scanned.tokens {
        writeln!(out, "{token}")?;
    }
    if debug {
        writeln!(out)?;
    }

    if scanned.has_errors() {
        return Err(ScanErrors(scanned.errors).into());
    }
    Ok(())
}

fn parse_file(source: &str, debug: bool, out: &mut impl Write) -> Result<(), Error> {
    let scanned = scan(source);
    if scanned.has_errors() {
        return Err(ScanErrors(scanned.errors).into());
    }

    let ast = parse(&scanned.tokens)?;
    for stmt in &ast {
        writeln!(out, "{stmt}")?;
    }
    if debug {
        writeln!(out)?;
    }
    Ok(())
}

fn execute(source: &str, dump: bool, out: &mut impl Write) -> Result<(), Error> {
    let program = compile_source(source)?;
    if dump {
        writeln!(out, "{}\n", program.dump())?;
    }

    Vm::new(&program).run(out)?;
    Ok(())
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_writer(io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_target(false)
        .without_time()
        .init();

    let args = Args::parse();
    debug!(?args, "starting");

    let (file, debug) = match &args.command {
        Command::Tokenize(input) | Command::Parse(input) | Command::Compile(input) => {
            (&input.file, input.debug)
        }
        Command::Run { file } => (file, false),
    };
    let source = match read_source(file) {
        Ok(source) => source,
        Err(code) => return code,
    };

    let mut stdout = io::stdout().lock();
    let result = match &args.command {
        Command::Tokenize(_) => tokenize(&source, debug, &mut stdout),
        Command::Parse(_) => parse_file(&source, debug, &mut stdout),
        Command::Compile(_) | Command::Run { .. } => execute(&source, debug, &mut stdout),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{e}");
            ExitCode::from(e.exit_code())
        }
    }
}
