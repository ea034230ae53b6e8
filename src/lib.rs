mod symbols;
mod value;

pub mod ast;
pub mod compiler;
pub mod error;
pub mod lexer;
pub mod parser;
pub mod vm;

use std::io::Write;

pub use crate::compiler::{compile, Program};
pub use crate::error::Error;
pub use crate::lexer::scan;
pub use crate::parser::parse;
pub use crate::value::{Type, Value};
pub use crate::vm::{run_str, Vm};

use crate::error::ScanErrors;

/// Scans, parses and compiles the given source into a program ready for the VM
pub fn compile_source(source: &str) -> Result<Program, Error> {
    let scanned = scan(source);
    if scanned.has_errors() {
        return Err(ScanErrors(scanned.errors).into());
    }

    let ast = parse(&scanned.tokens)?;
    Ok(compile(&ast)?)
}

/// Runs the given source through the whole pipeline, writing program output to `out`.
/// Nothing is retained in between calls.
pub fn run(source: &str, out: &mut impl Write) -> Result<(), Error> {
    let program = compile_source(source)?;
    Vm::new(&program).run(out)?;
    Ok(())
}
