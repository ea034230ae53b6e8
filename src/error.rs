use std::fmt::Display;
use std::io;

use thiserror::Error;

/// Exit code for source that failed to scan
pub const EXIT_LEXICAL_ERROR: u8 = 65;
/// Exit code for source that failed to parse
pub const EXIT_PARSE_ERROR: u8 = 40;
/// Exit code for a program that could not be compiled to bytecode
pub const EXIT_COMPILE_ERROR: u8 = 41;
/// Exit code for a program that faulted while executing
pub const EXIT_RUNTIME_ERROR: u8 = 70;
/// Exit code for output that could not be written
pub const EXIT_OUTPUT_ERROR: u8 = 74;

/// A recoverable lexical error. The scanner keeps going after reporting one of these.
#[derive(Debug, Error, PartialEq, Eq, Clone)]
pub enum ScanError {
    #[error("[line {line}] Error: Unexpected character: {character}")]
    UnexpectedCharacter { line: usize, character: char },
    #[error("[line {line}] Error: Unterminated string.")]
    UnterminatedString { line: usize },
}

/// All lexical errors found in a single source buffer, in source order
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct ScanErrors(pub Vec<ScanError>);

impl Display for ScanErrors {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for (i, e) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str("\n")?;
            }
            write!(f, "{e}")?;
        }
        Ok(())
    }
}

impl std::error::Error for ScanErrors {}

/// The first grammar violation found by the parser.
#[derive(Debug, Error, PartialEq, Eq, Clone)]
#[error("[line {line}] Error at {}: Expect {expected}.", location(.lexeme))]
pub struct ParseError {
    pub line: usize,
    /// Lexeme of the offending token, empty for the end of input
    pub lexeme: String,
    /// Description of the construct the parser was looking for
    pub expected: String,
}

fn location(lexeme: &str) -> String {
    if lexeme.is_empty() {
        "end".to_string()
    } else {
        format!("'{lexeme}'")
    }
}

#[derive(Debug, Error, PartialEq, Eq, Clone)]
pub enum CompileError {
    #[error("Too many constants in one program (at most {max} are allowed).")]
    TooManyConstants { max: usize },
    #[error("Too many variables in one program (at most {max} are allowed).")]
    TooManyVariables { max: usize },
}

/// A fault raised while executing bytecode. Each variant carries the offset of the faulting instruction.
#[derive(Debug, Error)]
pub enum RuntimeError {
    #[error("Stack underflow while executing {opcode} at offset {ip}.")]
    StackUnderflow { opcode: &'static str, ip: usize },
    #[error("Operands of {opcode} must be {expected}, got {found} at offset {ip}.")]
    TypeMismatch {
        opcode: &'static str,
        expected: &'static str,
        found: String,
        ip: usize,
    },
    #[error("Undefined variable '{name}' at offset {ip}.")]
    UnboundVariable { name: String, ip: usize },
    #[error("Unknown opcode {byte:#04x} at offset {ip}.")]
    UnknownOpcode { byte: u8, ip: usize },
    #[error("Missing operand for {opcode} at offset {ip}.")]
    MissingOperand { opcode: &'static str, ip: usize },
    #[error("Constant index {index} out of range at offset {ip}.")]
    ConstantOutOfRange { index: usize, ip: usize },
    #[error("Variable slot {slot} out of range at offset {ip}.")]
    SlotOutOfRange { slot: usize, ip: usize },
    #[error("Failed to write program output: {0}")]
    Output(#[from] io::Error),
}

/// Any error raised by one of the pipeline stages
#[derive(Debug, Error)]
pub enum Error {
    #[error("{0}")]
    Scan(#[from] ScanErrors),
    #[error("{0}")]
    Parse(#[from] ParseError),
    #[error("{0}")]
    Compile(#[from] CompileError),
    #[error("{0}")]
    Runtime(#[from] RuntimeError),
    #[error("Failed to write output: {0}")]
    Output(#[from] io::Error),
}

impl Error {
    /// The process exit code that reports this error
    pub fn exit_code(&self) -> u8 {
        match self {
            Error::Scan(_) => EXIT_LEXICAL_ERROR,
            Error::Parse(_) => EXIT_PARSE_ERROR,
            Error::Compile(_) => EXIT_COMPILE_ERROR,
            Error::Runtime(RuntimeError::Output(_)) | Error::Output(_) => EXIT_OUTPUT_ERROR,
            Error::Runtime(_) => EXIT_RUNTIME_ERROR,
        }
    }
}
