use std::fmt::Display;
use std::fmt::Write;

use tracing::debug;

use crate::ast::*;
use crate::error::CompileError;
use crate::symbols::SymbolTable;
use crate::value::Value;

/// Constants are addressed by a single operand byte
const MAX_CONSTANTS: usize = u8::MAX as usize + 1;

#[repr(u8)]
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum OpCode {
    LoadConst = 0,
    Add,
    Sub,
    Mul,
    Div,
    Grt,
    Grte,
    Lss,
    Lsse,
    Eq,
    Neq,
    Not,
    Neg,
    Print,
    LoadVar,
    StoreVar,
    Return,
}

impl TryFrom<u8> for OpCode {
    type Error = u8;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        let op = match value {
            0 => OpCode::LoadConst,
            1 => OpCode::Add,
            2 => OpCode::Sub,
            3 => OpCode::Mul,
            4 => OpCode::Div,
            5 => OpCode::Grt,
            6 => OpCode::Grte,
            7 => OpCode::Lss,
            8 => OpCode::Lsse,
            9 => OpCode::Eq,
            10 => OpCode::Neq,
            11 => OpCode::Not,
            12 => OpCode::Neg,
            13 => OpCode::Print,
            14 => OpCode::LoadVar,
            15 => OpCode::StoreVar,
            16 => OpCode::Return,
            _ => return Err(value),
        };
        Ok(op)
    }
}

impl OpCode {
    /// The number of single-byte operands following this opcode
    pub fn operands(self) -> usize {
        match self {
            OpCode::LoadConst | OpCode::LoadVar | OpCode::StoreVar => 1,

            OpCode::Add
            | OpCode::Sub
            | OpCode::Mul
            | OpCode::Div
            | OpCode::Grt
            | OpCode::Grte
            | OpCode::Lss
            | OpCode::Lsse
            | OpCode::Eq
            | OpCode::Neq
            | OpCode::Not
            | OpCode::Neg
            | OpCode::Print
            | OpCode::Return => 0,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            OpCode::LoadConst => "LOAD_CONST",
            OpCode::Add => "ADD",
            OpCode::Sub => "SUB",
            OpCode::Mul => "MUL",
            OpCode::Div => "DIV",
            OpCode::Grt => "GRT",
            OpCode::Grte => "GRTE",
            OpCode::Lss => "LSS",
            OpCode::Lsse => "LSSE",
            OpCode::Eq => "EQ",
            OpCode::Neq => "NEQ",
            OpCode::Not => "NOT",
            OpCode::Neg => "NEG",
            OpCode::Print => "PRINT",
            OpCode::LoadVar => "LOAD_VAR",
            OpCode::StoreVar => "STORE_VAR",
            OpCode::Return => "RETURN",
        }
    }
}

impl Display for OpCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

pub(crate) struct Compiler {
    symbols: SymbolTable,
    constants: Vec<Value>,
    instructions: Vec<u8>,
    /// Per variable slot, the constant its latest declaration was initialised with (if it was a plain constant)
    bindings: Vec<Option<u8>>,
}

impl Compiler {
    pub(crate) fn new() -> Self {
        Self {
            symbols: SymbolTable::new(),
            instructions: Vec::with_capacity(64),
            constants: Vec::with_capacity(64),
            bindings: Vec::new(),
        }
    }

    /// Emit the given OpCode with the given operands to the bytecode vector
    fn add_instruction(&mut self, op: OpCode, operands: &[u8]) -> usize {
        let pos = self.instructions.len();
        debug_assert_eq!(operands.len(), op.operands());

        self.instructions.push(op as u8);
        self.instructions.extend_from_slice(operands);
        pos
    }

    fn compile_statement(&mut self, stmt: &Stmt) -> Result<(), CompileError> {
        match stmt {
            Stmt::Expr(expr) => self.compile_expression(expr)?,
            Stmt::Print(expr) => {
                self.compile_expression(expr)?;
                self.add_instruction(OpCode::Print, &[]);
            }
            Stmt::Var { name, initializer } => {
                let start = self.instructions.len();
                self.compile_expression(initializer)?;
                let bound_constant = match self.instructions[start..] {
                    [op, idx] if op == OpCode::LoadConst as u8 => Some(idx),
                    _ => None,
                };

                let slot = self.symbols.define(&name.lexeme)?;
                self.bindings.resize(self.symbols.len(), None);
                self.bindings[slot as usize] = bound_constant;
                self.add_instruction(OpCode::StoreVar, &[slot]);
            }
        }

        self.add_instruction(OpCode::Return, &[]);
        Ok(())
    }

    fn compile_expression(&mut self, expr: &Expr) -> Result<(), CompileError> {
        match expr {
            Expr::Literal(literal) => {
                let idx = self.add_constant(Value::from(literal))?;
                self.add_instruction(OpCode::LoadConst, &[idx]);
            }
            Expr::Variable { name, .. } => {
                // A reference before any declaration still gets its slot now; reading it unbound faults at runtime
                let slot = self.symbols.define(name)?;
                self.add_instruction(OpCode::LoadVar, &[slot]);
            }
            Expr::Unary {
                operator, right, ..
            } => {
                self.compile_expression(right)?;
                let opcode = match operator {
                    UnaryOperator::Negate => OpCode::Neg,
                    UnaryOperator::Not => OpCode::Not,
                };
                self.add_instruction(opcode, &[]);
            }
            Expr::Binary {
                left,
                operator,
                right,
                ..
            } => {
                self.compile_expression(left)?;
                self.compile_expression(right)?;
                self.compile_operator(*operator);
            }
        }

        Ok(())
    }

    fn compile_operator(&mut self, operator: BinaryOperator) {
        let opcode = match operator {
            BinaryOperator::Add => OpCode::Add,
            BinaryOperator::Subtract => OpCode::Sub,
            BinaryOperator::Multiply => OpCode::Mul,
            BinaryOperator::Divide => OpCode::Div,
            BinaryOperator::Gt => OpCode::Grt,
            BinaryOperator::Gte => OpCode::Grte,
            BinaryOperator::Lt => OpCode::Lss,
            BinaryOperator::Lte => OpCode::Lsse,
            BinaryOperator::Eq => OpCode::Eq,
            BinaryOperator::Neq => OpCode::Neq,
        };
        self.add_instruction(opcode, &[]);
    }

    fn add_constant(&mut self, value: Value) -> Result<u8, CompileError> {
        // re-use already defined constants
        if let Some(pos) = self
            .constants
            .iter()
            .position(|c| c.tag() == value.tag() && c == &value)
        {
            return Ok(pos as u8);
        }

        if self.constants.len() >= MAX_CONSTANTS {
            return Err(CompileError::TooManyConstants { max: MAX_CONSTANTS });
        }

        self.constants.push(value);
        Ok((self.constants.len() - 1) as u8)
    }
}

/// Everything the compiler produces for one compilation unit
#[derive(Debug, Clone, PartialEq)]
pub struct Program {
    pub bytecode: Vec<u8>,
    pub constants: Vec<Value>,
    /// Variable names, indexed by slot
    pub variables: Vec<String>,
    /// Per slot, the constant index its declaration bound to it, if the initialiser was a single constant
    pub bindings: Vec<Option<u8>>,
}

impl Program {
    pub fn new(ast: &[Stmt]) -> Result<Self, CompileError> {
        let mut compiler = Compiler::new();

        for stmt in ast {
            compiler.compile_statement(stmt)?;
        }

        let mut bytecode = compiler.instructions;
        let mut constants = compiler.constants;
        let mut bindings = compiler.bindings;
        bindings.resize(compiler.symbols.len(), None);

        // Shrink everything to least possible size
        bytecode.shrink_to_fit();
        constants.shrink_to_fit();

        debug!(
            bytes = bytecode.len(),
            constants = constants.len(),
            variables = compiler.symbols.len(),
            "compiled program"
        );

        Ok(Self {
            bytecode,
            constants,
            variables: compiler.symbols.into_names(),
            bindings,
        })
    }

    /// A human readable dump of the compiled program, used by `compile --debug`
    pub fn dump(&self) -> String {
        let mut out = String::with_capacity(256);

        out.push_str("Bytecode:");
        for b in &self.bytecode {
            let _ = write!(out, " {b:02x}");
        }
        out.push('\n');
        out.push_str(disassemble(&self.bytecode, true).trim_start());
        out.push('\n');

        out.push_str("Constants:");
        for (i, c) in self.constants.iter().enumerate() {
            let _ = write!(out, "\n{i:4} {} {c}", c.tag());
        }
        out.push('\n');

        out.push_str("Variables:");
        for (slot, name) in self.variables.iter().enumerate() {
            let _ = write!(out, "\n{slot:4} {name}");
            if let Some(Some(idx)) = self.bindings.get(slot) {
                let _ = write!(out, " = constant {idx}");
            }
        }
        out
    }
}

/// Compiles a list of statements into bytecode, a constant pool and a variable table.
/// Compiling the same statements twice yields identical programs.
pub fn compile(ast: &[Stmt]) -> Result<Program, CompileError> {
    Program::new(ast)
}

// Converts an array of bytes to a string representation consisting of the OpCode along with its operand
// For example: [OpCode::LoadConst, 1] -> "LOAD_CONST(1)"
pub fn disassemble(code: &[u8], positions: bool) -> String {
    let mut ip = 0;
    let mut str = String::with_capacity(256);

    while ip < code.len() {
        if ip > 0 {
            str.push(' ');
        }
        if positions {
            let _ = write!(str, "\n{ip:04} ");
        }

        let op = match OpCode::try_from(code[ip]) {
            Ok(op) => op,
            Err(byte) => {
                let _ = write!(str, "UNKNOWN({byte:#04x})");
                ip += 1;
                continue;
            }
        };
        str.push_str(op.name());

        if op.operands() > 0 {
            match code.get(ip + 1) {
                Some(operand) => {
                    let _ = write!(str, "({operand})");
                }
                None => str.push_str("(?)"),
            }
        }

        ip += 1 + op.operands();
    }

    str
}
