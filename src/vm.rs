use std::io::Write;

use tracing::{debug, trace};

use crate::compiler::{OpCode, Program};
use crate::error::{Error, RuntimeError};
use crate::value::{Mismatch, Value};

/// A stack machine executing one compiled program.
///
/// The VM owns the operand stack and the value stored in every variable slot.
/// The program itself (bytecode, constants, variable names) is only ever read.
pub struct Vm<'a> {
    program: &'a Program,
    ip: usize,
    stack: Vec<Value>,
    slots: Vec<Option<Value>>,
}

impl<'a> Vm<'a> {
    pub fn new(program: &'a Program) -> Self {
        Self {
            program,
            ip: 0,
            stack: Vec::with_capacity(64),
            slots: vec![None; program.variables.len()],
        }
    }

    fn pop(&mut self, opcode: OpCode) -> Result<Value, RuntimeError> {
        self.stack.pop().ok_or(RuntimeError::StackUnderflow {
            opcode: opcode.name(),
            ip: self.ip,
        })
    }

    /// Pops the right operand, then the left one
    fn pop_pair(&mut self, opcode: OpCode) -> Result<(Value, Value), RuntimeError> {
        let right = self.pop(opcode)?;
        let left = self.pop(opcode)?;
        Ok((left, right))
    }

    fn operand(&self, opcode: OpCode) -> Result<usize, RuntimeError> {
        self.program
            .bytecode
            .get(self.ip + 1)
            .map(|b| *b as usize)
            .ok_or(RuntimeError::MissingOperand {
                opcode: opcode.name(),
                ip: self.ip,
            })
    }

    fn type_mismatch(&self, opcode: OpCode, mismatch: Mismatch) -> RuntimeError {
        RuntimeError::TypeMismatch {
            opcode: opcode.name(),
            expected: mismatch.expected,
            found: mismatch.found,
            ip: self.ip,
        }
    }

    /// Executes the program from its first instruction to the end of the bytecode.
    /// Every PRINT writes one line to `out`.
    pub fn run(&mut self, out: &mut impl Write) -> Result<(), RuntimeError> {
        let program = self.program;
        let code = &program.bytecode;

        macro_rules! impl_binary_op_method {
            ($opcode:ident, $op:ident) => {{
                let (left, right) = self.pop_pair($opcode)?;
                let result = left.$op(&right).map_err(|m| self.type_mismatch($opcode, m))?;
                self.stack.push(result);
            }};
        }

        macro_rules! impl_equality_op {
            ($opcode:ident, $op:ident) => {{
                let (left, right) = self.pop_pair($opcode)?;
                self.stack.push(left.$op(&right));
            }};
        }

        debug!(bytes = code.len(), slots = self.slots.len(), "executing program");

        while self.ip < code.len() {
            let opcode = OpCode::try_from(code[self.ip])
                .map_err(|byte| RuntimeError::UnknownOpcode { byte, ip: self.ip })?;
            trace!(ip = self.ip, %opcode, stack = self.stack.len(), "execute");

            match opcode {
                OpCode::LoadConst => {
                    let idx = self.operand(opcode)?;
                    let value = program
                        .constants
                        .get(idx)
                        .ok_or(RuntimeError::ConstantOutOfRange { index: idx, ip: self.ip })?;
                    self.stack.push(value.clone());
                }
                OpCode::Add => impl_binary_op_method!(opcode, add),
                OpCode::Sub => impl_binary_op_method!(opcode, sub),
                OpCode::Mul => impl_binary_op_method!(opcode, mul),
                OpCode::Div => impl_binary_op_method!(opcode, div),
                OpCode::Grt => impl_binary_op_method!(opcode, gt),
                OpCode::Grte => impl_binary_op_method!(opcode, gte),
                OpCode::Lss => impl_binary_op_method!(opcode, lt),
                OpCode::Lsse => impl_binary_op_method!(opcode, lte),
                OpCode::Eq => impl_equality_op!(opcode, eq),
                OpCode::Neq => impl_equality_op!(opcode, neq),
                OpCode::Not => {
                    let value = self.pop(opcode)?;
                    self.stack.push(value.not());
                }
                OpCode::Neg => {
                    let value = self.pop(opcode)?;
                    let result = value.negate().map_err(|m| self.type_mismatch(opcode, m))?;
                    self.stack.push(result);
                }
                OpCode::Print => {
                    let value = self.pop(opcode)?;
                    writeln!(out, "{value}")?;
                }
                OpCode::LoadVar => {
                    let slot = self.operand(opcode)?;
                    match self.slots.get(slot) {
                        Some(Some(value)) => {
                            let value = value.clone();
                            self.stack.push(value);
                        }
                        Some(None) => {
                            return Err(RuntimeError::UnboundVariable {
                                name: program.variables.get(slot).cloned().unwrap_or_default(),
                                ip: self.ip,
                            })
                        }
                        None => return Err(RuntimeError::SlotOutOfRange { slot, ip: self.ip }),
                    }
                }
                OpCode::StoreVar => {
                    let slot = self.operand(opcode)?;
                    let value = self.pop(opcode)?;
                    let ip = self.ip;
                    let Some(cell) = self.slots.get_mut(slot) else {
                        return Err(RuntimeError::SlotOutOfRange { slot, ip });
                    };
                    *cell = Some(value);
                }
                OpCode::Return => {
                    // statement boundary: drop whatever an expression statement left behind
                    self.stack.clear();
                }
            }

            self.ip += 1 + opcode.operands();
        }

        Ok(())
    }
}

/// Scans, parses, compiles and executes the given source, returning everything it printed
pub fn run_str(program: &str) -> Result<String, Error> {
    let mut out = Vec::with_capacity(64);
    crate::run(program, &mut out)?;
    Ok(String::from_utf8_lossy(&out).into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn program(bytecode: Vec<u8>, constants: Vec<Value>, variables: &[&str]) -> Program {
        Program {
            bytecode,
            constants,
            variables: variables.iter().map(|v| v.to_string()).collect(),
            bindings: vec![None; variables.len()],
        }
    }

    fn execute(program: &Program) -> Result<String, RuntimeError> {
        let mut out = Vec::new();
        Vm::new(program).run(&mut out)?;
        Ok(String::from_utf8(out).unwrap())
    }

    #[test]
    fn test_print_expression() {
        assert_eq!(run_str("print(2 + 3 * 4);").unwrap(), "14\n");
        assert_eq!(run_str("print(1 - 2 - 3);").unwrap(), "-4\n");
        assert_eq!(run_str("print(7 / 2);").unwrap(), "3.5\n");
        assert_eq!(run_str("print((1 + 2) * 3);").unwrap(), "9\n");
    }

    #[test]
    fn test_infix_expression() {
        assert_eq!(run_str("print(4 == 4);").unwrap(), "true\n");
        assert_eq!(run_str("print(4 != 4);").unwrap(), "false\n");
        assert_eq!(run_str("print(4 > 4);").unwrap(), "false\n");
        assert_eq!(run_str("print(4 >= 4);").unwrap(), "true\n");
        assert_eq!(run_str("print(4 < 4);").unwrap(), "false\n");
        assert_eq!(run_str("print(4 <= 4);").unwrap(), "true\n");
    }

    #[test]
    fn test_operand_order() {
        assert_eq!(run_str("print(10 - 4);").unwrap(), "6\n");
        assert_eq!(run_str("print(8 / 2);").unwrap(), "4\n");
        assert_eq!(run_str("print(1 < 2);").unwrap(), "true\n");
    }

    #[test]
    fn test_unary() {
        assert_eq!(run_str("print(-3);").unwrap(), "-3\n");
        assert_eq!(run_str("print(--3);").unwrap(), "3\n");
        assert_eq!(run_str("print(!true);").unwrap(), "false\n");
        assert_eq!(run_str("print(!nil);").unwrap(), "true\n");
        assert_eq!(run_str("print(!0);").unwrap(), "false\n");
    }

    #[test]
    fn test_variables() {
        assert_eq!(run_str("var x = 5; print(x);").unwrap(), "5\n");
        assert_eq!(
            run_str("var x = 1; var y = x + 1; print(y * 10);").unwrap(),
            "20\n"
        );
        assert_eq!(run_str("var x = 1; var x = x + 1; print(x);").unwrap(), "2\n");
        assert_eq!(run_str("var s = \"hi\"; print(s);").unwrap(), "hi\n");
    }

    #[test]
    fn test_equality_across_types() {
        assert_eq!(run_str("print(1 == \"1\");").unwrap(), "false\n");
        assert_eq!(run_str("print(nil == nil);").unwrap(), "true\n");
        assert_eq!(run_str("print(nil != false);").unwrap(), "true\n");
        assert_eq!(run_str("print(\"a\" == \"a\");").unwrap(), "true\n");
    }

    #[test]
    fn test_expression_statements_print_nothing() {
        assert_eq!(run_str("1 + 2; \"x\"; nil;").unwrap(), "");
        assert_eq!(run_str("").unwrap(), "");
    }

    #[test]
    fn test_return_clears_the_stack() {
        let program = crate::compile_source("1; 2; 3;").unwrap();
        let mut vm = Vm::new(&program);
        vm.run(&mut Vec::new()).unwrap();
        assert!(vm.stack.is_empty());
    }

    #[test]
    fn test_division_by_zero() {
        assert_eq!(run_str("print(1 / 0);").unwrap(), "inf\n");
        assert_eq!(run_str("print(-1 / 0);").unwrap(), "-inf\n");
        assert_eq!(run_str("print(0 / 0);").unwrap(), "NaN\n");
    }

    #[test]
    fn test_unbound_variable() {
        let err = run_str("print(a);").unwrap_err();
        assert!(matches!(
            err,
            Error::Runtime(RuntimeError::UnboundVariable { ref name, ip: 0 }) if name == "a"
        ));
        assert_eq!(err.exit_code(), 70);
    }

    #[test]
    fn test_type_mismatch() {
        let err = run_str("print(\"a\" + 1);").unwrap_err();
        assert_eq!(
            err.to_string(),
            "Operands of ADD must be numbers, got string and number at offset 4."
        );
        assert!(run_str("print(-\"a\");").is_err());
        assert!(run_str("print(true < false);").is_err());
    }

    #[test]
    fn test_output_before_fault_is_kept() {
        let program = crate::compile_source("print(1); print(nil * 2); print(3);").unwrap();
        let mut out = Vec::new();
        let result = Vm::new(&program).run(&mut out);
        assert!(result.is_err());
        assert_eq!(out, b"1\n");
    }

    #[test]
    fn test_stack_underflow() {
        let p = program(vec![OpCode::Add as u8], vec![], &[]);
        assert!(matches!(
            execute(&p),
            Err(RuntimeError::StackUnderflow { opcode: "ADD", ip: 0 })
        ));

        let p = program(vec![OpCode::Print as u8], vec![], &[]);
        assert!(matches!(execute(&p), Err(RuntimeError::StackUnderflow { .. })));
    }

    #[test]
    fn test_malformed_bytecode() {
        let p = program(vec![0xee], vec![], &[]);
        assert!(matches!(
            execute(&p),
            Err(RuntimeError::UnknownOpcode { byte: 0xee, ip: 0 })
        ));

        let p = program(vec![OpCode::LoadConst as u8], vec![], &[]);
        assert!(matches!(execute(&p), Err(RuntimeError::MissingOperand { .. })));

        let p = program(vec![OpCode::LoadConst as u8, 3], vec![Value::Nil], &[]);
        assert!(matches!(
            execute(&p),
            Err(RuntimeError::ConstantOutOfRange { index: 3, ip: 0 })
        ));

        let p = program(vec![OpCode::LoadVar as u8, 1], vec![], &["a"]);
        assert!(matches!(
            execute(&p),
            Err(RuntimeError::SlotOutOfRange { slot: 1, .. })
        ));
    }

    #[test]
    fn test_store_var_takes_top_of_stack() {
        let p = program(
            vec![
                OpCode::LoadConst as u8,
                0,
                OpCode::LoadConst as u8,
                1,
                OpCode::StoreVar as u8,
                0,
                OpCode::LoadVar as u8,
                0,
                OpCode::Print as u8,
            ],
            vec![Value::from(1.0), Value::from("top")],
            &["a"],
        );
        assert_eq!(execute(&p).unwrap(), "top\n");
    }
}
