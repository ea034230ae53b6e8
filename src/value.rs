use std::fmt::Display;

use crate::ast::Literal;

/// A runtime value. Constants in the constant pool and values on the VM stack are both of this type.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Nil,
    Number(f64),
    Bool(bool),
    String(String),
}

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum Type {
    Nil,
    Number,
    Bool,
    String,
}

/// The operands of an operation were of the wrong type
#[derive(Debug, PartialEq)]
pub(crate) struct Mismatch {
    pub expected: &'static str,
    pub found: String,
}

impl Mismatch {
    fn numbers(left: &Value, right: &Value) -> Self {
        Mismatch {
            expected: "numbers",
            found: format!("{} and {}", left.tag(), right.tag()),
        }
    }
}

macro_rules! impl_arith {
    ($func_name:ident, $op:tt) => {
        #[inline]
        pub(crate) fn $func_name(&self, rhs: &Self) -> Result<Value, Mismatch> {
            match (self, rhs) {
                (Value::Number(a), Value::Number(b)) => Ok(Value::Number(a $op b)),
                _ => Err(Mismatch::numbers(self, rhs)),
            }
        }
    };
}

macro_rules! impl_cmp {
    ($func_name:ident, $op:tt) => {
        #[inline]
        pub(crate) fn $func_name(&self, rhs: &Self) -> Result<Value, Mismatch> {
            match (self, rhs) {
                (Value::Number(a), Value::Number(b)) => Ok(Value::Bool(a $op b)),
                _ => Err(Mismatch::numbers(self, rhs)),
            }
        }
    };
}

impl Value {
    /// Returns the type of this value
    pub fn tag(&self) -> Type {
        match self {
            Value::Nil => Type::Nil,
            Value::Number(_) => Type::Number,
            Value::Bool(_) => Type::Bool,
            Value::String(_) => Type::String,
        }
    }

    /// `nil` and `false` are falsey, everything else is truthy
    pub fn is_truthy(&self) -> bool {
        !matches!(self, Value::Nil | Value::Bool(false))
    }

    impl_arith!(add, +);
    impl_arith!(sub, -);
    impl_arith!(mul, *);
    impl_arith!(div, /);

    impl_cmp!(gt, >);
    impl_cmp!(gte, >=);
    impl_cmp!(lt, <);
    impl_cmp!(lte, <=);

    /// Values of different types are never equal
    #[inline]
    pub(crate) fn eq(&self, rhs: &Self) -> Value {
        Value::Bool(self == rhs)
    }

    #[inline]
    pub(crate) fn neq(&self, rhs: &Self) -> Value {
        Value::Bool(self != rhs)
    }

    #[inline]
    pub(crate) fn not(&self) -> Value {
        Value::Bool(!self.is_truthy())
    }

    #[inline]
    pub(crate) fn negate(&self) -> Result<Value, Mismatch> {
        match self {
            Value::Number(n) => Ok(Value::Number(-n)),
            _ => Err(Mismatch {
                expected: "a number",
                found: self.tag().to_string(),
            }),
        }
    }
}

impl From<&Literal> for Value {
    fn from(literal: &Literal) -> Self {
        match literal {
            Literal::Nil => Value::Nil,
            Literal::Number(n) => Value::Number(*n),
            Literal::String(s) => Value::String(s.clone()),
            Literal::Bool(b) => Value::Bool(*b),
        }
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::Number(value)
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Bool(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::String(value.to_string())
    }
}

/// The textual form written by PRINT
impl Display for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Value::Nil => f.write_str("nil"),
            Value::Number(n) => write!(f, "{n}"),
            Value::Bool(b) => f.write_str(if *b { "true" } else { "false" }),
            Value::String(s) => f.write_str(s),
        }
    }
}

impl Display for Type {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Type::Nil => f.write_str("nil"),
            Type::Number => f.write_str("number"),
            Type::Bool => f.write_str("bool"),
            Type::String => f.write_str("string"),
        }
    }
}
