use std::fmt::Display;

use crate::lexer::{Token, TokenKind};

#[derive(PartialEq, Debug, Clone)]
pub enum Literal {
    Nil,
    Number(f64),
    String(String),
    Bool(bool),
}

#[derive(PartialEq, Debug, Clone)]
pub enum Expr {
    Literal(Literal),
    /// A reference to a (global) variable by name
    Variable {
        name: String,
        line: usize,
    },
    Unary {
        operator: UnaryOperator,
        right: Box<Expr>,
        line: usize,
    },
    Binary {
        left: Box<Expr>,
        operator: BinaryOperator,
        right: Box<Expr>,
        line: usize,
    },
}

#[derive(PartialEq, Debug, Clone)]
pub enum Stmt {
    Print(Expr),
    Var { name: Token, initializer: Expr },
    Expr(Expr),
}

#[derive(PartialEq, Eq, Debug, Clone, Copy)]
pub enum BinaryOperator {
    Add,
    Subtract,
    Multiply,
    Divide,
    Gt,
    Gte,
    Lt,
    Lte,
    Eq,
    Neq,
}

#[derive(PartialEq, Eq, Debug, Clone, Copy)]
pub enum UnaryOperator {
    /// `-`
    Negate,
    /// `!`
    Not,
}

impl BinaryOperator {
    pub(crate) fn from_token(kind: TokenKind) -> Option<Self> {
        let op = match kind {
            TokenKind::Plus => BinaryOperator::Add,
            TokenKind::Minus => BinaryOperator::Subtract,
            TokenKind::Star => BinaryOperator::Multiply,
            TokenKind::Slash => BinaryOperator::Divide,
            TokenKind::Greater => BinaryOperator::Gt,
            TokenKind::GreaterEqual => BinaryOperator::Gte,
            TokenKind::Less => BinaryOperator::Lt,
            TokenKind::LessEqual => BinaryOperator::Lte,
            TokenKind::EqualEqual => BinaryOperator::Eq,
            TokenKind::BangEqual => BinaryOperator::Neq,
            _ => return None,
        };
        Some(op)
    }

    pub fn symbol(self) -> &'static str {
        match self {
            BinaryOperator::Add => "+",
            BinaryOperator::Subtract => "-",
            BinaryOperator::Multiply => "*",
            BinaryOperator::Divide => "/",
            BinaryOperator::Gt => ">",
            BinaryOperator::Gte => ">=",
            BinaryOperator::Lt => "<",
            BinaryOperator::Lte => "<=",
            BinaryOperator::Eq => "==",
            BinaryOperator::Neq => "!=",
        }
    }
}

impl UnaryOperator {
    pub(crate) fn from_token(kind: TokenKind) -> Option<Self> {
        match kind {
            TokenKind::Minus => Some(UnaryOperator::Negate),
            TokenKind::Bang => Some(UnaryOperator::Not),
            _ => None,
        }
    }

    pub fn symbol(self) -> &'static str {
        match self {
            UnaryOperator::Negate => "-",
            UnaryOperator::Not => "!",
        }
    }
}

impl Expr {
    pub fn literal(value: Literal) -> Box<Expr> {
        Box::new(Expr::Literal(value))
    }

    pub fn unary(operator: UnaryOperator, right: Box<Expr>, line: usize) -> Box<Expr> {
        Box::new(Expr::Unary {
            operator,
            right,
            line,
        })
    }

    /// The number of nodes on the longest path from this expression down to a leaf
    pub fn depth(&self) -> usize {
        match self {
            Expr::Literal(_) | Expr::Variable { .. } => 1,
            Expr::Unary { right, .. } => 1 + right.depth(),
            Expr::Binary { left, right, .. } => 1 + left.depth().max(right.depth()),
        }
    }

    pub fn binary(
        left: Box<Expr>,
        operator: BinaryOperator,
        right: Box<Expr>,
        line: usize,
    ) -> Box<Expr> {
        Box::new(Expr::Binary {
            left,
            operator,
            right,
            line,
        })
    }
}

// The Display impls below produce the parenthesised prefix form printed by the `parse` command.

impl Display for Literal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Literal::Nil => f.write_str("nil"),
            Literal::Number(n) if n.fract() == 0.0 && n.is_finite() => write!(f, "{n:.1}"),
            Literal::Number(n) => write!(f, "{n}"),
            Literal::String(s) => f.write_str(s),
            Literal::Bool(b) => write!(f, "{b}"),
        }
    }
}

impl Display for Expr {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Expr::Literal(value) => write!(f, "{value}"),
            Expr::Variable { name, .. } => f.write_str(name),
            Expr::Unary {
                operator, right, ..
            } => write!(f, "({} {right})", operator.symbol()),
            Expr::Binary {
                left,
                operator,
                right,
                ..
            } => write!(f, "({} {left} {right})", operator.symbol()),
        }
    }
}

impl Display for Stmt {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Stmt::Print(expr) => write!(f, "(print {expr})"),
            Stmt::Var { name, initializer } => write!(f, "(var {} {initializer})", name.lexeme),
            Stmt::Expr(expr) => write!(f, "{expr}"),
        }
    }
}
