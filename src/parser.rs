use tracing::debug;

use crate::ast::{BinaryOperator, Expr, Literal, Stmt, UnaryOperator};
use crate::error::ParseError;
use crate::lexer::{Token, TokenKind, TokenLiteral};

type ParseResult<T> = Result<T, ParseError>;

/// Deepest expression tree the parser builds. Compiling and printing recurse over the tree.
pub const MAX_DEPTH: usize = 256;

/// Stands in for the end marker when the cursor is handed a token slice without one
static EOF: Token = Token {
    kind: TokenKind::Eof,
    lexeme: String::new(),
    literal: TokenLiteral::None,
    line: 0,
};

/// Recursive descent parser over a fully scanned token sequence.
///
/// Grammar, loosest binding first:
///
/// ```text
/// program    := statement* EOF
/// statement  := "print" "(" equality ")" ";"
///             | "var" IDENTIFIER "=" equality ";"
///             | equality ";"
/// equality   := comparison (("==" | "!=") comparison)*
/// comparison := term ((">" | ">=" | "<" | "<=") term)*
/// term       := factor (("+" | "-") factor)*
/// factor     := unary (("*" | "/") unary)*
/// unary      := ("!" | "-") unary | primary
/// primary    := NUMBER | STRING | "true" | "false" | "nil" | IDENTIFIER | "(" equality ")"
/// ```
pub struct Parser<'a> {
    tokens: &'a [Token],
    pos: usize,
    /// Current nesting of unary operators and parenthesised groups
    depth: usize,
}

impl<'a> Parser<'a> {
    pub fn new(tokens: &'a [Token]) -> Self {
        Parser {
            tokens,
            pos: 0,
            depth: 0,
        }
    }

    /// Looks `offset` tokens ahead of the cursor without consuming anything.
    /// Looking past the end yields the final EOF token, or a stand-in when the slice has none.
    fn peek(&self, offset: usize) -> &'a Token {
        let tokens: &'a [Token] = self.tokens;
        tokens
            .get(self.pos + offset)
            .or_else(|| tokens.last().filter(|t| t.kind == TokenKind::Eof))
            .unwrap_or(&EOF)
    }

    #[inline]
    fn check(&self, kind: TokenKind) -> bool {
        self.peek(0).kind == kind
    }

    /// Consumes the current token. The cursor never moves past the end marker.
    fn advance(&mut self) -> &'a Token {
        let token = self.peek(0);
        if token.kind != TokenKind::Eof {
            self.pos += 1;
        }
        token
    }

    fn expect(&mut self, kind: TokenKind, expected: &str) -> ParseResult<&'a Token> {
        if self.check(kind) {
            Ok(self.advance())
        } else {
            Err(self.error(expected))
        }
    }

    fn error(&self, expected: &str) -> ParseError {
        let token = self.peek(0);
        ParseError {
            line: token.line,
            lexeme: token.lexeme.clone(),
            expected: expected.to_string(),
        }
    }

    /// Runs `parse` one nesting level deeper, refusing to go past `MAX_DEPTH`
    fn nested<T>(&mut self, parse: impl FnOnce(&mut Self) -> ParseResult<T>) -> ParseResult<T> {
        if self.depth >= MAX_DEPTH {
            return Err(self.error("less nesting"));
        }
        self.depth += 1;
        let result = parse(self);
        self.depth -= 1;
        result
    }

    fn check_depth(&self, expr: Box<Expr>) -> ParseResult<Box<Expr>> {
        if expr.depth() > MAX_DEPTH {
            return Err(self.error("less nesting"));
        }
        Ok(expr)
    }

    /// Parses the whole token sequence into a list of statements.
    /// Stops at the first grammar violation.
    pub fn parse_program(&mut self) -> ParseResult<Vec<Stmt>> {
        let mut statements = Vec::new();
        while !self.check(TokenKind::Eof) {
            statements.push(self.statement()?);
        }
        Ok(statements)
    }

    fn statement(&mut self) -> ParseResult<Stmt> {
        match self.peek(0).kind {
            TokenKind::Print => self.print_statement(),
            TokenKind::Var => self.var_declaration(),
            _ => {
                let expr = self.equality()?;
                self.expect(TokenKind::Semicolon, "';' after expression")?;
                Ok(Stmt::Expr(*expr))
            }
        }
    }

    fn print_statement(&mut self) -> ParseResult<Stmt> {
        self.advance();
        self.expect(TokenKind::LeftParen, "'(' after 'print'")?;
        let expr = self.equality()?;
        self.expect(TokenKind::RightParen, "')' after expression")?;
        self.expect(TokenKind::Semicolon, "';' after value")?;
        Ok(Stmt::Print(*expr))
    }

    fn var_declaration(&mut self) -> ParseResult<Stmt> {
        self.advance();
        let name = self.expect(TokenKind::Identifier, "variable name")?.clone();
        self.expect(TokenKind::Equal, "'=' after variable name")?;
        let initializer = self.equality()?;
        self.expect(TokenKind::Semicolon, "';' after variable declaration")?;
        Ok(Stmt::Var {
            name,
            initializer: *initializer,
        })
    }

    /// Parses a left-associative chain of binary operators from the given set
    fn binary(
        &mut self,
        operand: fn(&mut Self) -> ParseResult<Box<Expr>>,
        operators: &[TokenKind],
    ) -> ParseResult<Box<Expr>> {
        let mut left = operand(self)?;

        while operators.contains(&self.peek(0).kind) {
            let token = self.advance();
            let Some(operator) = BinaryOperator::from_token(token.kind) else {
                return Err(self.error("binary operator"));
            };
            let right = operand(self)?;
            left = self.check_depth(Expr::binary(left, operator, right, token.line))?;
        }

        Ok(left)
    }

    fn equality(&mut self) -> ParseResult<Box<Expr>> {
        self.binary(
            Self::comparison,
            &[TokenKind::EqualEqual, TokenKind::BangEqual],
        )
    }

    fn comparison(&mut self) -> ParseResult<Box<Expr>> {
        self.binary(
            Self::term,
            &[
                TokenKind::Greater,
                TokenKind::GreaterEqual,
                TokenKind::Less,
                TokenKind::LessEqual,
            ],
        )
    }

    fn term(&mut self) -> ParseResult<Box<Expr>> {
        self.binary(Self::factor, &[TokenKind::Plus, TokenKind::Minus])
    }

    fn factor(&mut self) -> ParseResult<Box<Expr>> {
        self.binary(Self::unary, &[TokenKind::Star, TokenKind::Slash])
    }

    fn unary(&mut self) -> ParseResult<Box<Expr>> {
        if let Some(operator) = UnaryOperator::from_token(self.peek(0).kind) {
            let line = self.advance().line;
            let right = self.nested(Self::unary)?;
            return self.check_depth(Expr::unary(operator, right, line));
        }

        self.primary()
    }

    fn primary(&mut self) -> ParseResult<Box<Expr>> {
        let token = self.peek(0);
        let expr = match (&token.kind, &token.literal) {
            (TokenKind::Number, TokenLiteral::Number(text)) => {
                let value = text.parse::<f64>().map_err(|_| self.error("number"))?;
                Expr::literal(Literal::Number(value))
            }
            (TokenKind::String, TokenLiteral::String(value)) => {
                Expr::literal(Literal::String(value.clone()))
            }
            (TokenKind::True, _) => Expr::literal(Literal::Bool(true)),
            (TokenKind::False, _) => Expr::literal(Literal::Bool(false)),
            (TokenKind::Nil, _) => Expr::literal(Literal::Nil),
            (TokenKind::Identifier, _) => Box::new(Expr::Variable {
                name: token.lexeme.clone(),
                line: token.line,
            }),
            (TokenKind::LeftParen, _) => {
                self.advance();
                let expr = self.nested(Self::equality)?;
                self.expect(TokenKind::RightParen, "')' after expression")?;
                return Ok(expr);
            }
            _ => return Err(self.error("expression")),
        };

        self.advance();
        Ok(expr)
    }
}

/// Parses a fully scanned token sequence into its list of statements.
pub fn parse(tokens: &[Token]) -> Result<Vec<Stmt>, ParseError> {
    let statements = Parser::new(tokens).parse_program()?;
    debug!(statements = statements.len(), "parsed program");
    Ok(statements)
}
