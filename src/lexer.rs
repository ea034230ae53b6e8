use std::fmt::Display;
use std::str::Chars;

use tracing::debug;

use crate::error::ScanError;

use self::TokenKind::*;

#[derive(Debug, PartialEq, Clone)]
pub struct Token {
    pub kind: TokenKind,
    /// The raw source text this token was scanned from
    pub lexeme: std::string::String,
    pub literal: TokenLiteral,
    pub line: usize,
}

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum TokenKind {
    // One-char tokens:
    /// "("
    LeftParen,
    /// ")"
    RightParen,
    /// "{"
    LeftBrace,
    /// "}"
    RightBrace,
    /// ","
    Comma,
    /// "."
    Dot,
    /// "-"
    Minus,
    /// "+"
    Plus,
    /// ";"
    Semicolon,
    /// "/"
    Slash,
    /// "*"
    Star,

    // One or two char tokens:
    /// "!"
    Bang,
    /// "!="
    BangEqual,
    /// "="
    Equal,
    /// "=="
    EqualEqual,
    /// ">"
    Greater,
    /// ">="
    GreaterEqual,
    /// "<"
    Less,
    /// "<="
    LessEqual,

    // Literals:
    Identifier,
    String,
    Number,

    // Keywords:
    And,
    Class,
    Else,
    False,
    For,
    Fun,
    If,
    Nil,
    Or,
    Print,
    Return,
    Super,
    This,
    True,
    Var,
    While,

    Eof,
}

/// The literal value carried by a token, if any.
/// Numbers are kept in their normalised textual form, e.g. `3` becomes `3.0`.
#[derive(Debug, PartialEq, Clone)]
pub enum TokenLiteral {
    None,
    String(std::string::String),
    Number(std::string::String),
}

/// The single mode register of the scanner
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
enum Mode {
    Normal,
    InString,
    InComment,
    InNumber,
    InIdentifier,
}

/// The result of scanning a complete source buffer.
/// Lexical errors do not stop the scanner, so `tokens` is always terminated by an EOF token.
#[derive(Debug)]
pub struct Scanned {
    pub tokens: Vec<Token>,
    pub errors: Vec<ScanError>,
}

impl Scanned {
    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }
}

/// Scans the given source into a token sequence, collecting every lexical error along the way.
pub fn scan(source: &str) -> Scanned {
    Scanner::new(source).scan_tokens()
}

pub(crate) struct Scanner<'a> {
    input: &'a str,
    /// Iterator over chars. Slightly faster than a &str.
    chars: Chars<'a>,
    pos: usize,
    mode: Mode,
    line: usize,
    /// Set right after emitting a token that may combine with the character that immediately follows it
    connected: bool,
    /// Offset at which the token currently being built (string, number, identifier) started
    start: usize,
    tokens: Vec<Token>,
    errors: Vec<ScanError>,
}

impl<'a> Scanner<'a> {
    pub(crate) fn new(input: &'a str) -> Scanner<'a> {
        Scanner {
            input,
            chars: input.chars(),
            pos: 0,
            mode: Mode::Normal,
            line: 1,
            connected: false,
            start: 0,
            tokens: Vec::with_capacity(input.len() / 2),
            errors: Vec::new(),
        }
    }

    /// Peeks the next symbol from the input stream without consuming it.
    fn first(&self) -> Option<char> {
        self.chars.clone().next()
    }

    /// Moves to the next character.
    fn bump(&mut self) -> Option<char> {
        let c = self.chars.next()?;
        self.pos += c.len_utf8();
        Some(c)
    }

    pub(crate) fn scan_tokens(mut self) -> Scanned {
        while let Some(c) = self.bump() {
            let at = self.pos - c.len_utf8();
            self.step(c, at);
        }
        self.finish();

        self.tokens.push(Token::new(Eof, "", TokenLiteral::None, self.line));
        debug!(
            tokens = self.tokens.len(),
            errors = self.errors.len(),
            "scanned source"
        );

        Scanned {
            tokens: self.tokens,
            errors: self.errors,
        }
    }

    fn step(&mut self, c: char, at: usize) {
        match self.mode {
            Mode::Normal => (),
            Mode::InComment => {
                if c != '\n' {
                    return;
                }
                self.mode = Mode::Normal;
            }
            Mode::InString => {
                self.string_char(c, at);
                return;
            }
            Mode::InNumber => {
                if self.number_continues(c, at) {
                    return;
                }
                self.finish_number(at);
            }
            Mode::InIdentifier => {
                if is_identifier_char(c) {
                    return;
                }
                self.finish_identifier(at);
            }
        }

        self.normal_char(c, at);
    }

    /// Flushes whatever token is still being built once the input runs out
    fn finish(&mut self) {
        let end = self.input.len();
        match self.mode {
            Mode::InNumber => self.finish_number(end),
            Mode::InIdentifier => self.finish_identifier(end),
            Mode::InString => {
                self.errors
                    .push(ScanError::UnterminatedString { line: self.line });
            }
            Mode::Normal | Mode::InComment => (),
        }
        self.mode = Mode::Normal;
    }

    fn normal_char(&mut self, c: char, at: usize) {
        let connected = std::mem::take(&mut self.connected);

        match c {
            '(' => self.push_symbol(LeftParen, "("),
            ')' => self.push_symbol(RightParen, ")"),
            '{' => self.push_symbol(LeftBrace, "{"),
            '}' => self.push_symbol(RightBrace, "}"),
            ',' => self.push_symbol(Comma, ","),
            '.' => self.push_symbol(Dot, "."),
            '-' => self.push_symbol(Minus, "-"),
            '+' => self.push_symbol(Plus, "+"),
            ';' => self.push_symbol(Semicolon, ";"),
            '*' => self.push_symbol(Star, "*"),
            '=' => {
                if connected && self.combine_with_equal() {
                    return;
                }
                self.push_symbol(Equal, "=");
                self.connected = true;
            }
            '!' => {
                self.push_symbol(Bang, "!");
                self.connected = true;
            }
            '<' => {
                self.push_symbol(Less, "<");
                self.connected = true;
            }
            '>' => {
                self.push_symbol(Greater, ">");
                self.connected = true;
            }
            '/' => {
                if connected && self.tokens.last().map(|t| t.kind) == Some(Slash) {
                    self.tokens.pop();
                    self.mode = Mode::InComment;
                    return;
                }
                self.push_symbol(Slash, "/");
                self.connected = true;
            }
            '"' => {
                self.start = at;
                self.mode = Mode::InString;
            }
            '\n' => self.line += 1,
            ' ' | '\t' | '\r' => (),
            c if c.is_ascii_digit() => {
                self.start = at;
                self.mode = Mode::InNumber;
            }
            c if is_identifier_char(c) => {
                self.start = at;
                self.mode = Mode::InIdentifier;
            }
            c => self.errors.push(ScanError::UnexpectedCharacter {
                line: self.line,
                character: c,
            }),
        }
    }

    /// Replaces the provisional one-char token with its two-char `=` form, if it has one
    fn combine_with_equal(&mut self) -> bool {
        let Some(last) = self.tokens.last_mut() else {
            return false;
        };
        let (kind, lexeme) = match last.kind {
            Equal => (EqualEqual, "=="),
            Bang => (BangEqual, "!="),
            Less => (LessEqual, "<="),
            Greater => (GreaterEqual, ">="),
            _ => return false,
        };
        last.kind = kind;
        last.lexeme = lexeme.to_string();
        true
    }

    fn string_char(&mut self, c: char, at: usize) {
        match c {
            '"' => {
                let lexeme = &self.input[self.start..=at];
                let content = &self.input[self.start + 1..at];
                self.tokens.push(Token::new(
                    String,
                    lexeme,
                    TokenLiteral::String(content.to_string()),
                    self.line,
                ));
                self.mode = Mode::Normal;
            }
            '\n' => self.line += 1,
            _ => (),
        }
    }

    /// A number takes digits and at most one `.`, which must be followed by another digit
    fn number_continues(&self, c: char, at: usize) -> bool {
        if c.is_ascii_digit() {
            return true;
        }

        c == '.'
            && !self.input[self.start..at].contains('.')
            && self.first().is_some_and(|next| next.is_ascii_digit())
    }

    fn finish_number(&mut self, end: usize) {
        let lexeme = &self.input[self.start..end];
        let literal = TokenLiteral::Number(normalize_number(lexeme));
        self.tokens
            .push(Token::new(Number, lexeme, literal, self.line));
        self.mode = Mode::Normal;
    }

    fn finish_identifier(&mut self, end: usize) {
        let lexeme = &self.input[self.start..end];
        let kind = keyword(lexeme).unwrap_or(Identifier);
        self.tokens
            .push(Token::new(kind, lexeme, TokenLiteral::None, self.line));
        self.mode = Mode::Normal;
    }

    fn push_symbol(&mut self, kind: TokenKind, lexeme: &str) {
        self.tokens
            .push(Token::new(kind, lexeme, TokenLiteral::None, self.line));
    }
}

impl Token {
    pub fn new(kind: TokenKind, lexeme: &str, literal: TokenLiteral, line: usize) -> Token {
        Token {
            kind,
            lexeme: lexeme.to_string(),
            literal,
            line,
        }
    }
}

#[inline]
fn is_identifier_char(c: char) -> bool {
    c.is_ascii_alphabetic() || c == '_'
}

/// Trims trailing zeroes from the fractional part, always keeping at least one fractional digit
fn normalize_number(lexeme: &str) -> std::string::String {
    match lexeme.split_once('.') {
        Some((whole, fraction)) => {
            let fraction = fraction.trim_end_matches('0');
            if fraction.is_empty() {
                format!("{whole}.0")
            } else {
                format!("{whole}.{fraction}")
            }
        }
        None => format!("{lexeme}.0"),
    }
}

fn keyword(ident: &str) -> Option<TokenKind> {
    let kind = match ident {
        "and" => And,
        "class" => Class,
        "else" => Else,
        "false" => False,
        "for" => For,
        "fun" => Fun,
        "if" => If,
        "nil" => Nil,
        "or" => Or,
        "print" => Print,
        "return" => Return,
        "super" => Super,
        "this" => This,
        "true" => True,
        "var" => Var,
        "while" => While,
        _ => return None,
    };
    Some(kind)
}

impl Display for TokenKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            LeftParen => "LEFT_PAREN",
            RightParen => "RIGHT_PAREN",
            LeftBrace => "LEFT_BRACE",
            RightBrace => "RIGHT_BRACE",
            Comma => "COMMA",
            Dot => "DOT",
            Minus => "MINUS",
            Plus => "PLUS",
            Semicolon => "SEMICOLON",
            Slash => "SLASH",
            Star => "STAR",
            Bang => "BANG",
            BangEqual => "BANG_EQUAL",
            Equal => "EQUAL",
            EqualEqual => "EQUAL_EQUAL",
            Greater => "GREATER",
            GreaterEqual => "GREATER_EQUAL",
            Less => "LESS",
            LessEqual => "LESS_EQUAL",
            Identifier => "IDENTIFIER",
            String => "STRING",
            Number => "NUMBER",
            And => "AND",
            Class => "CLASS",
            Else => "ELSE",
            False => "FALSE",
            For => "FOR",
            Fun => "FUN",
            If => "IF",
            Nil => "NIL",
            Or => "OR",
            Print => "PRINT",
            Return => "RETURN",
            Super => "SUPER",
            This => "THIS",
            True => "TRUE",
            Var => "VAR",
            While => "WHILE",
            Eof => "EOF",
        };
        f.write_str(name)
    }
}

impl Display for TokenLiteral {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TokenLiteral::None => f.write_str("null"),
            TokenLiteral::String(s) | TokenLiteral::Number(s) => f.write_str(s),
        }
    }
}

/// Formats a token the way the `tokenize` command dumps it: `KIND lexeme literal`
impl Display for Token {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {} {}", self.kind, self.lexeme, self.literal)
    }
}
