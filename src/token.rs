use std::fmt;
use strum_macros::Display;

#[rustfmt::skip]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum TokenType {
    // Literals.
    Identifier, Number, String,

    // Keywords.
    Let, Const, Class, Function,
    Int, Double, Bool,
    For, While, In, Print, Return,

    // Single-character tokens.
    LeftParen, RightParen, LeftBrace, RightBrace, LeftBracket, RightBracket,
    Colon, Comma, Semicolon, Star, Slash,

    // One or two character tokens.
    Plus, PlusPlus,
    Minus, MinusMinus,
    Equal, EqualEqual,
    Less, LessEqual,
    Greater, GreaterEqual,
    BangEqual,

    End,
    // Lexical failure; the lexeme holds the message.
    Unexpected,
}

/// 1-based line and column of the first character of a token or node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Position {
    pub line: usize,
    pub column: usize,
}

impl Position {
    pub fn new(line: usize, column: usize) -> Position {
        Position { line, column }
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenType,
    pub lexeme: String,
    pub line: usize,
    pub column: usize,
}

impl Token {
    pub fn position(&self) -> Position {
        Position::new(self.line, self.column)
    }
}
