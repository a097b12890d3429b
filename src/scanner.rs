use crate::token::{Token, TokenType};
use phf::phf_map;
use std::iter::Peekable;
use std::str::CharIndices;

/// Pull-based lexer. Each call to `next_token` consumes exactly one token
/// plus whatever whitespace and comments precede it.
pub struct Scanner<'a> {
    source: &'a str,
    iter: Peekable<CharIndices<'a>>,
    start: usize,
    line: usize,
    column: usize,
    start_line: usize,
    start_column: usize,
}

/// Scan a whole buffer. The returned vector always ends with either an
/// `End` token or the first `Unexpected` token.
pub fn scan_tokens(source: &str) -> Vec<Token> {
    let mut scanner = Scanner::new(source);
    let mut tokens = Vec::new();
    loop {
        let token = scanner.next_token();
        let done = matches!(token.kind, TokenType::End | TokenType::Unexpected);
        tokens.push(token);
        if done {
            return tokens;
        }
    }
}

impl<'a> Scanner<'a> {
    pub fn new(source: &'a str) -> Scanner<'a> {
        Scanner {
            source,
            iter: source.char_indices().peekable(),
            start: 0,
            line: 1,
            column: 1,
            start_line: 1,
            start_column: 1,
        }
    }

    pub fn next_token(&mut self) -> Token {
        loop {
            self.skip_whitespace();
            self.start = self.current();
            self.start_line = self.line;
            self.start_column = self.column;

            let c = match self.advance() {
                None => return self.token(TokenType::End),
                Some(c) => c,
            };
            return match c {
                '(' => self.token(TokenType::LeftParen),
                ')' => self.token(TokenType::RightParen),
                '{' => self.token(TokenType::LeftBrace),
                '}' => self.token(TokenType::RightBrace),
                '[' => self.token(TokenType::LeftBracket),
                ']' => self.token(TokenType::RightBracket),
                ':' => self.token(TokenType::Colon),
                ',' => self.token(TokenType::Comma),
                '*' => self.token(TokenType::Star),
                '/' => self.token(TokenType::Slash),
                ';' => {
                    // A semicolon that opens a line is insignificant.
                    if self.source[..self.start].ends_with('\n') {
                        continue;
                    }
                    self.token(TokenType::Semicolon)
                }
                '=' => self.either('=', TokenType::EqualEqual, TokenType::Equal),
                '+' => self.either('+', TokenType::PlusPlus, TokenType::Plus),
                '-' => self.either('-', TokenType::MinusMinus, TokenType::Minus),
                '<' => self.either('=', TokenType::LessEqual, TokenType::Less),
                '>' => self.either('=', TokenType::GreaterEqual, TokenType::Greater),
                '!' => {
                    if self.next_if('=') {
                        self.token(TokenType::BangEqual)
                    } else {
                        self.error("Unexpected character '!'")
                    }
                }
                '"' => self.string(),
                '0'..='9' => self.number(),
                'a'..='z' | 'A'..='Z' | '_' => self.identifier(),
                other => self.error(&format!("Unexpected character '{}'", other)),
            };
        }
    }

    fn skip_whitespace(&mut self) {
        while let Some(&(_, c)) = self.iter.peek() {
            match c {
                ' ' | '\r' | '\t' | '\n' => {
                    self.advance();
                }
                '/' if self.peek_next() == Some('/') => {
                    while let Some(&(_, c)) = self.iter.peek() {
                        if c == '\n' {
                            break;
                        }
                        self.advance();
                    }
                }
                _ => return,
            }
        }
    }

    fn current(&mut self) -> usize {
        match self.iter.peek() {
            None => self.source.len(),
            Some((idx, _)) => *idx,
        }
    }

    fn advance(&mut self) -> Option<char> {
        let (_, c) = self.iter.next()?;
        if c == '\n' {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }
        Some(c)
    }

    fn peek_next(&self) -> Option<char> {
        let mut lookahead = self.iter.clone();
        lookahead.next();
        lookahead.peek().map(|&(_, c)| c)
    }

    fn next_if(&mut self, expected: char) -> bool {
        if let Some(&(_, c)) = self.iter.peek() {
            if c == expected {
                self.advance();
                return true;
            }
        }
        false
    }

    fn either(&mut self, expected: char, matched: TokenType, otherwise: TokenType) -> Token {
        if self.next_if(expected) {
            self.token(matched)
        } else {
            self.token(otherwise)
        }
    }

    fn token(&mut self, kind: TokenType) -> Token {
        let current = self.current();
        Token {
            kind,
            lexeme: self.source[self.start..current].to_string(),
            line: self.start_line,
            column: self.start_column,
        }
    }

    fn error(&self, message: &str) -> Token {
        Token {
            kind: TokenType::Unexpected,
            lexeme: message.to_string(),
            line: self.start_line,
            column: self.start_column,
        }
    }

    fn string(&mut self) -> Token {
        loop {
            match self.advance() {
                None => return self.error("Unterminated string"),
                Some('"') => return self.token(TokenType::String),
                Some('\\') => {
                    if self.advance().is_none() {
                        return self.error("Unterminated string");
                    }
                }
                Some(_) => {}
            }
        }
    }

    fn number(&mut self) -> Token {
        self.digits();
        if let Some(&(_, '.')) = self.iter.peek() {
            if let Some('0'..='9') = self.peek_next() {
                self.advance();
                self.digits();
            }
        }
        self.token(TokenType::Number)
    }

    fn digits(&mut self) {
        while let Some(&(_, '0'..='9')) = self.iter.peek() {
            self.advance();
        }
    }

    fn identifier(&mut self) -> Token {
        while let Some(&(_, c)) = self.iter.peek() {
            match c {
                '0'..='9' | 'a'..='z' | 'A'..='Z' | '_' => {
                    self.advance();
                }
                _ => break,
            }
        }
        let current = self.current();
        match KEYWORDS.get(&self.source[self.start..current]) {
            None => self.token(TokenType::Identifier),
            Some(kind) => self.token(*kind),
        }
    }
}

static KEYWORDS: phf::Map<&'static str, TokenType> = phf_map! {
    "let" => TokenType::Let,
    "const" => TokenType::Const,
    "class" => TokenType::Class,
    "function" => TokenType::Function,
    "int" => TokenType::Int,
    "double" => TokenType::Double,
    "bool" => TokenType::Bool,
    "for" => TokenType::For,
    "while" => TokenType::While,
    "in" => TokenType::In,
    "print" => TokenType::Print,
    "return" => TokenType::Return,
};
