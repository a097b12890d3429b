use crate::token::{Position, TokenType};
use strum_macros::Display;
use thiserror::Error;

/// Every way lexing, parsing or running a program can fail.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    #[error("lexical error at {position}: {message}")]
    Lexical { message: String, position: Position },
    #[error("syntax error at {position}: {message}. Got: {found}")]
    Syntax {
        message: String,
        found: TokenType,
        position: Position,
    },
    #[error("runtime error{}: {message}", located(.position))]
    Runtime {
        message: String,
        position: Option<Position>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum ErrorKind {
    Lexical,
    Syntax,
    Runtime,
}

fn located(position: &Option<Position>) -> String {
    match position {
        Some(position) => format!(" at {}", position),
        None => String::new(),
    }
}

impl Error {
    pub fn runtime(message: impl Into<String>, position: Position) -> Error {
        Error::Runtime {
            message: message.into(),
            position: Some(position),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::Lexical { .. } => ErrorKind::Lexical,
            Error::Syntax { .. } => ErrorKind::Syntax,
            Error::Runtime { .. } => ErrorKind::Runtime,
        }
    }

    pub fn message(&self) -> &str {
        match self {
            Error::Lexical { message, .. }
            | Error::Syntax { message, .. }
            | Error::Runtime { message, .. } => message,
        }
    }

    pub fn position(&self) -> Option<Position> {
        match self {
            Error::Lexical { position, .. } | Error::Syntax { position, .. } => Some(*position),
            Error::Runtime { position, .. } => *position,
        }
    }
}
