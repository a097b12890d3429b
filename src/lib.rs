pub mod ast;
pub mod callable;
pub mod environment;
pub mod error;
pub mod interpreter;
pub mod parser;
pub mod scanner;
pub mod token;

pub use ast::{Item, Value};
pub use error::{Error, ErrorKind};
pub use interpreter::{Flow, Interpreter};
pub use parser::Parser;

use std::io::Write;
use tracing::debug;

/// Name of the function invoked once all top-level input has been consumed.
pub const ENTRY_POINT: &str = "main";

/// Run a program: pull one top-level construct at a time, registering
/// functions and executing everything else immediately. Once the input is
/// exhausted, call `main()` if it was declared and return its result.
pub fn run<W: Write>(
    source: &str,
    interpreter: &mut Interpreter<W>,
) -> Result<Option<Value>, Error> {
    let mut parser = Parser::new(source);
    while !parser.is_at_end() {
        match parser.parse_top_level()? {
            Item::Function(decl) => interpreter.register(decl),
            Item::Statement(stmt) => {
                debug!(line = stmt.position().line, "executing top-level statement");
                interpreter.execute(&stmt)?;
            }
        }
    }

    if !interpreter.has_function(ENTRY_POINT) {
        debug!("no {} function declared", ENTRY_POINT);
        return Ok(None);
    }
    debug!("invoking {}", ENTRY_POINT);
    interpreter.call(ENTRY_POINT, &[]).map(Some)
}

/// Parse a whole program without running it.
pub fn parse_program(source: &str) -> Result<Vec<Item>, Error> {
    Parser::new(source).parse()
}
