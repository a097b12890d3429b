use crate::ast::{FunctionDecl, Value};
use crate::error::Error;
use crate::interpreter::{Flow, Interpreter};
use crate::token::Position;
use std::collections::BTreeMap;
use std::fmt;
use std::io::Write;
use std::rc::Rc;
use tracing::trace;

/// Deepest chain of active calls before a call is refused.
pub const MAX_CALL_DEPTH: usize = 200;

/// A declared function. Cloning shares the declaration.
#[derive(Clone, Debug)]
pub struct Function {
    decl: Rc<FunctionDecl>,
}

impl fmt::Display for Function {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<fn {}>", self.name())
    }
}

impl Function {
    pub fn new(decl: FunctionDecl) -> Function {
        Function {
            decl: Rc::new(decl),
        }
    }

    pub fn name(&self) -> &str {
        &self.decl.name
    }

    pub fn arity(&self) -> usize {
        self.decl.params.len()
    }

    /// Run the body with the parameters bound on top of the caller's
    /// environment. The whole environment is put back afterwards, so
    /// nothing the body binds or overwrites outlives the call. A body that
    /// finishes without `return` yields 0.
    pub fn call<W: Write>(
        &self,
        interpreter: &mut Interpreter<W>,
        arguments: &[Value],
        position: Option<Position>,
    ) -> Result<Value, Error> {
        if interpreter.depth >= MAX_CALL_DEPTH {
            return Err(Error::Runtime {
                message: "Call stack too deep".to_string(),
                position,
            });
        }
        if arguments.len() < self.arity() {
            return Err(Error::Runtime {
                message: format!(
                    "Function '{}' expects {} argument(s) but got {}",
                    self.name(),
                    self.arity(),
                    arguments.len()
                ),
                position,
            });
        }
        trace!(function = self.name(), ?arguments, "call");

        let saved = interpreter.environment.snapshot();
        for ((param, _), value) in self.decl.params.iter().zip(arguments) {
            interpreter.environment.define(param, *value);
        }
        interpreter.depth += 1;
        let result = interpreter.execute_block(&self.decl.body);
        interpreter.depth -= 1;
        interpreter.environment.restore(saved);

        let value = match result? {
            Flow::Return(value) => value,
            Flow::Normal => 0,
        };
        trace!(function = self.name(), value, "return");
        Ok(value)
    }
}

/// Registry of declared functions, keyed by name. Entries are never removed;
/// registering a name again replaces the earlier declaration.
#[derive(Debug, Default)]
pub struct FunctionTable {
    functions: BTreeMap<String, Function>,
}

impl FunctionTable {
    pub fn new() -> FunctionTable {
        FunctionTable {
            functions: BTreeMap::new(),
        }
    }

    pub fn register(&mut self, decl: FunctionDecl) -> Option<Function> {
        self.functions.insert(decl.name.clone(), Function::new(decl))
    }

    pub fn get(&self, name: &str) -> Option<&Function> {
        self.functions.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.functions.contains_key(name)
    }
}
