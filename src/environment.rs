use super::ast::Value;
use super::error::Error;
use super::token::Position;

use std::collections::BTreeMap;

/// The one flat mapping from variable name to value that an interpreter
/// owns for its lifetime. There are no nested scopes: a function call takes
/// a `snapshot`, binds its parameters on top of everything already visible,
/// and puts the snapshot back with `restore` when it returns.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Environment {
    values: BTreeMap<String, Value>,
}

impl Environment {
    pub fn new() -> Environment {
        Environment {
            values: BTreeMap::new(),
        }
    }

    /// Bind or overwrite `name`.
    pub fn define(&mut self, name: &str, value: Value) {
        self.values.insert(name.to_string(), value);
    }

    pub fn get(&self, name: &str, position: Position) -> Result<Value, Error> {
        match self.values.get(name) {
            Some(value) => Ok(*value),
            None => Err(Error::runtime(
                format!("Undefined variable: {}", name),
                position,
            )),
        }
    }

    pub fn lookup(&self, name: &str) -> Option<Value> {
        self.values.get(name).copied()
    }

    pub fn snapshot(&self) -> Environment {
        self.clone()
    }

    pub fn restore(&mut self, saved: Environment) {
        *self = saved;
    }
}
