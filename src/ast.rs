use super::token::Position;
use std::fmt;
use std::fmt::Formatter;
use strum_macros::{Display, EnumIter};

/// Every runtime value is an integer.
pub type Value = i64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumIter)]
pub enum Primitive {
    #[strum(serialize = "int")]
    Int,
    #[strum(serialize = "double")]
    Double,
    #[strum(serialize = "bool")]
    Bool,
}

/// A declared type. Array types parse but have no runtime meaning.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Type {
    pub primitive: Primitive,
    pub is_array: bool,
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        if self.is_array {
            write!(f, "{}[]", self.primitive)
        } else {
            write!(f, "{}", self.primitive)
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum BinaryOperator {
    #[strum(serialize = "+")]
    Add,
    #[strum(serialize = "-")]
    Subtract,
    #[strum(serialize = "*")]
    Multiply,
    #[strum(serialize = "/")]
    Divide,
    #[strum(serialize = "<")]
    Less,
    #[strum(serialize = "<=")]
    LessEqual,
    #[strum(serialize = ">")]
    Greater,
    #[strum(serialize = ">=")]
    GreaterEqual,
    #[strum(serialize = "==")]
    Equal,
    #[strum(serialize = "!=")]
    NotEqual,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Expression {
    Binary {
        operator: BinaryOperator,
        left: Box<Expression>,
        right: Box<Expression>,
        position: Position,
    },
    Identifier {
        name: String,
        position: Position,
    },
    Number {
        value: Value,
        position: Position,
    },
    Call {
        callee: String,
        arguments: Vec<Expression>,
        position: Position,
    },
    Index {
        target: Box<Expression>,
        index: Box<Expression>,
        position: Position,
    },
    Array {
        elements: Vec<Expression>,
        position: Position,
    },
    Assign {
        name: String,
        value: Box<Expression>,
        position: Position,
    },
}

impl Expression {
    pub fn position(&self) -> Position {
        match self {
            Expression::Binary { position, .. }
            | Expression::Identifier { position, .. }
            | Expression::Number { position, .. }
            | Expression::Call { position, .. }
            | Expression::Index { position, .. }
            | Expression::Array { position, .. }
            | Expression::Assign { position, .. } => *position,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Statement {
    Return {
        value: Expression,
        position: Position,
    },
    Print {
        value: Expression,
        position: Position,
    },
    Var {
        name: String,
        declared: Type,
        initializer: Expression,
        position: Position,
    },
    Assign {
        name: String,
        value: Expression,
        position: Position,
    },
    Expression {
        expression: Expression,
        position: Position,
    },
    For {
        init: Option<Box<Statement>>,
        condition: Option<Expression>,
        increment: Option<Box<Statement>>,
        body: Vec<Statement>,
        position: Position,
    },
    While {
        condition: Expression,
        body: Vec<Statement>,
        position: Position,
    },
    ForEach {
        name: String,
        declared: Type,
        iterable: Expression,
        body: Vec<Statement>,
        position: Position,
    },
}

impl Statement {
    /// Turn an expression parsed in statement position into a statement.
    /// A bare assignment becomes an assignment statement.
    pub fn from_expression(expression: Expression) -> Statement {
        match expression {
            Expression::Assign {
                name,
                value,
                position,
            } => Statement::Assign {
                name,
                value: *value,
                position,
            },
            expression => Statement::Expression {
                position: expression.position(),
                expression,
            },
        }
    }

    pub fn position(&self) -> Position {
        match self {
            Statement::Return { position, .. }
            | Statement::Print { position, .. }
            | Statement::Var { position, .. }
            | Statement::Assign { position, .. }
            | Statement::Expression { position, .. }
            | Statement::For { position, .. }
            | Statement::While { position, .. }
            | Statement::ForEach { position, .. } => *position,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FunctionDecl {
    pub name: String,
    pub params: Vec<(String, Type)>,
    pub return_type: Option<Type>,
    pub body: Vec<Statement>,
    pub position: Position,
}

/// One top-level construct.
#[derive(Debug, Clone, PartialEq)]
pub enum Item {
    Function(FunctionDecl),
    Statement(Statement),
}

fn parenthesize(f: &mut Formatter<'_>, name: &str, parts: &[&dyn fmt::Display]) -> fmt::Result {
    write!(f, "({}", name)?;
    for part in parts {
        write!(f, " {}", part)?;
    }
    write!(f, ")")
}

struct Body<'a>(&'a [Statement]);

impl<'a> fmt::Display for Body<'a> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{{")?;
        for (i, stmt) in self.0.iter().enumerate() {
            if i > 0 {
                write!(f, " ")?;
            }
            write!(f, "{}", stmt)?;
        }
        write!(f, "}}")
    }
}

struct Optional<'a, T>(&'a Option<T>);

impl<'a, T: fmt::Display> fmt::Display for Optional<'a, T> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self.0 {
            Some(x) => write!(f, "{}", x),
            None => write!(f, "_"),
        }
    }
}

impl fmt::Display for Expression {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Expression::Binary {
                operator,
                left,
                right,
                ..
            } => parenthesize(f, &operator.to_string(), &[left, right]),
            Expression::Identifier { name, .. } => write!(f, "{}", name),
            Expression::Number { value, .. } => write!(f, "{}", value),
            Expression::Call {
                callee, arguments, ..
            } => {
                write!(f, "(call {}", callee)?;
                for argument in arguments {
                    write!(f, " {}", argument)?;
                }
                write!(f, ")")
            }
            Expression::Index { target, index, .. } => parenthesize(f, "index", &[target, index]),
            Expression::Array { elements, .. } => {
                write!(f, "[")?;
                for (i, element) in elements.iter().enumerate() {
                    if i > 0 {
                        write!(f, " ")?;
                    }
                    write!(f, "{}", element)?;
                }
                write!(f, "]")
            }
            Expression::Assign { name, value, .. } => parenthesize(f, "=", &[name, value]),
        }
    }
}

impl fmt::Display for Statement {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Statement::Return { value, .. } => parenthesize(f, "return", &[value]),
            Statement::Print { value, .. } => parenthesize(f, "print", &[value]),
            Statement::Var {
                name,
                declared,
                initializer,
                ..
            } => write!(f, "(let {}:{} {})", name, declared, initializer),
            Statement::Assign { name, value, .. } => parenthesize(f, "=", &[name, value]),
            Statement::Expression { expression, .. } => parenthesize(f, "expr", &[expression]),
            Statement::For {
                init,
                condition,
                increment,
                body,
                ..
            } => parenthesize(
                f,
                "for",
                &[
                    &Optional(init),
                    &Optional(condition),
                    &Optional(increment),
                    &Body(body),
                ],
            ),
            Statement::While {
                condition, body, ..
            } => parenthesize(f, "while", &[condition, &Body(body)]),
            Statement::ForEach {
                name,
                declared,
                iterable,
                body,
                ..
            } => write!(
                f,
                "(foreach {}:{} {} {})",
                name,
                declared,
                iterable,
                Body(body)
            ),
        }
    }
}

impl fmt::Display for FunctionDecl {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "(function {} (", self.name)?;
        for (i, (name, declared)) in self.params.iter().enumerate() {
            if i > 0 {
                write!(f, " ")?;
            }
            write!(f, "{}:{}", name, declared)?;
        }
        match &self.return_type {
            Some(declared) => write!(f, "):{} ", declared)?,
            None => write!(f, "):void ")?,
        }
        write!(f, "{})", Body(&self.body))
    }
}

impl fmt::Display for Item {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Item::Function(decl) => write!(f, "{}", decl),
            Item::Statement(stmt) => write!(f, "{}", stmt),
        }
    }
}
