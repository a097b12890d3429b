use crate::ast::{BinaryOperator, Expression, FunctionDecl, Statement, Value};
use crate::callable::FunctionTable;
use crate::environment::Environment;
use crate::error::Error;
use crate::token::Position;
use std::io::{self, Stdout, Write};
use tracing::debug;

/// How a statement finished.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Normal,
    Return(Value),
}

/// Tree-walking interpreter. Owns one environment and one function table
/// for its whole lifetime; `print` output goes to `W`.
pub struct Interpreter<W: Write = Stdout> {
    pub(crate) environment: Environment,
    // Number of function calls currently executing; 0 at top level.
    pub(crate) depth: usize,
    functions: FunctionTable,
    output: W,
}

impl Interpreter<Stdout> {
    pub fn new() -> Interpreter<Stdout> {
        Interpreter::with_output(io::stdout())
    }
}

impl Default for Interpreter<Stdout> {
    fn default() -> Self {
        Interpreter::new()
    }
}

impl<W: Write> Interpreter<W> {
    pub fn with_output(output: W) -> Interpreter<W> {
        Interpreter {
            environment: Environment::new(),
            depth: 0,
            functions: FunctionTable::new(),
            output,
        }
    }

    pub fn environment(&self) -> &Environment {
        &self.environment
    }

    pub fn output(&self) -> &W {
        &self.output
    }

    pub fn into_output(self) -> W {
        self.output
    }

    pub fn register(&mut self, decl: FunctionDecl) {
        debug!(function = %decl.name, arity = decl.params.len(), "registering function");
        if self.functions.register(decl).is_some() {
            debug!("replaced an earlier declaration");
        }
    }

    pub fn has_function(&self, name: &str) -> bool {
        self.functions.contains(name)
    }

    /// Invoke a declared function by name.
    pub fn call(&mut self, name: &str, arguments: &[Value]) -> Result<Value, Error> {
        self.call_at(name, arguments, None)
    }

    fn call_at(
        &mut self,
        name: &str,
        arguments: &[Value],
        position: Option<Position>,
    ) -> Result<Value, Error> {
        let function = match self.functions.get(name) {
            Some(function) => function.clone(),
            None => {
                return Err(Error::Runtime {
                    message: format!("Function not found: {}", name),
                    position,
                })
            }
        };
        function.call(self, arguments, position)
    }

    /// Execute statements in order, stopping at the first `return`.
    pub fn execute_block(&mut self, statements: &[Statement]) -> Result<Flow, Error> {
        for stmt in statements {
            if let Flow::Return(value) = self.execute(stmt)? {
                return Ok(Flow::Return(value));
            }
        }
        Ok(Flow::Normal)
    }

    pub fn execute(&mut self, stmt: &Statement) -> Result<Flow, Error> {
        match stmt {
            Statement::Return { value, .. } => {
                let value = self.evaluate(value)?;
                if self.depth == 0 {
                    debug!(value, "ignoring top-level return");
                    return Ok(Flow::Normal);
                }
                Ok(Flow::Return(value))
            }
            Statement::Print { value, position } => {
                let value = self.evaluate(value)?;
                writeln!(self.output, "{}", value).map_err(|e| {
                    Error::runtime(format!("Failed to write output: {}", e), *position)
                })?;
                Ok(Flow::Normal)
            }
            Statement::Var {
                name, initializer, ..
            } => {
                let value = self.evaluate(initializer)?;
                self.environment.define(name, value);
                Ok(Flow::Normal)
            }
            Statement::Assign { name, value, .. } => {
                let value = self.evaluate(value)?;
                self.environment.define(name, value);
                Ok(Flow::Normal)
            }
            Statement::Expression { expression, .. } => {
                self.evaluate(expression)?;
                Ok(Flow::Normal)
            }
            Statement::For {
                init,
                condition,
                increment,
                body,
                position,
            } => {
                let condition = condition
                    .as_ref()
                    .ok_or_else(|| Error::runtime("For loop requires a condition", *position))?;
                if let Some(init) = init {
                    self.execute(init)?;
                }
                while is_truthy(self.evaluate(condition)?) {
                    if let Flow::Return(value) = self.execute_block(body)? {
                        return Ok(Flow::Return(value));
                    }
                    if let Some(increment) = increment {
                        self.execute(increment)?;
                    }
                }
                Ok(Flow::Normal)
            }
            Statement::While {
                condition, body, ..
            } => {
                while is_truthy(self.evaluate(condition)?) {
                    if let Flow::Return(value) = self.execute_block(body)? {
                        return Ok(Flow::Return(value));
                    }
                }
                Ok(Flow::Normal)
            }
            // Arrays are not runtime values, so no iterable can be evaluated.
            Statement::ForEach { iterable, .. } => Err(array_unsupported(iterable)),
        }
    }

    pub fn evaluate(&mut self, expr: &Expression) -> Result<Value, Error> {
        match expr {
            Expression::Identifier { name, position } => self.environment.get(name, *position),
            Expression::Number { value, .. } => Ok(*value),
            Expression::Binary {
                operator,
                left,
                right,
                position,
            } => {
                let left = self.evaluate(left)?;
                let right = self.evaluate(right)?;
                apply(*operator, left, right, *position)
            }
            Expression::Call {
                callee,
                arguments,
                position,
            } => {
                let mut values = Vec::with_capacity(arguments.len());
                for argument in arguments {
                    values.push(self.evaluate(argument)?);
                }
                self.call_at(callee, &values, Some(*position))
            }
            Expression::Index { target, .. } => Err(array_unsupported(target)),
            Expression::Array { .. } => Err(array_unsupported(expr)),
            Expression::Assign { name, value, .. } => {
                let value = self.evaluate(value)?;
                self.environment.define(name, value);
                Ok(value)
            }
        }
    }
}

fn apply(
    operator: BinaryOperator,
    left: Value,
    right: Value,
    position: Position,
) -> Result<Value, Error> {
    match operator {
        BinaryOperator::Add => Ok(left.wrapping_add(right)),
        BinaryOperator::Subtract => Ok(left.wrapping_sub(right)),
        BinaryOperator::Multiply => Ok(left.wrapping_mul(right)),
        // Truncates toward zero.
        BinaryOperator::Divide => {
            if right == 0 {
                Err(Error::runtime("Division by zero", position))
            } else {
                Ok(left.wrapping_div(right))
            }
        }
        BinaryOperator::Less => Ok(Value::from(left < right)),
        BinaryOperator::LessEqual => Ok(Value::from(left <= right)),
        BinaryOperator::Greater => Ok(Value::from(left > right)),
        BinaryOperator::GreaterEqual => Ok(Value::from(left >= right)),
        BinaryOperator::Equal | BinaryOperator::NotEqual => Err(Error::runtime(
            format!("Unsupported operator: {}", operator),
            position,
        )),
    }
}

fn array_unsupported(expr: &Expression) -> Error {
    match expr {
        Expression::Identifier { name, position } => Error::runtime(
            format!("Array support not implemented yet for: {}", name),
            *position,
        ),
        other => Error::runtime("Array support not implemented", other.position()),
    }
}

fn is_truthy(value: Value) -> bool {
    value != 0
}

#[cfg(test)]
mod interpreter_tests {
    use crate::ast::{Item, Statement, Value};
    use crate::callable::MAX_CALL_DEPTH;
    use crate::error::{Error, ErrorKind};
    use crate::interpreter::{Flow, Interpreter};
    use crate::parser::Parser;
    use crate::token::Position;

    fn load(source: &str) -> Interpreter<Vec<u8>> {
        let mut interpreter = Interpreter::with_output(Vec::new());
        for item in Parser::new(source).parse().unwrap() {
            match item {
                Item::Function(decl) => interpreter.register(decl),
                Item::Statement(stmt) => {
                    interpreter.execute(&stmt).unwrap();
                }
            }
        }
        interpreter
    }

    fn eval(source: &str) -> Result<Value, Error> {
        let expr = Parser::new(source).parse_expression().unwrap();
        Interpreter::with_output(Vec::new()).evaluate(&expr)
    }

    fn printed(interpreter: &Interpreter<Vec<u8>>) -> String {
        String::from_utf8(interpreter.output().clone()).unwrap()
    }

    #[test]
    fn arithmetic_is_right_associative() {
        assert_eq!(eval("1 - 2 - 3"), Ok(2));
        assert_eq!(eval("2 * 3 + 4"), Ok(14));
        assert_eq!(eval("(2 * 3) + 4"), Ok(10));
    }

    #[test]
    fn division_truncates_toward_zero() {
        assert_eq!(eval("7 / 2"), Ok(3));
        assert_eq!(eval("(0 - 7) / 2"), Ok(-3));
        assert_eq!(eval("7 / (0 - 2)"), Ok(-3));
    }

    #[test]
    fn division_by_zero_is_a_runtime_fault() {
        let err = eval("1 / 0").unwrap_err();
        assert_eq!(err, Error::runtime("Division by zero", Position::new(1, 3)));
    }

    #[test]
    fn comparisons_yield_one_or_zero() {
        assert_eq!(eval("1 < 2"), Ok(1));
        assert_eq!(eval("2 <= 2"), Ok(1));
        assert_eq!(eval("1 > 2"), Ok(0));
        assert_eq!(eval("3 >= 4"), Ok(0));
    }

    #[test]
    fn equality_operators_are_unsupported() {
        let err = eval("1 == 1").unwrap_err();
        assert_eq!(err.message(), "Unsupported operator: ==");
        let err = eval("1 != 2").unwrap_err();
        assert_eq!(err.message(), "Unsupported operator: !=");
    }

    #[test]
    fn operands_evaluate_left_to_right() {
        let mut interpreter = load("let x: int = 1;");
        let expr = Parser::new("(x = 10) - (x = 3)").parse_expression().unwrap();
        assert_eq!(interpreter.evaluate(&expr), Ok(7));
        assert_eq!(interpreter.environment().lookup("x"), Some(3));
    }

    #[test]
    fn undefined_variable() {
        let err = eval("1 + missing").unwrap_err();
        assert_eq!(
            err,
            Error::runtime("Undefined variable: missing", Position::new(1, 5))
        );
    }

    #[test]
    fn print_writes_lines() {
        let interpreter = load("print(1 + 1); let y: int = 5; print(y);");
        assert_eq!(printed(&interpreter), "2\n5\n");
    }

    #[test]
    fn for_loop_counts() {
        let interpreter = load("for (let i: int = 0; i < 3; i++) { print(i); }");
        assert_eq!(printed(&interpreter), "0\n1\n2\n");
        assert_eq!(interpreter.environment().lookup("i"), Some(3));
    }

    #[test]
    fn for_loop_without_condition_fails() {
        let mut interpreter = Interpreter::with_output(Vec::new());
        let stmt = Parser::new("for (let i: int = 0; ; i++) { }")
            .parse_statement()
            .unwrap();
        let err = interpreter.execute(&stmt).unwrap_err();
        assert_eq!(err.message(), "For loop requires a condition");
        assert_eq!(err.position(), Some(Position::new(1, 1)));
    }

    #[test]
    fn while_loop() {
        let interpreter = load("let n: int = 3; while (n > 0) { print(n); n--; }");
        assert_eq!(printed(&interpreter), "3\n2\n1\n");
    }

    #[test]
    fn call_returns_value_and_defaults_to_zero() {
        let mut interpreter = load(
            "function add(a: int, b: int): int { return a + b; }
             function nothing() { print(7); }",
        );
        assert_eq!(interpreter.call("add", &[2, 3]), Ok(5));
        assert_eq!(interpreter.call("nothing", &[]), Ok(0));
        assert_eq!(printed(&interpreter), "7\n");
    }

    #[test]
    fn return_stops_the_body() {
        let mut interpreter = load(
            "function f(): int { print(1); return 2; print(3); }
             function g(): int { while (1) { for (let i: int = 0; i < 5; i++) { return i + 40; } } return 0; }",
        );
        assert_eq!(interpreter.call("f", &[]), Ok(2));
        assert_eq!(interpreter.call("g", &[]), Ok(40));
        assert_eq!(printed(&interpreter), "1\n");
    }

    #[test]
    fn recursion() {
        let mut interpreter = load(
            "function fact(n: int): int {
                 while (n < 2) { return 1; }
                 return n * fact(n - 1);
             }",
        );
        assert_eq!(interpreter.call("fact", &[5]), Ok(120));
    }

    #[test]
    fn unknown_function() {
        let mut interpreter = Interpreter::with_output(Vec::new());
        let err = interpreter.call("ghost", &[]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Runtime);
        assert_eq!(err.message(), "Function not found: ghost");
        assert!(err.position().is_none());

        let err = eval("ghost(1)").unwrap_err();
        assert_eq!(err.position(), Some(Position::new(1, 1)));
    }

    #[test]
    fn too_few_arguments() {
        let mut interpreter = load("function f(a: int, b: int): int { return a; }");
        let err = interpreter.call("f", &[1]).unwrap_err();
        assert_eq!(err.message(), "Function 'f' expects 2 argument(s) but got 1");
        assert_eq!(interpreter.call("f", &[1, 2, 3]), Ok(1));
    }

    #[test]
    fn call_restores_the_whole_environment() {
        let mut interpreter = load(
            "let g: int = 1;
             function touch(p: int): int { g = 50; let local: int = p; return g + local; }",
        );
        assert_eq!(interpreter.call("touch", &[4]), Ok(54));
        assert_eq!(interpreter.environment().lookup("g"), Some(1));
        assert_eq!(interpreter.environment().lookup("local"), None);
        assert_eq!(interpreter.environment().lookup("p"), None);
    }

    #[test]
    fn callee_sees_caller_bindings() {
        let mut interpreter = load(
            "function inner(): int { return secret; }
             function outer(): int { let secret: int = 9; return inner(); }",
        );
        assert_eq!(interpreter.call("outer", &[]), Ok(9));
        assert!(interpreter.call("inner", &[]).is_err());
    }

    #[test]
    fn arrays_are_not_runtime_values() {
        let err = eval("[1, 2]").unwrap_err();
        assert_eq!(err.message(), "Array support not implemented");
        let err = eval("xs[0]").unwrap_err();
        assert_eq!(err.message(), "Array support not implemented yet for: xs");

        let mut interpreter = Interpreter::with_output(Vec::new());
        let stmt = Parser::new("for (let x: int in xs) { print(x); }")
            .parse_statement()
            .unwrap();
        let err = interpreter.execute(&stmt).unwrap_err();
        assert_eq!(err.message(), "Array support not implemented yet for: xs");
        assert!(interpreter.output().is_empty());
    }

    #[test]
    fn top_level_return_is_evaluated_and_ignored() {
        let mut interpreter = Interpreter::with_output(Vec::new());
        let stmt = Parser::new("return 4;").parse_statement().unwrap();
        assert!(matches!(stmt, Statement::Return { .. }));
        assert_eq!(interpreter.execute(&stmt), Ok(Flow::Normal));

        let stmt = Parser::new("return missing;").parse_statement().unwrap();
        let err = interpreter.execute(&stmt).unwrap_err();
        assert_eq!(err.message(), "Undefined variable: missing");
    }

    #[test]
    fn return_inside_top_level_loop_keeps_looping() {
        let interpreter = load("let i: int = 0; while (i < 3) { print(i); i++; return 0; }");
        assert_eq!(printed(&interpreter), "0\n1\n2\n");
        assert_eq!(interpreter.environment().lookup("i"), Some(3));
    }

    #[test]
    fn runaway_recursion_is_a_runtime_fault() {
        let mut interpreter = load(
            "function down(n: int): int {
                 while (n > 0) { return down(n - 1); }
                 return 0;
             }",
        );
        assert_eq!(interpreter.call("down", &[MAX_CALL_DEPTH as Value - 1]), Ok(0));
        let err = interpreter.call("down", &[20000]).unwrap_err();
        assert_eq!(err.message(), "Call stack too deep");
        assert_eq!(err.position(), Some(Position::new(2, 41)));
        assert_eq!(interpreter.depth, 0);
        assert_eq!(interpreter.call("down", &[3]), Ok(0));
    }

    #[test]
    fn assignment_expression_yields_value() {
        let mut interpreter = load("let a: int = 0;");
        let stmt = Parser::new("print(a = 6);").parse_statement().unwrap();
        interpreter.execute(&stmt).unwrap();
        assert_eq!(printed(&interpreter), "6\n");
        assert_eq!(interpreter.environment().lookup("a"), Some(6));
    }
}
