use super::ast::{BinaryOperator, Expression, FunctionDecl, Item, Primitive, Statement, Type};
use super::error::Error;
use super::scanner::Scanner;
use super::token::{Position, Token, TokenType};
use strum::IntoEnumIterator;

/// Recursive-descent parser that pulls tokens from a `Scanner` on demand,
/// holding exactly one token of lookahead.
///
/// All binary operators share one precedence level and group to the right:
/// `1 - 2 - 3` parses as `1 - (2 - 3)`.
pub struct Parser<'a> {
    scanner: Scanner<'a>,
    current: Token,
    depth: usize,
}

/// Deepest nesting of expressions and statements the parser accepts.
pub const MAX_NESTING: usize = 100;

impl<'a> Parser<'a> {
    pub fn new(source: &'a str) -> Parser<'a> {
        let mut scanner = Scanner::new(source);
        let current = scanner.next_token();
        Parser {
            scanner,
            current,
            depth: 0,
        }
    }

    pub fn is_at_end(&self) -> bool {
        self.current.kind == TokenType::End
    }

    /// Parse every remaining top-level construct.
    pub fn parse(&mut self) -> Result<Vec<Item>, Error> {
        let mut items = Vec::new();
        while !self.is_at_end() {
            items.push(self.parse_top_level()?);
        }
        Ok(items)
    }

    pub fn parse_top_level(&mut self) -> Result<Item, Error> {
        match self.peek()? {
            TokenType::Function => Ok(Item::Function(self.parse_function()?)),
            _ => Ok(Item::Statement(self.parse_statement()?)),
        }
    }

    pub fn parse_function(&mut self) -> Result<FunctionDecl, Error> {
        self.expect(TokenType::Function, "Expected 'function' keyword")?;
        let position = self.current.position();
        let name = self.identifier("Expected function name")?;
        self.expect(TokenType::LeftParen, "Expected '(' after function name")?;

        let mut params = Vec::new();
        if self.peek()? != TokenType::RightParen {
            loop {
                let param = self.identifier("Expected identifier in parameter")?;
                self.expect(TokenType::Colon, "Expected ':' after parameter name")?;
                params.push((param, self.parse_type()?));
                if !self.advance_if(TokenType::Comma)? {
                    break;
                }
            }
        }
        self.expect(TokenType::RightParen, "Expected ')' after parameters")?;

        let return_type = if self.advance_if(TokenType::Colon)? {
            Some(self.parse_type()?)
        } else {
            None
        };
        let body = self.block()?;
        Ok(FunctionDecl {
            name,
            params,
            return_type,
            body,
            position,
        })
    }

    pub fn parse_statement(&mut self) -> Result<Statement, Error> {
        self.enter("Statement nested too deeply")?;
        let result = self.statement();
        self.depth -= 1;
        result
    }

    pub fn parse_expression(&mut self) -> Result<Expression, Error> {
        self.enter("Expression nested too deeply")?;
        let result = self.primary().and_then(|left| self.finish_expression(left));
        self.depth -= 1;
        result
    }

    fn statement(&mut self) -> Result<Statement, Error> {
        let position = self.current.position();
        match self.peek()? {
            TokenType::Return => {
                self.advance();
                let value = self.parse_expression()?;
                self.expect(TokenType::Semicolon, "Expected ';' after return")?;
                Ok(Statement::Return { value, position })
            }
            TokenType::Print => {
                self.advance();
                self.expect(TokenType::LeftParen, "Expected '(' after print")?;
                let value = self.parse_expression()?;
                self.expect(TokenType::RightParen, "Expected ')' after print expression")?;
                self.expect(TokenType::Semicolon, "Expected ';' after print")?;
                Ok(Statement::Print { value, position })
            }
            TokenType::Let => {
                let (name, declared) = self.let_binding()?;
                self.expect(TokenType::Equal, "Expected '=' after type")?;
                let initializer = self.parse_expression()?;
                self.expect(
                    TokenType::Semicolon,
                    "Expected ';' after variable declaration",
                )?;
                Ok(Statement::Var {
                    name,
                    declared,
                    initializer,
                    position,
                })
            }
            TokenType::For => self.for_statement(),
            TokenType::While => {
                self.advance();
                self.expect(TokenType::LeftParen, "Expected '(' after while")?;
                let condition = self.parse_expression()?;
                self.expect(TokenType::RightParen, "Expected ')' after while condition")?;
                let body = self.block()?;
                Ok(Statement::While {
                    condition,
                    body,
                    position,
                })
            }
            TokenType::Identifier => {
                let name = self.advance().lexeme;
                let left = self.identifier_suffix(name, position)?;
                let expression = self.finish_expression(left)?;
                self.expect(TokenType::Semicolon, "Expected ';' after expression")?;
                Ok(Statement::from_expression(expression))
            }
            _ => Err(self.error(&format!(
                "Unsupported statement '{}'",
                self.current.lexeme
            ))),
        }
    }

    fn for_statement(&mut self) -> Result<Statement, Error> {
        let position = self.advance().position();
        self.expect(TokenType::LeftParen, "Expected '(' after for")?;

        let init = match self.peek()? {
            TokenType::Semicolon => None,
            TokenType::Let => {
                let init_position = self.current.position();
                let (name, declared) = self.let_binding()?;
                if self.advance_if(TokenType::In)? {
                    let iterable = self.parse_expression()?;
                    self.expect(TokenType::RightParen, "Expected ')' after for-each iterable")?;
                    let body = self.block()?;
                    return Ok(Statement::ForEach {
                        name,
                        declared,
                        iterable,
                        body,
                        position,
                    });
                }
                self.expect(TokenType::Equal, "Expected '=' after type")?;
                let initializer = self.parse_expression()?;
                Some(Box::new(Statement::Var {
                    name,
                    declared,
                    initializer,
                    position: init_position,
                }))
            }
            TokenType::Identifier => {
                let init_position = self.current.position();
                let name = self.advance().lexeme;
                self.expect(TokenType::Equal, "Expected '=' after variable name")?;
                let value = self.parse_expression()?;
                Some(Box::new(Statement::Assign {
                    name,
                    value,
                    position: init_position,
                }))
            }
            _ => return Err(self.error("Unsupported for-loop initializer")),
        };
        self.expect(TokenType::Semicolon, "Expected ';' after for initializer")?;

        let condition = if self.peek()? != TokenType::Semicolon {
            Some(self.parse_expression()?)
        } else {
            None
        };
        self.expect(TokenType::Semicolon, "Expected ';' after for condition")?;

        let increment = if self.peek()? != TokenType::RightParen {
            Some(Box::new(Statement::from_expression(self.parse_expression()?)))
        } else {
            None
        };
        self.expect(TokenType::RightParen, "Expected ')' after for increment")?;

        let body = self.block()?;
        Ok(Statement::For {
            init,
            condition,
            increment,
            body,
            position,
        })
    }

    // `let name : type`, shared by declarations and loop headers.
    fn let_binding(&mut self) -> Result<(String, Type), Error> {
        self.expect(TokenType::Let, "Expected 'let'")?;
        let name = self.identifier("Expected identifier after 'let'")?;
        self.expect(TokenType::Colon, "Expected ':' after variable name")?;
        Ok((name, self.parse_type()?))
    }

    fn parse_type(&mut self) -> Result<Type, Error> {
        let primitive = match self.peek()? {
            TokenType::Int => Primitive::Int,
            TokenType::Double => Primitive::Double,
            TokenType::Bool => Primitive::Bool,
            _ => {
                let names: Vec<String> = Primitive::iter().map(|p| p.to_string()).collect();
                return Err(self.error(&format!("Expected type ({})", names.join(", "))));
            }
        };
        self.advance();
        let is_array = if self.advance_if(TokenType::LeftBracket)? {
            self.expect(TokenType::RightBracket, "Expected ']' after '[' in type")?;
            true
        } else {
            false
        };
        Ok(Type {
            primitive,
            is_array,
        })
    }

    fn block(&mut self) -> Result<Vec<Statement>, Error> {
        self.expect(TokenType::LeftBrace, "Expected '{' to start block")?;
        let mut statements = Vec::new();
        loop {
            match self.peek()? {
                TokenType::RightBrace | TokenType::End => break,
                _ => statements.push(self.parse_statement()?),
            }
        }
        self.expect(TokenType::RightBrace, "Expected '}' to end block")?;
        Ok(statements)
    }

    // Optional trailing `=` or `++`/`--` after a binary expression.
    fn finish_expression(&mut self, left: Expression) -> Result<Expression, Error> {
        let left = self.finish_binary(left)?;
        let position = self.current.position();
        match self.peek()? {
            TokenType::Equal => {
                let name = self
                    .assignment_target(left, "Left side of assignment must be an identifier")?;
                self.advance();
                let value = self.parse_expression()?;
                Ok(Expression::Assign {
                    name,
                    value: Box::new(value),
                    position,
                })
            }
            TokenType::PlusPlus | TokenType::MinusMinus => {
                let operator = if self.current.kind == TokenType::PlusPlus {
                    BinaryOperator::Add
                } else {
                    BinaryOperator::Subtract
                };
                let target = self.assignment_target(
                    left,
                    "Left side of increment/decrement must be an identifier",
                )?;
                self.advance();
                let value = Expression::Binary {
                    operator,
                    left: Box::new(Expression::Identifier {
                        name: target.clone(),
                        position,
                    }),
                    right: Box::new(Expression::Number { value: 1, position }),
                    position,
                };
                Ok(Expression::Assign {
                    name: target,
                    value: Box::new(value),
                    position,
                })
            }
            _ => Ok(left),
        }
    }

    // The right operand is a whole expression, which makes every operator
    // right-associative with equal precedence.
    fn finish_binary(&mut self, mut left: Expression) -> Result<Expression, Error> {
        while let Some(operator) = binary_operator(self.peek()?) {
            let position = self.advance().position();
            let right = self.parse_expression()?;
            left = Expression::Binary {
                operator,
                left: Box::new(left),
                right: Box::new(right),
                position,
            };
        }
        Ok(left)
    }

    fn primary(&mut self) -> Result<Expression, Error> {
        let position = self.current.position();
        match self.peek()? {
            TokenType::Identifier => {
                let name = self.advance().lexeme;
                self.identifier_suffix(name, position)
            }
            TokenType::Number => {
                let token = self.advance();
                let digits = token.lexeme.split('.').next().unwrap_or_default();
                match digits.parse::<i64>() {
                    Ok(value) => Ok(Expression::Number { value, position }),
                    Err(_) => Err(Error::Syntax {
                        message: format!("Number literal '{}' is out of range", token.lexeme),
                        found: token.kind,
                        position,
                    }),
                }
            }
            TokenType::LeftParen => {
                self.advance();
                let expression = self.parse_expression()?;
                self.expect(TokenType::RightParen, "Expected ')' after expression")?;
                Ok(expression)
            }
            TokenType::LeftBracket => {
                self.advance();
                let elements = self.expression_list(TokenType::RightBracket)?;
                self.expect(TokenType::RightBracket, "Expected ']' after array literal")?;
                Ok(Expression::Array { elements, position })
            }
            _ => Err(self.error(&format!(
                "Unsupported expression '{}'",
                self.current.lexeme
            ))),
        }
    }

    // A call, or a chain of index suffixes, after an identifier.
    fn identifier_suffix(&mut self, name: String, position: Position) -> Result<Expression, Error> {
        if self.advance_if(TokenType::LeftParen)? {
            let arguments = self.expression_list(TokenType::RightParen)?;
            self.expect(TokenType::RightParen, "Expected ')' after function call")?;
            return Ok(Expression::Call {
                callee: name,
                arguments,
                position,
            });
        }
        let mut expression = Expression::Identifier { name, position };
        while self.peek()? == TokenType::LeftBracket {
            let position = self.advance().position();
            let index = self.parse_expression()?;
            self.expect(TokenType::RightBracket, "Expected ']' after array index")?;
            expression = Expression::Index {
                target: Box::new(expression),
                index: Box::new(index),
                position,
            };
        }
        Ok(expression)
    }

    fn expression_list(&mut self, close: TokenType) -> Result<Vec<Expression>, Error> {
        let mut expressions = Vec::new();
        if self.peek()? != close {
            loop {
                expressions.push(self.parse_expression()?);
                if !self.advance_if(TokenType::Comma)? {
                    break;
                }
            }
        }
        Ok(expressions)
    }

    fn assignment_target(&self, left: Expression, message: &str) -> Result<String, Error> {
        match left {
            Expression::Identifier { name, .. } => Ok(name),
            _ => Err(self.error(message)),
        }
    }

    fn identifier(&mut self, message: &str) -> Result<String, Error> {
        match self.peek()? {
            TokenType::Identifier => Ok(self.advance().lexeme),
            _ => Err(self.error(message)),
        }
    }

    /// Kind of the lookahead token. A lexical failure token becomes a hard
    /// error the first time the parser looks at it.
    fn peek(&self) -> Result<TokenType, Error> {
        match self.current.kind {
            TokenType::Unexpected => Err(Error::Lexical {
                message: self.current.lexeme.clone(),
                position: self.current.position(),
            }),
            kind => Ok(kind),
        }
    }

    /// Discard the lookahead token, pull the next one, and return the
    /// discarded token.
    fn advance(&mut self) -> Token {
        let next = self.scanner.next_token();
        std::mem::replace(&mut self.current, next)
    }

    fn enter(&mut self, message: &str) -> Result<(), Error> {
        if self.depth >= MAX_NESTING {
            return Err(self.error(message));
        }
        self.depth += 1;
        Ok(())
    }

    fn advance_if(&mut self, kind: TokenType) -> Result<bool, Error> {
        if self.peek()? == kind {
            self.advance();
            Ok(true)
        } else {
            Ok(false)
        }
    }

    fn expect(&mut self, kind: TokenType, message: &str) -> Result<Token, Error> {
        if self.peek()? == kind {
            Ok(self.advance())
        } else {
            Err(self.error(message))
        }
    }

    fn error(&self, message: &str) -> Error {
        Error::Syntax {
            message: message.to_string(),
            found: self.current.kind,
            position: self.current.position(),
        }
    }
}

fn binary_operator(kind: TokenType) -> Option<BinaryOperator> {
    match kind {
        TokenType::Plus => Some(BinaryOperator::Add),
        TokenType::Minus => Some(BinaryOperator::Subtract),
        TokenType::Star => Some(BinaryOperator::Multiply),
        TokenType::Slash => Some(BinaryOperator::Divide),
        TokenType::Less => Some(BinaryOperator::Less),
        TokenType::LessEqual => Some(BinaryOperator::LessEqual),
        TokenType::Greater => Some(BinaryOperator::Greater),
        TokenType::GreaterEqual => Some(BinaryOperator::GreaterEqual),
        TokenType::EqualEqual => Some(BinaryOperator::Equal),
        TokenType::BangEqual => Some(BinaryOperator::NotEqual),
        _ => None,
    }
}

#[cfg(test)]
mod parser_tests {
    use crate::ast::{BinaryOperator, Expression, Item, Primitive, Statement, Type};
    use crate::error::{Error, ErrorKind};
    use crate::parser::{Parser, MAX_NESTING};
    use crate::token::{Position, TokenType};

    fn expression(source: &str) -> Expression {
        Parser::new(source).parse_expression().unwrap()
    }

    fn statement(source: &str) -> Statement {
        Parser::new(source).parse_statement().unwrap()
    }

    const INT: Type = Type {
        primitive: Primitive::Int,
        is_array: false,
    };

    #[test]
    fn function_declaration() {
        let mut parser = Parser::new("function f(a: int): int { return a + 1; }");
        let decl = match parser.parse_top_level().unwrap() {
            Item::Function(decl) => decl,
            other => panic!("expected function, got {}", other),
        };
        assert!(parser.is_at_end());
        assert_eq!(decl.name, "f");
        assert_eq!(decl.params, vec![("a".to_string(), INT)]);
        assert_eq!(decl.return_type, Some(INT));
        assert_eq!(decl.body.len(), 1);
        match &decl.body[0] {
            Statement::Return {
                value:
                    Expression::Binary {
                        operator: BinaryOperator::Add,
                        left,
                        right,
                        ..
                    },
                ..
            } => {
                assert!(matches!(&**left, Expression::Identifier { name, .. } if name == "a"));
                assert!(matches!(&**right, Expression::Number { value: 1, .. }));
            }
            other => panic!("unexpected body {}", other),
        }
    }

    #[test]
    fn function_without_return_type_or_params() {
        let mut parser = Parser::new("function go() { print(1); }");
        match parser.parse_top_level().unwrap() {
            Item::Function(decl) => {
                assert!(decl.params.is_empty());
                assert_eq!(decl.return_type, None);
                assert_eq!(decl.to_string(), "(function go ():void {(print 1)})");
            }
            other => panic!("expected function, got {}", other),
        }
    }

    #[test]
    fn array_parameter_types() {
        let mut parser = Parser::new("function sum(xs: int[], n: double) {}");
        match parser.parse_top_level().unwrap() {
            Item::Function(decl) => {
                assert_eq!(decl.params[0].1.to_string(), "int[]");
                assert_eq!(decl.params[1].1.primitive, Primitive::Double);
            }
            other => panic!("expected function, got {}", other),
        }
    }

    #[test]
    fn operators_group_to_the_right() {
        assert_eq!(expression("1 - 2 - 3").to_string(), "(- 1 (- 2 3))");
        assert_eq!(expression("1 * 2 + 3").to_string(), "(* 1 (+ 2 3))");
        assert_eq!(expression("(1 - 2) - 3").to_string(), "(- (- 1 2) 3)");
        assert_eq!(expression("a <= b != c").to_string(), "(<= a (!= b c))");
    }

    #[test]
    fn assignment_and_increment() {
        assert_eq!(expression("x = y = 2").to_string(), "(= x (= y 2))");
        assert_eq!(expression("i++").to_string(), "(= i (+ i 1))");
        assert_eq!(expression("i--").to_string(), "(= i (- i 1))");
    }

    #[test]
    fn assignment_to_non_identifier_fails() {
        let err = Parser::new("f(1) = 2").parse_expression().unwrap_err();
        assert!(matches!(
            err,
            Error::Syntax { ref message, .. } if message == "Left side of assignment must be an identifier"
        ));
        let err = Parser::new("3++").parse_expression().unwrap_err();
        assert!(matches!(err, Error::Syntax { .. }));
    }

    #[test]
    fn calls_indexes_and_arrays() {
        assert_eq!(expression("f(1, g(2), x)").to_string(), "(call f 1 (call g 2) x)");
        assert_eq!(expression("f()").to_string(), "(call f)");
        assert_eq!(expression("m[1][j]").to_string(), "(index (index m 1) j)");
        assert_eq!(expression("[1, 2, 3]").to_string(), "[1 2 3]");
        assert_eq!(expression("[]").to_string(), "[]");
    }

    #[test]
    fn decimal_literal_truncates() {
        assert!(matches!(expression("2.75"), Expression::Number { value: 2, .. }));
    }

    #[test]
    fn for_loop() {
        let stmt = statement("for (let i: int = 0; i < 10; i++) { print(i); }");
        assert_eq!(
            stmt.to_string(),
            "(for (let i:int 0) (< i 10) (= i (+ i 1)) {(print i)})"
        );
        let stmt = statement("for (i = 0; ; ) { }");
        assert_eq!(stmt.to_string(), "(for (= i 0) _ _ {})");
        let stmt = statement("for (; i; i) { }");
        assert_eq!(stmt.to_string(), "(for _ i (expr i) {})");
    }

    #[test]
    fn for_each_loop() {
        let stmt = statement("for (let x: int in xs) { print(x); }");
        assert_eq!(stmt.to_string(), "(foreach x:int xs {(print x)})");
    }

    #[test]
    fn identifier_led_statements() {
        assert!(matches!(statement("x = 4;"), Statement::Assign { .. }));
        assert!(matches!(statement("i++;"), Statement::Assign { .. }));
        assert!(matches!(
            statement("f(1);"),
            Statement::Expression {
                expression: Expression::Call { .. },
                ..
            }
        ));
        assert!(matches!(
            statement("x;"),
            Statement::Expression {
                expression: Expression::Identifier { .. },
                ..
            }
        ));
    }

    #[test]
    fn while_and_let() {
        let stmt = statement("while (n > 0) { n = n - 1; }");
        assert_eq!(stmt.to_string(), "(while (> n 0) {(= n (- n 1))})");
        let stmt = statement("let flag: bool = 1;");
        assert_eq!(stmt.to_string(), "(let flag:bool 1)");
    }

    #[test]
    fn missing_semicolon_reports_position() {
        let err = Parser::new("print(1)\n").parse_statement().unwrap_err();
        assert_eq!(
            err,
            Error::Syntax {
                message: "Expected ';' after print".to_string(),
                found: TokenType::End,
                position: Position::new(2, 1),
            }
        );
    }

    #[test]
    fn lexical_failure_surfaces_when_consumed() {
        let mut parser = Parser::new("print(1); let s: int = \"oops");
        assert!(parser.parse_top_level().is_ok());
        let err = parser.parse_top_level().unwrap_err();
        assert_eq!(
            err,
            Error::Lexical {
                message: "Unterminated string".to_string(),
                position: Position::new(1, 24),
            }
        );
    }

    #[test]
    fn unsupported_statement_and_expression() {
        let err = Parser::new("42;").parse_statement().unwrap_err();
        assert!(matches!(err, Error::Syntax { found: TokenType::Number, .. }));
        let err = Parser::new("print(;);").parse_statement().unwrap_err();
        assert!(matches!(err, Error::Syntax { found: TokenType::Semicolon, .. }));
    }

    #[test]
    fn nesting_is_bounded() {
        let chain = vec!["1"; MAX_NESTING].join(" + ");
        assert!(Parser::new(&chain).parse_expression().is_ok());

        let chain = vec!["1"; 5000].join(" + ");
        let err = Parser::new(&chain).parse_expression().unwrap_err();
        assert_eq!(err.message(), "Expression nested too deeply");
        assert_eq!(err.kind(), ErrorKind::Syntax);

        let parens = format!("{}1{}", "(".repeat(5000), ")".repeat(5000));
        let err = Parser::new(&parens).parse_expression().unwrap_err();
        assert_eq!(err.message(), "Expression nested too deeply");

        let loops = format!("{}{}", "for (;;) { ".repeat(5000), "}".repeat(5000));
        let err = Parser::new(&loops).parse_statement().unwrap_err();
        assert_eq!(err.message(), "Statement nested too deeply");
    }

    #[test]
    fn bad_type_lists_primitives() {
        let err = Parser::new("let x: string = 1;").parse_statement().unwrap_err();
        assert_eq!(err.message(), "Expected type (int, double, bool)");
    }

    #[test]
    fn whole_program() {
        let items = Parser::new("let g: int = 1;\nfunction main(): int { return g; }\nprint(g);")
            .parse()
            .unwrap();
        assert_eq!(items.len(), 3);
        assert!(matches!(items[1], Item::Function(_)));
    }
}
