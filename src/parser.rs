use crate::Span;
use crate::ast::{Expr, ExprKind, Program, Property, Stmt, StmtKind};
use crate::lexer::{LexerError, Token, TokenKind};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ParseError {
    #[error("Parse Error [at {}]: Unexpected token {found}, expected {expected}", .found.span)]
    UnexpectedToken { found: Token, expected: String },
    #[error("Parse Error: Unexpected end of input. Expected {expected}")]
    UnexpectedEof { expected: String, span: Span },
    #[error("Lexer Error during parse: {0}")]
    LexerError(#[from] LexerError),
    #[error("Parse Error [at {0}]: const declarations must be initialised")]
    MissingConstInitializer(Span),
    #[error("Parse Error [at {0}]: function parameters must be identifiers")]
    InvalidParameter(Span),
}

impl ParseError {
    /// Whether more input could still turn this into a valid program.
    /// The REPL uses this to keep reading lines.
    pub fn is_incomplete(&self) -> bool {
        matches!(self, ParseError::UnexpectedEof { .. })
    }
}

// Result type alias for convenience
pub type ParseResult<T> = Result<T, ParseError>;

/// Recursive-descent parser over an owned token buffer.
///
/// Precedence, lowest first: assignment, object literal, additive,
/// multiplicative, call/member, primary. `^` shares the multiplicative
/// level and folds left like the other operators there.
pub struct Parser {
    tokens: Vec<Token>,
    position: usize,
}

impl Parser {
    pub fn new(mut tokens: Vec<Token>) -> Self {
        // The lookahead relies on a trailing EOF token.
        if tokens.last().is_none_or(|token| token.kind != TokenKind::Eof) {
            let end = tokens.last().map_or(0, |token| token.span.end);
            tokens.push(Token {
                kind: TokenKind::Eof,
                text: String::new(),
                span: Span::new(end, end),
            });
        }
        Parser {
            tokens,
            position: 0,
        }
    }

    // Peeks at the current token without consuming.
    fn at(&self) -> &Token {
        let last = self.tokens.len() - 1;
        &self.tokens[self.position.min(last)]
    }

    fn at_kind(&self, kind: TokenKind) -> bool {
        self.at().kind == kind
    }

    fn at_operator(&self, operators: &[&str]) -> bool {
        let token = self.at();
        token.kind == TokenKind::BinaryOperator && operators.contains(&token.text.as_str())
    }

    // Consumes the current token. EOF is never consumed.
    fn next_token(&mut self) -> Token {
        let token = self.at().clone();
        if token.kind != TokenKind::Eof {
            self.position += 1;
        }
        token
    }

    fn expect(&mut self, kind: TokenKind, expected: &str) -> ParseResult<Token> {
        let token = self.next_token();
        if token.kind == kind {
            Ok(token)
        } else {
            Err(unexpected(token, expected))
        }
    }

    /// Parses statements until EOF.
    pub fn parse(mut self) -> ParseResult<Program> {
        let mut body = Vec::new();
        while !self.at_kind(TokenKind::Eof) {
            body.push(self.parse_statement()?);
        }
        log::trace!("parsed program with {} statements", body.len());
        Ok(Program { body })
    }

    fn parse_statement(&mut self) -> ParseResult<Stmt> {
        match self.at().kind {
            TokenKind::Let | TokenKind::Const => self.parse_var_declaration(),
            TokenKind::Fn => self.parse_function_declaration(),
            _ => {
                let expr = self.parse_expression()?;
                let mut span = expr.span;
                if self.at_kind(TokenKind::Semicolon) {
                    span = span.merge(self.next_token().span);
                }
                Ok(Stmt::new(StmtKind::Expression(expr), span))
            }
        }
    }

    fn parse_var_declaration(&mut self) -> ParseResult<Stmt> {
        let keyword = self.next_token();
        let constant = keyword.kind == TokenKind::Const;
        let identifier = self
            .expect(
                TokenKind::Identifier,
                "an identifier following 'let' or 'const'",
            )?
            .text;

        if self.at_kind(TokenKind::Semicolon) {
            let span = keyword.span.merge(self.next_token().span);
            if constant {
                return Err(ParseError::MissingConstInitializer(span));
            }
            return Ok(Stmt::new(
                StmtKind::VarDeclaration {
                    constant,
                    identifier,
                    value: None,
                },
                span,
            ));
        }

        self.expect(TokenKind::Equals, "'=' following the variable name")?;
        let value = self.parse_expression()?;
        let semicolon = self.expect(
            TokenKind::Semicolon,
            "';' to end the variable declaration",
        )?;

        Ok(Stmt::new(
            StmtKind::VarDeclaration {
                constant,
                identifier,
                value: Some(value),
            },
            keyword.span.merge(semicolon.span),
        ))
    }

    fn parse_function_declaration(&mut self) -> ParseResult<Stmt> {
        let keyword = self.next_token();
        let name = self
            .expect(TokenKind::Identifier, "a function name following 'fn'")?
            .text;

        let (arguments, _) = self.parse_arguments()?;
        let parameters = arguments
            .into_iter()
            .map(|argument| match argument.kind {
                ExprKind::Identifier(parameter) => Ok(parameter),
                _ => Err(ParseError::InvalidParameter(argument.span)),
            })
            .collect::<ParseResult<Vec<String>>>()?;

        self.expect(TokenKind::OpenBrace, "'{' to open the function body")?;
        let mut body = Vec::new();
        while !self.at_kind(TokenKind::Eof) && !self.at_kind(TokenKind::CloseBrace) {
            body.push(self.parse_statement()?);
        }
        let close = self.expect(TokenKind::CloseBrace, "'}' to close the function body")?;

        Ok(Stmt::new(
            StmtKind::FunctionDeclaration {
                name,
                parameters,
                body,
            },
            keyword.span.merge(close.span),
        ))
    }

    fn parse_expression(&mut self) -> ParseResult<Expr> {
        self.parse_assignment()
    }

    fn parse_assignment(&mut self) -> ParseResult<Expr> {
        let left = self.parse_object()?;

        if self.at_kind(TokenKind::Equals) {
            self.next_token();
            // Right associative: a = b = c
            let value = self.parse_assignment()?;
            let span = left.span.merge(value.span);
            return Ok(Expr::new(
                ExprKind::Assignment {
                    assignee: Box::new(left),
                    value: Box::new(value),
                },
                span,
            ));
        }

        Ok(left)
    }

    fn parse_object(&mut self) -> ParseResult<Expr> {
        if !self.at_kind(TokenKind::OpenBrace) {
            return self.parse_additive();
        }
        let open = self.next_token();

        let mut properties = Vec::new();
        while !self.at_kind(TokenKind::Eof) && !self.at_kind(TokenKind::CloseBrace) {
            let key = self.expect(TokenKind::Identifier, "an object key")?;

            // Shorthand { key, } and { key }
            if self.at_kind(TokenKind::Comma) {
                self.next_token();
                properties.push(Property {
                    key: key.text,
                    value: None,
                    span: key.span,
                });
                continue;
            } else if self.at_kind(TokenKind::CloseBrace) {
                properties.push(Property {
                    key: key.text,
                    value: None,
                    span: key.span,
                });
                continue;
            }

            self.expect(TokenKind::Colon, "':' following the object key")?;
            let value = self.parse_expression()?;
            properties.push(Property {
                key: key.text,
                span: key.span.merge(value.span),
                value: Some(value),
            });

            if !self.at_kind(TokenKind::CloseBrace) {
                self.expect(
                    TokenKind::Comma,
                    "',' or '}' following the object property",
                )?;
            }
        }

        let close = self.expect(TokenKind::CloseBrace, "'}' to close the object literal")?;
        Ok(Expr::new(
            ExprKind::ObjectLiteral(properties),
            open.span.merge(close.span),
        ))
    }

    fn parse_additive(&mut self) -> ParseResult<Expr> {
        let mut left = self.parse_multiplicative()?;

        while self.at_operator(&["+", "-"]) {
            let operator = self.next_token().text;
            let right = self.parse_multiplicative()?;
            left = binary(left, operator, right);
        }

        Ok(left)
    }

    fn parse_multiplicative(&mut self) -> ParseResult<Expr> {
        let mut left = self.parse_call_member()?;

        while self.at_operator(&["*", "/", "%", "^"]) {
            let operator = self.next_token().text;
            let right = self.parse_call_member()?;
            left = binary(left, operator, right);
        }

        Ok(left)
    }

    /// A primary followed by any chain of `.name`, `[expr]` and `(args)`.
    fn parse_call_member(&mut self) -> ParseResult<Expr> {
        let mut expr = self.parse_primary()?;

        loop {
            match self.at().kind {
                TokenKind::Dot => {
                    self.next_token();
                    let name = self.expect(TokenKind::Identifier, "a property name after '.'")?;
                    let span = expr.span.merge(name.span);
                    expr = Expr::new(
                        ExprKind::Member {
                            object: Box::new(expr),
                            property: Box::new(Expr::new(
                                ExprKind::Identifier(name.text),
                                name.span,
                            )),
                            computed: false,
                        },
                        span,
                    );
                }
                TokenKind::OpenBracket => {
                    self.next_token();
                    let property = self.parse_expression()?;
                    let close = self.expect(
                        TokenKind::CloseBracket,
                        "']' to close the computed member",
                    )?;
                    let span = expr.span.merge(close.span);
                    expr = Expr::new(
                        ExprKind::Member {
                            object: Box::new(expr),
                            property: Box::new(property),
                            computed: true,
                        },
                        span,
                    );
                }
                TokenKind::OpenParen => {
                    let (arguments, arguments_span) = self.parse_arguments()?;
                    let span = expr.span.merge(arguments_span);
                    expr = Expr::new(
                        ExprKind::Call {
                            caller: Box::new(expr),
                            arguments,
                        },
                        span,
                    );
                }
                _ => break,
            }
        }

        Ok(expr)
    }

    /// Parses `( expr, ... )`, returning the arguments and the span of the
    /// parenthesised list.
    fn parse_arguments(&mut self) -> ParseResult<(Vec<Expr>, Span)> {
        let open = self.expect(TokenKind::OpenParen, "'(' to open the argument list")?;

        let mut arguments = Vec::new();
        if !self.at_kind(TokenKind::CloseParen) {
            arguments.push(self.parse_assignment()?);
            while self.at_kind(TokenKind::Comma) {
                self.next_token();
                arguments.push(self.parse_assignment()?);
            }
        }

        let close = self.expect(TokenKind::CloseParen, "')' to close the argument list")?;
        Ok((arguments, open.span.merge(close.span)))
    }

    fn parse_primary(&mut self) -> ParseResult<Expr> {
        let token = self.next_token();

        match token.kind {
            TokenKind::Identifier => Ok(Expr::new(ExprKind::Identifier(token.text), token.span)),
            TokenKind::Number => match token.text.parse::<f64>() {
                Ok(n) => Ok(Expr::new(ExprKind::NumericLiteral(n), token.span)),
                Err(_) => Err(unexpected(token, "a numeric literal")),
            },
            TokenKind::String => Ok(Expr::new(ExprKind::StringLiteral(token.text), token.span)),
            TokenKind::OpenParen => {
                let inner = self.parse_expression()?;
                let close = self.expect(
                    TokenKind::CloseParen,
                    "')' to close the parenthesised expression",
                )?;
                Ok(Expr::new(inner.kind, token.span.merge(close.span)))
            }
            _ => Err(unexpected(token, "an expression")),
        }
    }
}

fn binary(left: Expr, operator: String, right: Expr) -> Expr {
    let span = left.span.merge(right.span);
    Expr::new(
        ExprKind::Binary {
            left: Box::new(left),
            operator,
            right: Box::new(right),
        },
        span,
    )
}

fn unexpected(found: Token, expected: &str) -> ParseError {
    if found.kind == TokenKind::Eof {
        ParseError::UnexpectedEof {
            expected: expected.to_string(),
            span: found.span,
        }
    } else {
        ParseError::UnexpectedToken {
            found,
            expected: expected.to_string(),
        }
    }
}

// Helper function to lex and parse a string directly (useful for tests and REPL)
pub fn parse_str(input: &str) -> ParseResult<Program> {
    let tokens = crate::lexer::tokenize(input)?;
    Parser::new(tokens).parse()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::LexerErrorKind;

    // Parses the input and compares the prefix rendering of the program.
    fn assert_parsed(input: &str, expected_output: &str) {
        let program = match parse_str(input) {
            Ok(result) => result,
            Err(e) => panic!("Parsing failed for input '{}': {}", input, e),
        };
        assert_eq!(program.to_string(), expected_output, "Input: '{}'", input);
    }

    // Helper for asserting parse errors
    fn assert_parse_error(input: &str, expected_error_variant: ParseError) {
        match parse_str(input) {
            Ok(result) => panic!(
                "Expected parsing to fail for input '{}', but got: {:?}",
                input, result
            ),
            Err(e) => {
                assert_eq!(
                    std::mem::discriminant(&e),
                    std::mem::discriminant(&expected_error_variant),
                    "Input: '{}', Expected error variant like {:?}, got: {:?}",
                    input,
                    expected_error_variant,
                    e
                );
            }
        }
    }

    fn first_expr(input: &str) -> Expr {
        let program = parse_str(input).expect("input should parse");
        match program.body.into_iter().next().map(|stmt| stmt.kind) {
            Some(StmtKind::Expression(expr)) => expr,
            other => panic!("Expected an expression statement, got {:?}", other),
        }
    }

    fn dummy_token() -> Token {
        Token {
            kind: TokenKind::Eof,
            text: String::new(),
            span: Span::default(),
        }
    }

    #[test]
    fn test_empty_program() {
        assert_eq!(parse_str("").unwrap(), Program::default());
        assert_eq!(parse_str("  // nothing\n").unwrap().body.len(), 0);
    }

    #[test]
    fn test_primary_expressions() {
        assert_parsed("x", "x");
        assert_parsed("42", "42");
        assert_parsed(r#""hi""#, "\"hi\"");
        assert_parsed("(x)", "x");
    }

    #[test]
    fn test_additive_binds_looser_than_multiplicative() {
        assert_parsed("2 + 3 * 4", "(+ 2 (* 3 4))");
        assert_parsed("(2 + 3) * 4", "(* (+ 2 3) 4)");
        assert_parsed("1 - 2 - 3", "(- (- 1 2) 3)");
    }

    #[test]
    fn test_power_shares_multiplicative_level() {
        assert_parsed("2 ^ 3 * 2", "(* (^ 2 3) 2)");
        assert_parsed("2 * 3 ^ 2", "(^ (* 2 3) 2)");
        assert_parsed("8 % 3 / 2", "(/ (% 8 3) 2)");
    }

    #[test]
    fn test_operator_text_is_stored() {
        match first_expr("a % b").kind {
            ExprKind::Binary { operator, .. } => assert_eq!(operator, "%"),
            other => panic!("Expected binary expression, got {:?}", other),
        }
    }

    #[test]
    fn test_assignment_is_right_associative() {
        assert_parsed("a = b = 1 + 2", "(= a (= b (+ 1 2)))");
    }

    #[test]
    fn test_assignment_target_is_not_checked_by_parser() {
        // Rejected during evaluation instead
        assert_parsed("1 = 2", "(= 1 2)");
        assert_parsed("a.b = 2", "(= (. a b) 2)");
    }

    #[test]
    fn test_var_declarations() {
        assert_parsed("let x = 5;", "(let x 5)");
        assert_parsed("cho x = 5;", "(let x 5)");
        assert_parsed("const y = x * 2;", "(const y (* x 2))");
        assert_parsed("let z;", "(let z)");
    }

    #[test]
    fn test_var_declaration_errors() {
        assert_parse_error(
            "const x;",
            ParseError::MissingConstInitializer(Span::default()),
        );
        assert_parse_error(
            "let = 5;",
            ParseError::UnexpectedToken {
                found: dummy_token(),
                expected: String::new(),
            },
        );
        assert_parse_error(
            "let x = 5",
            ParseError::UnexpectedEof {
                expected: String::new(),
                span: Span::default(),
            },
        );
        assert_parse_error(
            "let x 5;",
            ParseError::UnexpectedToken {
                found: dummy_token(),
                expected: String::new(),
            },
        );
    }

    #[test]
    fn test_function_declaration() {
        assert_parsed(
            "fn add(a, b) { let c = a + b; c }",
            "(fn add (a b) (let c (+ a b)) c)",
        );
        assert_parsed("fn nothing() {}", "(fn nothing ())");
        assert_parsed(
            "fn outer() { fn inner(x) { x } inner }",
            "(fn outer () (fn inner (x) x) inner)",
        );
    }

    #[test]
    fn test_function_declaration_errors() {
        assert_parse_error("fn f(a, 1) {}", ParseError::InvalidParameter(Span::default()));
        assert_parse_error("fn f(a = 1) {}", ParseError::InvalidParameter(Span::default()));
        assert_parse_error(
            "fn (a) {}",
            ParseError::UnexpectedToken {
                found: dummy_token(),
                expected: String::new(),
            },
        );
        assert_parse_error(
            "fn f(a) { a",
            ParseError::UnexpectedEof {
                expected: String::new(),
                span: Span::default(),
            },
        );
    }

    #[test]
    fn test_calls_and_members_chain() {
        assert_parsed("f()", "(call f)");
        assert_parsed("f(1, x = 2)", "(call f 1 (= x 2))");
        assert_parsed("f()()", "(call (call f))");
        assert_parsed("a.b", "(. a b)");
        assert_parsed("a[0]", "([] a 0)");
        assert_parsed("a.b()[0]", "([] (call (. a b)) 0)");
        assert_parsed("a.b.c(d)", "(call (. (. a b) c) d)");
        assert_parsed("a[b + 1].c", "(. ([] a (+ b 1)) c)");
        assert_parsed("f(x) * 2", "(* (call f x) 2)");
    }

    #[test]
    fn test_member_errors() {
        assert_parse_error(
            "a.1",
            ParseError::UnexpectedToken {
                found: dummy_token(),
                expected: String::new(),
            },
        );
        assert_parse_error(
            "a[1",
            ParseError::UnexpectedEof {
                expected: String::new(),
                span: Span::default(),
            },
        );
    }

    #[test]
    fn test_object_literals() {
        assert_parsed("{}", "{}");
        assert_parsed("{ a: 1, b: 2 }", "{a: 1, b: 2}");
        assert_parsed("{ a, b: 2 }", "{a, b: 2}");
        assert_parsed("{ a, b }", "{a, b}");
        assert_parsed("{ a: 1, }", "{a: 1}");
        assert_parsed("{ inner: { x: 1 } }", "{inner: {x: 1}}");
        assert_parsed("let o = { a: f(1) };", "(let o {a: (call f 1)})");
    }

    #[test]
    fn test_object_shorthand_stores_no_value() {
        match first_expr("{ a, b: 2 }").kind {
            ExprKind::ObjectLiteral(properties) => {
                assert_eq!(properties.len(), 2);
                assert_eq!(properties[0].key, "a");
                assert!(properties[0].value.is_none());
                assert_eq!(properties[1].key, "b");
                assert!(properties[1].value.is_some());
            }
            other => panic!("Expected object literal, got {:?}", other),
        }
    }

    #[test]
    fn test_object_literal_errors() {
        assert_parse_error(
            "{ 1: 2 }",
            ParseError::UnexpectedToken {
                found: dummy_token(),
                expected: String::new(),
            },
        );
        assert_parse_error(
            "{ a: 1 b: 2 }",
            ParseError::UnexpectedToken {
                found: dummy_token(),
                expected: String::new(),
            },
        );
        assert_parse_error(
            "{ a: 1",
            ParseError::UnexpectedEof {
                expected: String::new(),
                span: Span::default(),
            },
        );
    }

    #[test]
    fn test_statement_sequence_with_optional_semicolons() {
        assert_parsed(
            "const x = 1; x = 2; x",
            "(const x 1)\n(= x 2)\nx",
        );
        assert_parsed("f(1) g(2)", "(call f 1)\n(call g 2)");
    }

    #[test]
    fn test_unexpected_tokens() {
        assert_parse_error(
            ")",
            ParseError::UnexpectedToken {
                found: dummy_token(),
                expected: String::new(),
            },
        );
        assert_parse_error(
            "1 +",
            ParseError::UnexpectedEof {
                expected: String::new(),
                span: Span::default(),
            },
        );
        assert_parse_error(
            "(1 + 2",
            ParseError::UnexpectedEof {
                expected: String::new(),
                span: Span::default(),
            },
        );
    }

    #[test]
    fn test_error_names_token_and_expectation() {
        let err = parse_str("let 5 = x;").unwrap_err();
        assert_eq!(
            err.to_string(),
            "Parse Error [at 4..5]: Unexpected token '5', expected an identifier following 'let' or 'const'"
        );
        assert!(!err.is_incomplete());
        assert!(parse_str("fn f() {").unwrap_err().is_incomplete());
    }

    #[test]
    fn test_lexer_error_propagates() {
        match parse_str("let x = \"open") {
            Err(ParseError::LexerError(e)) => {
                assert_eq!(e.error, LexerErrorKind::UnterminatedString)
            }
            other => panic!("Expected lexer error, got {:?}", other),
        }
    }

    #[test]
    fn test_spans() {
        let expr = first_expr("foo(1, 2) + 3");
        assert_eq!(expr.span, Span::new(0, 13));
        match expr.kind {
            ExprKind::Binary { left, right, .. } => {
                assert_eq!(left.span, Span::new(0, 9));
                assert_eq!(right.span, Span::new(12, 13));
            }
            other => panic!("Expected binary expression, got {:?}", other),
        }

        let program = parse_str("let x = 1;\nfn f() { x }").unwrap();
        assert_eq!(program.body[0].span, Span::new(0, 10));
        assert_eq!(program.body[1].span, Span::new(11, 23));
    }

    #[test]
    fn test_parser_from_tokens_without_eof() {
        let mut tokens = crate::lexer::tokenize("1 + 2").unwrap();
        tokens.pop();
        let program = Parser::new(tokens).parse().unwrap();
        assert_eq!(program.to_string(), "(+ 1 2)");
    }
}
