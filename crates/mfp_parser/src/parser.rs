use std::rc::Rc;

use thiserror::Error;

use crate::ast::{
    BinaryOp, BinaryOperator, Binding, Expression, FunctionCall, FunctionDef, IfExpression,
    Number, Program,
};
use crate::span::{Span, WithSpan};
use crate::token::Token;

#[derive(Debug, Error, PartialEq)]
pub enum ParseError {
    #[error("Unexpected token {} {}", .0.value.describe(), .0.span.at_str())]
    Unexpected(WithSpan<Token>),
    #[error("Expected {expected}, but got {} instead {}", .got.value.describe(), .got.span.at_str())]
    Expected {
        expected: String,
        got: WithSpan<Token>,
    },
    #[error("Expected an expression, but got {} instead {}", .0.value.describe(), .0.span.at_str())]
    ExpectedExpression(WithSpan<Token>),
    #[error("Unexpected end of input, expected {expected} {}", .span.at_str())]
    UnexpectedEof { expected: String, span: Span },
    #[error("Invalid number literal `{lexeme}` {}", .span.at_str())]
    InvalidNumber { lexeme: String, span: Span },
    /// When an expression would be deeper than [`Parser::MAX_DEPTH`]
    #[error("Expression is nested more than {limit} levels deep {}", .span.at_str())]
    TooDeeplyNested { limit: usize, span: Span },
}

type ParseResult<T> = Result<T, ParseError>;

/// Recursive descent parser over an already tokenised source unit.
///
/// Precedence, lowest first: binding / function literal / `if`, then `+ -`,
/// then `* / >`. The first error aborts the whole parse.
///
/// Every later stage walks the tree recursively, so the parser refuses trees
/// taller than [`Parser::MAX_DEPTH`]. Long operator chains count as well as
/// parentheses, since `1 + 1 + 1` is a left-deep tree.
pub struct Parser {
    tokens: Vec<WithSpan<Token>>,
    index: usize,
    /// Nested expressions currently being parsed
    nesting: usize,
    /// Height of the expression parsed last
    height: usize,
}

impl Parser {
    pub const MAX_DEPTH: usize = 256;

    pub fn new(tokens: Vec<WithSpan<Token>>) -> Parser {
        Parser {
            tokens,
            index: 0,
            nesting: 0,
            height: 0,
        }
    }

    pub fn parse_program(&mut self) -> ParseResult<Program> {
        let mut program = Program::new();

        while !self.is_at_end() {
            if let Some(expression) = self.parse_expression()? {
                program.expressions.push(expression);
            }
        }

        tracing::trace!(expressions = program.expressions.len(), "parsed program");
        Ok(program)
    }

    /// Parse one expression. `None` means a line terminator was consumed instead.
    fn parse_expression(&mut self) -> ParseResult<Option<Expression>> {
        match (self.current_token(), self.peek_token()) {
            (Some(Token::Identifier(_)), Some(Token::Binding)) => self.parse_binding().map(Some),
            (Some(Token::Identifier(_)), Some(Token::MapsTo)) => {
                self.parse_function_def().map(Some)
            }
            (Some(Token::If), _) => self.parse_if_expression().map(Some),
            _ => self.parse_binary_expression(),
        }
    }

    /// Parse an expression in a position where a line terminator is not allowed.
    fn parse_required_expression(&mut self) -> ParseResult<Expression> {
        let start = self.index;
        if self.nesting >= Parser::MAX_DEPTH {
            return Err(self.too_deep(start));
        }

        self.nesting += 1;
        let expression = self.parse_expression();
        self.nesting -= 1;

        match expression? {
            Some(expression) => Ok(expression),
            None => Err(ParseError::ExpectedExpression(self.tokens[start].clone())),
        }
    }

    fn parse_binding(&mut self) -> ParseResult<Expression> {
        let start = self.index;
        let name = self.expect_identifier()?;
        self.expect(Token::Binding)?;
        let value = self.parse_required_expression()?;
        self.set_height(self.height + 1, start)?;

        Ok(Expression::Binding(Box::new(Binding { name, value })))
    }

    fn parse_function_def(&mut self) -> ParseResult<Expression> {
        let start = self.index;
        let parameter = self.expect_identifier()?;
        self.expect(Token::MapsTo)?;
        let body = self.parse_required_expression()?;
        self.set_height(self.height + 1, start)?;

        Ok(Expression::FunctionDef(Box::new(FunctionDef {
            parameter,
            body: Rc::new(body),
        })))
    }

    fn parse_if_expression(&mut self) -> ParseResult<Expression> {
        let start = self.index;
        self.expect(Token::If)?;
        let condition = self.parse_required_expression()?;
        let mut height = self.height;
        self.expect(Token::Then)?;
        let consequence = self.parse_required_expression()?;
        height = height.max(self.height);
        self.expect(Token::Else)?;
        let alternative = self.parse_required_expression()?;
        height = height.max(self.height);
        self.set_height(height + 1, start)?;

        Ok(Expression::If(Box::new(IfExpression {
            condition,
            consequence,
            alternative,
        })))
    }

    /// `term { ('+' | '-') term }`, left associative
    fn parse_binary_expression(&mut self) -> ParseResult<Option<Expression>> {
        self.parse_left_associative(
            &[Token::Plus, Token::Minus],
            Parser::parse_term,
        )
    }

    /// `factor { ('*' | '/' | '>') factor }`, left associative
    fn parse_term(&mut self) -> ParseResult<Option<Expression>> {
        self.parse_left_associative(
            &[Token::Star, Token::Slash, Token::GreaterThan],
            Parser::parse_factor,
        )
    }

    fn parse_left_associative(
        &mut self,
        operators: &[Token],
        operand: fn(&mut Parser) -> ParseResult<Option<Expression>>,
    ) -> ParseResult<Option<Expression>> {
        let start = self.index;
        let mut left = match operand(self)? {
            Some(left) => left,
            None => return Ok(None),
        };
        let mut height = self.height;

        while let Some(token) = self.current_token() {
            if !operators.contains(token) {
                break;
            }
            let operator = match BinaryOperator::from_token(token) {
                Some(operator) => operator,
                None => break,
            };
            self.advance();

            let right_start = self.index;
            let right = match operand(self)? {
                Some(right) => right,
                None => {
                    return Err(ParseError::ExpectedExpression(
                        self.tokens[right_start].clone(),
                    ))
                }
            };
            height = height.max(self.height) + 1;
            self.set_height(height, start)?;

            left = Expression::BinaryOp(Box::new(BinaryOp {
                left,
                operator,
                right,
            }));
        }

        self.height = height;
        Ok(Some(left))
    }

    fn parse_factor(&mut self) -> ParseResult<Option<Expression>> {
        let token = match self.tokens.get(self.index) {
            Some(token) => token.clone(),
            None => return Err(self.end_of_input("an expression")),
        };

        match token.value {
            Token::Number(ref lexeme) => {
                self.advance();
                let number = parse_number(lexeme, token.span)?;
                self.height = 1;
                Ok(Some(Expression::Number(number)))
            }
            Token::Identifier(_) => self.parse_call_or_var().map(Some),
            Token::LeftParen => {
                self.advance();
                // Grouping adds no node, so the height is the inner expression's
                let expression = self.parse_required_expression()?;
                self.expect(Token::RightParen)?;
                Ok(Some(expression))
            }
            Token::EndLine => {
                self.advance();
                Ok(None)
            }
            _ => Err(ParseError::Unexpected(token)),
        }
    }

    /// `IDENT { '(' expression ')' }`; each pair of parentheses applies one argument.
    fn parse_call_or_var(&mut self) -> ParseResult<Expression> {
        let start = self.index;
        let name = self.expect_identifier()?;
        let mut expression = Expression::Var(name);
        let mut height = 1;

        while self.current_token() == Some(&Token::LeftParen) {
            self.advance();
            let argument = self.parse_required_expression()?;
            self.expect(Token::RightParen)?;
            height = height.max(self.height) + 1;
            self.set_height(height, start)?;

            expression = Expression::FunctionCall(Box::new(FunctionCall {
                function: expression,
                argument,
            }));
        }

        self.height = height;
        Ok(expression)
    }

    /// Record the height of the node just built.
    fn set_height(&mut self, height: usize, start: usize) -> ParseResult<()> {
        if height > Parser::MAX_DEPTH {
            return Err(self.too_deep(start));
        }
        self.height = height;
        Ok(())
    }

    fn too_deep(&self, start: usize) -> ParseError {
        let span = match self.tokens.get(start) {
            Some(token) => token.span,
            None => self.end_span(),
        };
        ParseError::TooDeeplyNested {
            limit: Parser::MAX_DEPTH,
            span,
        }
    }

    fn end_span(&self) -> Span {
        Span::point(self.tokens.last().map(|tok| tok.span.end).unwrap_or_default())
    }

    fn end_of_input(&self, expected: impl Into<String>) -> ParseError {
        ParseError::UnexpectedEof {
            expected: expected.into(),
            span: self.end_span(),
        }
    }

    fn is_at_end(&self) -> bool {
        self.index >= self.tokens.len()
    }

    fn current_token(&self) -> Option<&Token> {
        self.tokens.get(self.index).map(|tok| &tok.value)
    }

    fn peek_token(&self) -> Option<&Token> {
        self.tokens.get(self.index + 1).map(|tok| &tok.value)
    }

    fn advance(&mut self) {
        self.index += 1;
    }

    fn expect(&mut self, token: Token) -> ParseResult<()> {
        match self.tokens.get(self.index) {
            Some(current) if current.value == token => {
                self.advance();
                Ok(())
            }
            Some(current) => Err(ParseError::Expected {
                expected: token.describe(),
                got: current.clone(),
            }),
            None => Err(self.end_of_input(token.describe())),
        }
    }

    fn expect_identifier(&mut self) -> ParseResult<String> {
        let name = match self.tokens.get(self.index) {
            Some(WithSpan {
                value: Token::Identifier(name),
                ..
            }) => name.to_owned(),
            Some(current) => {
                return Err(ParseError::Expected {
                    expected: String::from("identifier"),
                    got: current.clone(),
                })
            }
            None => return Err(self.end_of_input("identifier")),
        };

        self.advance();
        Ok(name)
    }
}

fn parse_number(lexeme: &str, span: Span) -> ParseResult<Number> {
    let invalid = || ParseError::InvalidNumber {
        lexeme: lexeme.to_owned(),
        span,
    };

    if lexeme.contains('.') {
        lexeme.parse().map(Number::Float).map_err(|_| invalid())
    } else {
        lexeme.parse().map(Number::Integer).map_err(|_| invalid())
    }
}

#[cfg(test)]
mod tests {
    use std::rc::Rc;

    use pretty_assertions::assert_eq;

    use crate::ast::{
        BinaryOp, BinaryOperator, Binding, Expression, FunctionCall, FunctionDef, Number, Program,
    };
    use crate::lexer::Lexer;
    use crate::parser::{ParseError, Parser};
    use crate::token::Token;

    #[test]
    fn test_binding() {
        let prog = setup("x := 5\ny := 10\n", 2);

        let tests = vec![("x", 5), ("y", 10)];

        for (expression, (name, value)) in prog.expressions.iter().zip(tests) {
            assert_eq!(
                *expression,
                Expression::Binding(Box::new(Binding {
                    name: name.to_string(),
                    value: Expression::Number(Number::Integer(value)),
                }))
            );
        }
    }

    #[test]
    fn test_function_def() {
        let prog = setup("b := x |-> 3*x", 1);

        assert_eq!(
            prog.expressions[0],
            Expression::Binding(Box::new(Binding {
                name: "b".to_owned(),
                value: Expression::FunctionDef(Box::new(FunctionDef {
                    parameter: "x".to_owned(),
                    body: Rc::new(Expression::BinaryOp(Box::new(BinaryOp {
                        left: Expression::Number(Number::Integer(3)),
                        operator: BinaryOperator::Multiply,
                        right: Expression::Var("x".to_owned()),
                    }))),
                })),
            }))
        );
    }

    #[test]
    fn test_operator_precedence() {
        let tests = vec![
            ("1 + 2 * 3", "(1 + (2 * 3))"),
            ("1 - 2 - 3", "((1 - 2) - 3)"),
            ("8 / 4 / 2", "((8 / 4) / 2)"),
            // `>` binds as tightly as `*`
            ("1 + 2 > 1", "(1 + (2 > 1))"),
            ("a > b * c", "((a > b) * c)"),
            ("(1 + 2) > 1", "((1 + 2) > 1)"),
            ("2.5 * x", "(2.5 * x)"),
        ];

        for (input, expected) in tests {
            let prog = setup(input, 1);
            assert_eq!(prog.to_string(), expected, "input: {}", input);
        }
    }

    #[test]
    fn test_calls() {
        let tests = vec![
            ("f(0) / 2", "(f(0) / 2)"),
            ("a(b)", "a(b)"),
            ("add(1)(2)", "add(1)(2)"),
            ("f(x |-> x + 1)", "f((x |-> (x + 1)))"),
        ];

        for (input, expected) in tests {
            let prog = setup(input, 1);
            assert_eq!(prog.to_string(), expected, "input: {}", input);
        }

        let prog = setup("add(1)(2)", 1);
        match &prog.expressions[0] {
            Expression::FunctionCall(call) => {
                assert_eq!(call.argument, Expression::Number(Number::Integer(2)));
                assert!(matches!(call.function, Expression::FunctionCall(_)));
            }
            other => panic!("expected a call but got {}", other),
        }
    }

    #[test]
    fn test_if_expression() {
        let prog = setup("fact := n |-> if n > 0 then n*fact(n-1) else 1\n", 1);

        assert_eq!(
            prog.to_string(),
            "fact := (n |-> (if (n > 0) then (n * fact((n - 1))) else 1))"
        );
    }

    #[test]
    fn test_blank_lines_are_skipped() {
        let prog = setup("\n\nx := 1\n\n\nx\n", 2);
        assert_eq!(prog.expressions[1], Expression::Var("x".to_owned()));

        let prog = setup("", 0);
        assert_eq!(prog, Program::new());
    }

    #[test]
    fn test_float_literal() {
        let prog = setup("7.", 1);
        assert_eq!(prog.expressions[0], Expression::Number(Number::Float(7.0)));
    }

    #[test]
    fn test_errors() {
        assert!(matches!(
            parse_err("x := )"),
            ParseError::Unexpected(tok) if tok.value == Token::RightParen
        ));
        assert!(matches!(
            parse_err("(1 + 2"),
            ParseError::UnexpectedEof { .. }
        ));
        assert!(matches!(
            parse_err("if 1 then 2 3"),
            ParseError::Expected { got, .. } if got.value == Token::Number("3".to_owned())
        ));
        assert!(matches!(
            parse_err("x :=\n1"),
            ParseError::ExpectedExpression(tok) if tok.value == Token::EndLine
        ));
        assert!(matches!(
            parse_err("1 +\n2"),
            ParseError::ExpectedExpression(_)
        ));
        assert!(matches!(
            parse_err("99999999999999999999"),
            ParseError::InvalidNumber { .. }
        ));
        // One bad statement invalidates the whole unit
        assert!(matches!(
            parse_err("x := 1\nthen\ny := 2\n"),
            ParseError::Unexpected(tok) if tok.value == Token::Then
        ));
    }

    #[test]
    fn test_error_messages() {
        assert_eq!(
            parse_err("x := )").to_string(),
            "Unexpected token `)` (at 5:6)"
        );
        assert_eq!(
            parse_err("if 1 else 2").to_string(),
            "Expected `then`, but got `else` instead (at 5:9)"
        );
        assert_eq!(
            parse_err("(1 + 2").to_string(),
            "Unexpected end of input, expected `)` (at 6:6)"
        );
        assert_eq!(
            parse_err(&format!("x := {}", "(".repeat(1000))).to_string(),
            "Expression is nested more than 256 levels deep (at 261:262)"
        );
    }

    #[test]
    fn test_depth_limit() {
        let chain = |terms: usize| vec!["1"; terms].join(" + ");
        let grouped = |levels: usize| {
            let mut input = String::from("1");
            for _ in 0..levels {
                input = format!("({}{})", input, " * 2".repeat(30));
            }
            input
        };
        let calls = |count: usize| format!("f{}", "(1)".repeat(count));

        let tests = vec![
            (chain(Parser::MAX_DEPTH), true),
            (chain(Parser::MAX_DEPTH + 1), false),
            (format!("x := {}", chain(Parser::MAX_DEPTH - 1)), true),
            (format!("x := {}", chain(Parser::MAX_DEPTH)), false),
            (chain(20_000), false),
            (grouped(8), true),
            (grouped(9), false),
            (calls(Parser::MAX_DEPTH - 1), true),
            (calls(Parser::MAX_DEPTH), false),
            (format!("{}1{}", "(".repeat(200_000), ")".repeat(200_000)), false),
            (format!("{}1", "x |-> ".repeat(100_000)), false),
        ];

        for (input, accepted) in tests {
            let tokens = Lexer::new(&input).tokenise();
            assert!(!tokens.had_error());

            match Parser::new(tokens.tokens).parse_program() {
                Ok(_) => assert!(accepted, "input of {} bytes was accepted", input.len()),
                Err(ParseError::TooDeeplyNested { limit, .. }) => {
                    assert!(!accepted, "input of {} bytes was rejected", input.len());
                    assert_eq!(limit, Parser::MAX_DEPTH);
                }
                Err(error) => panic!("unexpected parse error: {}", error),
            }
        }
    }

    fn parse_err(input: &str) -> ParseError {
        let tokens = Lexer::new(input).tokenise().tokens;
        match Parser::new(tokens).parse_program() {
            Ok(prog) => panic!("expected a parse error for '{}' but got {}", input, prog),
            Err(error) => error,
        }
    }

    fn setup(input: &str, expr_count: usize) -> Program {
        let tokens = Lexer::new(input).tokenise();
        assert!(!tokens.had_error(), "lexer errors: {:?}", tokens.errors);

        let mut p = Parser::new(tokens.tokens);
        match p.parse_program() {
            Ok(prog) => {
                if prog.expressions.len() != expr_count {
                    panic!(
                        "expected {} expression(s) for '{}' but got {:?}",
                        expr_count, input, prog.expressions
                    )
                }

                prog
            }
            Err(error) => panic!("parser error: {}", error),
        }
    }
}
