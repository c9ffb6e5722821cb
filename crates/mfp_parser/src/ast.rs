use std::{fmt::Display, rc::Rc};

use crate::token::Token;

#[derive(Debug, Default, PartialEq)]
pub struct Program {
    pub expressions: Vec<Expression>,
}

impl Program {
    pub fn new() -> Program {
        Program {
            expressions: Vec::new(),
        }
    }
}

impl Display for Program {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = self
            .expressions
            .iter()
            .map(|expr| expr.to_string())
            .collect::<Vec<String>>()
            .join("\n");

        write!(f, "{}", s)
    }
}

#[derive(Debug, PartialEq, Clone, Copy)]
pub enum Number {
    Integer(i64),
    Float(f64),
}

impl Display for Number {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Number::Integer(value) => write!(f, "{}", value),
            Number::Float(value) => write!(f, "{:?}", value),
        }
    }
}

#[derive(Debug, PartialEq, Clone, Copy)]
pub enum BinaryOperator {
    Add,
    Subtract,
    Multiply,
    Divide,
    GreaterThan,
}

impl BinaryOperator {
    pub fn from_token(token: &Token) -> Option<BinaryOperator> {
        match token {
            Token::Plus => Some(BinaryOperator::Add),
            Token::Minus => Some(BinaryOperator::Subtract),
            Token::Star => Some(BinaryOperator::Multiply),
            Token::Slash => Some(BinaryOperator::Divide),
            Token::GreaterThan => Some(BinaryOperator::GreaterThan),
            _ => None,
        }
    }

    /// The name this operator is registered under in the built-in table.
    pub fn symbol(&self) -> &'static str {
        match self {
            BinaryOperator::Add => "+",
            BinaryOperator::Subtract => "-",
            BinaryOperator::Multiply => "*",
            BinaryOperator::Divide => "/",
            BinaryOperator::GreaterThan => ">",
        }
    }
}

impl Display for BinaryOperator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.symbol())
    }
}

/// One node per surface construct. Nodes are never mutated after parsing;
/// function bodies are shared with the closures created from them.
#[derive(Debug, PartialEq)]
pub enum Expression {
    Number(Number),
    Var(String),
    Binding(Box<Binding>),
    FunctionDef(Box<FunctionDef>),
    FunctionCall(Box<FunctionCall>),
    BinaryOp(Box<BinaryOp>),
    If(Box<IfExpression>),
}

impl Display for Expression {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        use Expression::*;

        match self {
            Number(value) => write!(f, "{}", value),
            Var(name) => write!(f, "{}", name),
            Binding(binding) => write!(f, "{}", binding),
            FunctionDef(func) => write!(f, "{}", func),
            FunctionCall(call) => write!(f, "{}", call),
            BinaryOp(op) => write!(f, "{}", op),
            If(if_expr) => write!(f, "{}", if_expr),
        }
    }
}

#[derive(Debug, PartialEq)]
pub struct Binding {
    pub name: String,
    pub value: Expression,
}

impl Display for Binding {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{ident} {tok} {val}",
            ident = self.name,
            tok = Token::Binding,
            val = self.value
        )
    }
}

#[derive(Debug, PartialEq)]
pub struct FunctionDef {
    pub parameter: String,
    pub body: Rc<Expression>,
}

impl Display for FunctionDef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({} {} {})", self.parameter, Token::MapsTo, self.body)
    }
}

#[derive(Debug, PartialEq)]
pub struct FunctionCall {
    pub function: Expression,
    pub argument: Expression,
}

impl Display for FunctionCall {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}({})", self.function, self.argument)
    }
}

#[derive(Debug, PartialEq)]
pub struct BinaryOp {
    pub left: Expression,
    pub operator: BinaryOperator,
    pub right: Expression,
}

impl Display for BinaryOp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "({l} {op} {r})",
            l = self.left,
            op = self.operator,
            r = self.right
        )
    }
}

#[derive(Debug, PartialEq)]
pub struct IfExpression {
    pub condition: Expression,
    /// Selected when the condition is truthy
    pub consequence: Expression,
    /// Selected otherwise
    pub alternative: Expression,
}

impl Display for IfExpression {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "({} {} {} {} {} {})",
            Token::If,
            self.condition,
            Token::Then,
            self.consequence,
            Token::Else,
            self.alternative
        )
    }
}
