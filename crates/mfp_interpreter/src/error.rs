use std::rc::Rc;

use thiserror::Error;

use crate::{builtin::Builtin, value::Value};

/// Diagnostics recorded while evaluating. None of them stop evaluation: the
/// expression that failed yields [`Value::Absent`] and later statements still run.
#[derive(Debug, Error, PartialEq)]
pub enum RuntimeError {
    /// When referencing a name bound neither in the environment nor as a builtin
    #[error("Unknown variable: {0}")]
    IdentifierNotFound(String),
    /// When binding a name that is already bound in the current environment
    #[error("Redeclaration of variable: {0}")]
    Redeclaration(String),
    /// When an operand of an arithmetic/comparison builtin is not a number
    #[error(
        "unsupported operand type(s) for {}: `{}` ({}) and `{}` ({})",
        .builtin.name(), .left.typename(), .left, .right.typename(), .right
    )]
    InvalidOperandType {
        builtin: Builtin,
        left: Rc<Value>,
        right: Rc<Value>,
    },
    #[error("integer overflow in {left} {} {right}", .builtin.name())]
    IntegerOverflow { builtin: Builtin, left: i64, right: i64 },
    /// When a math builtin gets an argument it cannot convert to a number
    #[error(
        "unsupported argument type for {} function: `{}` ({})",
        .0.name(), .1.typename(), .1
    )]
    InvalidArgumentType(Builtin, Rc<Value>),
    #[error("math domain error: {}({})", .0.name(), .1)]
    MathDomain(Builtin, Rc<Value>),
    /// When a math builtin's result is too large to represent
    #[error("math range error: {}({})", .0.name(), .1)]
    MathRange(Builtin, Rc<Value>),
    #[error("division by zero: {0} / 0")]
    DivisionByZero(Rc<Value>),
    #[error("{} expected {expected} argument(s) but got {got}", .builtin.name())]
    BadArity {
        builtin: Builtin,
        expected: usize,
        got: usize,
    },
    /// When a value that is not a function is used with call syntax
    #[error("{0} is not a function")]
    NotCallable(Rc<Value>),
    /// When the built-in table has no entry for a binary operator
    #[error("no builtin registered for operator {0}")]
    UnknownOperator(&'static str),
    #[error("maximum call depth of {0} exceeded")]
    CallDepthExceeded(usize),
    #[error("could not write output: {0}")]
    Output(String),
}
