use std::{fmt::Display, rc::Rc};

use mfp_parser::ast::Expression;

use crate::{builtin::Builtin, environment::Environment};

#[derive(Debug, PartialEq)]
pub enum Value {
    Integer(i64),
    Float(f64),
    Boolean(bool),
    /// Result of bindings, `print`, and of expressions that failed with a diagnostic.
    Absent,
    Function(Closure),
    Builtin(Builtin),
    Partial(Partial),
}

impl Value {
    pub fn typename(&self) -> &'static str {
        use Value::*;

        match self {
            Integer(_) => "integer",
            Float(_) => "float",
            Boolean(_) => "boolean",
            Absent => "absent",
            Function(_) => "function",
            Builtin(_) | Partial(_) => "builtin",
        }
    }

    pub fn is_absent(&self) -> bool {
        matches!(self, Value::Absent)
    }

    /// `0`, `0.0`, `false` and absent are false; every other value is true.
    pub fn is_truthy(&self) -> bool {
        use Value::*;

        match self {
            Integer(value) => *value != 0,
            Float(value) => *value != 0.0,
            Boolean(value) => *value,
            Absent => false,
            Function(_) | Builtin(_) | Partial(_) => true,
        }
    }

    /// The value as an arithmetic operand. Booleans count as 0 and 1.
    pub fn as_number(&self) -> Option<Number> {
        match self {
            Value::Integer(value) => Some(Number::Integer(*value)),
            Value::Float(value) => Some(Number::Float(*value)),
            Value::Boolean(value) => Some(Number::Integer(i64::from(*value))),
            _ => None,
        }
    }
}

/// Floats use the shortest representation that reads back to the same value,
/// so large and tiny magnitudes switch to exponent form without a sign: `1e16`,
/// `1e-7`.
impl Display for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        use Value::*;

        match self {
            Integer(value) => write!(f, "{}", value),
            Float(value) => write!(f, "{}", ryu::Buffer::new().format(*value)),
            Boolean(value) => write!(f, "{}", value),
            Absent => write!(f, "absent"),
            Function(func) => write!(f, "{}", func),
            Builtin(builtin) => write!(f, "{}", builtin),
            Partial(partial) => write!(f, "{}", partial),
        }
    }
}

/// A numeric operand after coercion.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Number {
    Integer(i64),
    Float(f64),
}

impl Number {
    pub fn to_f64(self) -> f64 {
        match self {
            Number::Integer(value) => value as f64,
            Number::Float(value) => value,
        }
    }
}

/// A function value: parameter, body and the environment it was defined in.
#[derive(Debug)]
pub struct Closure {
    pub parameter: String,
    pub body: Rc<Expression>,
    pub env: Environment,
}

impl Display for Closure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} |-> {}", self.parameter, self.body)
    }
}

impl PartialEq for Closure {
    /// Closures are equal only when they come from the same definition
    /// evaluated in the same environment.
    fn eq(&self, other: &Closure) -> bool {
        self.parameter == other.parameter
            && Rc::ptr_eq(&self.body, &other.body)
            && self.env.ptr_eq(&other.env)
    }
}

/// A built-in applied to fewer arguments than it takes.
#[derive(Debug, PartialEq)]
pub struct Partial {
    pub builtin: Builtin,
    pub arguments: Vec<Rc<Value>>,
}

impl Display for Partial {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.builtin)?;
        for arg in &self.arguments {
            write!(f, "({})", arg)?;
        }
        Ok(())
    }
}
