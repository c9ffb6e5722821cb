use std::{collections::HashMap, fmt::Display, io::Write, rc::Rc};

use crate::{
    error::RuntimeError,
    value::{Number, Value},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Builtin {
    Add,
    Subtract,
    Multiply,
    Divide,
    GreaterThan,
    If,
    Print,
    Exp,
    Ln,
    Sin,
    Cos,
}

impl Builtin {
    pub const ALL: [Builtin; 11] = [
        Builtin::Add,
        Builtin::Subtract,
        Builtin::Multiply,
        Builtin::Divide,
        Builtin::GreaterThan,
        Builtin::If,
        Builtin::Print,
        Builtin::Exp,
        Builtin::Ln,
        Builtin::Sin,
        Builtin::Cos,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Builtin::Add => "+",
            Builtin::Subtract => "-",
            Builtin::Multiply => "*",
            Builtin::Divide => "/",
            Builtin::GreaterThan => ">",
            Builtin::If => "if",
            Builtin::Print => "print",
            Builtin::Exp => "exp",
            Builtin::Ln => "ln",
            Builtin::Sin => "sin",
            Builtin::Cos => "cos",
        }
    }

    /// Number of arguments taken before the operation runs.
    pub fn arity(&self) -> usize {
        match self {
            Builtin::Add
            | Builtin::Subtract
            | Builtin::Multiply
            | Builtin::Divide
            | Builtin::GreaterThan => 2,
            Builtin::If => 3,
            Builtin::Print | Builtin::Exp | Builtin::Ln | Builtin::Sin | Builtin::Cos => 1,
        }
    }

    /// Run the operation. `args` must hold exactly `arity()` values.
    pub fn apply(
        &self,
        args: &[Rc<Value>],
        out: &mut dyn Write,
    ) -> Result<Rc<Value>, RuntimeError> {
        if args.len() != self.arity() {
            return Err(RuntimeError::BadArity {
                builtin: *self,
                expected: self.arity(),
                got: args.len(),
            });
        }

        match self {
            Builtin::Add | Builtin::Subtract | Builtin::Multiply | Builtin::Divide => {
                self.arithmetic(&args[0], &args[1])
            }
            Builtin::GreaterThan => {
                let (left, right) = self.operands(&args[0], &args[1])?;
                let result = match (left, right) {
                    (Number::Integer(l), Number::Integer(r)) => l > r,
                    (l, r) => l.to_f64() > r.to_f64(),
                };
                Ok(Rc::new(Value::Boolean(result)))
            }
            Builtin::If => {
                let chosen = if args[0].is_truthy() { &args[1] } else { &args[2] };
                Ok(Rc::clone(chosen))
            }
            Builtin::Print => {
                writeln!(out, "{}", args[0]).map_err(|err| RuntimeError::Output(err.to_string()))?;
                Ok(Rc::new(Value::Absent))
            }
            Builtin::Exp | Builtin::Ln | Builtin::Sin | Builtin::Cos => self.math(&args[0]),
        }
    }

    fn operands(&self, left: &Rc<Value>, right: &Rc<Value>) -> Result<(Number, Number), RuntimeError> {
        match (left.as_number(), right.as_number()) {
            (Some(l), Some(r)) => Ok((l, r)),
            _ => Err(RuntimeError::InvalidOperandType {
                builtin: *self,
                left: Rc::clone(left),
                right: Rc::clone(right),
            }),
        }
    }

    fn arithmetic(&self, left: &Rc<Value>, right: &Rc<Value>) -> Result<Rc<Value>, RuntimeError> {
        let (l, r) = self.operands(left, right)?;

        if let Builtin::Divide = self {
            // Always true division
            if r.to_f64() == 0.0 {
                return Err(RuntimeError::DivisionByZero(Rc::clone(left)));
            }
            return Ok(Rc::new(Value::Float(l.to_f64() / r.to_f64())));
        }

        let value = match (l, r) {
            (Number::Integer(l), Number::Integer(r)) => {
                let result = match self {
                    Builtin::Add => l.checked_add(r),
                    Builtin::Subtract => l.checked_sub(r),
                    _ => l.checked_mul(r),
                };
                match result {
                    Some(value) => Value::Integer(value),
                    None => {
                        return Err(RuntimeError::IntegerOverflow {
                            builtin: *self,
                            left: l,
                            right: r,
                        })
                    }
                }
            }
            (l, r) => {
                let (l, r) = (l.to_f64(), r.to_f64());
                Value::Float(match self {
                    Builtin::Add => l + r,
                    Builtin::Subtract => l - r,
                    _ => l * r,
                })
            }
        };

        Ok(Rc::new(value))
    }

    fn math(&self, arg: &Rc<Value>) -> Result<Rc<Value>, RuntimeError> {
        let x = match arg.as_number() {
            Some(number) => number.to_f64(),
            None => return Err(RuntimeError::InvalidArgumentType(*self, Rc::clone(arg))),
        };

        let result = match self {
            Builtin::Exp => {
                let result = x.exp();
                if !result.is_finite() {
                    return Err(RuntimeError::MathRange(*self, Rc::clone(arg)));
                }
                result
            }
            Builtin::Ln => {
                if x <= 0.0 {
                    return Err(RuntimeError::MathDomain(*self, Rc::clone(arg)));
                }
                x.ln()
            }
            Builtin::Sin => x.sin(),
            _ => x.cos(),
        };

        Ok(Rc::new(Value::Float(result)))
    }
}

impl Display for Builtin {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "<builtin {}>", self.name())
    }
}

/// Read-only name to built-in mapping handed to the evaluator.
///
/// Names are resolved here only after the environment had no binding for them.
#[derive(Debug, Clone)]
pub struct BuiltinTable {
    entries: HashMap<&'static str, Builtin>,
}

impl BuiltinTable {
    /// Every built-in under its usual name.
    pub fn standard() -> Self {
        BuiltinTable::with(&Builtin::ALL)
    }

    /// A table restricted to the given built-ins.
    pub fn with(builtins: &[Builtin]) -> Self {
        BuiltinTable {
            entries: builtins.iter().map(|b| (b.name(), *b)).collect(),
        }
    }

    pub fn lookup(&self, name: &str) -> Option<Builtin> {
        self.entries.get(name).copied()
    }

}

impl Default for BuiltinTable {
    fn default() -> Self {
        BuiltinTable::standard()
    }
}
