use std::{
    io::{self, Write},
    mem,
    rc::Rc,
};

use crate::{
    builtin::{Builtin, BuiltinTable},
    environment::Environment,
    error::RuntimeError,
    value::{Closure, Partial, Value},
};

use mfp_parser::ast::{self, Binding, Expression, Program};

/// Tunables for a single evaluator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EvalConfig {
    /// Nested closure calls allowed before a call yields a diagnostic instead.
    pub max_call_depth: usize,
}

impl EvalConfig {
    pub const DEFAULT_MAX_CALL_DEPTH: usize = 256;
}

impl Default for EvalConfig {
    fn default() -> Self {
        EvalConfig {
            max_call_depth: EvalConfig::DEFAULT_MAX_CALL_DEPTH,
        }
    }
}

/// Outcome of evaluating a whole program.
#[derive(Debug)]
pub struct Evaluation {
    /// Value of the last top-level expression
    pub value: Rc<Value>,
    /// Environment after every top-level binding
    pub env: Environment,
    pub diagnostics: Vec<RuntimeError>,
}

impl Evaluation {
    pub fn has_diagnostics(&self) -> bool {
        !self.diagnostics.is_empty()
    }
}

pub struct Evaluator {
    builtins: Rc<BuiltinTable>,
    config: EvalConfig,
    output: Box<dyn Write>,
    diagnostics: Vec<RuntimeError>,
    depth: usize,
}

impl Default for Evaluator {
    fn default() -> Self {
        Self::new()
    }
}

impl Evaluator {
    pub fn new() -> Self {
        Self::new_with_builtins(Rc::new(BuiltinTable::standard()), EvalConfig::default())
    }

    pub fn new_with_builtins(builtins: Rc<BuiltinTable>, config: EvalConfig) -> Self {
        Evaluator {
            builtins,
            config,
            output: Box::new(io::stdout()),
            diagnostics: Vec::new(),
            depth: 0,
        }
    }

    /// Send `print` output somewhere other than stdout.
    pub fn with_output(mut self, output: Box<dyn Write>) -> Self {
        self.output = output;
        self
    }

    /// Evaluate the top-level expressions in order, threading the environment
    /// through. Only bindings change the environment.
    pub fn eval(&mut self, prog: &Program, env: Environment) -> Evaluation {
        let mut env = env;
        let mut value = Rc::new(Value::Absent);

        for expr in &prog.expressions {
            let (next_env, result) = self.eval_statement(expr, &env);
            env = next_env;
            value = result;
        }

        if let Err(err) = self.output.flush() {
            self.report(RuntimeError::Output(err.to_string()));
        }

        Evaluation {
            value,
            env,
            diagnostics: mem::take(&mut self.diagnostics),
        }
    }

    /// Evaluate one top-level expression, returning the environment the next
    /// expression should see.
    pub fn eval_statement(
        &mut self,
        expr: &Expression,
        env: &Environment,
    ) -> (Environment, Rc<Value>) {
        match expr {
            Expression::Binding(binding) => self.eval_binding(binding, env),
            _ => (env.clone(), self.eval_expression(expr, env)),
        }
    }

    fn eval_expression(&mut self, expr: &Expression, env: &Environment) -> Rc<Value> {
        match expr {
            Expression::Number(ast::Number::Integer(value)) => Rc::new(Value::Integer(*value)),
            Expression::Number(ast::Number::Float(value)) => Rc::new(Value::Float(*value)),
            Expression::Var(name) => self.eval_identifier(name, env),

            // A binding below the top level only scopes over itself
            Expression::Binding(binding) => self.eval_binding(binding, env).1,

            Expression::FunctionDef(func) => Rc::new(Value::Function(Closure {
                parameter: func.parameter.clone(),
                body: Rc::clone(&func.body),
                env: env.clone(),
            })),
            Expression::FunctionCall(call) => {
                let func = self.eval_expression(&call.function, env);
                let arg = self.eval_expression(&call.argument, env);
                self.apply_function(func, arg)
            }

            Expression::BinaryOp(op) => {
                let left = self.eval_expression(&op.left, env);
                let right = self.eval_expression(&op.right, env);

                match self.builtins.lookup(op.operator.symbol()) {
                    Some(builtin) => self.call_builtin(builtin, &[left, right]),
                    None => self.report(RuntimeError::UnknownOperator(op.operator.symbol())),
                }
            }

            // Every branch is evaluated; the condition only picks the result
            Expression::If(if_expr) => {
                let condition = self.eval_expression(&if_expr.condition, env);
                let consequence = self.eval_expression(&if_expr.consequence, env);
                let alternative = self.eval_expression(&if_expr.alternative, env);

                if condition.is_truthy() {
                    consequence
                } else {
                    alternative
                }
            }
        }
    }

    fn eval_binding(&mut self, binding: &Binding, env: &Environment) -> (Environment, Rc<Value>) {
        let value = self.eval_expression(&binding.value, env);

        if env.contains(&binding.name) {
            // The existing binding wins; the new value is dropped
            self.report(RuntimeError::Redeclaration(binding.name.clone()));
            return (env.clone(), Rc::new(Value::Absent));
        }

        tracing::trace!(name = %binding.name, %value, "bound");
        (env.extend(binding.name.as_str(), value), Rc::new(Value::Absent))
    }

    fn eval_identifier(&mut self, name: &str, env: &Environment) -> Rc<Value> {
        match env.get(name) {
            Some(value) => value,
            // Builtins are only consulted when the environment has no such name
            None => match self.builtins.lookup(name) {
                Some(builtin) => Rc::new(Value::Builtin(builtin)),
                None => self.report(RuntimeError::IdentifierNotFound(name.to_owned())),
            },
        }
    }

    fn apply_function(&mut self, func: Rc<Value>, arg: Rc<Value>) -> Rc<Value> {
        match func.as_ref() {
            Value::Function(closure) => {
                if self.depth >= self.config.max_call_depth {
                    let limit = self.config.max_call_depth;
                    return self.report(RuntimeError::CallDepthExceeded(limit));
                }

                // The parameter lives in a frame only this call can see
                let local_env = closure.env.extend(closure.parameter.as_str(), arg);

                self.depth += 1;
                let result = self.eval_expression(&closure.body, &local_env);
                self.depth -= 1;

                result
            }
            Value::Builtin(builtin) => self.collect_argument(*builtin, Vec::new(), arg),
            Value::Partial(partial) => {
                self.collect_argument(partial.builtin, partial.arguments.clone(), arg)
            }
            _ => self.report(RuntimeError::NotCallable(func)),
        }
    }

    /// Builtins taking several arguments receive them one call at a time.
    fn collect_argument(
        &mut self,
        builtin: Builtin,
        mut arguments: Vec<Rc<Value>>,
        arg: Rc<Value>,
    ) -> Rc<Value> {
        arguments.push(arg);

        if arguments.len() < builtin.arity() {
            Rc::new(Value::Partial(Partial { builtin, arguments }))
        } else {
            self.call_builtin(builtin, &arguments)
        }
    }

    fn call_builtin(&mut self, builtin: Builtin, args: &[Rc<Value>]) -> Rc<Value> {
        match builtin.apply(args, self.output.as_mut()) {
            Ok(value) => value,
            Err(err) => self.report(err),
        }
    }

    /// Record a diagnostic and produce the value the failed expression yields.
    fn report(&mut self, err: RuntimeError) -> Rc<Value> {
        tracing::debug!(error = %err, "runtime diagnostic");
        self.diagnostics.push(err);
        Rc::new(Value::Absent)
    }
}
