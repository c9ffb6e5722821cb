use std::{path::Path, rc::Rc};

use thiserror::Error;

use mfp_parser::{
    span::WithSpan, LexError, Lexer, ParseError, Parser, PreprocessError, Preprocessor,
};

use crate::{
    environment::Environment, error::RuntimeError, evaluator::Evaluator, value::Value,
};

/// Failures that abort a source unit before any of it is evaluated.
#[derive(Debug, Error)]
pub enum FrontendError {
    #[error(transparent)]
    Preprocess(#[from] PreprocessError),
    #[error("{} lexical error(s)", .0.len())]
    Lex(Vec<WithSpan<LexError>>),
    #[error(transparent)]
    Parse(#[from] ParseError),
}

impl FrontendError {
    /// One human readable line per underlying problem.
    pub fn messages(&self) -> Vec<String> {
        match self {
            FrontendError::Lex(errors) => errors.iter().map(|err| err.at_str()).collect(),
            other => vec![other.to_string()],
        }
    }
}

/// Result of running one source unit.
#[derive(Debug)]
pub struct Outcome {
    pub value: Rc<Value>,
    pub diagnostics: Vec<RuntimeError>,
}

/// Drives text through preprocessing, tokenising, parsing and evaluation,
/// keeping the environment between runs.
pub struct Session {
    evaluator: Evaluator,
    preprocessor: Preprocessor,
    env: Environment,
}

impl Default for Session {
    fn default() -> Self {
        Session::new(Evaluator::new())
    }
}

impl Session {
    pub fn new(evaluator: Evaluator) -> Self {
        Session {
            evaluator,
            preprocessor: Preprocessor::new(),
            env: Environment::new(),
        }
    }

    pub fn env(&self) -> &Environment {
        &self.env
    }

    /// Run `source`, read from `origin`. A front end error leaves the
    /// session environment untouched.
    pub fn run_source(&mut self, source: &str, origin: &Path) -> Result<Outcome, FrontendError> {
        let expanded = self.preprocessor.preprocess(source, origin)?;

        let tokens = Lexer::new(&expanded)
            .tokenise()
            .into_result()
            .map_err(FrontendError::Lex)?;

        let program = Parser::new(tokens).parse_program()?;
        tracing::debug!(
            origin = %origin.display(),
            expressions = program.expressions.len(),
            "evaluating"
        );

        let evaluation = self.evaluator.eval(&program, self.env.clone());
        if evaluation.has_diagnostics() {
            tracing::debug!(count = evaluation.diagnostics.len(), "evaluation reported diagnostics");
        }
        self.env = evaluation.env;

        Ok(Outcome {
            value: evaluation.value,
            diagnostics: evaluation.diagnostics,
        })
    }
}
