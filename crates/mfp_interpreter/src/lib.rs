//! Evaluator for MathFP programs produced by `mfp_parser`.

pub mod builtin;
pub mod environment;
pub mod error;
pub mod evaluator;
pub mod session;
pub mod value;

pub use builtin::{Builtin, BuiltinTable};
pub use environment::Environment;
pub use error::RuntimeError;
pub use evaluator::{EvalConfig, Evaluation, Evaluator};
pub use session::{FrontendError, Outcome, Session};
pub use value::Value;
