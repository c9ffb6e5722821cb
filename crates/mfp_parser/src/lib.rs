//! Front end of the MathFP language: macro preprocessing, tokenising and
//! parsing into an [`ast::Program`].

pub mod ast;
pub mod lexer;
pub mod parser;
pub mod preprocessor;
pub mod span;
pub mod token;

pub use lexer::{LexError, Lexer, Tokens};
pub use parser::{ParseError, Parser};
pub use preprocessor::{PreprocessError, PreprocessErrorKind, Preprocessor};
