use std::path::PathBuf;

use thiserror::Error;

use mfp_interpreter::EvalConfig;

pub const USAGE: &str = "\
Usage: mfp [OPTIONS] [FILE]

Runs FILE, or starts an interactive session when no FILE is given.

Options:
  --max-call-depth <N>  Nested function calls allowed before a call fails
  -h, --help            Print this help
  -V, --version         Print the version";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum OptionsError {
    #[error("unknown option `{0}`")]
    UnknownOption(String),
    #[error("option `{0}` needs a value")]
    MissingValue(String),
    #[error("invalid value `{value}` for `{option}`")]
    InvalidValue { option: String, value: String },
    #[error("only one file can be run, got `{0}` as well")]
    ExtraFile(String),
}

/// What the command line asked for.
#[derive(Debug, PartialEq, Eq)]
pub enum Command {
    Help,
    Version,
    Run(Options),
}

#[derive(Debug, PartialEq, Eq)]
pub struct Options {
    pub max_call_depth: usize,
    /// Runs the file in batch mode, or the interactive loop when `None`
    pub file: Option<PathBuf>,
}

impl Default for Options {
    fn default() -> Self {
        Options {
            max_call_depth: EvalConfig::DEFAULT_MAX_CALL_DEPTH,
            file: None,
        }
    }
}

impl Options {
    pub fn eval_config(&self) -> EvalConfig {
        EvalConfig {
            max_call_depth: self.max_call_depth,
        }
    }
}

/// Parse the arguments that follow the executable name.
pub fn parse_args<I>(args: I) -> Result<Command, OptionsError>
where
    I: IntoIterator<Item = String>,
{
    let mut options = Options::default();
    let mut args = args.into_iter();

    while let Some(arg) = args.next() {
        match arg.as_str() {
            "-h" | "--help" => return Ok(Command::Help),
            "-V" | "--version" => return Ok(Command::Version),
            "--max-call-depth" => {
                let value = args
                    .next()
                    .ok_or_else(|| OptionsError::MissingValue(arg.clone()))?;
                options.max_call_depth = parse_depth(&arg, &value)?;
            }
            _ => {
                if let Some(value) = arg.strip_prefix("--max-call-depth=") {
                    options.max_call_depth = parse_depth("--max-call-depth", value)?;
                } else if arg.starts_with('-') && arg != "-" {
                    return Err(OptionsError::UnknownOption(arg));
                } else if options.file.is_some() {
                    return Err(OptionsError::ExtraFile(arg));
                } else {
                    options.file = Some(PathBuf::from(arg));
                }
            }
        }
    }

    Ok(Command::Run(options))
}

fn parse_depth(option: &str, value: &str) -> Result<usize, OptionsError> {
    value.parse().map_err(|_| OptionsError::InvalidValue {
        option: option.to_owned(),
        value: value.to_owned(),
    })
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use pretty_assertions::assert_eq;

    use crate::options::{parse_args, Command, Options, OptionsError};

    fn parse(args: &[&str]) -> Result<Command, OptionsError> {
        parse_args(args.iter().map(|arg| arg.to_string()))
    }

    #[test]
    fn commands() {
        let tests = vec![
            (vec![], Command::Run(Options::default())),
            (
                vec!["prog.mfp"],
                Command::Run(Options {
                    file: Some(PathBuf::from("prog.mfp")),
                    ..Options::default()
                }),
            ),
            (
                vec!["--max-call-depth", "10", "prog.mfp"],
                Command::Run(Options {
                    max_call_depth: 10,
                    file: Some(PathBuf::from("prog.mfp")),
                }),
            ),
            (
                vec!["--max-call-depth=3"],
                Command::Run(Options {
                    max_call_depth: 3,
                    file: None,
                }),
            ),
            (vec!["prog.mfp", "--help"], Command::Help),
            (vec!["-V"], Command::Version),
        ];

        for (args, expected) in tests {
            assert_eq!(parse(&args), Ok(expected), "args: {:?}", args);
        }
    }

    #[test]
    fn errors() {
        let tests = vec![
            (vec!["--fast"], OptionsError::UnknownOption("--fast".into())),
            (
                vec!["--max-call-depth"],
                OptionsError::MissingValue("--max-call-depth".into()),
            ),
            (
                vec!["--max-call-depth", "deep"],
                OptionsError::InvalidValue {
                    option: "--max-call-depth".into(),
                    value: "deep".into(),
                },
            ),
            (vec!["a.mfp", "b.mfp"], OptionsError::ExtraFile("b.mfp".into())),
        ];

        for (args, expected) in tests {
            assert_eq!(parse(&args), Err(expected), "args: {:?}", args);
        }
    }

    #[test]
    fn eval_config_carries_depth() {
        let options = Options {
            max_call_depth: 7,
            file: None,
        };
        assert_eq!(options.eval_config().max_call_depth, 7);
    }
}
