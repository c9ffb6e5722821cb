mod options;
mod repl;
mod runner;

use std::{io, path::Path, process::ExitCode, rc::Rc};

use mfp_interpreter::{BuiltinTable, EvalConfig, Evaluator, Session};

use crate::options::{parse_args, Command, USAGE};

fn main() -> ExitCode {
    init_tracing();

    let options = match parse_args(std::env::args().skip(1)) {
        Ok(Command::Run(options)) => options,
        Ok(Command::Help) => {
            println!("{}", USAGE);
            return ExitCode::SUCCESS;
        }
        Ok(Command::Version) => {
            println!("mfp {}", repl::VERSION);
            return ExitCode::SUCCESS;
        }
        Err(err) => {
            eprintln!("error: {}", err);
            eprintln!();
            eprintln!("{}", USAGE);
            return ExitCode::FAILURE;
        }
    };

    match options.file.as_deref() {
        Some(path) => run_batch(path, options.eval_config()),
        None => match repl::repl(options.eval_config()) {
            Ok(()) => ExitCode::SUCCESS,
            Err(err) => {
                eprintln!("{} {}", runner::DIAGNOSTIC_PREFIX, err);
                ExitCode::FAILURE
            }
        },
    }
}

fn run_batch(path: &Path, config: EvalConfig) -> ExitCode {
    let evaluator = Evaluator::new_with_builtins(Rc::new(BuiltinTable::standard()), config);
    let mut session = Session::new(evaluator);
    let mut errors = io::stderr();

    match runner::run_file(&mut session, path, &mut errors) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            // Nothing more can be done if stderr itself is gone
            let _ = err.report(&mut errors);
            ExitCode::FAILURE
        }
    }
}

/// Install a log subscriber on stderr when `RUST_LOG` is set,
/// e.g. `RUST_LOG=mfp_interpreter=trace`.
fn init_tracing() {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    if std::env::var("RUST_LOG").is_ok() {
        tracing_subscriber::registry()
            .with(fmt::layer().with_writer(io::stderr).with_target(true))
            .with(EnvFilter::from_default_env())
            .init();
    }
}
