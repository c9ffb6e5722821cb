use std::{
    io::{self, Write},
    path::Path,
    rc::Rc,
};

use rustyline::error::ReadlineError;
use rustyline::Editor;

use mfp_interpreter::{BuiltinTable, EvalConfig, Evaluator, Session};

use crate::runner::{write_diagnostics, write_frontend_error};

pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Origin of interactive input; includes resolve against the working directory.
const REPL_ORIGIN: &str = "<stdin>";

pub fn repl(config: EvalConfig) -> Result<(), ReadlineError> {
    println!("MathFP v{}", VERSION);

    let evaluator = Evaluator::new_with_builtins(Rc::new(BuiltinTable::standard()), config);
    let mut session = Session::new(evaluator);

    // `()` can be used when no completer is required
    let mut rl = Editor::<()>::new();
    loop {
        match rl.readline(">>> ") {
            Ok(line) => {
                let input = line.trim();
                if input == "exit" || input == "quit" {
                    break;
                } else if input.is_empty() {
                    continue;
                }

                rl.add_history_entry(line.as_str());
                run_line(&mut session, &line);
            }
            Err(ReadlineError::Interrupted) | Err(ReadlineError::Eof) => break,
            Err(err) => return Err(err),
        }
    }

    Ok(())
}

fn run_line(session: &mut Session, line: &str) {
    let stderr = io::stderr();
    let mut errors = stderr.lock();

    let written = match session.run_source(line, Path::new(REPL_ORIGIN)) {
        Ok(outcome) => {
            if !outcome.value.is_absent() {
                println!("{}", outcome.value);
            }
            write_diagnostics(&mut errors, &outcome.diagnostics)
        }
        Err(err) => write_frontend_error(&mut errors, &err),
    };

    if let Err(err) = written.and_then(|_| errors.flush()) {
        tracing::warn!(error = %err, "could not write diagnostics");
    }
}
