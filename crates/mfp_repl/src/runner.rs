use std::{
    fs,
    io::{self, Write},
    path::{Path, PathBuf},
};

use thiserror::Error;

use mfp_interpreter::{FrontendError, RuntimeError, Session};

/// Prefix for every diagnostic shown to the user.
pub const DIAGNOSTIC_PREFIX: &str = "[mfp]";

#[derive(Debug, Error)]
pub enum RunError {
    #[error("No such file: {}", .0.display())]
    NoSuchFile(PathBuf),
    #[error("could not read {}: {source}", .path.display())]
    Unreadable { path: PathBuf, source: io::Error },
    #[error(transparent)]
    Frontend(#[from] FrontendError),
    #[error(transparent)]
    Io(#[from] io::Error),
}

impl RunError {
    /// Write the error the way the command line reports it.
    pub fn report(&self, errors: &mut dyn Write) -> io::Result<()> {
        match self {
            // Printed without the prefix, as the only line
            RunError::NoSuchFile(_) => writeln!(errors, "{}", self),
            RunError::Frontend(err) => write_frontend_error(errors, err),
            _ => writeln!(errors, "{} {}", DIAGNOSTIC_PREFIX, self),
        }
    }
}

pub fn write_frontend_error(errors: &mut dyn Write, err: &FrontendError) -> io::Result<()> {
    for message in err.messages() {
        writeln!(errors, "{} {}", DIAGNOSTIC_PREFIX, message)?;
    }
    Ok(())
}

pub fn write_diagnostics(errors: &mut dyn Write, diagnostics: &[RuntimeError]) -> io::Result<()> {
    for diagnostic in diagnostics {
        writeln!(errors, "{} {}", DIAGNOSTIC_PREFIX, diagnostic)?;
    }
    Ok(())
}

/// Run a whole file. Runtime diagnostics are written to `errors` but do not
/// make the run fail.
pub fn run_file(session: &mut Session, path: &Path, errors: &mut dyn Write) -> Result<(), RunError> {
    if !path.is_file() {
        return Err(RunError::NoSuchFile(path.to_owned()));
    }

    let source = fs::read_to_string(path).map_err(|source| RunError::Unreadable {
        path: path.to_owned(),
        source,
    })?;
    tracing::debug!(path = %path.display(), bytes = source.len(), "running file");

    let outcome = session.run_source(&source, path)?;
    write_diagnostics(errors, &outcome.diagnostics)?;

    Ok(())
}
