//! Line oriented macro expansion that runs before tokenising.
//!
//! A line whose trimmed content starts with `!` (and is longer than just `!`)
//! is a macro call of the form `!name(argument)`. The only macro is
//! `include`, which splices another file in place of the call line. Spliced
//! lines are scanned for macros in turn, and every file is included at most
//! once per pass.

use std::collections::HashSet;
use std::fmt::Display;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum PreprocessErrorKind {
    #[error("Expected '!' before macro call")]
    MissingBang,
    #[error("Expected '(' after macro name")]
    MissingOpenParen,
    #[error("Expected ')' after macro argument")]
    MissingCloseParen,
    #[error("Expected a macro name after '!'")]
    EmptyMacroName,
    #[error("No such macro '{0}'")]
    UnknownMacro(String),
    #[error("!include: expected a file name")]
    EmptyIncludePath,
    #[error("!include: No such file '{path}' found")]
    IncludeNotFound {
        path: String,
        #[source]
        source: io::Error,
    },
    #[error("!include: '{0}' is a directory")]
    IncludeIsDirectory(String),
    #[error("!include: '{0}' is not a regular file")]
    IncludeNotAFile(String),
    #[error("!include: could not read '{path}'")]
    IncludeUnreadable {
        path: String,
        #[source]
        source: io::Error,
    },
}

/// A fatal preprocessing error, located at the macro line that caused it.
#[derive(Debug, Error)]
#[error("{origin}:{line}: {kind}")]
pub struct PreprocessError {
    pub origin: String,
    pub line: usize,
    #[source]
    pub kind: PreprocessErrorKind,
}

/// A physical line together with the file it came from.
struct SourceLine {
    text: String,
    origin: Rc<Path>,
    number: usize,
}

impl SourceLine {
    fn split(text: &str, origin: &Rc<Path>) -> Vec<SourceLine> {
        let mut lines: Vec<SourceLine> = text
            .split_inclusive('\n')
            .enumerate()
            .map(|(i, line)| SourceLine {
                text: line.to_owned(),
                origin: Rc::clone(origin),
                number: i + 1,
            })
            .collect();

        // Included text must not run into whatever line follows it
        if let Some(last) = lines.last_mut() {
            if !last.text.ends_with('\n') {
                last.text.push('\n');
            }
        }

        lines
    }
}

/// A parsed `!name(argument)` call.
#[derive(Debug, PartialEq)]
pub struct MacroCall {
    pub name: String,
    pub argument: String,
}

impl Display for MacroCall {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "!{}({})", self.name, self.argument)
    }
}

impl MacroCall {
    /// Parse a trimmed macro line.
    pub fn parse(line: &str) -> Result<MacroCall, PreprocessErrorKind> {
        let rest = line
            .strip_prefix('!')
            .ok_or(PreprocessErrorKind::MissingBang)?;

        let open = rest
            .find('(')
            .ok_or(PreprocessErrorKind::MissingOpenParen)?;
        let name = &rest[..open];
        if name.is_empty() {
            return Err(PreprocessErrorKind::EmptyMacroName);
        }

        let after_open = &rest[open + 1..];
        let close = after_open
            .find(')')
            .ok_or(PreprocessErrorKind::MissingCloseParen)?;

        Ok(MacroCall {
            name: name.to_owned(),
            argument: after_open[..close].trim().to_owned(),
        })
    }
}

/// Whether the line is a macro call rather than program text.
fn is_macro_line(line: &str) -> bool {
    let stripped = line.trim();
    stripped.starts_with('!') && stripped.len() > 1
}

#[derive(Debug, Default)]
pub struct Preprocessor {
    /// Canonical paths of files already spliced in during this pass.
    included_files: HashSet<PathBuf>,
}

impl Preprocessor {
    pub fn new() -> Self {
        Preprocessor::default()
    }

    /// Expand all macros in `source`, which was read from `origin`.
    ///
    /// `origin` does not have to exist (e.g. text typed into the REPL); includes
    /// then resolve against its parent directory, or the working directory.
    pub fn preprocess(&mut self, source: &str, origin: &Path) -> Result<String, PreprocessError> {
        self.included_files.clear();
        if let Ok(canonical) = origin.canonicalize() {
            self.included_files.insert(canonical);
        }

        let origin: Rc<Path> = Rc::from(origin);
        let mut lines = SourceLine::split(source, &origin);
        if !source.ends_with('\n') {
            // Top-level text is passed through exactly as given
            if let Some(last) = lines.last_mut() {
                last.text.pop();
            }
        }

        let mut index = 0;
        while index < lines.len() {
            if !is_macro_line(&lines[index].text) {
                index += 1;
                continue;
            }

            let line = lines.remove(index);
            let located = |kind| PreprocessError {
                origin: line.origin.display().to_string(),
                line: line.number,
                kind,
            };

            let call = MacroCall::parse(line.text.trim()).map_err(located)?;
            tracing::debug!(%call, origin = %line.origin.display(), line = line.number, "expanding macro");

            let expansion = self.call_macro(&call, &line.origin).map_err(located)?;
            // Spliced lines are visited next, so nested macros expand in place
            lines.splice(index..index, expansion);
        }

        Ok(lines.into_iter().map(|line| line.text).collect())
    }

    fn call_macro(
        &mut self,
        call: &MacroCall,
        origin: &Path,
    ) -> Result<Vec<SourceLine>, PreprocessErrorKind> {
        match call.name.as_str() {
            "include" => self.include(&call.argument, origin),
            _ => Err(PreprocessErrorKind::UnknownMacro(call.name.clone())),
        }
    }

    fn include(
        &mut self,
        target: &str,
        origin: &Path,
    ) -> Result<Vec<SourceLine>, PreprocessErrorKind> {
        if target.is_empty() {
            return Err(PreprocessErrorKind::EmptyIncludePath);
        }

        let parent_dir = origin.parent().unwrap_or_else(|| Path::new(""));
        let path = parent_dir.join(target);

        let canonical =
            path.canonicalize()
                .map_err(|source| PreprocessErrorKind::IncludeNotFound {
                    path: target.to_owned(),
                    source,
                })?;

        if canonical.is_dir() {
            return Err(PreprocessErrorKind::IncludeIsDirectory(target.to_owned()));
        }
        if !canonical.is_file() {
            return Err(PreprocessErrorKind::IncludeNotAFile(target.to_owned()));
        }

        if self.included_files.contains(&canonical) {
            tracing::debug!(path = %canonical.display(), "skipping already included file");
            return Ok(Vec::new());
        }

        let contents = fs::read_to_string(&canonical).map_err(|source| {
            PreprocessErrorKind::IncludeUnreadable {
                path: target.to_owned(),
                source,
            }
        })?;
        tracing::debug!(path = %canonical.display(), bytes = contents.len(), "included file");

        let lines = SourceLine::split(&contents, &Rc::from(canonical.as_path()));
        self.included_files.insert(canonical);
        Ok(lines)
    }
}
