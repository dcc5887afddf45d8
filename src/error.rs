use crate::config::ConfigError;
use crate::pos::Position;
use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// Broad category of a construction failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// A named path is missing or unreadable, or holds no buildable files.
    Input,
    /// Malformed source text.
    Parse,
    /// Whole-package semantic inconsistency.
    Resolve,
    /// Invalid configuration.
    Config,
}

/// Every way a [`FileSet`](crate::FileSet) construction can fail.
#[derive(Error, Debug)]
pub enum Error {
    #[error("I/O error reading {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("no buildable Go source files in {}", dir.display())]
    NoGoFiles { dir: PathBuf },

    #[error("failed to set Go language for parser")]
    LanguageSet,

    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error(transparent)]
    Resolve(#[from] ResolveError),

    #[error(transparent)]
    Config(#[from] ConfigError),
}

impl Error {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::Io { .. } | Error::NoGoFiles { .. } | Error::LanguageSet => ErrorKind::Input,
            Error::Parse(_) => ErrorKind::Parse,
            Error::Resolve(_) => ErrorKind::Resolve,
            Error::Config(_) => ErrorKind::Config,
        }
    }
}

/// A syntax error in one file.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{position}: {message}")]
pub struct ParseError {
    pub position: Position,
    pub message: String,
}

/// One problem reported by the resolver.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub position: Position,
    pub message: String,
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.position, self.message)
    }
}

/// Resolution failed. Holds every diagnostic, ordered by position.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub struct ResolveError {
    pub diagnostics: Vec<Diagnostic>,
}

impl ResolveError {
    /// The first diagnostic in source order.
    pub fn first(&self) -> Option<&Diagnostic> {
        self.diagnostics.first()
    }

    pub fn messages(&self) -> impl Iterator<Item = &str> {
        self.diagnostics.iter().map(|d| d.message.as_str())
    }
}

impl fmt::Display for ResolveError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.diagnostics.as_slice() {
            [] => write!(f, "resolution failed"),
            [only] => write!(f, "{only}"),
            [first, rest @ ..] => write!(f, "{first} (and {} more errors)", rest.len()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn diag(line: usize, message: &str) -> Diagnostic {
        Diagnostic {
            position: Position {
                filename: "a.go".into(),
                offset: 0,
                line,
                column: 1,
            },
            message: message.into(),
        }
    }

    #[test]
    fn resolve_error_headline() {
        let err = ResolveError {
            diagnostics: vec![diag(2, "undefined: x"), diag(5, "undefined: y")],
        };
        assert_eq!(err.to_string(), "a.go:2:1: undefined: x (and 1 more errors)");
        assert_eq!(Error::from(err).kind(), ErrorKind::Resolve);
    }

    #[test]
    fn single_diagnostic_display() {
        let err = ResolveError {
            diagnostics: vec![diag(1, "undefined: x")],
        };
        assert_eq!(err.to_string(), "a.go:1:1: undefined: x");
    }
}
