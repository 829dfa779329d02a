use std::fmt;
use std::path::PathBuf;

use crate::environment::Scope;

/// Coarse classification of a [`CompileError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Syntax,
    Semantic,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CompileError {
    /// Malformed construct: unterminated argument list, misplaced keyword,
    /// illegal loop modifier, function nesting violation.
    Syntax(String),
    UndefinedVariable {
        name: String,
    },
    DuplicateDeclaration {
        name: String,
        scope: Scope,
    },
    TooFewArguments {
        callable: String,
        expected: usize,
        provided: usize,
    },
    TooManyArguments {
        callable: String,
        expected: usize,
        provided: usize,
    },
    /// Unsupported convention or library argument value.
    Semantic(String),
}

pub type Result<T> = std::result::Result<T, CompileError>;

impl CompileError {
    pub fn syntax(message: impl Into<String>) -> Self {
        Self::Syntax(message.into())
    }

    pub fn semantic(message: impl Into<String>) -> Self {
        Self::Semantic(message.into())
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Syntax(_) => ErrorKind::Syntax,
            Self::UndefinedVariable { .. }
            | Self::DuplicateDeclaration { .. }
            | Self::TooFewArguments { .. }
            | Self::TooManyArguments { .. }
            | Self::Semantic(_) => ErrorKind::Semantic,
        }
    }
}

impl fmt::Display for CompileError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Syntax(message) => write!(f, "syntax error: {}", message),
            Self::UndefinedVariable { name } => {
                write!(f, "undefined variable '{}'", name)
            }
            Self::DuplicateDeclaration { name, scope } => {
                write!(f, "'{}' is already declared in {}", name, scope)
            }
            Self::TooFewArguments {
                callable,
                expected,
                provided,
            } => write!(
                f,
                "too few arguments for '{}' (expected at minimum {}, provided {})",
                callable, expected, provided
            ),
            Self::TooManyArguments {
                callable,
                expected,
                provided,
            } => write!(
                f,
                "too many arguments for '{}' (expected at most {}, provided {})",
                callable, expected, provided
            ),
            Self::Semantic(message) => write!(f, "{}", message),
        }
    }
}

impl std::error::Error for CompileError {}

/// A [`CompileError`] located in a source file.
#[derive(Debug)]
pub struct SourceError {
    pub path: PathBuf,
    pub line: usize,
    pub error: CompileError,
}

impl fmt::Display for SourceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}: {}", self.path.display(), self.line, self.error)
    }
}

impl std::error::Error for SourceError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.error)
    }
}

#[derive(Debug)]
pub enum DriverError {
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    Source(SourceError),
}

impl fmt::Display for DriverError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io { path, source } => {
                write!(f, "{}: {}", path.display(), source)
            }
            Self::Source(err) => write!(f, "{}", err),
        }
    }
}

impl std::error::Error for DriverError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io { source, .. } => Some(source),
            Self::Source(err) => Some(err),
        }
    }
}

impl From<SourceError> for DriverError {
    fn from(err: SourceError) -> Self {
        Self::Source(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn arity_errors_are_semantic() {
        let err = CompileError::TooFewArguments {
            callable: "StrLen".to_string(),
            expected: 1,
            provided: 0,
        };
        assert_eq!(err.kind(), ErrorKind::Semantic);
        assert!(err.to_string().contains("expected at minimum 1"));
    }

    #[test]
    fn source_error_display_has_location() {
        let err = SourceError {
            path: PathBuf::from("setup.nsi"),
            line: 12,
            error: CompileError::syntax("Unterminated function call"),
        };
        assert_eq!(
            err.to_string(),
            "setup.nsi:12: syntax error: Unterminated function call"
        );
    }
}
