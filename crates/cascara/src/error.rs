//! Error types for the stylesheet engine.

use std::fmt;
use std::path::PathBuf;

/// Result type alias for stylesheet operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Categories of recoverable parse errors.
///
/// In the default lenient mode every one of these is tolerated: the
/// offending construct is dropped and parsing continues. Each kind can be
/// promoted to a hard error through [`ErrorPolicy`](crate::ErrorPolicy).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// A property has a colon but no usable value.
    EmptyValue,
    /// A declaration lacks a colon, or has only a property name.
    MalformedDeclaration,
    /// A selector is empty, whitespace-only, or begins with a combinator.
    InvalidSelector,
    /// A selector contains disallowed character sequences.
    InvalidSelectorSyntax,
    /// An at-rule header is missing its required query or condition.
    MalformedAtRule,
    /// EOF was reached with open braces outstanding.
    UnclosedBlock,
}

impl ErrorKind {
    /// The symbolic name of this error kind.
    pub fn name(&self) -> &'static str {
        match self {
            Self::EmptyValue => "empty_value",
            Self::MalformedDeclaration => "malformed_declaration",
            Self::InvalidSelector => "invalid_selector",
            Self::InvalidSelectorSyntax => "invalid_selector_syntax",
            Self::MalformedAtRule => "malformed_at_rule",
            Self::UnclosedBlock => "unclosed_block",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Errors that can occur in the stylesheet engine.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// CSS parsing error raised in strict mode.
    #[error("CSS {kind} error at line {line}, column {column}: {message}")]
    Parse {
        kind: ErrorKind,
        message: String,
        line: u32,
        column: u32,
    },

    /// File I/O error.
    #[error("failed to read stylesheet '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// An `@import` could not be resolved.
    #[error("failed to import '{target}': {message}")]
    Import { target: String, message: String },

    /// Invalid use of an API, such as an oversized shorthand value.
    #[error("{0}")]
    Usage(String),
}

impl Error {
    /// Create a parse error.
    pub fn parse(
        kind: ErrorKind,
        message: impl Into<String>,
        line: u32,
        column: u32,
    ) -> Self {
        Self::Parse {
            kind,
            message: message.into(),
            line,
            column,
        }
    }

    /// Create an I/O error.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Create an import error.
    pub fn import(target: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Import {
            target: target.into(),
            message: message.into(),
        }
    }

    /// Create a usage error.
    pub fn usage(message: impl Into<String>) -> Self {
        Self::Usage(message.into())
    }

    /// The parse-error kind, if this is a parse error.
    pub fn kind(&self) -> Option<ErrorKind> {
        match self {
            Self::Parse { kind, .. } => Some(*kind),
            _ => None,
        }
    }

    /// The 1-based source line, if this is a parse error.
    pub fn line(&self) -> Option<u32> {
        match self {
            Self::Parse { line, .. } => Some(*line),
            _ => None,
        }
    }

    /// The 1-based source column, if this is a parse error.
    pub fn column(&self) -> Option<u32> {
        match self {
            Self::Parse { column, .. } => Some(*column),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_names() {
        assert_eq!(ErrorKind::EmptyValue.name(), "empty_value");
        assert_eq!(ErrorKind::UnclosedBlock.name(), "unclosed_block");
        assert_eq!(format!("{}", ErrorKind::MalformedDeclaration), "malformed_declaration");
    }

    #[test]
    fn parse_error_accessors() {
        let err = Error::parse(ErrorKind::EmptyValue, "property 'color' has no value", 3, 12);
        assert_eq!(err.kind(), Some(ErrorKind::EmptyValue));
        assert_eq!(err.line(), Some(3));
        assert_eq!(err.column(), Some(12));
        let text = err.to_string();
        assert!(text.contains("empty_value"));
        assert!(text.contains("line 3"));
    }

    #[test]
    fn usage_error_has_no_position() {
        let err = Error::usage("value too long");
        assert_eq!(err.kind(), None);
        assert_eq!(err.line(), None);
    }
}
