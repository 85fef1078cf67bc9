//! Parse-time configuration.
//!
//! All behavior toggles are carried in an explicit [`ParseOptions`] value
//! passed to the parse entry points. There is no ambient or process-global
//! configuration.

use std::path::PathBuf;
use url::Url;

use crate::error::ErrorKind;

/// Per-kind strictness toggles for parse errors.
///
/// Every kind defaults to "tolerate": the offending construct is dropped
/// (with a warning logged) and parsing continues. Enabling a kind makes the
/// first occurrence of that kind, in document order, abort the parse with a
/// structured [`Error::Parse`](crate::Error::Parse).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ErrorPolicy {
    pub empty_value: bool,
    pub malformed_declaration: bool,
    pub invalid_selector: bool,
    pub invalid_selector_syntax: bool,
    pub malformed_at_rule: bool,
    pub unclosed_block: bool,
}

impl ErrorPolicy {
    /// Tolerate everything (the default).
    pub fn lenient() -> Self {
        Self::default()
    }

    /// Raise on every error kind.
    pub fn strict() -> Self {
        Self {
            empty_value: true,
            malformed_declaration: true,
            invalid_selector: true,
            invalid_selector_syntax: true,
            malformed_at_rule: true,
            unclosed_block: true,
        }
    }

    /// Whether the given kind is promoted to a hard error.
    pub fn raises(&self, kind: ErrorKind) -> bool {
        match kind {
            ErrorKind::EmptyValue => self.empty_value,
            ErrorKind::MalformedDeclaration => self.malformed_declaration,
            ErrorKind::InvalidSelector => self.invalid_selector,
            ErrorKind::InvalidSelectorSyntax => self.invalid_selector_syntax,
            ErrorKind::MalformedAtRule => self.malformed_at_rule,
            ErrorKind::UnclosedBlock => self.unclosed_block,
        }
    }

    /// Enable a single kind, chaining.
    pub fn raise(mut self, kind: ErrorKind) -> Self {
        match kind {
            ErrorKind::EmptyValue => self.empty_value = true,
            ErrorKind::MalformedDeclaration => self.malformed_declaration = true,
            ErrorKind::InvalidSelector => self.invalid_selector = true,
            ErrorKind::InvalidSelectorSyntax => self.invalid_selector_syntax = true,
            ErrorKind::MalformedAtRule => self.malformed_at_rule = true,
            ErrorKind::UnclosedBlock => self.unclosed_block = true,
        }
        self
    }
}

/// Policy for `@import` statements.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ImportPolicy {
    /// `@import` statements are dropped (the default).
    #[default]
    Disabled,
    /// Imports are resolved; only the listed URI schemes are permitted.
    /// Relative targets inherit the scheme of the base location (`file`
    /// when resolving against a base directory).
    Enabled { allowed_schemes: Vec<String> },
}

impl ImportPolicy {
    /// Allow local filesystem imports only.
    pub fn local() -> Self {
        Self::Enabled {
            allowed_schemes: vec!["file".into()],
        }
    }

    /// Allow imports for the given schemes.
    pub fn with_schemes<I, S>(schemes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::Enabled {
            allowed_schemes: schemes.into_iter().map(Into::into).collect(),
        }
    }

    /// Whether imports are enabled at all.
    pub fn is_enabled(&self) -> bool {
        matches!(self, Self::Enabled { .. })
    }

    /// Whether the given scheme is permitted.
    pub fn allows_scheme(&self, scheme: &str) -> bool {
        match self {
            Self::Disabled => false,
            Self::Enabled { allowed_schemes } => {
                allowed_schemes.iter().any(|s| s.eq_ignore_ascii_case(scheme))
            }
        }
    }
}

/// Options controlling a parse run.
#[derive(Debug, Clone, Default)]
pub struct ParseOptions {
    /// Base URI for resolving `@import` targets and `url(...)` values.
    pub base_uri: Option<Url>,
    /// Base directory for resolving relative `@import` targets.
    pub base_dir: Option<PathBuf>,
    /// Rewrite relative `url(...)` values to absolute URLs against
    /// `base_uri`.
    pub absolute_paths: bool,
    /// `@import` handling.
    pub imports: ImportPolicy,
    /// Per-kind strictness for parse errors.
    pub errors: ErrorPolicy,
    /// Synthesize missing closing braces at EOF instead of dropping the
    /// unclosed construct.
    pub fix_braces: bool,
}

impl ParseOptions {
    /// Options with every leniency enabled (the default).
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the error policy, chaining.
    pub fn errors(mut self, errors: ErrorPolicy) -> Self {
        self.errors = errors;
        self
    }

    /// Replace the import policy, chaining.
    pub fn imports(mut self, imports: ImportPolicy) -> Self {
        self.imports = imports;
        self
    }

    /// Set the base URI, chaining.
    pub fn base_uri(mut self, base: Url) -> Self {
        self.base_uri = Some(base);
        self
    }

    /// Set the base directory, chaining.
    pub fn base_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.base_dir = Some(dir.into());
        self
    }

    /// Enable `url(...)` absolutization, chaining.
    pub fn absolute_paths(mut self, enabled: bool) -> Self {
        self.absolute_paths = enabled;
        self
    }

    /// Enable closing-brace repair, chaining.
    pub fn fix_braces(mut self, enabled: bool) -> Self {
        self.fix_braces = enabled;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lenient_raises_nothing() {
        let policy = ErrorPolicy::lenient();
        assert!(!policy.raises(ErrorKind::EmptyValue));
        assert!(!policy.raises(ErrorKind::UnclosedBlock));
    }

    #[test]
    fn strict_raises_everything() {
        let policy = ErrorPolicy::strict();
        assert!(policy.raises(ErrorKind::EmptyValue));
        assert!(policy.raises(ErrorKind::InvalidSelectorSyntax));
    }

    #[test]
    fn single_kind_promotion() {
        let policy = ErrorPolicy::lenient().raise(ErrorKind::MalformedDeclaration);
        assert!(policy.raises(ErrorKind::MalformedDeclaration));
        assert!(!policy.raises(ErrorKind::EmptyValue));
    }

    #[test]
    fn import_policy_schemes() {
        let policy = ImportPolicy::with_schemes(["https", "file"]);
        assert!(policy.is_enabled());
        assert!(policy.allows_scheme("https"));
        assert!(policy.allows_scheme("FILE"));
        assert!(!policy.allows_scheme("ftp"));
        assert!(!ImportPolicy::Disabled.allows_scheme("file"));
    }
}
