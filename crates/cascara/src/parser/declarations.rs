//! Declaration parsing: `property: value [!important]` triples.
//!
//! Input chunks arrive pre-split on structural semicolons by the block
//! scanner; this module classifies each chunk and extracts the property
//! name (lowercased), the verbatim value text, and the `!important` flag.

use crate::error::ErrorKind;

/// Outcome of parsing one declaration chunk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum DeclParse {
    Ok {
        property: String,
        value: String,
        important: bool,
    },
    /// Blank chunk (e.g. between two semicolons); not an error.
    Blank,
    Err {
        kind: ErrorKind,
        message: String,
    },
}

/// Parse one declaration chunk (no trailing semicolon).
pub(crate) fn parse_declaration(text: &str) -> DeclParse {
    let text = text.trim();
    if text.is_empty() {
        return DeclParse::Blank;
    }

    let Some(colon) = find_top_level_colon(text) else {
        return DeclParse::Err {
            kind: ErrorKind::MalformedDeclaration,
            message: format!("declaration '{text}' is missing a ':'"),
        };
    };

    let property_raw = text[..colon].trim();
    if property_raw.is_empty() || !is_valid_property(property_raw) {
        return DeclParse::Err {
            kind: ErrorKind::MalformedDeclaration,
            message: format!("'{property_raw}' is not a valid property name"),
        };
    }
    let property = normalize_property(property_raw);

    let value_raw = text[colon + 1..].trim();
    let (value, important) = strip_important(value_raw);
    if value.is_empty() {
        return DeclParse::Err {
            kind: ErrorKind::EmptyValue,
            message: format!("property '{property}' has no value"),
        };
    }

    DeclParse::Ok {
        property,
        value,
        important,
    }
}

/// Lowercase a property name. Custom properties (`--x`) keep their case
/// because they are case-sensitive by definition.
pub(crate) fn normalize_property(property: &str) -> String {
    if property.starts_with("--") {
        property.to_string()
    } else {
        property.to_ascii_lowercase()
    }
}

/// Byte index of the first `:` outside strings, parentheses, and brackets.
fn find_top_level_colon(text: &str) -> Option<usize> {
    let mut quote: Option<char> = None;
    let mut escaped = false;
    let mut depth = 0usize;

    for (idx, ch) in text.char_indices() {
        if escaped {
            escaped = false;
            continue;
        }
        match quote {
            Some(q) => match ch {
                '\\' => escaped = true,
                c if c == q => quote = None,
                _ => {}
            },
            None => match ch {
                '"' | '\'' => quote = Some(ch),
                '(' | '[' => depth += 1,
                ')' | ']' => depth = depth.saturating_sub(1),
                ':' if depth == 0 => return Some(idx),
                _ => {}
            },
        }
    }
    None
}

/// Detach a trailing `!important` (case-insensitive, optional whitespace
/// after the `!`). A `!important` inside a string or function is value
/// text, not the flag.
fn strip_important(value: &str) -> (String, bool) {
    let mut quote: Option<char> = None;
    let mut escaped = false;
    let mut depth = 0usize;
    let mut last_bang: Option<usize> = None;

    for (idx, ch) in value.char_indices() {
        if escaped {
            escaped = false;
            continue;
        }
        match quote {
            Some(q) => match ch {
                '\\' => escaped = true,
                c if c == q => quote = None,
                _ => {}
            },
            None => match ch {
                '"' | '\'' => quote = Some(ch),
                '(' | '[' => depth += 1,
                ')' | ']' => depth = depth.saturating_sub(1),
                '!' if depth == 0 => last_bang = Some(idx),
                _ => {}
            },
        }
    }

    if let Some(idx) = last_bang {
        let tail = value[idx + 1..].trim();
        if tail.eq_ignore_ascii_case("important") {
            return (value[..idx].trim_end().to_string(), true);
        }
    }
    (value.to_string(), false)
}

/// Property names are ASCII identifiers: letters, digits, `-`, `_`, with a
/// leading `*` or `_` tolerated for legacy browser-hack properties. A name
/// starting with a combinator-like character is malformed.
fn is_valid_property(property: &str) -> bool {
    let mut chars = property.chars();
    let Some(first) = chars.next() else {
        return false;
    };
    if matches!(first, '>' | '+' | '~') {
        return false;
    }
    if !(first.is_ascii_alphabetic() || matches!(first, '-' | '_' | '*')) {
        return false;
    }
    chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_'))
}
