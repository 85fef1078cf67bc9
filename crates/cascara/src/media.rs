//! Media query model and condition text handling.
//!
//! `@media` blocks never become entities of their own: their bodies are
//! flattened into ordinary rules tagged with a [`MediaQuery`] reference.
//! Nested `@media` conditions are combined with `and`, and every condition
//! string is normalized once at parse time so that equal conditions compare
//! equal textually.

use std::fmt;

/// Coarse media type extracted from a media condition.
///
/// `All` is the implicit type: a query for `All` matches every rule,
/// whether or not it carries an explicit media condition.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum MediaType {
    All,
    Screen,
    Print,
    Speech,
    Other(String),
}

impl MediaType {
    /// Map a media-type name to its symbol. Unknown names are preserved.
    pub fn from_name(name: &str) -> Self {
        match name {
            "all" => Self::All,
            "screen" => Self::Screen,
            "print" => Self::Print,
            "speech" | "aural" => Self::Speech,
            other => Self::Other(other.to_string()),
        }
    }
}

impl fmt::Display for MediaType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::All => f.write_str("all"),
            Self::Screen => f.write_str("screen"),
            Self::Print => f.write_str("print"),
            Self::Speech => f.write_str("speech"),
            Self::Other(name) => f.write_str(name),
        }
    }
}

/// One distinct media condition referenced by rules.
///
/// The condition text is the full, normalized query (commas preserved),
/// e.g. `screen and (min-width: 500px)` or `screen, print`. Conditions are
/// deduplicated by text: two rules under the same condition share one
/// `MediaQuery` id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaQuery {
    /// Index into the owning stylesheet's media query table.
    pub id: usize,
    /// Normalized condition text.
    pub condition: String,
}

impl MediaQuery {
    pub(crate) fn new(id: usize, condition: impl Into<String>) -> Self {
        Self {
            id,
            condition: condition.into(),
        }
    }

    /// The media types named by this condition, one per comma-separated
    /// component. Components that open with a feature test (`(...)`) count
    /// as `All`.
    pub fn types(&self) -> Vec<MediaType> {
        let mut types = vec![];
        for component in split_components(&self.condition) {
            let ty = component_type(component);
            if !types.contains(&ty) {
                types.push(ty);
            }
        }
        types
    }

    /// The primary (first) media type of this condition.
    pub fn media_type(&self) -> MediaType {
        self.types().into_iter().next().unwrap_or(MediaType::All)
    }
}

impl fmt::Display for MediaQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.condition)
    }
}

/// Normalize a media condition: lowercase, collapse whitespace, canonical
/// spacing around `:`, `,`, and parentheses.
///
/// `"SCREEN and (min-width:500px)"` becomes
/// `"screen and (min-width: 500px)"`.
pub fn normalize_condition(raw: &str) -> String {
    let lower = raw.trim().to_lowercase();
    let mut out = String::with_capacity(lower.len());
    let mut chars = lower.chars().peekable();
    let mut pending_space = false;

    while let Some(ch) = chars.next() {
        match ch {
            c if c.is_whitespace() => pending_space = true,
            ':' => {
                out.push(':');
                out.push(' ');
                while chars.peek().is_some_and(|c| c.is_whitespace()) {
                    chars.next();
                }
                pending_space = false;
            }
            ',' => {
                out.push(',');
                out.push(' ');
                while chars.peek().is_some_and(|c| c.is_whitespace()) {
                    chars.next();
                }
                pending_space = false;
            }
            '(' => {
                if pending_space && !out.is_empty() {
                    out.push(' ');
                }
                out.push('(');
                while chars.peek().is_some_and(|c| c.is_whitespace()) {
                    chars.next();
                }
                pending_space = false;
            }
            ')' => {
                out.push(')');
                pending_space = false;
            }
            _ => {
                if pending_space && !out.is_empty() {
                    out.push(' ');
                }
                out.push(ch);
                pending_space = false;
            }
        }
    }

    out
}

/// Combine an outer and an inner media condition into one.
///
/// Comma-separated components distribute: `screen, print` nested over
/// `(min-width: 500px)` yields
/// `screen and (min-width: 500px), print and (min-width: 500px)`.
/// Both inputs are expected to be normalized already.
pub fn combine_conditions(outer: &str, inner: &str) -> String {
    let outer_parts = split_components(outer);
    let inner_parts = split_components(inner);
    if outer_parts.is_empty() {
        return inner.to_string();
    }
    if inner_parts.is_empty() {
        return outer.to_string();
    }

    let mut combined = vec![];
    for o in &outer_parts {
        for i in &inner_parts {
            combined.push(format!("{o} and {i}"));
        }
    }
    combined.join(", ")
}

/// Split a condition on top-level commas (parentheses are opaque).
pub(crate) fn split_components(condition: &str) -> Vec<&str> {
    let mut parts = vec![];
    let mut depth = 0usize;
    let mut start = 0usize;
    for (idx, ch) in condition.char_indices() {
        match ch {
            '(' => depth += 1,
            ')' => depth = depth.saturating_sub(1),
            ',' if depth == 0 => {
                let part = condition[start..idx].trim();
                if !part.is_empty() {
                    parts.push(part);
                }
                start = idx + 1;
            }
            _ => {}
        }
    }
    let tail = condition[start..].trim();
    if !tail.is_empty() {
        parts.push(tail);
    }
    parts
}

/// The coarse type of one comma component. `only` and `not` qualifiers are
/// skipped; a component opening with a feature test is `All`.
fn component_type(component: &str) -> MediaType {
    for word in component.split_whitespace() {
        if word == "only" || word == "not" {
            continue;
        }
        if word.starts_with('(') {
            return MediaType::All;
        }
        return MediaType::from_name(word);
    }
    MediaType::All
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_spacing() {
        assert_eq!(
            normalize_condition("screen and (min-width:500px)"),
            "screen and (min-width: 500px)"
        );
        assert_eq!(
            normalize_condition("  SCREEN   and ( min-width : 500px )"),
            "screen and (min-width: 500px)"
        );
        assert_eq!(normalize_condition("screen,print"), "screen, print");
    }

    #[test]
    fn combine_nested_media() {
        assert_eq!(
            combine_conditions("screen", "(min-width: 500px)"),
            "screen and (min-width: 500px)"
        );
        assert_eq!(
            combine_conditions("screen, print", "(min-width: 500px)"),
            "screen and (min-width: 500px), print and (min-width: 500px)"
        );
    }

    #[test]
    fn component_types() {
        let query = MediaQuery::new(0, "screen and (min-width: 500px)");
        assert_eq!(query.types(), vec![MediaType::Screen]);
        assert_eq!(query.media_type(), MediaType::Screen);

        let query = MediaQuery::new(1, "screen, print");
        assert_eq!(query.types(), vec![MediaType::Screen, MediaType::Print]);

        let query = MediaQuery::new(2, "(min-width: 100px)");
        assert_eq!(query.media_type(), MediaType::All);

        let query = MediaQuery::new(3, "only screen");
        assert_eq!(query.media_type(), MediaType::Screen);

        let query = MediaQuery::new(4, "3d-glasses");
        assert_eq!(query.media_type(), MediaType::Other("3d-glasses".into()));
    }
}
