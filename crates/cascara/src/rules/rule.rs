//! Rule, at-rule, and declaration entities.

use std::collections::HashMap;
use std::fmt;
use std::hash::{Hash, Hasher};

use crate::parser::declarations::normalize_property;
use crate::parser::selector;
use crate::shorthand;

/// A single `property: value` pair with its `!important` flag.
///
/// Immutable once created. The property name is case-normalized to ASCII
/// lowercase at construction (custom `--` properties keep their case); the
/// value keeps its source text verbatim, UTF-8 included.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Declaration {
    property: String,
    value: String,
    important: bool,
}

impl Declaration {
    pub fn new(property: impl AsRef<str>, value: impl Into<String>, important: bool) -> Self {
        Self {
            property: normalize_property(property.as_ref().trim()),
            value: value.into().trim().to_string(),
            important,
        }
    }

    pub fn property(&self) -> &str {
        &self.property
    }

    pub fn value(&self) -> &str {
        &self.value
    }

    pub fn important(&self) -> bool {
        self.important
    }
}

impl fmt::Display for Declaration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.important {
            write!(f, "{}: {} !important", self.property, self.value)
        } else {
            write!(f, "{}: {}", self.property, self.value)
        }
    }
}

/// Collapse whitespace runs in a selector to single spaces.
pub(crate) fn normalize_selector(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut pending_space = false;
    for ch in raw.trim().chars() {
        if ch.is_whitespace() {
            pending_space = true;
        } else {
            if pending_space && !out.is_empty() {
                out.push(' ');
            }
            out.push(ch);
            pending_space = false;
        }
    }
    out
}

/// One qualified selector with its declaration block.
///
/// `id` is the rule's index in the owning stylesheet and is recomputed on
/// every mutation; `parent_rule` points at the rule this one was nested
/// under before flattening (always a smaller id); `media_query` references
/// the stylesheet's media query table.
#[derive(Debug, Clone)]
pub struct Rule {
    pub id: usize,
    pub selector: String,
    pub declarations: Vec<Declaration>,
    /// Integer specificity score of the selector (ids 100, classes 10,
    /// types 1).
    pub specificity: u32,
    pub parent_rule: Option<usize>,
    pub media_query: Option<usize>,
    /// Headers of enclosing conditional at-rules (`@supports ...`,
    /// `@layer ...`) this rule was flattened out of, outermost first.
    pub wrappers: Vec<String>,
}

impl Rule {
    /// Create a detached rule (id 0, no media, no parent). The specificity
    /// is computed from the selector.
    pub fn new(selector: impl AsRef<str>, declarations: Vec<Declaration>) -> Self {
        let selector = normalize_selector(selector.as_ref());
        let specificity = selector::specificity(&selector);
        Self {
            id: 0,
            selector,
            declarations,
            specificity,
            parent_rule: None,
            media_query: None,
            wrappers: vec![],
        }
    }

    /// Create a detached rule with an explicit specificity override.
    pub fn with_specificity(
        selector: impl AsRef<str>,
        declarations: Vec<Declaration>,
        specificity: u32,
    ) -> Self {
        let mut rule = Self::new(selector, declarations);
        rule.specificity = specificity;
        rule
    }

    /// Render the declarations as `prop: value; prop2: value2` (no braces).
    pub fn declarations_to_css(&self) -> String {
        self.declarations
            .iter()
            .map(Declaration::to_string)
            .collect::<Vec<_>>()
            .join("; ")
    }

    /// The declaration set with every shorthand expanded to longhands and
    /// same-property repeats resolved last-wins, in first-seen property
    /// order. This is the canonical form used for equality and hashing.
    pub fn expanded_declarations(&self) -> Vec<Declaration> {
        let mut order: Vec<String> = vec![];
        let mut map: HashMap<String, Declaration> = HashMap::new();
        for decl in &self.declarations {
            let longhands = shorthand::expand_value(
                decl.property(),
                decl.value(),
                decl.important(),
            )
            .unwrap_or_else(|| vec![decl.clone()]);
            for lh in longhands {
                if !map.contains_key(lh.property()) {
                    order.push(lh.property().to_string());
                }
                map.insert(lh.property().to_string(), lh);
            }
        }
        order.into_iter().filter_map(|p| map.remove(&p)).collect()
    }

    /// Expand every shorthand declaration in place.
    pub fn expand_shorthands(&mut self) {
        self.declarations = self.expanded_declarations();
    }

    /// Recombine complete longhand sets into shorthands in place.
    pub fn collapse_shorthands(&mut self) {
        let expanded = self.expanded_declarations();
        self.declarations = shorthand::collapse(expanded);
    }
}

impl fmt::Display for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.declarations.is_empty() {
            write!(f, "{} {{ }}", self.selector)
        } else {
            write!(f, "{} {{ ", self.selector)?;
            for decl in &self.declarations {
                write!(f, "{decl}; ")?;
            }
            write!(f, "}}")
        }
    }
}

/// Structural, shorthand-aware equality: selectors must match and the
/// expanded declaration sets must be equivalent. Ids and stored
/// specificity do not participate.
impl PartialEq for Rule {
    fn eq(&self, other: &Self) -> bool {
        if self.selector != other.selector {
            return false;
        }
        let ours = self.expanded_declarations();
        let others = other.expanded_declarations();
        let mine: HashMap<&str, (&str, bool)> = ours
            .iter()
            .map(|d| (d.property(), (d.value(), d.important())))
            .collect();
        let theirs: HashMap<&str, (&str, bool)> = others
            .iter()
            .map(|d| (d.property(), (d.value(), d.important())))
            .collect();
        mine == theirs
    }
}

impl Eq for Rule {}

impl Hash for Rule {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.selector.hash(state);
        let mut expanded = self.expanded_declarations();
        expanded.sort_by(|a, b| a.property().cmp(b.property()));
        for decl in expanded {
            decl.hash(state);
        }
    }
}

/// Classification of retained (non-flattened) at-rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AtRuleKind {
    FontFace,
    Keyframes,
    Page,
    Property,
    CounterStyle,
    Other,
}

/// One keyframe step inside `@keyframes` (`from`, `to`, or a percentage
/// list).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyframeBlock {
    pub selector: String,
    pub declarations: Vec<Declaration>,
}

/// Body of a retained at-rule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AtRuleBody {
    /// Descriptor list (`@font-face`, `@page`, `@property`,
    /// `@counter-style`).
    Declarations(Vec<Declaration>),
    /// Keyframe steps (`@keyframes`).
    Keyframes(Vec<KeyframeBlock>),
}

/// An at-rule kept as an opaque entity rather than flattened.
///
/// Its header text (e.g. `@keyframes slide`) doubles as its selector for
/// query purposes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AtRule {
    pub id: usize,
    pub header: String,
    pub kind: AtRuleKind,
    pub body: AtRuleBody,
    pub media_query: Option<usize>,
    pub wrappers: Vec<String>,
}

/// One slot in a stylesheet's ordered entry sequence.
#[derive(Debug, Clone)]
pub enum Entry {
    Rule(Rule),
    AtRule(AtRule),
}

impl Entry {
    pub fn id(&self) -> usize {
        match self {
            Self::Rule(rule) => rule.id,
            Self::AtRule(at) => at.id,
        }
    }

    pub(crate) fn set_id(&mut self, id: usize) {
        match self {
            Self::Rule(rule) => rule.id = id,
            Self::AtRule(at) => at.id = id,
        }
    }

    /// The selector for query purposes: a rule's selector, or an
    /// at-rule's header text.
    pub fn selector(&self) -> &str {
        match self {
            Self::Rule(rule) => &rule.selector,
            Self::AtRule(at) => &at.header,
        }
    }

    pub fn media_query(&self) -> Option<usize> {
        match self {
            Self::Rule(rule) => rule.media_query,
            Self::AtRule(at) => at.media_query,
        }
    }

    pub fn wrappers(&self) -> &[String] {
        match self {
            Self::Rule(rule) => &rule.wrappers,
            Self::AtRule(at) => &at.wrappers,
        }
    }

    pub fn is_rule(&self) -> bool {
        matches!(self, Self::Rule(_))
    }

    pub fn as_rule(&self) -> Option<&Rule> {
        match self {
            Self::Rule(rule) => Some(rule),
            Self::AtRule(_) => None,
        }
    }

    pub fn as_at_rule(&self) -> Option<&AtRule> {
        match self {
            Self::Rule(_) => None,
            Self::AtRule(at) => Some(at),
        }
    }
}
