//! Rule model: entities and the stylesheet document.

pub(crate) mod rule;
mod stylesheet;

pub use rule::{AtRule, AtRuleBody, AtRuleKind, Declaration, Entry, KeyframeBlock, Rule};
pub use stylesheet::{SelectorEntry, Stylesheet};
