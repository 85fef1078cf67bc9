//! Cascara: a CSS stylesheet engine.
//!
//! This crate parses CSS text into a structured rule model, applies
//! cascade semantics, and serializes the result back to canonical CSS:
//!
//! - **Parsing**: a recovery-friendly scanner handles comments, strings,
//!   escapes, nested blocks, and unclosed-brace repair; nested selectors
//!   and nested `@media` are flattened into fully-qualified rules
//! - **Rule model**: an ordered entry sequence with stable sequential
//!   ids, parent links for nested selectors, and a media-type index
//! - **Cascade/merge**: per-property winners by `!important`,
//!   specificity, and source order, with shorthand expansion and
//!   collapsing
//! - **Serialization**: canonical output with a parse→render fixed point
//!
//! # Example
//!
//! ```
//! use cascara::prelude::*;
//!
//! let mut sheet = Stylesheet::parse(
//!     ".btn { margin: 10px; color: #c00; } .btn { margin-top: 20px; }",
//! )?;
//! sheet.merge()?;
//!
//! let rule = sheet.rules().next().unwrap();
//! assert_eq!(rule.selector, ".btn");
//! assert_eq!(rule.declarations_to_css(), "margin: 20px 10px 10px; color: #c00");
//! # Ok::<(), cascara::Error>(())
//! ```

pub mod color;
pub mod config;
pub mod imports;
pub mod media;
pub mod merge;
pub mod parser;
pub mod rules;
pub mod serialize;
pub mod shorthand;
pub mod urls;

mod error;

pub use config::{ErrorPolicy, ImportPolicy, ParseOptions};
pub use error::{Error, ErrorKind, Result};
pub use media::{MediaQuery, MediaType};
pub use rules::{
    AtRule, AtRuleBody, AtRuleKind, Declaration, Entry, KeyframeBlock, Rule, SelectorEntry,
    Stylesheet,
};

/// Prelude module with commonly used types.
pub mod prelude {
    pub use crate::color::{ColorNotation, convert_stylesheet, convert_value};
    pub use crate::config::{ErrorPolicy, ImportPolicy, ParseOptions};
    pub use crate::imports::{FileImporter, ImportBase, ImportResolver};
    pub use crate::media::{MediaQuery, MediaType};
    pub use crate::merge::{merge, merge_by_selector};
    pub use crate::rules::{
        AtRule, AtRuleBody, AtRuleKind, Declaration, Entry, KeyframeBlock, Rule, SelectorEntry,
        Stylesheet,
    };
    pub use crate::{Error, ErrorKind, Result};
}
