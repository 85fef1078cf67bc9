//! Block and nesting resolution: from scanned constructs to rule entities.
//!
//! The resolver walks prelude/block events from the [`Scanner`] and builds
//! the flat entry sequence a stylesheet owns. Nested selectors and nested
//! `@media` are flattened here; retained at-rules (`@font-face`,
//! `@keyframes`, ...) become opaque entities; `@import` splices resolved
//! text into the same entry sequence, preserving the sequential-id and
//! parent-link invariants.

use std::collections::{HashMap, HashSet};

use crate::config::ParseOptions;
use crate::error::{Error, ErrorKind};
use crate::imports::{self, ImportBase, ImportResolver};
use crate::media::{self, MediaQuery};
use crate::parser::declarations::{self, DeclParse};
use crate::parser::scanner::{PreludeEnd, Scanner, SourcePosition, strip_comments};
use crate::parser::selector;
use crate::rules::rule::normalize_selector;
use crate::rules::{AtRule, AtRuleBody, AtRuleKind, Declaration, Entry, KeyframeBlock, Rule};
use crate::urls;

/// Recursion limit for `@import` chains.
const MAX_IMPORT_DEPTH: usize = 16;

/// One declaration chunk with its source position.
struct DeclChunk {
    text: String,
    pos: SourcePosition,
}

/// One nested block found inside another block's body.
struct RawBlock {
    prelude: String,
    pos: SourcePosition,
    body: String,
    body_pos: SourcePosition,
    closed: bool,
}

/// Ancestry context threaded through nested constructs.
#[derive(Debug, Clone, Default)]
struct BlockContext {
    /// Fully-qualified selector of the enclosing rule, if nested.
    ancestor: Option<String>,
    /// Entry id of the enclosing rule.
    parent_id: Option<usize>,
    /// Combined media condition of every enclosing `@media`.
    media: Option<String>,
    /// Headers of enclosing conditional at-rules, outermost first.
    wrappers: Vec<String>,
}

/// Accumulating state for one parse run, including recursive imports.
pub(crate) struct ParseSession<'a> {
    options: &'a ParseOptions,
    resolver: &'a dyn ImportResolver,
    pub entries: Vec<Entry>,
    pub media_queries: Vec<MediaQuery>,
    media_ids: HashMap<String, usize>,
    pub charset: Option<String>,
    import_depth: usize,
    imported: HashSet<String>,
    base: Vec<ImportBase>,
}

impl<'a> ParseSession<'a> {
    pub fn new(options: &'a ParseOptions, resolver: &'a dyn ImportResolver) -> Self {
        let base = ImportBase {
            uri: options.base_uri.clone(),
            dir: options.base_dir.clone(),
        };
        Self {
            options,
            resolver,
            entries: vec![],
            media_queries: vec![],
            media_ids: HashMap::new(),
            charset: None,
            import_depth: 0,
            imported: HashSet::new(),
            base: vec![base],
        }
    }

    /// Parse a whole source buffer into the session.
    pub fn parse(&mut self, css: &str) -> crate::Result<()> {
        let cleaned = strip_comments(css);
        let mut scanner = Scanner::new(&cleaned);
        if let Some(charset) = consume_charset(&mut scanner)
            && self.charset.is_none()
        {
            self.charset = Some(charset);
        }
        self.parse_body(&mut scanner, &BlockContext::default())
    }

    /// Intern a media condition, returning its id.
    fn media_id(&mut self, condition: &str) -> usize {
        if let Some(&id) = self.media_ids.get(condition) {
            return id;
        }
        let id = self.media_queries.len();
        self.media_queries.push(MediaQuery::new(id, condition));
        self.media_ids.insert(condition.to_string(), id);
        id
    }

    /// Raise or tolerate a parse error, per the configured policy.
    fn report(
        &mut self,
        kind: ErrorKind,
        pos: SourcePosition,
        message: impl Into<String>,
    ) -> crate::Result<()> {
        let message = message.into();
        if self.options.errors.raises(kind) {
            return Err(Error::parse(kind, message, pos.line, pos.column));
        }
        tracing::warn!(
            kind = kind.name(),
            line = pos.line,
            column = pos.column,
            "tolerated parse error: {message}"
        );
        Ok(())
    }

    /// Walk one body (the top level, or the inside of a flattening
    /// at-rule), dispatching each construct.
    fn parse_body(&mut self, scanner: &mut Scanner<'_>, ctx: &BlockContext) -> crate::Result<()> {
        loop {
            scanner.skip_whitespace();
            if scanner.is_eof() {
                break;
            }
            let start = scanner.position();
            let (prelude, end) = scanner.read_prelude();
            let text = prelude.trim().to_string();

            match end {
                PreludeEnd::Semicolon | PreludeEnd::Eof => {
                    if text.is_empty() {
                        continue;
                    }
                    if let Some(stripped) = text.strip_prefix('@') {
                        self.at_statement(stripped, start, ctx)?;
                    } else {
                        tracing::debug!(
                            line = start.line,
                            "skipping stray content '{text}' outside a block"
                        );
                    }
                }
                PreludeEnd::BlockClose => {
                    if !text.is_empty() {
                        tracing::debug!(line = start.line, "skipping stray content '{text}'");
                    }
                }
                PreludeEnd::BlockOpen => {
                    let body_pos = scanner.position();
                    let (body, closed) = scanner.read_block();
                    if !closed && !self.options.fix_braces {
                        self.report(
                            ErrorKind::UnclosedBlock,
                            start,
                            format!("block for '{text}' is never closed"),
                        )?;
                        continue;
                    }
                    if let Some(stripped) = text.strip_prefix('@') {
                        self.at_block(stripped, &body, start, body_pos, ctx)?;
                    } else {
                        self.qualified_rule(&text, &body, start, body_pos, ctx)?;
                    }
                }
            }
        }
        Ok(())
    }

    /// A selector list with its declaration block, possibly holding nested
    /// blocks of its own.
    fn qualified_rule(
        &mut self,
        selector_list: &str,
        body: &str,
        start: SourcePosition,
        body_pos: SourcePosition,
        ctx: &BlockContext,
    ) -> crate::Result<()> {
        // Validate the whole comma-separated list first: one bad selector
        // rejects all of them.
        let mut resolved = vec![];
        for raw in split_top_commas(selector_list) {
            let full = resolve_nested_selector(ctx.ancestor.as_deref(), &raw);
            match selector::check(&full) {
                Ok(specificity) => resolved.push((full, specificity)),
                Err(err) => {
                    self.report(err.kind, start, err.message)?;
                    return Ok(());
                }
            }
        }
        if resolved.is_empty() {
            self.report(ErrorKind::InvalidSelector, start, "selector is empty")?;
            return Ok(());
        }

        let (chunks, nested) = scan_block_contents(body, body_pos);
        let declarations = self.parse_declarations(&chunks)?;
        let media_query = match &ctx.media {
            Some(condition) => Some(self.media_id(condition)),
            None => None,
        };

        for (selector, specificity) in resolved {
            let id = self.entries.len();
            self.entries.push(Entry::Rule(Rule {
                id,
                selector: selector.clone(),
                declarations: declarations.clone(),
                specificity,
                parent_rule: ctx.parent_id,
                media_query,
                wrappers: ctx.wrappers.clone(),
            }));
            let child_ctx = BlockContext {
                ancestor: Some(selector),
                parent_id: Some(id),
                media: ctx.media.clone(),
                wrappers: ctx.wrappers.clone(),
            };
            for block in &nested {
                self.nested_block(block, &child_ctx)?;
            }
        }
        Ok(())
    }

    /// Dispatch one block nested inside a rule body.
    fn nested_block(&mut self, block: &RawBlock, ctx: &BlockContext) -> crate::Result<()> {
        if !block.closed && !self.options.fix_braces {
            self.report(
                ErrorKind::UnclosedBlock,
                block.pos,
                format!("block for '{}' is never closed", block.prelude.trim()),
            )?;
            return Ok(());
        }
        let text = block.prelude.trim();
        if let Some(stripped) = text.strip_prefix('@') {
            self.at_block(stripped, &block.body, block.pos, block.body_pos, ctx)
        } else {
            self.qualified_rule(text, &block.body, block.pos, block.body_pos, ctx)
        }
    }

    /// Parse declaration chunks, applying the error policy and optional
    /// `url(...)` absolutization.
    fn parse_declarations(&mut self, chunks: &[DeclChunk]) -> crate::Result<Vec<Declaration>> {
        let mut declarations = vec![];
        for chunk in chunks {
            if chunk.text.trim_start().starts_with('@') {
                tracing::debug!(
                    line = chunk.pos.line,
                    "skipping at-statement inside a declaration block"
                );
                continue;
            }
            match declarations::parse_declaration(&chunk.text) {
                DeclParse::Ok {
                    property,
                    value,
                    important,
                } => {
                    let value = self.maybe_absolutize(value);
                    declarations.push(Declaration::new(property, value, important));
                }
                DeclParse::Blank => {}
                DeclParse::Err { kind, message } => {
                    self.report(kind, chunk.pos, message)?;
                }
            }
        }
        Ok(declarations)
    }

    fn maybe_absolutize(&self, value: String) -> String {
        if !self.options.absolute_paths {
            return value;
        }
        let base = self.base.last().and_then(|b| b.uri.as_ref());
        match base {
            Some(base) => urls::rewrite_urls(&value, base),
            None => value,
        }
    }

    /// An at-rule with a block body.
    fn at_block(
        &mut self,
        header: &str,
        body: &str,
        start: SourcePosition,
        body_pos: SourcePosition,
        ctx: &BlockContext,
    ) -> crate::Result<()> {
        let (name, rest) = split_at_header(header);
        let lower = name.to_ascii_lowercase();

        match lower.as_str() {
            "media" => {
                if rest.is_empty() {
                    self.report(
                        ErrorKind::MalformedAtRule,
                        start,
                        "@media is missing its media query",
                    )?;
                    return Ok(());
                }
                let normalized = media::normalize_condition(rest);
                let combined = match &ctx.media {
                    Some(outer) => media::combine_conditions(outer, &normalized),
                    None => normalized,
                };
                let mut sub = Scanner::with_origin(body, body_pos);
                self.parse_body(
                    &mut sub,
                    &BlockContext {
                        ancestor: ctx.ancestor.clone(),
                        parent_id: ctx.parent_id,
                        media: Some(combined),
                        wrappers: ctx.wrappers.clone(),
                    },
                )
            }
            "supports" | "layer" | "container" | "scope" => {
                if lower == "supports" && rest.is_empty() {
                    self.report(
                        ErrorKind::MalformedAtRule,
                        start,
                        "@supports is missing its condition",
                    )?;
                    return Ok(());
                }
                let wrapper = if rest.is_empty() {
                    format!("@{lower}")
                } else {
                    format!("@{lower} {}", normalize_selector(rest))
                };
                let mut wrappers = ctx.wrappers.clone();
                wrappers.push(wrapper);
                let mut sub = Scanner::with_origin(body, body_pos);
                self.parse_body(
                    &mut sub,
                    &BlockContext {
                        ancestor: ctx.ancestor.clone(),
                        parent_id: ctx.parent_id,
                        media: ctx.media.clone(),
                        wrappers,
                    },
                )
            }
            "font-face" => self.retained_at_rule(AtRuleKind::FontFace, name, rest, body, body_pos, ctx),
            "page" => self.retained_at_rule(AtRuleKind::Page, name, rest, body, body_pos, ctx),
            "property" => self.retained_at_rule(AtRuleKind::Property, name, rest, body, body_pos, ctx),
            "counter-style" => {
                self.retained_at_rule(AtRuleKind::CounterStyle, name, rest, body, body_pos, ctx)
            }
            _ if lower.ends_with("keyframes") => self.keyframes(name, rest, body, body_pos, ctx),
            _ => {
                tracing::debug!(line = start.line, "skipping unknown at-rule '@{name}'");
                Ok(())
            }
        }
    }

    /// Build one opaque at-rule entity whose body is a descriptor list.
    fn retained_at_rule(
        &mut self,
        kind: AtRuleKind,
        name: &str,
        rest: &str,
        body: &str,
        body_pos: SourcePosition,
        ctx: &BlockContext,
    ) -> crate::Result<()> {
        let (chunks, nested) = scan_block_contents(body, body_pos);
        for block in nested {
            tracing::debug!(
                line = block.pos.line,
                "skipping unexpected block inside '@{name}'"
            );
        }
        let declarations = self.parse_declarations(&chunks)?;
        let media_query = match &ctx.media {
            Some(condition) => Some(self.media_id(condition)),
            None => None,
        };
        let id = self.entries.len();
        self.entries.push(Entry::AtRule(AtRule {
            id,
            header: at_header_text(name, rest),
            kind,
            body: AtRuleBody::Declarations(declarations),
            media_query,
            wrappers: ctx.wrappers.clone(),
        }));
        Ok(())
    }

    /// Build one `@keyframes` entity (vendor prefixes included); the body
    /// is a list of keyframe steps.
    fn keyframes(
        &mut self,
        name: &str,
        rest: &str,
        body: &str,
        body_pos: SourcePosition,
        ctx: &BlockContext,
    ) -> crate::Result<()> {
        let (chunks, nested) = scan_block_contents(body, body_pos);
        for chunk in chunks {
            if !chunk.text.trim().is_empty() {
                tracing::debug!(
                    line = chunk.pos.line,
                    "skipping stray content inside '@{name}'"
                );
            }
        }
        let mut blocks = vec![];
        for block in nested {
            if !block.closed && !self.options.fix_braces {
                self.report(
                    ErrorKind::UnclosedBlock,
                    block.pos,
                    format!("keyframe block '{}' is never closed", block.prelude.trim()),
                )?;
                continue;
            }
            let (step_chunks, step_nested) = scan_block_contents(&block.body, block.body_pos);
            for inner in step_nested {
                tracing::debug!(
                    line = inner.pos.line,
                    "skipping unexpected block inside a keyframe step"
                );
            }
            blocks.push(KeyframeBlock {
                selector: normalize_selector(&block.prelude),
                declarations: self.parse_declarations(&step_chunks)?,
            });
        }
        let media_query = match &ctx.media {
            Some(condition) => Some(self.media_id(condition)),
            None => None,
        };
        let id = self.entries.len();
        self.entries.push(Entry::AtRule(AtRule {
            id,
            header: at_header_text(name, rest),
            kind: AtRuleKind::Keyframes,
            body: AtRuleBody::Keyframes(blocks),
            media_query,
            wrappers: ctx.wrappers.clone(),
        }));
        Ok(())
    }

    /// An at-rule in statement form (terminated by `;`).
    fn at_statement(
        &mut self,
        header: &str,
        start: SourcePosition,
        ctx: &BlockContext,
    ) -> crate::Result<()> {
        let (name, rest) = split_at_header(header);
        match name.to_ascii_lowercase().as_str() {
            "import" => self.at_import(rest, start, ctx),
            "charset" => {
                tracing::debug!(
                    line = start.line,
                    "ignoring @charset that is not at the start of the stylesheet"
                );
                Ok(())
            }
            _ => {
                tracing::debug!(line = start.line, "skipping at-statement '@{name}'");
                Ok(())
            }
        }
    }

    /// Resolve and splice one `@import`.
    fn at_import(
        &mut self,
        rest: &str,
        start: SourcePosition,
        ctx: &BlockContext,
    ) -> crate::Result<()> {
        if !self.options.imports.is_enabled() {
            tracing::debug!(line = start.line, "imports disabled; dropping @import");
            return Ok(());
        }
        let Some((target, media_rest)) = parse_import_prelude(rest) else {
            tracing::warn!(line = start.line, "unparseable @import '{rest}'");
            return Ok(());
        };

        let import_media = if media_rest.is_empty() {
            None
        } else {
            Some(media::normalize_condition(media_rest))
        };
        let combined = match (&ctx.media, &import_media) {
            (Some(outer), Some(inner)) => Some(media::combine_conditions(outer, inner)),
            (Some(outer), None) => Some(outer.clone()),
            (None, Some(inner)) => Some(inner.clone()),
            (None, None) => None,
        };

        let base = self.base.last().cloned().unwrap_or_default();
        let resolved = match imports::absolutize(&base, &target) {
            Ok(resolved) => resolved,
            Err(err) => {
                tracing::warn!(line = start.line, "cannot resolve @import '{target}': {err}");
                return Ok(());
            }
        };
        if !self.options.imports.allows_scheme(resolved.scheme()) {
            tracing::warn!(
                line = start.line,
                "scheme '{}' not allowed; dropping @import '{target}'",
                resolved.scheme()
            );
            return Ok(());
        }
        let key = resolved.key();
        if self.imported.contains(&key) {
            tracing::warn!(line = start.line, "circular @import of '{target}' dropped");
            return Ok(());
        }
        if self.import_depth >= MAX_IMPORT_DEPTH {
            tracing::warn!(line = start.line, "@import nesting too deep; dropping '{target}'");
            return Ok(());
        }

        let css = match self.resolver.resolve(&base, &target) {
            Ok(css) => css,
            Err(err) => {
                tracing::warn!(line = start.line, "failed to import '{target}': {err}");
                return Ok(());
            }
        };

        self.imported.insert(key);
        self.import_depth += 1;
        self.base.push(resolved.child_base());

        let cleaned = strip_comments(&css);
        let mut sub = Scanner::new(&cleaned);
        // A charset in the imported sheet applies to its own bytes only.
        let _ = consume_charset(&mut sub);
        let result = self.parse_body(
            &mut sub,
            &BlockContext {
                ancestor: None,
                parent_id: None,
                media: combined,
                wrappers: ctx.wrappers.clone(),
            },
        );

        self.base.pop();
        self.import_depth -= 1;
        result
    }
}

/// Capture a leading `@charset "X";` and return its value. The scanner is
/// only advanced when the statement is actually present.
fn consume_charset(scanner: &mut Scanner<'_>) -> Option<String> {
    scanner.skip_whitespace();
    if !scanner.at_keyword("@charset ") {
        return None;
    }
    let (prelude, end) = scanner.read_prelude();
    if end != PreludeEnd::Semicolon {
        return None;
    }
    let rest = prelude.trim().strip_prefix("@charset")?.trim();
    let quoted = rest
        .strip_prefix('"')
        .and_then(|s| s.strip_suffix('"'))
        .or_else(|| rest.strip_prefix('\'').and_then(|s| s.strip_suffix('\'')))?;
    Some(quoted.to_string())
}

/// Split a block body into declaration chunks and nested blocks.
fn scan_block_contents(body: &str, origin: SourcePosition) -> (Vec<DeclChunk>, Vec<RawBlock>) {
    let mut scanner = Scanner::with_origin(body, origin);
    let mut chunks = vec![];
    let mut blocks = vec![];

    loop {
        scanner.skip_whitespace();
        if scanner.is_eof() {
            break;
        }
        let pos = scanner.position();
        let (prelude, end) = scanner.read_prelude();
        match end {
            PreludeEnd::Semicolon | PreludeEnd::Eof => {
                if !prelude.trim().is_empty() {
                    chunks.push(DeclChunk { text: prelude, pos });
                }
            }
            PreludeEnd::BlockClose => {
                // Stray closing brace inside a body; nothing to anchor it
                // to.
            }
            PreludeEnd::BlockOpen => {
                let body_pos = scanner.position();
                let (body, closed) = scanner.read_block();
                blocks.push(RawBlock {
                    prelude,
                    pos,
                    body,
                    body_pos,
                    closed,
                });
            }
        }
    }
    (chunks, blocks)
}

/// Split an at-rule header (leading `@` already stripped) into its name
/// and the rest of the prelude.
fn split_at_header(header: &str) -> (&str, &str) {
    let header = header.trim();
    match header.find(|c: char| c.is_whitespace()) {
        Some(idx) => (&header[..idx], header[idx..].trim()),
        None => (header, ""),
    }
}

/// Canonical header text for a retained at-rule (`@keyframes slide`).
fn at_header_text(name: &str, rest: &str) -> String {
    if rest.is_empty() {
        format!("@{name}")
    } else {
        format!("@{name} {}", normalize_selector(rest))
    }
}

/// Split a selector list on top-level commas. Empty segments are kept so
/// that `h1, , h2` fails validation as a whole.
fn split_top_commas(text: &str) -> Vec<String> {
    let mut parts = vec![];
    let mut depth = 0usize;
    let mut quote: Option<char> = None;
    let mut escaped = false;
    let mut current = String::new();

    for ch in text.chars() {
        if escaped {
            escaped = false;
            current.push(ch);
            continue;
        }
        match quote {
            Some(q) => {
                current.push(ch);
                match ch {
                    '\\' => escaped = true,
                    c if c == q => quote = None,
                    _ => {}
                }
            }
            None => match ch {
                '"' | '\'' => {
                    quote = Some(ch);
                    current.push(ch);
                }
                '(' | '[' => {
                    depth += 1;
                    current.push(ch);
                }
                ')' | ']' => {
                    depth = depth.saturating_sub(1);
                    current.push(ch);
                }
                ',' if depth == 0 => {
                    parts.push(std::mem::take(&mut current));
                }
                _ => current.push(ch),
            },
        }
    }
    parts.push(current);
    parts.into_iter().map(|p| p.trim().to_string()).collect()
}

/// Rewrite a nested selector against its ancestor: `&` splices the
/// ancestor in place; otherwise the ancestor is prepended (combinator-led
/// selectors keep their combinator).
fn resolve_nested_selector(ancestor: Option<&str>, raw: &str) -> String {
    let selector = normalize_selector(raw);
    match ancestor {
        None => selector,
        Some(parent) => {
            if selector.contains('&') {
                normalize_selector(&selector.replace('&', parent))
            } else {
                format!("{parent} {selector}")
            }
        }
    }
}

/// Extract the target and trailing media list from an `@import` prelude:
/// `url("a.css") print` or `"a.css" screen`.
fn parse_import_prelude(rest: &str) -> Option<(String, &str)> {
    let rest = rest.trim();
    if rest.len() >= 4 && rest[..4].eq_ignore_ascii_case("url(") {
        let close = rest.find(')')?;
        let inner = rest[4..close].trim();
        let target = strip_quotes(inner).to_string();
        return Some((target, rest[close + 1..].trim()));
    }
    let quote = rest.chars().next().filter(|c| *c == '"' || *c == '\'')?;
    let closing = rest[1..].find(quote)? + 1;
    let target = rest[1..closing].to_string();
    Some((target, rest[closing + 1..].trim()))
}

fn strip_quotes(text: &str) -> &str {
    let text = text.trim();
    text.strip_prefix('"')
        .and_then(|s| s.strip_suffix('"'))
        .or_else(|| text.strip_prefix('\'').and_then(|s| s.strip_suffix('\'')))
        .unwrap_or(text)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn split_commas_respects_functions() {
        assert_eq!(
            split_top_commas("h1, h2:not(.a, .b), h3"),
            vec!["h1", "h2:not(.a, .b)", "h3"]
        );
    }

    #[test]
    fn split_commas_keeps_empty_segments() {
        assert_eq!(split_top_commas("h1, , h2"), vec!["h1", "", "h2"]);
    }

    #[test]
    fn nested_selector_resolution() {
        assert_eq!(resolve_nested_selector(None, " h1 "), "h1");
        assert_eq!(resolve_nested_selector(Some(".card"), ".title"), ".card .title");
        assert_eq!(resolve_nested_selector(Some(".card"), "> .title"), ".card > .title");
        assert_eq!(resolve_nested_selector(Some(".card"), "&:hover"), ".card:hover");
        assert_eq!(
            resolve_nested_selector(Some(".card"), ".dark &"),
            ".dark .card"
        );
    }

    #[test]
    fn at_header_splitting() {
        assert_eq!(split_at_header("media screen"), ("media", "screen"));
        assert_eq!(split_at_header("font-face"), ("font-face", ""));
        assert_eq!(
            split_at_header("keyframes   slide  in"),
            ("keyframes", "slide  in")
        );
    }

    #[test]
    fn import_prelude_forms() {
        assert_eq!(
            parse_import_prelude("url(\"a.css\") print"),
            Some(("a.css".to_string(), "print"))
        );
        assert_eq!(
            parse_import_prelude("url(a.css)"),
            Some(("a.css".to_string(), ""))
        );
        assert_eq!(
            parse_import_prelude("'b.css' screen and (min-width: 100px)"),
            Some(("b.css".to_string(), "screen and (min-width: 100px)"))
        );
        assert_eq!(parse_import_prelude("not-a-target"), None);
    }

    #[test]
    fn charset_capture() {
        let mut scanner = Scanner::new("@charset \"utf-8\";\nh1 { }");
        assert_eq!(consume_charset(&mut scanner), Some("utf-8".to_string()));
        let mut scanner = Scanner::new("h1 { }");
        assert_eq!(consume_charset(&mut scanner), None);
    }
}
