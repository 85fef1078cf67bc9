//! The stylesheet document: an ordered entry sequence with a media index.
//!
//! The entry vector is the single source of truth. Every derived view (the
//! selector list, the media index) is a lazily recomputed cache that every
//! mutating operation invalidates synchronously before returning, so a
//! read can never observe a stale view.

use std::cell::OnceCell;
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::path::Path;

use crate::config::ParseOptions;
use crate::error::Error;
use crate::imports::{FileImporter, ImportResolver};
use crate::media::{self, MediaQuery, MediaType};
use crate::merge;
use crate::parser::block::ParseSession;
use crate::rules::rule::normalize_selector;
use crate::rules::{AtRule, AtRuleBody, Declaration, Entry, Rule};
use crate::serialize;

/// Read-only projection of one rule for positional/legacy consumers:
/// `(selector, declaration text, specificity)`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectorEntry {
    pub selector: String,
    pub declarations: String,
    pub specificity: u32,
}

/// An in-memory CSS document.
///
/// Invariants, maintained across every mutation:
/// - `entries()[i].id() == i` (ids are compacted, not merely assigned)
/// - a rule's `parent_rule` is always a smaller id
#[derive(Debug, Clone, Default)]
pub struct Stylesheet {
    entries: Vec<Entry>,
    media_queries: Vec<MediaQuery>,
    charset: Option<String>,
    options: ParseOptions,
    selector_cache: OnceCell<Vec<String>>,
    media_index: OnceCell<HashMap<MediaType, Vec<usize>>>,
}

impl Stylesheet {
    /// An empty stylesheet with default options.
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse CSS text with default (lenient) options.
    pub fn parse(css: &str) -> crate::Result<Self> {
        Self::parse_with_options(css, ParseOptions::default())
    }

    /// Parse CSS text with explicit options. Imports, when enabled,
    /// resolve through the local [`FileImporter`].
    pub fn parse_with_options(css: &str, options: ParseOptions) -> crate::Result<Self> {
        Self::parse_with_resolver(css, options, &FileImporter)
    }

    /// Parse CSS text with a caller-provided import resolver.
    pub fn parse_with_resolver(
        css: &str,
        options: ParseOptions,
        resolver: &dyn ImportResolver,
    ) -> crate::Result<Self> {
        let (entries, media_queries, charset) = {
            let mut session = ParseSession::new(&options, resolver);
            session.parse(css)?;
            (session.entries, session.media_queries, session.charset)
        };
        Ok(Self {
            entries,
            media_queries,
            charset,
            options,
            selector_cache: OnceCell::new(),
            media_index: OnceCell::new(),
        })
    }

    /// Load and parse a stylesheet file. The file's directory becomes the
    /// base directory for relative imports unless one is already set.
    pub fn from_file(path: impl AsRef<Path>) -> crate::Result<Self> {
        Self::from_file_with_options(path, ParseOptions::default())
    }

    /// Load and parse a stylesheet file with explicit options.
    pub fn from_file_with_options(
        path: impl AsRef<Path>,
        mut options: ParseOptions,
    ) -> crate::Result<Self> {
        let path = path.as_ref();
        let css = std::fs::read_to_string(path).map_err(|err| Error::io(path, err))?;
        if options.base_dir.is_none()
            && let Some(parent) = path.parent()
        {
            options.base_dir = Some(parent.to_path_buf());
        }
        Self::parse_with_options(&css, options)
    }

    // --- Accessors ---------------------------------------------------

    /// The ordered entry sequence.
    pub fn entries(&self) -> &[Entry] {
        &self.entries
    }

    /// The rules, in document order.
    pub fn rules(&self) -> impl Iterator<Item = &Rule> {
        self.entries.iter().filter_map(Entry::as_rule)
    }

    /// The retained at-rule entities, in document order.
    pub fn at_rules(&self) -> impl Iterator<Item = &AtRule> {
        self.entries.iter().filter_map(Entry::as_at_rule)
    }

    /// The interned media query table.
    pub fn media_queries(&self) -> &[MediaQuery] {
        &self.media_queries
    }

    /// The media condition text a rule is tagged with, if any.
    pub fn media_condition_of(&self, rule: &Rule) -> Option<&str> {
        rule.media_query
            .and_then(|id| self.media_queries.get(id))
            .map(|mq| mq.condition.as_str())
    }

    /// The recorded `@charset` value, if any.
    pub fn charset(&self) -> Option<&str> {
        self.charset.as_deref()
    }

    pub fn set_charset(&mut self, charset: Option<String>) {
        self.charset = charset;
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate over all entries.
    pub fn iter(&self) -> impl Iterator<Item = &Entry> {
        self.entries.iter()
    }

    // --- Derived views (cached) --------------------------------------

    /// Distinct rule selectors in first-occurrence order. Cached;
    /// recomputed lazily after any mutation.
    pub fn selectors(&self) -> &[String] {
        self.selector_cache.get_or_init(|| {
            let mut seen = HashSet::new();
            let mut out = vec![];
            for rule in self.entries.iter().filter_map(Entry::as_rule) {
                if seen.insert(rule.selector.clone()) {
                    out.push(rule.selector.clone());
                }
            }
            out
        })
    }

    fn media_index(&self) -> &HashMap<MediaType, Vec<usize>> {
        self.media_index.get_or_init(|| {
            let mut index: HashMap<MediaType, Vec<usize>> = HashMap::new();
            for rule in self.entries.iter().filter_map(Entry::as_rule) {
                index.entry(MediaType::All).or_default().push(rule.id);
                if let Some(mq) = rule.media_query {
                    for ty in self.media_queries[mq].types() {
                        if ty != MediaType::All {
                            index.entry(ty).or_default().push(rule.id);
                        }
                    }
                }
            }
            index
        })
    }

    /// Rules reachable under a media type. `All` matches every rule,
    /// explicit media or not.
    pub fn rules_for_media(&self, media_type: &MediaType) -> Vec<&Rule> {
        match self.media_index().get(media_type) {
            Some(ids) => ids
                .iter()
                .filter_map(|&id| self.entries[id].as_rule())
                .collect(),
            None => vec![],
        }
    }

    /// Rules whose selector matches (whitespace-normalized).
    pub fn find_by_selector(&self, selector: &str) -> Vec<&Rule> {
        let needle = normalize_selector(selector);
        self.rules().filter(|r| r.selector == needle).collect()
    }

    /// Rules whose selector matches and that are reachable under the
    /// given media type.
    pub fn find_by_selector_in_media(
        &self,
        selector: &str,
        media_type: &MediaType,
    ) -> Vec<&Rule> {
        let needle = normalize_selector(selector);
        self.rules_for_media(media_type)
            .into_iter()
            .filter(|r| r.selector == needle)
            .collect()
    }

    /// Entries whose query selector matches: rule selectors and at-rule
    /// headers alike (`@font-face`, `@keyframes slide`, ...).
    pub fn find_entries_by_selector(&self, selector: &str) -> Vec<&Entry> {
        let needle = normalize_selector(selector);
        self.entries
            .iter()
            .filter(|e| e.selector() == needle)
            .collect()
    }

    /// The positional/legacy projection: one `(selector, declarations,
    /// specificity)` tuple per rule, computed on demand from the entry
    /// sequence.
    pub fn selector_entries(&self) -> Vec<SelectorEntry> {
        self.rules()
            .map(|rule| SelectorEntry {
                selector: rule.selector.clone(),
                declarations: rule.declarations_to_css(),
                specificity: rule.specificity,
            })
            .collect()
    }

    // --- Mutations ---------------------------------------------------

    fn invalidate_caches(&mut self) {
        self.selector_cache.take();
        self.media_index.take();
    }

    /// Intern a (normalized) media condition, returning its id.
    fn intern_media(&mut self, condition: &str) -> usize {
        if let Some(existing) = self
            .media_queries
            .iter()
            .find(|mq| mq.condition == condition)
        {
            return existing.id;
        }
        let id = self.media_queries.len();
        self.media_queries.push(MediaQuery::new(id, condition));
        id
    }

    /// Append a rule; its id is assigned from the current length. A
    /// forward-pointing parent link is cleared.
    pub fn add_rule(&mut self, mut rule: Rule) -> usize {
        let id = self.entries.len();
        rule.id = id;
        if rule.parent_rule.is_some_and(|p| p >= id) {
            rule.parent_rule = None;
        }
        self.entries.push(Entry::Rule(rule));
        self.invalidate_caches();
        id
    }

    /// Append a rule tagged with a media condition.
    pub fn add_rule_in_media(
        &mut self,
        selector: &str,
        declarations: Vec<Declaration>,
        condition: &str,
    ) -> usize {
        let condition = media::normalize_condition(condition);
        let media_query = Some(self.intern_media(&condition));
        let mut rule = Rule::new(selector, declarations);
        rule.media_query = media_query;
        self.add_rule(rule)
    }

    /// Append a retained at-rule entity.
    pub fn add_at_rule(&mut self, mut at_rule: AtRule) -> usize {
        let id = self.entries.len();
        at_rule.id = id;
        self.entries.push(Entry::AtRule(at_rule));
        self.invalidate_caches();
        id
    }

    /// Parse a CSS fragment with this sheet's options and append its
    /// entries, renumbering and re-interning media conditions.
    pub fn add_rules_from_css(&mut self, css: &str) -> crate::Result<()> {
        let options = self.options.clone();
        let resolver = FileImporter;
        let (entries, media_queries, charset) = {
            let mut session = ParseSession::new(&options, &resolver);
            session.parse(css)?;
            (session.entries, session.media_queries, session.charset)
        };
        self.splice(entries, &media_queries, charset);
        Ok(())
    }

    /// Append another stylesheet's entries to this one.
    pub fn append(&mut self, other: Stylesheet) {
        let Stylesheet {
            entries,
            media_queries,
            charset,
            ..
        } = other;
        self.splice(entries, &media_queries, charset);
    }

    fn splice(
        &mut self,
        entries: Vec<Entry>,
        foreign_media: &[MediaQuery],
        charset: Option<String>,
    ) {
        let offset = self.entries.len();
        let remap: Vec<usize> = foreign_media
            .iter()
            .map(|mq| self.intern_media(&mq.condition))
            .collect();

        for mut entry in entries {
            match &mut entry {
                Entry::Rule(rule) => {
                    rule.id += offset;
                    rule.parent_rule = rule.parent_rule.map(|p| p + offset);
                    rule.media_query = rule.media_query.map(|m| remap[m]);
                }
                Entry::AtRule(at) => {
                    at.id += offset;
                    at.media_query = at.media_query.map(|m| remap[m]);
                }
            }
            self.entries.push(entry);
        }
        if self.charset.is_none() {
            self.charset = charset;
        }
        self.invalidate_caches();
    }

    /// Keep only entries the predicate accepts, then compact ids and
    /// remap parent links (a removed parent orphans its children — the
    /// flattened selector text already carries the ancestry). Returns the
    /// number of removed entries.
    fn retain_entries(&mut self, keep: impl Fn(&Entry) -> bool) -> usize {
        let mut map: Vec<Option<usize>> = Vec::with_capacity(self.entries.len());
        let mut next = 0usize;
        for entry in &self.entries {
            if keep(entry) {
                map.push(Some(next));
                next += 1;
            } else {
                map.push(None);
            }
        }
        let removed = self.entries.len() - next;
        if removed == 0 {
            return 0;
        }

        self.entries.retain(|entry| map[entry.id()].is_some());
        for entry in self.entries.iter_mut() {
            let new_id = map[entry.id()].expect("kept entries have a mapping");
            if let Entry::Rule(rule) = entry {
                rule.parent_rule = rule.parent_rule.and_then(|p| map[p]);
            }
            entry.set_id(new_id);
        }
        self.invalidate_caches();
        removed
    }

    /// Remove the entry with the given id. Remaining entries are
    /// renumbered to stay sequential.
    pub fn remove_rule(&mut self, id: usize) -> bool {
        self.retain_entries(|entry| entry.id() != id) > 0
    }

    /// Remove every entry whose query selector matches. Returns the
    /// number removed.
    pub fn remove_by_selector(&mut self, selector: &str) -> usize {
        let needle = normalize_selector(selector);
        self.retain_entries(|entry| entry.selector() != needle)
    }

    /// Cascade-merge the document: within each (media, wrapper) group,
    /// rules sharing a selector are merged into one rule carrying the
    /// winning declaration per property. At-rule entities pass through.
    pub fn merge(&mut self) -> crate::Result<()> {
        type GroupKey = (Option<usize>, Vec<String>);

        enum Slot {
            At(AtRule),
            Group(GroupKey),
        }

        let mut groups: HashMap<GroupKey, Vec<Rule>> = HashMap::new();
        let mut slots = vec![];
        for entry in &self.entries {
            match entry {
                Entry::AtRule(at) => slots.push(Slot::At(at.clone())),
                Entry::Rule(rule) => {
                    let key = (rule.media_query, rule.wrappers.clone());
                    let group = groups.entry(key.clone()).or_default();
                    if group.is_empty() {
                        slots.push(Slot::Group(key));
                    }
                    group.push(rule.clone());
                }
            }
        }

        let mut merged_entries = vec![];
        for slot in slots {
            match slot {
                Slot::At(mut at) => {
                    at.id = merged_entries.len();
                    merged_entries.push(Entry::AtRule(at));
                }
                Slot::Group(key) => {
                    let rules = groups.remove(&key).expect("group recorded");
                    for mut rule in merge::merge_by_selector(&rules)? {
                        rule.id = merged_entries.len();
                        rule.parent_rule = None;
                        merged_entries.push(Entry::Rule(rule));
                    }
                }
            }
        }

        self.entries = merged_entries;
        self.invalidate_caches();
        Ok(())
    }

    /// Apply a value transform to every declaration in the document:
    /// rule bodies, at-rule descriptor bodies, and keyframe steps. The
    /// transform returns `Some(new_value)` to rewrite a value.
    pub fn rewrite_values(&mut self, mut transform: impl FnMut(&str) -> Option<String>) {
        fn rewrite(decls: &mut [Declaration], transform: &mut impl FnMut(&str) -> Option<String>) {
            for decl in decls.iter_mut() {
                if let Some(value) = transform(decl.value()) {
                    *decl = Declaration::new(decl.property(), value, decl.important());
                }
            }
        }

        for entry in &mut self.entries {
            match entry {
                Entry::Rule(rule) => rewrite(&mut rule.declarations, &mut transform),
                Entry::AtRule(at) => match &mut at.body {
                    AtRuleBody::Declarations(decls) => rewrite(decls, &mut transform),
                    AtRuleBody::Keyframes(blocks) => {
                        for block in blocks {
                            rewrite(&mut block.declarations, &mut transform);
                        }
                    }
                },
            }
        }
        self.invalidate_caches();
    }

    /// Render the document to canonical CSS text.
    pub fn to_css(&self) -> String {
        serialize::render(self)
    }
}

impl fmt::Display for Stylesheet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_css())
    }
}
