//! Cascade and merge: pick the winning declaration per property.
//!
//! Precedence, in order: `!important` beats non-important regardless of
//! specificity; then higher specificity; then later source position (which
//! also resolves repeats of one property inside a single block). Source
//! order is a total order, so ties cannot remain.

use std::collections::HashMap;
use std::collections::hash_map::Entry as MapEntry;

use crate::rules::{Declaration, Rule};
use crate::shorthand;

#[derive(Debug)]
struct Winner {
    value: String,
    important: bool,
    specificity: u32,
}

/// Whether a later candidate overwrites the current winner.
fn overwrites(incumbent: &Winner, candidate: &Winner) -> bool {
    if candidate.important != incumbent.important {
        return candidate.important;
    }
    // Equal importance: higher specificity wins; on equal specificity the
    // candidate wins because it comes later in source order.
    candidate.specificity >= incumbent.specificity
}

/// Resolve the winning declaration per property across `rules`, walking
/// rules and their declarations in source order. Shorthands are expanded
/// before comparison and complete longhand sets are re-collapsed in the
/// output. Output order is first-seen property order.
fn cascade<'a, I>(rules: I) -> crate::Result<Vec<Declaration>>
where
    I: IntoIterator<Item = &'a Rule>,
{
    let mut order: Vec<String> = vec![];
    let mut winners: HashMap<String, Winner> = HashMap::new();

    for rule in rules {
        for decl in &rule.declarations {
            let longhands = shorthand::expand(decl.property(), decl.value(), decl.important())?
                .unwrap_or_else(|| vec![decl.clone()]);
            for longhand in longhands {
                let candidate = Winner {
                    value: longhand.value().to_string(),
                    important: longhand.important(),
                    specificity: rule.specificity,
                };
                match winners.entry(longhand.property().to_string()) {
                    MapEntry::Vacant(slot) => {
                        order.push(slot.key().clone());
                        slot.insert(candidate);
                    }
                    MapEntry::Occupied(mut slot) => {
                        if overwrites(slot.get(), &candidate) {
                            slot.insert(candidate);
                        }
                    }
                }
            }
        }
    }

    let resolved = order
        .into_iter()
        .map(|property| {
            let winner = winners.remove(&property).expect("winner recorded");
            Declaration::new(property, winner.value, winner.important)
        })
        .collect();
    Ok(shorthand::collapse(resolved))
}

/// Merge rules that all apply to one element (selectors may differ): the
/// result is the single winning declaration set.
pub fn merge(rules: &[Rule]) -> crate::Result<Vec<Declaration>> {
    cascade(rules)
}

/// Merge a rule sequence into one rule per distinct selector, preserving
/// the position of each selector's first occurrence. Rules for different
/// selectors do not interact.
pub fn merge_by_selector(rules: &[Rule]) -> crate::Result<Vec<Rule>> {
    let mut order: Vec<&str> = vec![];
    let mut groups: HashMap<&str, Vec<&Rule>> = HashMap::new();

    for rule in rules {
        let group = groups.entry(rule.selector.as_str()).or_default();
        if group.is_empty() {
            order.push(&rule.selector);
        }
        group.push(rule);
    }

    let mut merged = vec![];
    for (id, selector) in order.into_iter().enumerate() {
        let group = &groups[selector];
        let declarations = cascade(group.iter().copied())?;
        let first = group[0];
        let mut rule = Rule::with_specificity(selector, declarations, first.specificity);
        rule.id = id;
        rule.media_query = first.media_query;
        rule.wrappers = first.wrappers.clone();
        merged.push(rule);
    }
    Ok(merged)
}
