//! Canonical CSS rendering.
//!
//! Output shape: an optional `@charset` line, then every entry without an
//! explicit media condition in document order, then one `@media` block per
//! distinct condition in first-occurrence order. Rules flattened out of
//! conditional at-rules re-acquire their wrapper blocks. Rendering the
//! parse of rendered output reproduces it byte for byte.

use std::collections::HashMap;

use crate::rules::{AtRule, AtRuleBody, Declaration, Entry, Rule, Stylesheet};

/// Render a stylesheet to CSS text.
pub fn render(sheet: &Stylesheet) -> String {
    let mut out = String::new();
    if let Some(charset) = sheet.charset() {
        out.push_str("@charset \"");
        out.push_str(charset);
        out.push_str("\";\n");
    }

    let mut base: Vec<&Entry> = vec![];
    let mut condition_order: Vec<&str> = vec![];
    let mut by_condition: HashMap<&str, Vec<&Entry>> = HashMap::new();

    for entry in sheet.entries() {
        match entry.media_query() {
            None => base.push(entry),
            Some(mq) => {
                let condition = sheet.media_queries()[mq].condition.as_str();
                let group = by_condition.entry(condition).or_default();
                if group.is_empty() {
                    condition_order.push(condition);
                }
                group.push(entry);
            }
        }
    }

    render_group(&mut out, &base, 0);
    for condition in condition_order {
        out.push_str("@media ");
        out.push_str(condition);
        out.push_str(" {\n");
        render_group(&mut out, &by_condition[condition], 1);
        out.push_str("}\n");
    }

    if out.trim().is_empty() { String::new() } else { out }
}

/// Render one media group, re-nesting wrapper chains (`@supports`,
/// `@layer`, ...) in first-occurrence order.
fn render_group(out: &mut String, entries: &[&Entry], indent: usize) {
    let mut chain_order: Vec<&[String]> = vec![];
    let mut by_chain: HashMap<&[String], Vec<&Entry>> = HashMap::new();

    for entry in entries {
        let chain = entry.wrappers();
        let group = by_chain.entry(chain).or_default();
        if group.is_empty() {
            chain_order.push(chain);
        }
        group.push(entry);
    }

    for chain in chain_order {
        let mut level = indent;
        for header in chain {
            push_indent(out, level);
            out.push_str(header);
            out.push_str(" {\n");
            level += 1;
        }
        for entry in &by_chain[chain] {
            match entry {
                Entry::Rule(rule) => {
                    push_indent(out, level);
                    out.push_str(&rule_text(rule));
                    out.push('\n');
                }
                Entry::AtRule(at) => render_at_rule(out, at, level),
            }
        }
        for closing in (indent..level).rev() {
            push_indent(out, closing);
            out.push_str("}\n");
        }
    }
}

/// One rule on one line: `selector { prop: value; prop2: value2; }`.
pub fn rule_text(rule: &Rule) -> String {
    if rule.declarations.is_empty() {
        format!("{} {{ }}", rule.selector)
    } else {
        format!("{} {{ {} }}", rule.selector, declarations_text(&rule.declarations))
    }
}

fn declarations_text(declarations: &[Declaration]) -> String {
    declarations
        .iter()
        .map(|d| format!("{d};"))
        .collect::<Vec<_>>()
        .join(" ")
}

fn render_at_rule(out: &mut String, at: &AtRule, indent: usize) {
    match &at.body {
        AtRuleBody::Declarations(declarations) => {
            push_indent(out, indent);
            out.push_str(&at.header);
            if declarations.is_empty() {
                out.push_str(" { }\n");
            } else {
                out.push_str(" { ");
                out.push_str(&declarations_text(declarations));
                out.push_str(" }\n");
            }
        }
        AtRuleBody::Keyframes(blocks) => {
            push_indent(out, indent);
            out.push_str(&at.header);
            out.push_str(" {\n");
            for block in blocks {
                push_indent(out, indent + 1);
                if block.declarations.is_empty() {
                    out.push_str(&format!("{} {{ }}\n", block.selector));
                } else {
                    out.push_str(&format!(
                        "{} {{ {} }}\n",
                        block.selector,
                        declarations_text(&block.declarations)
                    ));
                }
            }
            push_indent(out, indent);
            out.push_str("}\n");
        }
    }
}

fn push_indent(out: &mut String, level: usize) {
    for _ in 0..level {
        out.push_str("  ");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::Rule;

    fn decl(property: &str, value: &str, important: bool) -> Declaration {
        Declaration::new(property, value, important)
    }

    #[test]
    fn rule_line_format() {
        let rule = Rule::new(
            "h1",
            vec![
                decl("color", "red", false),
                decl("font-size", "10px", true),
            ],
        );
        assert_eq!(
            rule_text(&rule),
            "h1 { color: red; font-size: 10px !important; }"
        );
    }

    #[test]
    fn empty_rule_renders_closed() {
        let rule = Rule::new("h1", vec![]);
        assert_eq!(rule_text(&rule), "h1 { }");
    }

    #[test]
    fn charset_line_comes_first() {
        let mut sheet = Stylesheet::new();
        sheet.set_charset(Some("utf-8".to_string()));
        sheet.add_rule(Rule::new("a", vec![decl("color", "red", false)]));
        let css = render(&sheet);
        assert!(css.starts_with("@charset \"utf-8\";\n"));
    }

    #[test]
    fn media_groups_wrap_rules() {
        let mut sheet = Stylesheet::new();
        sheet.add_rule(Rule::new("a", vec![decl("color", "red", false)]));
        sheet.add_rule_in_media("b", vec![decl("color", "blue", false)], "screen");
        sheet.add_rule_in_media("c", vec![decl("color", "green", false)], "screen");
        let css = render(&sheet);
        assert_eq!(
            css,
            "a { color: red; }\n@media screen {\n  b { color: blue; }\n  c { color: green; }\n}\n"
        );
    }

    #[test]
    fn empty_stylesheet_renders_empty() {
        assert_eq!(render(&Stylesheet::new()), "");
    }
}
