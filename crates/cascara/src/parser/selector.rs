//! Selector validation and specificity scoring.
//!
//! Selectors are analyzed with the `cssparser` tokenizer rather than a
//! grammar: a single token walk both screens the selector against a
//! whitelist of permitted token shapes and counts the id/class/type
//! contributions for the specificity score.

use cssparser::{ParseError as CssParseError, Parser, ParserInput, Token};

use crate::error::ErrorKind;

/// Single-colon pseudo-elements that survive from CSS 2.1. These score in
/// the type tier even without the `::` form.
const LEGACY_PSEUDO_ELEMENTS: [&str; 4] = ["before", "after", "first-line", "first-letter"];

/// Functional pseudo-classes whose argument is itself a selector and
/// contributes its own specificity.
const SELECTOR_ARG_PSEUDOS: [&str; 3] = ["not", "is", "has"];

/// A rejected selector, with the error kind it maps to.
#[derive(Debug, Clone)]
pub(crate) struct SelectorError {
    pub kind: ErrorKind,
    pub message: String,
}

fn invalid(message: String) -> SelectorError {
    SelectorError {
        kind: ErrorKind::InvalidSelector,
        message,
    }
}

fn syntax(message: String) -> SelectorError {
    SelectorError {
        kind: ErrorKind::InvalidSelectorSyntax,
        message,
    }
}

/// Specificity contributions: ids / classes / types.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct Counts {
    ids: u32,
    classes: u32,
    types: u32,
}

impl Counts {
    /// Summed integer score: id selectors weigh 100, class/attribute/
    /// pseudo-class selectors 10, type and pseudo-element selectors 1.
    fn score(&self) -> u32 {
        self.ids * 100 + self.classes * 10 + self.types
    }
}

/// Specificity score of a selector (best effort: unparseable selectors
/// score whatever their recognizable prefix contributes).
pub fn specificity(selector: &str) -> u32 {
    analyze(selector).0.score()
}

/// Validate a selector against the permitted token shapes.
pub(crate) fn validate(selector: &str) -> Result<(), SelectorError> {
    match analyze(selector).1 {
        Some(err) => Err(err),
        None => Ok(()),
    }
}

/// Validate and score in one pass.
pub(crate) fn check(selector: &str) -> Result<u32, SelectorError> {
    let (counts, err) = analyze(selector);
    match err {
        Some(err) => Err(err),
        None => Ok(counts.score()),
    }
}

fn analyze(selector: &str) -> (Counts, Option<SelectorError>) {
    let mut counts = Counts::default();
    let trimmed = selector.trim();

    if trimmed.is_empty() {
        return (counts, Some(invalid("selector is empty".into())));
    }
    if let Some(first) = trimmed.chars().next()
        && matches!(first, '>' | '+' | '~')
    {
        return (
            counts,
            Some(invalid(format!(
                "selector '{trimmed}' begins with a combinator"
            ))),
        );
    }

    let mut input = ParserInput::new(trimmed);
    let mut parser = Parser::new(&mut input);
    let mut err = None;
    scan_tokens(&mut parser, &mut counts, &mut err, false);

    if let Some(inner) = err.take() {
        let err = SelectorError {
            kind: inner.kind,
            message: format!("selector '{trimmed}': {}", inner.message),
        };
        return (counts, Some(err));
    }
    (counts, None)
}

/// Walk one token stream (the whole selector, or a functional pseudo-class
/// argument when `in_function` is set, where commas separate sub-selectors).
fn scan_tokens<'i>(
    parser: &mut Parser<'i, '_>,
    counts: &mut Counts,
    err: &mut Option<SelectorError>,
    in_function: bool,
) {
    let mut after_combinator = false;
    let mut pending_dot = false;
    let mut colon_run = 0u8;

    loop {
        if err.is_some() {
            return;
        }
        let token = match parser.next_including_whitespace() {
            Ok(t) => t.clone(),
            Err(_) => break,
        };

        if pending_dot && !matches!(token, Token::Ident(_)) {
            *err = Some(syntax("expected a class name after '.'".into()));
            return;
        }
        if colon_run > 0
            && !matches!(token, Token::Ident(_) | Token::Function(_) | Token::Colon)
        {
            *err = Some(syntax("expected a pseudo-class name after ':'".into()));
            return;
        }

        match token {
            Token::WhiteSpace(_) => {
                // Descendant boundary. A pending combinator stays pending.
            }
            Token::Ident(name) => {
                if pending_dot {
                    counts.classes += 1;
                    pending_dot = false;
                } else if colon_run == 1 {
                    if LEGACY_PSEUDO_ELEMENTS.contains(&name.as_ref()) {
                        counts.types += 1;
                    } else {
                        counts.classes += 1;
                    }
                    colon_run = 0;
                } else if colon_run >= 2 {
                    counts.types += 1;
                    colon_run = 0;
                } else {
                    counts.types += 1;
                }
                after_combinator = false;
            }
            Token::IDHash(_) => {
                counts.ids += 1;
                after_combinator = false;
            }
            Token::Hash(value) => {
                *err = Some(syntax(format!("'#{value}' is not a valid id selector")));
                return;
            }
            Token::Delim('.') => {
                pending_dot = true;
            }
            Token::Delim('*') | Token::Delim('&') | Token::Delim('|') => {
                after_combinator = false;
            }
            Token::Delim(c @ ('>' | '+' | '~')) => {
                if after_combinator {
                    *err = Some(syntax(format!("repeated combinator '{c}'")));
                    return;
                }
                after_combinator = true;
            }
            Token::Delim(c) => {
                *err = Some(syntax(format!("disallowed character '{c}' in selector")));
                return;
            }
            Token::Colon => {
                colon_run += 1;
                if colon_run > 2 {
                    *err = Some(syntax("too many ':' in a row".into()));
                    return;
                }
            }
            Token::Function(name) => {
                let fname = name.to_string().to_ascii_lowercase();
                let was_element = colon_run >= 2;
                colon_run = 0;
                if SELECTOR_ARG_PSEUDOS.contains(&fname.as_str()) {
                    // The argument is a selector; it contributes its own
                    // counts.
                    let _ = parser.parse_nested_block(|p| {
                        scan_tokens(p, counts, err, true);
                        Ok::<(), CssParseError<'_, ()>>(())
                    });
                } else {
                    if fname != "where" {
                        if was_element {
                            counts.types += 1;
                        } else {
                            counts.classes += 1;
                        }
                    }
                    skip_nested(parser);
                }
                after_combinator = false;
            }
            Token::SquareBracketBlock => {
                counts.classes += 1;
                scan_attribute(parser, err);
                after_combinator = false;
            }
            Token::Comma => {
                if in_function {
                    // Sub-selector boundary inside :not()/:is()/:has().
                    after_combinator = false;
                } else {
                    *err = Some(syntax("unexpected ',' in selector".into()));
                    return;
                }
            }
            Token::Number { .. } | Token::Dimension { .. } | Token::Percentage { .. } => {
                *err = Some(syntax("unexpected number in selector".into()));
                return;
            }
            _ => {
                *err = Some(syntax("disallowed token in selector".into()));
                return;
            }
        }
    }

    if err.is_none() {
        if pending_dot {
            *err = Some(syntax("expected a class name after '.'".into()));
        } else if colon_run > 0 {
            *err = Some(syntax("expected a pseudo-class name after ':'".into()));
        } else if after_combinator {
            *err = Some(syntax("selector ends with a combinator".into()));
        }
    }
}

/// Consume a nested block without interpreting it (nth-expressions and
/// other non-selector pseudo-class arguments).
fn skip_nested(parser: &mut Parser<'_, '_>) {
    let _ = parser.parse_nested_block(|p| {
        while p.next_including_whitespace().is_ok() {}
        Ok::<(), CssParseError<'_, ()>>(())
    });
}

/// Validate the inside of an attribute selector. Deliberately loose: any
/// ident (including `--custom-property` shapes), strings, match operators,
/// and numbers are fine.
fn scan_attribute<'i>(
    parser: &mut Parser<'i, '_>,
    err: &mut Option<SelectorError>,
) {
    let _ = parser.parse_nested_block(|p| {
        loop {
            let token = match p.next_including_whitespace() {
                Ok(t) => t.clone(),
                Err(_) => break,
            };
            match token {
                Token::Ident(_)
                | Token::QuotedString(_)
                | Token::WhiteSpace(_)
                | Token::Number { .. }
                | Token::Dimension { .. }
                | Token::Hash(_)
                | Token::IDHash(_)
                | Token::Colon
                | Token::IncludeMatch
                | Token::DashMatch
                | Token::PrefixMatch
                | Token::SuffixMatch
                | Token::SubstringMatch
                | Token::Delim('=')
                | Token::Delim('*')
                | Token::Delim('|')
                | Token::Delim('~')
                | Token::Delim('^')
                | Token::Delim('$')
                | Token::Delim('-') => {}
                _ => {
                    *err = Some(syntax("invalid attribute selector".into()));
                    break;
                }
            }
        }
        Ok::<(), CssParseError<'_, ()>>(())
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scoring_tiers() {
        assert_eq!(specificity("*"), 0);
        assert_eq!(specificity("h1"), 1);
        assert_eq!(specificity(".primary"), 10);
        assert_eq!(specificity("#submit"), 100);
        assert_eq!(specificity("h1.primary"), 11);
        assert_eq!(specificity("#submit .primary h1"), 111);
        assert_eq!(specificity("a:hover"), 11);
        assert_eq!(specificity("p::before"), 2);
        assert_eq!(specificity("p:before"), 2);
        assert_eq!(specificity("a[href]"), 11);
    }

    #[test]
    fn not_counts_its_argument() {
        assert_eq!(specificity(":not(.primary)"), 10);
        assert_eq!(specificity("div:not(#x)"), 101);
        assert_eq!(specificity(":where(.a)"), 0);
    }

    #[test]
    fn nth_child_is_one_class() {
        assert_eq!(specificity("li:nth-child(2n+1)"), 11);
        assert!(validate("li:nth-child(2n+1)").is_ok());
    }

    #[test]
    fn accepts_common_shapes() {
        for sel in [
            "h1",
            "h1 h2.foo",
            "div > p",
            "a + b",
            "a ~ b",
            "input[type=\"text\"]",
            "[data-role~=admin]",
            "[data--custom]",
            "a:hover:focus",
            "p::first-line",
            "ul li:not(.done)",
            "*",
        ] {
            assert!(validate(sel).is_ok(), "expected '{sel}' to be accepted");
        }
    }

    #[test]
    fn rejects_empty_and_leading_combinator() {
        let err = validate("").unwrap_err();
        assert_eq!(err.kind, ErrorKind::InvalidSelector);
        let err = validate("   ").unwrap_err();
        assert_eq!(err.kind, ErrorKind::InvalidSelector);
        let err = validate("> div").unwrap_err();
        assert_eq!(err.kind, ErrorKind::InvalidSelector);
    }

    #[test]
    fn rejects_bad_punctuation() {
        for sel in ["div..foo", "a##b", ". foo", "a 5", "a !b", "div > > p", "a >"] {
            let err = validate(sel).unwrap_err();
            assert_eq!(err.kind, ErrorKind::InvalidSelectorSyntax, "selector '{sel}'");
        }
    }
}
