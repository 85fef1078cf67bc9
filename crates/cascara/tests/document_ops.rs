//! Document mutation, error policy, imports, and value passes.

use std::fs;

use cascara::color::{ColorNotation, convert_stylesheet};
use cascara::prelude::*;
use url::Url;

fn sequential(sheet: &Stylesheet) -> bool {
    sheet.entries().iter().enumerate().all(|(i, e)| e.id() == i)
}

#[test]
fn removal_renumbers_and_shifts_the_media_index() {
    let mut sheet = Stylesheet::parse(
        "a { color: red } b { color: blue } @media screen { c { color: green } } d { color: black }",
    )
    .unwrap();
    assert_eq!(sheet.len(), 4);

    assert!(sheet.remove_rule(1));
    let ids: Vec<usize> = sheet.entries().iter().map(|e| e.id()).collect();
    assert_eq!(ids, vec![0, 1, 2]);
    let selectors: Vec<&str> = sheet.rules().map(|r| r.selector.as_str()).collect();
    assert_eq!(selectors, vec!["a", "c", "d"]);

    // The media index follows the renumbering.
    let screen = sheet.rules_for_media(&MediaType::Screen);
    assert_eq!(screen.len(), 1);
    assert_eq!(screen[0].selector, "c");
    assert_eq!(screen[0].id, 1);

    assert!(!sheet.remove_rule(17));
}

#[test]
fn ids_stay_sequential_through_mixed_mutations() {
    let mut sheet = Stylesheet::parse("a { x: 1 } b { y: 2 }").unwrap();
    sheet.add_rule(Rule::new("c", vec![Declaration::new("z", "3", false)]));
    sheet.add_rules_from_css("@media print { d { w: 4 } }").unwrap();
    assert!(sequential(&sheet));

    sheet.remove_by_selector("b");
    assert!(sequential(&sheet));

    sheet.merge().unwrap();
    assert!(sequential(&sheet));
    assert_eq!(sheet.rules_for_media(&MediaType::Print).len(), 1);
}

#[test]
fn strict_empty_value_raises_with_position_and_property() {
    let options = ParseOptions::new().errors(ErrorPolicy::strict());
    let err = Stylesheet::parse_with_options("h1 { color: ; }", options).unwrap_err();
    assert_eq!(err.kind(), Some(ErrorKind::EmptyValue));
    assert_eq!(err.line(), Some(1));
    assert!(err.to_string().contains("color"));
}

#[test]
fn lenient_mode_drops_only_the_offender() {
    let sheet = Stylesheet::parse("h1 { color: ; font-size: 10px }").unwrap();
    let rule = sheet.rules().next().unwrap();
    assert_eq!(rule.declarations_to_css(), "font-size: 10px");
}

#[test]
fn error_positions_track_lines() {
    let options = ParseOptions::new().errors(ErrorPolicy::strict());
    let err = Stylesheet::parse_with_options("h1 { color: red }\nh2 { color: ; }", options)
        .unwrap_err();
    assert_eq!(err.kind(), Some(ErrorKind::EmptyValue));
    assert_eq!(err.line(), Some(2));
}

#[test]
fn only_enabled_kinds_raise() {
    let options =
        ParseOptions::new().errors(ErrorPolicy::lenient().raise(ErrorKind::MalformedDeclaration));

    // empty_value stays tolerated under this policy
    let sheet = Stylesheet::parse_with_options("h1 { color: ; }", options.clone()).unwrap();
    assert_eq!(sheet.len(), 1);

    let err = Stylesheet::parse_with_options("h1 { color red }", options).unwrap_err();
    assert_eq!(err.kind(), Some(ErrorKind::MalformedDeclaration));
}

#[test]
fn first_error_in_document_order_is_raised() {
    let options = ParseOptions::new().errors(ErrorPolicy::strict());
    let err = Stylesheet::parse_with_options("h1 { color: ; }\nh2 { font red }", options)
        .unwrap_err();
    assert_eq!(err.kind(), Some(ErrorKind::EmptyValue));
    assert_eq!(err.line(), Some(1));
}

#[test]
fn invalid_selector_rejects_the_whole_list() {
    let sheet = Stylesheet::parse("h1, h2..bad, h3 { color: red }").unwrap();
    assert!(sheet.is_empty());

    let options = ParseOptions::new().errors(ErrorPolicy::strict());
    let err = Stylesheet::parse_with_options("h1, h2..bad, h3 { color: red }", options)
        .unwrap_err();
    assert_eq!(err.kind(), Some(ErrorKind::InvalidSelectorSyntax));
}

#[test]
fn combinator_leading_selector_is_invalid() {
    let options = ParseOptions::new().errors(ErrorPolicy::strict());
    let err = Stylesheet::parse_with_options("> div { color: red }", options).unwrap_err();
    assert_eq!(err.kind(), Some(ErrorKind::InvalidSelector));
}

#[test]
fn media_without_a_query_is_malformed() {
    let sheet = Stylesheet::parse("@media { body { color: red } }").unwrap();
    assert!(sheet.is_empty());

    let options = ParseOptions::new().errors(ErrorPolicy::strict());
    let err =
        Stylesheet::parse_with_options("@media { body { color: red } }", options).unwrap_err();
    assert_eq!(err.kind(), Some(ErrorKind::MalformedAtRule));
}

#[test]
fn unclosed_block_policies() {
    // Lenient: the unclosed construct is dropped.
    let sheet = Stylesheet::parse("h1 { color: red").unwrap();
    assert!(sheet.is_empty());

    // fix_braces: the missing brace is synthesized.
    let options = ParseOptions::new().fix_braces(true);
    let sheet = Stylesheet::parse_with_options("h1 { color: red", options).unwrap();
    assert_eq!(sheet.len(), 1);
    assert_eq!(sheet.rules().next().unwrap().declarations_to_css(), "color: red");

    // Strict without repair: an error.
    let options = ParseOptions::new().errors(ErrorPolicy::strict());
    let err = Stylesheet::parse_with_options("h1 { color: red", options).unwrap_err();
    assert_eq!(err.kind(), Some(ErrorKind::UnclosedBlock));

    // Repair wins over strictness: nothing to report once fixed.
    let options = ParseOptions::new().errors(ErrorPolicy::strict()).fix_braces(true);
    let sheet = Stylesheet::parse_with_options("h1 { color: red", options).unwrap();
    assert_eq!(sheet.len(), 1);
}

#[test]
fn file_imports_splice_with_media() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("reset.css"), "h1 { margin: 0 }").unwrap();

    let css = "@import \"reset.css\" print;\nbody { color: red }";
    let options = ParseOptions::new()
        .imports(ImportPolicy::local())
        .base_dir(dir.path());
    let sheet = Stylesheet::parse_with_options(css, options).unwrap();

    let selectors: Vec<&str> = sheet.rules().map(|r| r.selector.as_str()).collect();
    assert_eq!(selectors, vec!["h1", "body"]);
    assert!(sequential(&sheet));

    let print = sheet.rules_for_media(&MediaType::Print);
    assert_eq!(print.len(), 1);
    assert_eq!(print[0].selector, "h1");

    let body = sheet.find_by_selector("body");
    assert_eq!(sheet.media_condition_of(body[0]), None);
}

#[test]
fn chained_imports_resolve_relative_to_the_importer() {
    let dir = tempfile::tempdir().unwrap();
    fs::create_dir(dir.path().join("parts")).unwrap();
    fs::write(dir.path().join("main.css"), "@import \"parts/a.css\";\nbody { color: red }")
        .unwrap();
    fs::write(dir.path().join("parts/a.css"), "@import \"b.css\";\n.a { x: 1 }").unwrap();
    fs::write(dir.path().join("parts/b.css"), ".b { y: 2 }").unwrap();

    let options = ParseOptions::new().imports(ImportPolicy::local());
    let sheet =
        Stylesheet::from_file_with_options(dir.path().join("main.css"), options).unwrap();
    let selectors: Vec<&str> = sheet.rules().map(|r| r.selector.as_str()).collect();
    assert_eq!(selectors, vec![".b", ".a", "body"]);
    assert!(sequential(&sheet));
}

#[test]
fn circular_imports_terminate() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("a.css"), "@import \"a.css\";\n.a { x: 1 }").unwrap();

    let options = ParseOptions::new().imports(ImportPolicy::local());
    let sheet = Stylesheet::from_file_with_options(dir.path().join("a.css"), options).unwrap();
    assert!(sheet.rules().all(|r| r.selector == ".a"));
    assert!(sequential(&sheet));
}

#[test]
fn missing_import_is_dropped_not_fatal() {
    let dir = tempfile::tempdir().unwrap();
    let css = "@import \"nope.css\";\nbody { color: red }";
    let options = ParseOptions::new()
        .imports(ImportPolicy::local())
        .base_dir(dir.path());
    let sheet = Stylesheet::parse_with_options(css, options).unwrap();
    assert_eq!(sheet.len(), 1);
}

#[test]
fn disallowed_scheme_is_dropped() {
    let css = "@import url(https://cdn.example.com/a.css);\nbody { color: red }";
    let options = ParseOptions::new().imports(ImportPolicy::local());
    let sheet = Stylesheet::parse_with_options(css, options).unwrap();
    assert_eq!(sheet.len(), 1);
}

#[test]
fn from_file_errors_on_missing_files() {
    let dir = tempfile::tempdir().unwrap();
    let err = Stylesheet::from_file(dir.path().join("nope.css")).unwrap_err();
    assert!(matches!(err, Error::Io { .. }));
}

#[test]
fn absolute_paths_rewrite_relative_urls() {
    let options = ParseOptions::new()
        .absolute_paths(true)
        .base_uri(Url::parse("https://example.com/site/style.css").unwrap());
    let sheet = Stylesheet::parse_with_options(
        "body { background: url(images/bg.png); mask: url(#clip); cursor: url(data:image/png;base64,AA), auto }",
        options,
    )
    .unwrap();
    let rule = sheet.rules().next().unwrap();
    assert_eq!(
        rule.declarations[0].value(),
        "url(https://example.com/site/images/bg.png)"
    );
    assert_eq!(rule.declarations[1].value(), "url(#clip)");
    assert_eq!(
        rule.declarations[2].value(),
        "url(data:image/png;base64,AA), auto"
    );
}

#[test]
fn color_conversion_is_a_separate_pass() {
    let mut sheet = Stylesheet::parse(".a { color: red; border: 1px solid #00ff00 }").unwrap();

    convert_stylesheet(&mut sheet, ColorNotation::Hex);
    let rule = sheet.rules().next().unwrap();
    assert_eq!(rule.declarations[0].value(), "#ff0000");
    assert_eq!(rule.declarations[1].value(), "1px solid #00ff00");

    convert_stylesheet(&mut sheet, ColorNotation::Rgb);
    let rule = sheet.rules().next().unwrap();
    assert_eq!(rule.declarations[0].value(), "rgb(255, 0, 0)");
    assert_eq!(rule.declarations[1].value(), "1px solid rgb(0, 255, 0)");
}

#[test]
fn oversized_shorthand_is_a_usage_error_not_a_parse_error() {
    let css = format!(".x {{ margin: {} }}", "1px ".repeat(2000));
    let mut sheet = Stylesheet::parse(&css).unwrap();
    let err = sheet.merge().unwrap_err();
    assert!(matches!(err, Error::Usage(_)));
    assert_eq!(err.kind(), None);
}

#[test]
fn selector_entries_are_a_projection_not_a_store() {
    let mut sheet = Stylesheet::parse("#x { color: red }").unwrap();
    let entries = sheet.selector_entries();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].selector, "#x");
    assert_eq!(entries[0].declarations, "color: red");
    assert_eq!(entries[0].specificity, 100);

    sheet.remove_by_selector("#x");
    assert!(sheet.selector_entries().is_empty());
}

#[test]
fn selectors_cache_follows_mutations() {
    let mut sheet = Stylesheet::parse("a { x: 1 } b { y: 2 } a { z: 3 }").unwrap();
    assert_eq!(sheet.selectors(), vec!["a".to_string(), "b".to_string()]);
    sheet.remove_by_selector("a");
    assert_eq!(sheet.selectors(), vec!["b".to_string()]);
}

#[test]
fn dedup_via_rule_equality() {
    let sheet = Stylesheet::parse(
        ".box { margin: 10px }\n.box { margin-top: 10px; margin-right: 10px; margin-bottom: 10px; margin-left: 10px }",
    )
    .unwrap();
    let rules: Vec<&Rule> = sheet.rules().collect();
    assert_eq!(rules.len(), 2);
    let unique: std::collections::HashSet<&Rule> = rules.iter().copied().collect();
    assert_eq!(unique.len(), 1);
}
