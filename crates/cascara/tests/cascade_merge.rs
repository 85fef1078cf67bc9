//! Cascade semantics across rules: specificity, importance, source order,
//! and shorthand interplay.

use std::collections::HashSet;

use cascara::merge::{merge, merge_by_selector};
use cascara::prelude::*;

fn rules_of(css: &str) -> Vec<Rule> {
    Stylesheet::parse(css).unwrap().rules().cloned().collect()
}

fn the_only(decls: &[Declaration]) -> &Declaration {
    assert_eq!(decls.len(), 1, "expected exactly one declaration");
    &decls[0]
}

#[test]
fn later_rule_wins_at_equal_specificity() {
    let decls = merge(&rules_of(".t{color:black} .t{color:red}")).unwrap();
    assert_eq!(the_only(&decls).to_string(), "color: red");
}

#[test]
fn higher_specificity_wins() {
    let decls = merge(&rules_of(".t{color:black} #t{color:red}")).unwrap();
    assert_eq!(the_only(&decls).to_string(), "color: red");
}

#[test]
fn important_beats_higher_specificity() {
    let decls = merge(&rules_of(".t{color:black!important} #t{color:red}")).unwrap();
    assert_eq!(the_only(&decls).to_string(), "color: black !important");
}

#[test]
fn later_important_wins_between_importants() {
    let decls = merge(&rules_of(".t{color:red!important} .t{color:black!important}")).unwrap();
    assert_eq!(the_only(&decls).to_string(), "color: black !important");
}

#[test]
fn specificity_scores_match_the_model() {
    let sheet = Stylesheet::parse(".t { } #t { } div p { } * { } a:hover { } a[href] { }").unwrap();
    let scores: Vec<u32> = sheet.rules().map(|r| r.specificity).collect();
    assert_eq!(scores, vec![10, 100, 2, 0, 11, 11]);
}

#[test]
fn shorthand_rule_equals_expanded_longhands() {
    let short = rules_of(".box { margin: 10px }");
    let long = rules_of(
        ".box { margin-top: 10px; margin-right: 10px; margin-bottom: 10px; margin-left: 10px }",
    );
    assert_eq!(short[0], long[0]);

    // Hash agrees with equality, so either form finds the other in a set.
    let mut set = HashSet::new();
    set.insert(short[0].clone());
    assert!(set.contains(&long[0]));
    assert_eq!(set.len(), 1);
}

#[test]
fn longhand_layered_over_shorthand_overrides_one_side() {
    let mut sheet = Stylesheet::parse(".x { margin: 10px; margin-top: 20px }").unwrap();
    sheet.merge().unwrap();
    assert_eq!(sheet.to_css(), ".x { margin: 20px 10px 10px; }\n");
}

#[test]
fn shorthand_after_longhand_resets_the_side() {
    let mut sheet = Stylesheet::parse(".x { margin-top: 20px; margin: 10px }").unwrap();
    sheet.merge().unwrap();
    assert_eq!(sheet.to_css(), ".x { margin: 10px; }\n");
}

#[test]
fn background_longhand_merges_into_expanded_shorthand() {
    let decls = merge(&rules_of(
        ".t{background:#fff url(a.png)} .t{background-color:#000}",
    ))
    .unwrap();
    assert_eq!(the_only(&decls).to_string(), "background: #000 url(a.png)");
}

#[test]
fn property_names_compare_case_insensitively() {
    let decls = merge(&rules_of(".t{COLOR:black} .t{color:red}")).unwrap();
    assert_eq!(the_only(&decls).to_string(), "color: red");
}

#[test]
fn merge_by_selector_keeps_distinct_selectors_apart() {
    let merged = merge_by_selector(&rules_of(
        "h1 { color: red } h2 { color: blue } h1 { margin: 0 }",
    ))
    .unwrap();
    assert_eq!(merged.len(), 2);
    assert_eq!(merged[0].selector, "h1");
    assert_eq!(merged[0].id, 0);
    assert_eq!(merged[1].selector, "h2");
    assert_eq!(merged[1].id, 1);

    let h1_props: Vec<&str> = merged[0]
        .declarations
        .iter()
        .map(Declaration::property)
        .collect();
    assert!(h1_props.contains(&"color"));
    assert!(h1_props.contains(&"margin"));
}

#[test]
fn document_merge_dedups_duplicate_selectors() {
    let mut sheet = Stylesheet::parse(".t { color: black } .t { color: red }").unwrap();
    sheet.merge().unwrap();
    assert_eq!(sheet.len(), 1);
    assert_eq!(sheet.to_css(), ".t { color: red; }\n");
}

#[test]
fn document_merge_respects_media_boundaries() {
    let mut sheet =
        Stylesheet::parse("a { color: red } @media print { a { color: blue } }").unwrap();
    sheet.merge().unwrap();
    assert_eq!(sheet.rules().count(), 2);
    assert_eq!(
        sheet.to_css(),
        "a { color: red; }\n@media print {\n  a { color: blue; }\n}\n"
    );
}

#[test]
fn document_merge_keeps_at_rules() {
    let mut sheet = Stylesheet::parse(
        "@font-face { font-family: X; src: url(x.woff2) } .t { color: black } .t { color: red }",
    )
    .unwrap();
    sheet.merge().unwrap();
    assert_eq!(sheet.at_rules().count(), 1);
    assert_eq!(sheet.rules().count(), 1);
    let ids: Vec<usize> = sheet.entries().iter().map(|e| e.id()).collect();
    assert_eq!(ids, vec![0, 1]);
}

#[test]
fn merged_declaration_order_is_first_seen() {
    let decls = merge(&rules_of(
        ".t { color: red; font-size: 10px } .t { font-size: 12px; display: block }",
    ))
    .unwrap();
    let props: Vec<&str> = decls.iter().map(Declaration::property).collect();
    assert_eq!(props, vec!["color", "font-size", "display"]);
    assert_eq!(decls[1].value(), "12px");
}

#[test]
fn important_longhand_survives_later_shorthand() {
    let decls = merge(&rules_of(
        ".t { margin-top: 5px !important } .t { margin: 10px }",
    ))
    .unwrap();
    let top = decls
        .iter()
        .find(|d| d.property() == "margin-top")
        .expect("margin-top kept as a longhand");
    assert_eq!(top.value(), "5px");
    assert!(top.important());
}
