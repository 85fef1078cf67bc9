//! Shorthand collapsing: recombine complete longhand sets.
//!
//! Only complete, compatible sets collapse — every component present with
//! the same `!important` flag. Partial sets are left as longhands, so the
//! transformation is lossless.

use super::SIDES;
use crate::rules::Declaration;

/// Collapse longhand runs in a declaration list. Input is expected to hold
/// at most one declaration per property (the expanded, resolved form);
/// declarations not participating in a collapse pass through in order.
pub fn collapse(decls: Vec<Declaration>) -> Vec<Declaration> {
    let mut slots: Vec<Option<Declaration>> = decls.into_iter().map(Some).collect();

    collapse_border(&mut slots);
    collapse_dimensions(&mut slots, "margin", |side| format!("margin-{side}"));
    collapse_dimensions(&mut slots, "padding", |side| format!("padding-{side}"));
    collapse_dimensions(&mut slots, "border-width", |side| format!("border-{side}-width"));
    collapse_dimensions(&mut slots, "border-style", |side| format!("border-{side}-style"));
    collapse_dimensions(&mut slots, "border-color", |side| format!("border-{side}-color"));
    collapse_font(&mut slots);
    collapse_background(&mut slots);
    collapse_list_style(&mut slots);

    slots.into_iter().flatten().collect()
}

fn find(slots: &[Option<Declaration>], property: &str) -> Option<usize> {
    slots
        .iter()
        .position(|slot| slot.as_ref().is_some_and(|d| d.property() == property))
}

/// The shared importance of the given slots, or `None` if it is mixed.
fn uniform_importance(slots: &[Option<Declaration>], idxs: &[usize]) -> Option<bool> {
    let mut flags = idxs
        .iter()
        .filter_map(|&i| slots[i].as_ref().map(Declaration::important));
    let first = flags.next()?;
    if flags.all(|f| f == first) {
        Some(first)
    } else {
        None
    }
}

/// Replace the earliest participating slot with the shorthand and clear
/// the rest.
fn install(slots: &mut [Option<Declaration>], idxs: &[usize], shorthand: Declaration) {
    let earliest = *idxs.iter().min().expect("collapse set is never empty");
    for &idx in idxs {
        slots[idx] = None;
    }
    slots[earliest] = Some(shorthand);
}

/// Reduce top/right/bottom/left values to the shortest 1/2/3/4-value form.
fn minimize_sides(values: [&str; 4]) -> String {
    let mut out: Vec<&str> = values.to_vec();
    if out[3] == out[1] {
        out.pop();
        if out[2] == out[0] {
            out.pop();
            if out[1] == out[0] {
                out.pop();
            }
        }
    }
    out.join(" ")
}

fn collapse_dimensions(
    slots: &mut [Option<Declaration>],
    shorthand: &str,
    longhand: impl Fn(&str) -> String,
) {
    let Some(idxs) = SIDES
        .into_iter()
        .map(|side| find(slots, &longhand(side)))
        .collect::<Option<Vec<_>>>()
    else {
        return;
    };
    let Some(important) = uniform_importance(slots, &idxs) else {
        return;
    };

    let values: Vec<String> = idxs
        .iter()
        .map(|&i| slots[i].as_ref().expect("slot present").value().to_string())
        .collect();
    let value = minimize_sides([
        values[0].as_str(),
        values[1].as_str(),
        values[2].as_str(),
        values[3].as_str(),
    ]);
    install(slots, &idxs, Declaration::new(shorthand, value, important));
}

/// Collapse the full `border` shorthand (uniform across sides, all three
/// components), or failing that, complete per-side `border-<side>` sets.
fn collapse_border(slots: &mut [Option<Declaration>]) {
    let components = ["width", "style", "color"];

    // Full border: all 12 longhands, each component uniform across sides.
    let all: Option<Vec<usize>> = SIDES
        .iter()
        .flat_map(|side| {
            components
                .iter()
                .map(move |comp| format!("border-{side}-{comp}"))
        })
        .map(|prop| find(slots, &prop))
        .collect();
    if let Some(idxs) = all
        && let Some(important) = uniform_importance(slots, &idxs)
    {
        let mut parts = vec![];
        let mut uniform = true;
        for comp in components {
            let values: Vec<&str> = SIDES
                .iter()
                .map(|side| {
                    let idx = find(slots, &format!("border-{side}-{comp}")).expect("checked");
                    slots[idx].as_ref().expect("slot present").value()
                })
                .collect();
            if values.iter().any(|v| *v != values[0]) {
                uniform = false;
                break;
            }
            parts.push(values[0].to_string());
        }
        if uniform {
            let value = parts.join(" ");
            install(slots, &idxs, Declaration::new("border", value, important));
            return;
        }
    }

    // Per-side shorthands for sides that carry all three components.
    for side in SIDES {
        let idxs: Option<Vec<usize>> = components
            .iter()
            .map(|comp| find(slots, &format!("border-{side}-{comp}")))
            .collect();
        if let Some(idxs) = idxs
            && let Some(important) = uniform_importance(slots, &idxs)
        {
            let value = idxs
                .iter()
                .map(|&i| slots[i].as_ref().expect("slot present").value().to_string())
                .collect::<Vec<_>>()
                .join(" ");
            install(
                slots,
                &idxs,
                Declaration::new(format!("border-{side}"), value, important),
            );
        }
    }
}

/// Collapse `font` when at least the mandatory size and family are
/// present.
fn collapse_font(slots: &mut [Option<Declaration>]) {
    let Some(size_idx) = find(slots, "font-size") else {
        return;
    };
    let Some(family_idx) = find(slots, "font-family") else {
        return;
    };

    let mut idxs = vec![size_idx, family_idx];
    let style = find(slots, "font-style");
    let variant = find(slots, "font-variant");
    let weight = find(slots, "font-weight");
    let line_height = find(slots, "line-height");
    idxs.extend([style, variant, weight, line_height].into_iter().flatten());

    let Some(important) = uniform_importance(slots, &idxs) else {
        return;
    };

    let value_at = |idx: usize, slots: &[Option<Declaration>]| {
        slots[idx].as_ref().expect("slot present").value().to_string()
    };

    let mut parts = vec![];
    for idx in [style, variant, weight].into_iter().flatten() {
        parts.push(value_at(idx, slots));
    }
    let size = value_at(size_idx, slots);
    match line_height {
        Some(lh) => parts.push(format!("{size}/{}", value_at(lh, slots))),
        None => parts.push(size),
    }
    parts.push(value_at(family_idx, slots));

    install(
        slots,
        &idxs,
        Declaration::new("font", parts.join(" "), important),
    );
}

/// Collapse `background` when two or more components are present. A size
/// without a position cannot be expressed in the shorthand and is left as
/// a longhand.
fn collapse_background(slots: &mut [Option<Declaration>]) {
    let color = find(slots, "background-color");
    let image = find(slots, "background-image");
    let repeat = find(slots, "background-repeat");
    let position = find(slots, "background-position");
    let size = find(slots, "background-size").filter(|_| position.is_some());
    let attachment = find(slots, "background-attachment");

    let idxs: Vec<usize> = [color, image, repeat, position, size, attachment]
        .into_iter()
        .flatten()
        .collect();
    if idxs.len() < 2 {
        return;
    }
    let Some(important) = uniform_importance(slots, &idxs) else {
        return;
    };

    let value_at = |idx: usize, slots: &[Option<Declaration>]| {
        slots[idx].as_ref().expect("slot present").value().to_string()
    };

    let mut parts = vec![];
    for idx in [color, image, repeat].into_iter().flatten() {
        parts.push(value_at(idx, slots));
    }
    if let Some(pos) = position {
        match size {
            Some(sz) => parts.push(format!(
                "{} / {}",
                value_at(pos, slots),
                value_at(sz, slots)
            )),
            None => parts.push(value_at(pos, slots)),
        }
    }
    if let Some(att) = attachment {
        parts.push(value_at(att, slots));
    }

    install(
        slots,
        &idxs,
        Declaration::new("background", parts.join(" "), important),
    );
}

/// Collapse `list-style` when two or more components are present.
fn collapse_list_style(slots: &mut [Option<Declaration>]) {
    let ty = find(slots, "list-style-type");
    let position = find(slots, "list-style-position");
    let image = find(slots, "list-style-image");

    let idxs: Vec<usize> = [ty, position, image].into_iter().flatten().collect();
    if idxs.len() < 2 {
        return;
    }
    let Some(important) = uniform_importance(slots, &idxs) else {
        return;
    };

    let value = idxs
        .iter()
        .map(|&i| slots[i].as_ref().expect("slot present").value().to_string())
        .collect::<Vec<_>>()
        .join(" ");
    install(
        slots,
        &idxs,
        Declaration::new("list-style", value, important),
    );
}

#[cfg(test)]
mod tests {
    use super::super::expand;
    use super::*;

    fn decl(property: &str, value: &str) -> Declaration {
        Declaration::new(property, value, false)
    }

    fn decl_important(property: &str, value: &str) -> Declaration {
        Declaration::new(property, value, true)
    }

    fn rendered(decls: &[Declaration]) -> Vec<String> {
        decls.iter().map(Declaration::to_string).collect()
    }

    #[test]
    fn four_equal_sides_minimize_to_one() {
        let out = collapse(vec![
            decl("margin-top", "10px"),
            decl("margin-right", "10px"),
            decl("margin-bottom", "10px"),
            decl("margin-left", "10px"),
        ]);
        assert_eq!(rendered(&out), vec!["margin: 10px"]);
    }

    #[test]
    fn vertical_horizontal_minimize_to_two() {
        let out = collapse(vec![
            decl("margin-top", "1px"),
            decl("margin-right", "2px"),
            decl("margin-bottom", "1px"),
            decl("margin-left", "2px"),
        ]);
        assert_eq!(rendered(&out), vec!["margin: 1px 2px"]);
    }

    #[test]
    fn partial_set_stays_longhand() {
        let out = collapse(vec![
            decl("margin-top", "1px"),
            decl("margin-right", "2px"),
        ]);
        assert_eq!(out.len(), 2);
        assert_eq!(out[0].property(), "margin-top");
    }

    #[test]
    fn mixed_importance_stays_longhand() {
        let out = collapse(vec![
            decl("margin-top", "1px"),
            decl("margin-right", "1px"),
            decl("margin-bottom", "1px"),
            decl_important("margin-left", "1px"),
        ]);
        assert_eq!(out.len(), 4);
    }

    #[test]
    fn uniform_importance_is_carried() {
        let out = collapse(vec![
            decl_important("margin-top", "1px"),
            decl_important("margin-right", "1px"),
            decl_important("margin-bottom", "1px"),
            decl_important("margin-left", "1px"),
        ]);
        assert_eq!(rendered(&out), vec!["margin: 1px !important"]);
    }

    #[test]
    fn border_round_trip() {
        let expanded = expand("border", "1px solid red", false).unwrap().unwrap();
        let out = collapse(expanded);
        assert_eq!(rendered(&out), vec!["border: 1px solid red"]);
    }

    #[test]
    fn border_with_per_side_colors_collapses_per_side() {
        let mut decls = expand("border", "1px solid", false).unwrap().unwrap();
        decls.push(decl("border-top-color", "red"));
        decls.push(decl("border-right-color", "blue"));
        decls.push(decl("border-bottom-color", "red"));
        decls.push(decl("border-left-color", "blue"));
        let out = collapse(decls);
        let props: Vec<&str> = out.iter().map(Declaration::property).collect();
        assert!(props.contains(&"border-top"));
        assert!(props.contains(&"border-left"));
        assert!(!props.contains(&"border"));
    }

    #[test]
    fn font_round_trip() {
        let expanded = expand("font", "italic bold 12px/1.5 Arial, sans-serif", false)
            .unwrap()
            .unwrap();
        let out = collapse(expanded);
        assert_eq!(
            rendered(&out),
            vec!["font: italic bold 12px/1.5 Arial, sans-serif"]
        );
    }

    #[test]
    fn background_round_trip() {
        let expanded = expand("background", "#fff url(bg.png) no-repeat", false)
            .unwrap()
            .unwrap();
        let out = collapse(expanded);
        assert_eq!(rendered(&out), vec!["background: #fff url(bg.png) no-repeat"]);
    }

    #[test]
    fn lone_background_component_stays_longhand() {
        let out = collapse(vec![decl("background-color", "red")]);
        assert_eq!(rendered(&out), vec!["background-color: red"]);
    }

    #[test]
    fn unrelated_declarations_keep_their_order() {
        let out = collapse(vec![
            decl("color", "red"),
            decl("margin-top", "1px"),
            decl("margin-right", "1px"),
            decl("margin-bottom", "1px"),
            decl("margin-left", "1px"),
            decl("display", "block"),
        ]);
        assert_eq!(
            rendered(&out),
            vec!["color: red", "margin: 1px", "display: block"]
        );
    }
}
