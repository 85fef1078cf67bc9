//! Shorthand property expansion and collapsing.
//!
//! Expansion rewrites a shorthand declaration (`margin: 10px 20px`) into
//! its longhand components, each inheriting the original `!important`
//! flag. Collapsing is the inverse and lives in [`collapse`].
//!
//! Values are split on top-level whitespace only: parentheses, brackets,
//! and strings are opaque, so `calc(100% - 20px)` is one token.

mod collapse;

pub use collapse::collapse;

use crate::error::Error;
use crate::rules::Declaration;

/// Upper bound on a shorthand value before expansion refuses to split it.
/// Oversized values are a usage error, not a parse error.
pub const MAX_VALUE_LENGTH: usize = 4096;

pub(crate) const SIDES: [&str; 4] = ["top", "right", "bottom", "left"];

const BORDER_STYLES: [&str; 10] = [
    "none", "hidden", "dotted", "dashed", "solid", "double", "groove", "ridge", "inset", "outset",
];

const REPEAT_KEYWORDS: [&str; 6] = ["repeat", "repeat-x", "repeat-y", "no-repeat", "space", "round"];

const ATTACHMENT_KEYWORDS: [&str; 3] = ["fixed", "scroll", "local"];

const POSITION_KEYWORDS: [&str; 5] = ["left", "right", "top", "bottom", "center"];

const FONT_SIZE_KEYWORDS: [&str; 9] = [
    "xx-small", "x-small", "small", "medium", "large", "x-large", "xx-large", "smaller", "larger",
];

const WIDE_KEYWORDS: [&str; 4] = ["inherit", "initial", "unset", "revert"];

/// Whether this property is a shorthand the engine can expand.
pub fn is_shorthand(property: &str) -> bool {
    matches!(
        property,
        "margin"
            | "padding"
            | "border"
            | "border-top"
            | "border-right"
            | "border-bottom"
            | "border-left"
            | "border-width"
            | "border-style"
            | "border-color"
            | "background"
            | "font"
            | "list-style"
    )
}

/// Expand a shorthand into longhand declarations.
///
/// Returns `Ok(None)` when the property is not a shorthand or the value
/// does not fit the shorthand grammar (the declaration passes through
/// untouched). Oversized values fail with [`Error::Usage`].
pub fn expand(
    property: &str,
    value: &str,
    important: bool,
) -> crate::Result<Option<Vec<Declaration>>> {
    let property = property.to_ascii_lowercase();
    if !is_shorthand(&property) {
        return Ok(None);
    }
    if value.len() > MAX_VALUE_LENGTH {
        return Err(Error::usage(format!(
            "value for '{property}' exceeds {MAX_VALUE_LENGTH} bytes and cannot be expanded"
        )));
    }
    Ok(expand_value(&property, value, important))
}

/// Expansion core, without the input-size guard. Used internally where
/// failure is not an option (equality, hashing).
pub(crate) fn expand_value(
    property: &str,
    value: &str,
    important: bool,
) -> Option<Vec<Declaration>> {
    let value = value.trim();
    match property {
        "margin" | "padding" => {
            expand_dimensions(value, important, |side| format!("{property}-{side}"))
        }
        "border-width" | "border-style" | "border-color" => {
            let suffix = &property["border".len()..]; // "-width" etc.
            expand_dimensions(value, important, |side| format!("border-{side}{suffix}"))
        }
        "border" => expand_border(value, important, &SIDES),
        "border-top" | "border-right" | "border-bottom" | "border-left" => {
            let side = &property["border-".len()..];
            expand_border(value, important, &[side])
        }
        "background" => expand_background(value, important),
        "font" => expand_font(value, important),
        "list-style" => expand_list_style(value, important),
        _ => None,
    }
}

/// The 1/2/3/4-value expansion rule shared by margin, padding, and the
/// per-side border properties.
fn expand_dimensions(
    value: &str,
    important: bool,
    longhand: impl Fn(&str) -> String,
) -> Option<Vec<Declaration>> {
    let tokens = split_value_tokens(value);
    let sides: [usize; 4] = match tokens.len() {
        1 => [0, 0, 0, 0],
        2 => [0, 1, 0, 1],
        3 => [0, 1, 2, 1],
        4 => [0, 1, 2, 3],
        _ => return None,
    };
    Some(
        SIDES
            .into_iter()
            .zip(sides)
            .map(|(side, idx)| Declaration::new(longhand(side), tokens[idx].clone(), important))
            .collect(),
    )
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BorderComponent {
    Width,
    Style,
    Color,
}

impl BorderComponent {
    fn suffix(&self) -> &'static str {
        match self {
            Self::Width => "width",
            Self::Style => "style",
            Self::Color => "color",
        }
    }
}

fn classify_border_token(token: &str) -> BorderComponent {
    let lower = token.to_ascii_lowercase();
    if BORDER_STYLES.contains(&lower.as_str()) {
        BorderComponent::Style
    } else if lower == "thin"
        || lower == "medium"
        || lower == "thick"
        || lower.starts_with("calc(")
        || lower.starts_with(|c: char| c.is_ascii_digit() || c == '.')
    {
        BorderComponent::Width
    } else {
        BorderComponent::Color
    }
}

/// Expand `border` (all four sides) or `border-<side>` (one side) into
/// width/style/color longhands for each of its up to three components.
fn expand_border(value: &str, important: bool, sides: &[&str]) -> Option<Vec<Declaration>> {
    let tokens = split_value_tokens(value);
    if tokens.is_empty() || tokens.len() > 3 {
        return None;
    }

    let mut width = None;
    let mut style = None;
    let mut color = None;
    for token in &tokens {
        match classify_border_token(token) {
            BorderComponent::Width => width.get_or_insert_with(|| token.clone()),
            BorderComponent::Style => style.get_or_insert_with(|| token.clone()),
            BorderComponent::Color => color.get_or_insert_with(|| token.clone()),
        };
    }

    let mut out = vec![];
    for (component, value) in [
        (BorderComponent::Width, width),
        (BorderComponent::Style, style),
        (BorderComponent::Color, color),
    ] {
        if let Some(value) = value {
            for side in sides {
                out.push(Declaration::new(
                    format!("border-{side}-{}", component.suffix()),
                    value.clone(),
                    important,
                ));
            }
        }
    }
    if out.is_empty() { None } else { Some(out) }
}

fn is_color_token(token: &str) -> bool {
    let lower = token.to_ascii_lowercase();
    lower.starts_with('#')
        || lower.starts_with("rgb(")
        || lower.starts_with("rgba(")
        || lower.starts_with("hsl(")
        || lower.starts_with("hsla(")
        || lower.starts_with("hwb(")
        || lower.starts_with("lab(")
        || lower.starts_with("lch(")
        || lower.starts_with("oklab(")
        || lower.starts_with("oklch(")
        || csscolorparser::parse(&lower).is_ok()
}

fn is_image_token(token: &str) -> bool {
    let lower = token.to_ascii_lowercase();
    lower.starts_with("url(") || lower.contains("gradient(")
}

fn is_position_token(token: &str) -> bool {
    let lower = token.to_ascii_lowercase();
    POSITION_KEYWORDS.contains(&lower.as_str())
        || lower.starts_with(|c: char| c.is_ascii_digit() || c == '.' || c == '-')
        || lower.starts_with("calc(")
}

/// Expand `background` by recognizing token shapes.
fn expand_background(value: &str, important: bool) -> Option<Vec<Declaration>> {
    if WIDE_KEYWORDS.contains(&value.to_ascii_lowercase().as_str()) {
        return Some(
            ["color", "image", "repeat", "position", "attachment"]
                .iter()
                .map(|part| Declaration::new(format!("background-{part}"), value, important))
                .collect(),
        );
    }

    let mut color = None;
    let mut image = None;
    let mut repeat: Vec<String> = vec![];
    let mut position: Vec<String> = vec![];
    let mut size: Vec<String> = vec![];
    let mut attachment = None;
    let mut after_slash = false;

    for token in split_value_tokens(value) {
        // A `/` separates position from size; it may be glued to its
        // neighbors (`center/cover`).
        for (piece_idx, piece) in split_slash(&token).into_iter().enumerate() {
            if piece_idx > 0 {
                after_slash = true;
            }
            if piece.is_empty() {
                continue;
            }
            let lower = piece.to_ascii_lowercase();
            if piece == "/" {
                after_slash = true;
            } else if lower == "none" || is_image_token(&piece) {
                image.get_or_insert(piece);
            } else if REPEAT_KEYWORDS.contains(&lower.as_str()) {
                repeat.push(piece);
            } else if ATTACHMENT_KEYWORDS.contains(&lower.as_str()) {
                attachment.get_or_insert(piece);
            } else if after_slash {
                size.push(piece);
            } else if is_position_token(&piece) {
                position.push(piece);
            } else if is_color_token(&piece) {
                color.get_or_insert(piece);
            }
        }
    }

    let mut out = vec![];
    if let Some(color) = color {
        out.push(Declaration::new("background-color", color, important));
    }
    if let Some(image) = image {
        out.push(Declaration::new("background-image", image, important));
    }
    if !repeat.is_empty() {
        out.push(Declaration::new("background-repeat", repeat.join(" "), important));
    }
    if !position.is_empty() {
        out.push(Declaration::new("background-position", position.join(" "), important));
    }
    if !size.is_empty() {
        out.push(Declaration::new("background-size", size.join(" "), important));
    }
    if let Some(attachment) = attachment {
        out.push(Declaration::new("background-attachment", attachment, important));
    }
    if out.is_empty() { None } else { Some(out) }
}

fn is_font_size_token(token: &str) -> bool {
    let lower = token.to_ascii_lowercase();
    let head = lower.split('/').next().unwrap_or("");
    FONT_SIZE_KEYWORDS.contains(&head)
        || head.starts_with(|c: char| c.is_ascii_digit() || c == '.')
        || head.starts_with("calc(")
}

/// Expand `font`: optional style/variant/weight tokens, then the mandatory
/// `size[/line-height]`, then the family list verbatim.
fn expand_font(value: &str, important: bool) -> Option<Vec<Declaration>> {
    let spans = split_value_spans(value);
    let size_idx = spans
        .iter()
        .position(|&(start, end)| is_font_size_token(&value[start..end]))?;

    let mut out = vec![];
    for &(start, end) in &spans[..size_idx] {
        let token = &value[start..end];
        let lower = token.to_ascii_lowercase();
        match lower.as_str() {
            "italic" | "oblique" => {
                out.push(Declaration::new("font-style", token, important));
            }
            "small-caps" => {
                out.push(Declaration::new("font-variant", token, important));
            }
            "bold" | "bolder" | "lighter" => {
                out.push(Declaration::new("font-weight", token, important));
            }
            _ if lower.chars().all(|c| c.is_ascii_digit()) => {
                out.push(Declaration::new("font-weight", token, important));
            }
            // `normal` is the default for style/variant/weight alike.
            "normal" => {}
            _ => return None,
        }
    }

    let (size_start, size_end) = spans[size_idx];
    let size_token = &value[size_start..size_end];
    match size_token.split_once('/') {
        Some((size, line_height)) => {
            out.push(Declaration::new("font-size", size, important));
            out.push(Declaration::new("line-height", line_height, important));
        }
        None => out.push(Declaration::new("font-size", size_token, important)),
    }

    // Everything after the size token is the family list, kept verbatim
    // (family names may contain commas and quotes).
    let family = value[size_end..].trim();
    if family.is_empty() {
        return None;
    }
    out.push(Declaration::new("font-family", family, important));
    Some(out)
}

/// Expand `list-style` into type/position/image.
fn expand_list_style(value: &str, important: bool) -> Option<Vec<Declaration>> {
    let mut ty = None;
    let mut position = None;
    let mut image = None;

    for token in split_value_tokens(value) {
        let lower = token.to_ascii_lowercase();
        if lower.starts_with("url(") {
            image.get_or_insert(token);
        } else if lower == "inside" || lower == "outside" {
            position.get_or_insert(token);
        } else {
            ty.get_or_insert(token);
        }
    }

    let mut out = vec![];
    if let Some(ty) = ty {
        out.push(Declaration::new("list-style-type", ty, important));
    }
    if let Some(position) = position {
        out.push(Declaration::new("list-style-position", position, important));
    }
    if let Some(image) = image {
        out.push(Declaration::new("list-style-image", image, important));
    }
    if out.is_empty() { None } else { Some(out) }
}

/// Split a value on top-level whitespace. Parentheses, brackets, and
/// strings are opaque, so function calls and quoted names hold together.
pub(crate) fn split_value_tokens(value: &str) -> Vec<String> {
    split_value_spans(value)
        .into_iter()
        .map(|(start, end)| value[start..end].to_string())
        .collect()
}

/// Byte spans of the top-level whitespace-separated tokens.
pub(crate) fn split_value_spans(value: &str) -> Vec<(usize, usize)> {
    let mut spans = vec![];
    let mut depth = 0usize;
    let mut quote: Option<char> = None;
    let mut escaped = false;
    let mut start: Option<usize> = None;

    for (idx, ch) in value.char_indices() {
        if escaped {
            escaped = false;
            continue;
        }
        match quote {
            Some(q) => match ch {
                '\\' => escaped = true,
                c if c == q => quote = None,
                _ => {}
            },
            None => match ch {
                '"' | '\'' => {
                    quote = Some(ch);
                    start.get_or_insert(idx);
                }
                '(' | '[' => {
                    depth += 1;
                    start.get_or_insert(idx);
                }
                ')' | ']' => {
                    depth = depth.saturating_sub(1);
                    start.get_or_insert(idx);
                }
                c if c.is_whitespace() && depth == 0 => {
                    if let Some(s) = start.take() {
                        spans.push((s, idx));
                    }
                }
                _ => {
                    start.get_or_insert(idx);
                }
            },
        }
    }
    if let Some(s) = start {
        spans.push((s, value.len()));
    }
    spans
}

/// Split a token on top-level `/` (outside parentheses), keeping the `/`
/// out of the pieces.
fn split_slash(token: &str) -> Vec<String> {
    if token == "/" {
        return vec!["/".to_string()];
    }
    let mut pieces = vec![];
    let mut depth = 0usize;
    let mut current = String::new();
    for ch in token.chars() {
        match ch {
            '(' => {
                depth += 1;
                current.push(ch);
            }
            ')' => {
                depth = depth.saturating_sub(1);
                current.push(ch);
            }
            '/' if depth == 0 => {
                pieces.push(std::mem::take(&mut current));
            }
            _ => current.push(ch),
        }
    }
    pieces.push(current);
    pieces
}
