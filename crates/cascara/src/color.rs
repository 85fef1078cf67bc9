//! Color notation rewriting.
//!
//! A post-parse value transform: recognized color tokens (hex, rgb/rgba,
//! hsl/hsla, hwb, lab/lch, oklab/oklch, named) are reformatted into the
//! requested notation; anything unrecognized is left untouched. This pass
//! never runs during tokenization.

use csscolorparser::Color;

use crate::rules::Stylesheet;
use crate::shorthand::split_value_spans;

/// Target notation for color rewriting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColorNotation {
    /// `#rrggbb`, with an alpha byte appended when alpha < 1.
    Hex,
    /// `rgb(r, g, b)` / `rgba(r, g, b, a)`.
    Rgb,
    /// `hsl(h, s%, l%)` / `hsla(h, s%, l%, a)`.
    Hsl,
}

/// Rewrite every recognized color token in a value. Returns `None` when
/// nothing changed.
pub fn convert_value(value: &str, target: ColorNotation) -> Option<String> {
    let mut out = String::with_capacity(value.len());
    let mut cursor = 0;
    let mut changed = false;

    for (start, end) in split_value_spans(value) {
        out.push_str(&value[cursor..start]);
        let token = &value[start..end];
        match convert_token(token, target) {
            Some(converted) if converted != token => {
                out.push_str(&converted);
                changed = true;
            }
            _ => out.push_str(token),
        }
        cursor = end;
    }
    out.push_str(&value[cursor..]);

    changed.then_some(out)
}

/// Rewrite every recognized color token in every declaration value of the
/// stylesheet (rule bodies, at-rule descriptor bodies, and keyframe steps).
pub fn convert_stylesheet(sheet: &mut Stylesheet, target: ColorNotation) {
    sheet.rewrite_values(|value| convert_value(value, target));
}

fn convert_token(token: &str, target: ColorNotation) -> Option<String> {
    let color = csscolorparser::parse(token).ok()?;
    Some(format_color(&color, target))
}

fn format_color(color: &Color, target: ColorNotation) -> String {
    let [r, g, b, a] = color.to_rgba8();
    match target {
        ColorNotation::Hex => color.to_hex_string(),
        ColorNotation::Rgb => {
            if a == 255 {
                format!("rgb({r}, {g}, {b})")
            } else {
                format!("rgba({r}, {g}, {b}, {})", format_alpha(color.a))
            }
        }
        ColorNotation::Hsl => {
            let (h, s, l) = rgb_to_hsl(color.r, color.g, color.b);
            if a == 255 {
                format!("hsl({h}, {s}%, {l}%)")
            } else {
                format!("hsla({h}, {s}%, {l}%, {})", format_alpha(color.a))
            }
        }
    }
}

/// Alpha rendered to at most three decimals, trailing zeros trimmed.
fn format_alpha(alpha: f64) -> String {
    let text = format!("{:.3}", alpha.clamp(0.0, 1.0));
    let text = text.trim_end_matches('0').trim_end_matches('.');
    if text.is_empty() {
        "0".to_string()
    } else {
        text.to_string()
    }
}

/// Hue in degrees, saturation and lightness as rounded percentages.
fn rgb_to_hsl(r: f64, g: f64, b: f64) -> (u32, u32, u32) {
    let max = r.max(g).max(b);
    let min = r.min(g).min(b);
    let delta = max - min;
    let lightness = (max + min) / 2.0;

    let (hue, saturation) = if delta == 0.0 {
        (0.0, 0.0)
    } else {
        let saturation = delta / (1.0 - (2.0 * lightness - 1.0).abs());
        let hue = if max == r {
            60.0 * (((g - b) / delta).rem_euclid(6.0))
        } else if max == g {
            60.0 * ((b - r) / delta + 2.0)
        } else {
            60.0 * ((r - g) / delta + 4.0)
        };
        (hue, saturation)
    };

    (
        hue.round().rem_euclid(360.0) as u32,
        (saturation * 100.0).round() as u32,
        (lightness * 100.0).round() as u32,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn named_to_hex() {
        assert_eq!(convert_value("red", ColorNotation::Hex).unwrap(), "#ff0000");
    }

    #[test]
    fn hex_to_rgb() {
        assert_eq!(
            convert_value("#ff0000", ColorNotation::Rgb).unwrap(),
            "rgb(255, 0, 0)"
        );
    }

    #[test]
    fn rgba_alpha_is_trimmed() {
        // Already in target form: nothing changes.
        assert_eq!(convert_value("rgba(255, 0, 0, 0.5)", ColorNotation::Rgb), None);
        let converted = convert_value("#ff000080", ColorNotation::Rgb).unwrap();
        assert_eq!(converted, "rgba(255, 0, 0, 0.502)");
    }

    #[test]
    fn hex_to_hsl() {
        assert_eq!(
            convert_value("#ff0000", ColorNotation::Hsl).unwrap(),
            "hsl(0, 100%, 50%)"
        );
        assert_eq!(
            convert_value("#00ff00", ColorNotation::Hsl).unwrap(),
            "hsl(120, 100%, 50%)"
        );
    }

    #[test]
    fn only_color_tokens_change() {
        assert_eq!(
            convert_value("1px solid red", ColorNotation::Hex).unwrap(),
            "1px solid #ff0000"
        );
        assert_eq!(convert_value("1px solid", ColorNotation::Hex), None);
    }

    #[test]
    fn unrecognized_values_are_untouched() {
        assert_eq!(convert_value("inherit", ColorNotation::Hex), None);
        assert_eq!(convert_value("url(red.png)", ColorNotation::Hex), None);
    }

    #[test]
    fn spacing_between_tokens_is_preserved() {
        assert_eq!(
            convert_value("red   blue", ColorNotation::Hex).unwrap(),
            "#ff0000   #0000ff"
        );
    }
}
