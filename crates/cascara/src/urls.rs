//! `url(...)` rewriting inside declaration values.
//!
//! When absolute-path conversion is enabled, relative URLs inside values
//! are joined against the base URI. `data:` URLs, fragment references, and
//! already-absolute URLs pass through untouched, and a failed join leaves
//! the original text in place — a value is never corrupted.

use url::Url;

/// Rewrite every rewritable `url(...)` occurrence in a value.
pub fn rewrite_urls(value: &str, base: &Url) -> String {
    let mut out = String::with_capacity(value.len());
    let chars: Vec<(usize, char)> = value.char_indices().collect();
    let mut i = 0;
    let mut quote: Option<char> = None;
    let mut prev: Option<char> = None;

    while i < chars.len() {
        let (pos, ch) = chars[i];

        if let Some(q) = quote {
            out.push(ch);
            if ch == '\\' {
                if let Some(&(_, escaped)) = chars.get(i + 1) {
                    out.push(escaped);
                    i += 1;
                }
            } else if ch == q {
                quote = None;
            }
            prev = Some(ch);
            i += 1;
            continue;
        }

        if ch == '"' || ch == '\'' {
            quote = Some(ch);
            out.push(ch);
            prev = Some(ch);
            i += 1;
            continue;
        }

        let at_url = value[pos..].len() >= 4
            && value.as_bytes()[pos..pos + 4].eq_ignore_ascii_case(b"url(")
            && !prev.is_some_and(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
        if at_url && let Some(close) = value[pos + 4..].find(')') {
            let inner = &value[pos + 4..pos + 4 + close];
            out.push_str(&rewrite_one(inner, base));
            let end = pos + 4 + close + 1;
            while i < chars.len() && chars[i].0 < end {
                i += 1;
            }
            prev = Some(')');
            continue;
        }

        out.push(ch);
        prev = Some(ch);
        i += 1;
    }

    out
}

/// Rewrite the inside of one `url(...)`, preserving the quoting style.
fn rewrite_one(inner: &str, base: &Url) -> String {
    let trimmed = inner.trim();
    let (quote, target) = match trimmed.chars().next() {
        Some(q @ ('"' | '\'')) => match trimmed.strip_prefix(q).and_then(|s| s.strip_suffix(q)) {
            Some(stripped) => (Some(q), stripped),
            None => return format!("url({inner})"),
        },
        _ => (None, trimmed),
    };

    if !is_rewritable(target) {
        return format!("url({inner})");
    }

    match base.join(target) {
        Ok(absolute) => match quote {
            Some(q) => format!("url({q}{absolute}{q})"),
            None => format!("url({absolute})"),
        },
        Err(_) => format!("url({inner})"),
    }
}

fn is_rewritable(target: &str) -> bool {
    if target.is_empty() || target.starts_with('#') {
        return false;
    }
    if target.len() >= 5 && target[..5].eq_ignore_ascii_case("data:") {
        return false;
    }
    // A target that parses on its own already has a scheme.
    Url::parse(target).is_err()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base() -> Url {
        Url::parse("https://example.com/css/main.css").unwrap()
    }

    #[test]
    fn relative_url_is_absolutized() {
        assert_eq!(
            rewrite_urls("url(../img/bg.png)", &base()),
            "url(https://example.com/img/bg.png)"
        );
    }

    #[test]
    fn quoting_style_is_preserved() {
        assert_eq!(
            rewrite_urls("url(\"bg.png\")", &base()),
            "url(\"https://example.com/css/bg.png\")"
        );
        assert_eq!(
            rewrite_urls("url('bg.png')", &base()),
            "url('https://example.com/css/bg.png')"
        );
    }

    #[test]
    fn data_and_absolute_urls_pass_through() {
        assert_eq!(
            rewrite_urls("url(data:image/png;base64,AA)", &base()),
            "url(data:image/png;base64,AA)"
        );
        assert_eq!(
            rewrite_urls("url(https://cdn.example.com/a.png)", &base()),
            "url(https://cdn.example.com/a.png)"
        );
        assert_eq!(rewrite_urls("url(#anchor)", &base()), "url(#anchor)");
    }

    #[test]
    fn surrounding_value_text_is_kept() {
        assert_eq!(
            rewrite_urls("#fff url(bg.png) no-repeat", &base()),
            "#fff url(https://example.com/css/bg.png) no-repeat"
        );
    }

    #[test]
    fn url_inside_string_is_untouched() {
        assert_eq!(
            rewrite_urls("\"url(bg.png)\"", &base()),
            "\"url(bg.png)\""
        );
    }

    #[test]
    fn blur_function_is_not_a_url() {
        assert_eq!(rewrite_urls("blur(4px)", &base()), "blur(4px)");
    }
}
