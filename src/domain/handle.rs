//! Handle validation and synthesis helpers.
//!
//! Upstream APIs do not always expose a stable handle, so connectors derive
//! one from whatever material is available. Every candidate is validated
//! against the same charset/length pattern before use.

use std::sync::LazyLock;

use chrono::Utc;
use regex::Regex;

/// Accepted handle shape, including the leading '@'.
static HANDLE_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^@[A-Za-z0-9._]{3,30}$").expect("valid handle pattern"));

/// Handle-shaped token embedded in free text.
static HANDLE_IN_TEXT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"@[A-Za-z0-9._]{3,30}").expect("valid handle pattern"));

/// Validate a candidate, normalizing a missing '@' prefix.
pub fn normalize(candidate: &str) -> Option<String> {
    let trimmed = candidate.trim();
    if trimmed.is_empty() {
        return None;
    }
    let with_at = if trimmed.starts_with('@') {
        trimmed.to_string()
    } else {
        format!("@{}", trimmed)
    };
    HANDLE_PATTERN.is_match(&with_at).then_some(with_at)
}

/// First handle-shaped token found in free text, e.g. a channel description.
pub fn scrape_from_text(text: &str) -> Option<String> {
    HANDLE_IN_TEXT.find(text).map(|m| m.as_str().to_string())
}

/// Lowercase, collapse non-alphanumeric runs to '.', trim separators.
///
/// Uses '.' as the separator so the result stays inside the handle charset.
pub fn slugify(s: &str) -> String {
    let mut slug = String::with_capacity(s.len());
    let mut last_was_sep = true;
    for c in s.trim().chars() {
        if c.is_ascii_alphanumeric() {
            slug.push(c.to_ascii_lowercase());
            last_was_sep = false;
        } else if !last_was_sep {
            slug.push('.');
            last_was_sep = true;
        }
    }
    while slug.ends_with('.') {
        slug.pop();
    }
    slug
}

/// Handle candidate from a display title, validated.
pub fn from_title(title: &str) -> Option<String> {
    let slug = slugify(title);
    if slug.is_empty() {
        return None;
    }
    normalize(&slug)
}

/// Last-resort unique placeholder; never fails.
pub fn placeholder() -> String {
    format!("@unknown{}", Utc::now().timestamp_millis() % 10_000)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_accepts_valid_handles() {
        assert_eq!(normalize("@mkbhd"), Some("@mkbhd".to_string()));
        assert_eq!(normalize("mkbhd"), Some("@mkbhd".to_string()));
        assert_eq!(normalize(" @some.name_9 "), Some("@some.name_9".to_string()));
    }

    #[test]
    fn test_normalize_rejects_bad_shapes() {
        assert_eq!(normalize(""), None);
        assert_eq!(normalize("@ab"), None); // too short
        assert_eq!(normalize("@has spaces"), None);
        assert_eq!(normalize(&format!("@{}", "x".repeat(31))), None); // too long
    }

    #[test]
    fn test_scrape_from_text() {
        let desc = "Tech reviews every week. Follow @mkbhd for more!";
        assert_eq!(scrape_from_text(desc), Some("@mkbhd".to_string()));
        assert_eq!(scrape_from_text("no handles here"), None);
    }

    #[test]
    fn test_slugify() {
        assert_eq!(slugify("Marques Brownlee"), "marques.brownlee");
        assert_eq!(slugify("  Linus Tech Tips!  "), "linus.tech.tips");
        assert_eq!(slugify("---"), "");
    }

    #[test]
    fn test_from_title() {
        assert_eq!(from_title("Marques Brownlee"), Some("@marques.brownlee".to_string()));
        assert_eq!(from_title("!!"), None);
    }

    #[test]
    fn test_placeholder_shape() {
        let p = placeholder();
        assert!(p.starts_with("@unknown"));
    }
}
