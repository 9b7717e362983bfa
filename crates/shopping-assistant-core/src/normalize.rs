//! Text normalization for classification.
//!
//! Lowercases, strips Vietnamese diacritics, expands a fixed table of chat
//! shorthand and collapses whitespace. The result is only used for intent
//! classification and result-count extraction; the text sent to the search
//! backend keeps its accents.

use regex::Regex;
use std::sync::OnceLock;
use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

/// Ordered whole-word shorthand expansions.
///
/// No expansion is itself a key, which keeps [`normalize_text`] idempotent.
const SHORTHAND: &[(&str, &str)] = &[
    ("ko", "khong"),
    ("kh", "khong"),
    ("hok", "khong"),
    ("k", "khong"),
    ("sp", "san pham"),
    ("spham", "san pham"),
    ("dc", "duoc"),
    ("oke", "ok"),
    ("okie", "ok"),
    ("okela", "ok"),
    ("j", "gi"),
    ("mk", "minh"),
];

fn shorthand_patterns() -> &'static [(Regex, &'static str)] {
    static PATTERNS: OnceLock<Vec<(Regex, &'static str)>> = OnceLock::new();
    PATTERNS.get_or_init(|| {
        SHORTHAND
            .iter()
            .map(|(from, to)| {
                let re = Regex::new(&format!(r"\b{}\b", regex::escape(from)))
                    .expect("shorthand pattern must compile");
                (re, *to)
            })
            .collect()
    })
}

/// Normalize free text for classification.
///
/// ```rust
/// use shopping_assistant_core::normalize::normalize_text;
///
/// assert_eq!(normalize_text("Tìm ÁO  hoodie màu đen"), "tim ao hoodie mau den");
/// assert_eq!(normalize_text("sp này ko đẹp"), "san pham nay khong dep");
/// ```
pub fn normalize_text(text: &str) -> String {
    let stripped = strip_diacritics(&text.to_lowercase());
    let mut out = collapse_whitespace(&stripped);
    for (re, replacement) in shorthand_patterns() {
        if re.is_match(&out) {
            out = re.replace_all(&out, *replacement).into_owned();
        }
    }
    collapse_whitespace(&out)
}

/// Remove combining marks after canonical decomposition.
///
/// `đ` has no decomposition and is mapped to `d` explicitly.
pub fn strip_diacritics(text: &str) -> String {
    text.nfd()
        .filter(|c| !is_combining_mark(*c))
        .map(|c| match c {
            'đ' => 'd',
            'Đ' => 'D',
            other => other,
        })
        .collect()
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Split normalized text into alphanumeric tokens.
pub fn tokens(normalized: &str) -> Vec<&str> {
    normalized
        .split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .collect()
}
