//! Guarantees a well-formed product-list payload out of raw LLM text.
//!
//! The model is told to return tool JSON verbatim but may prepend commentary
//! or wrap it in markdown fences. When the text carries product-list markers,
//! [`enforce`] cuts out the first balanced JSON object with
//! `"type": "product_list"`; when no such object exists it returns a fixed
//! empty stub. Text without the markers is ordinary conversation and passes
//! through unchanged.

use serde_json::Value;

use crate::models::{SearchPayload, PRODUCT_LIST_TYPE};

const TYPE_MARKER: &str = "\"type\"";

/// The stub returned when markers are present but no valid object is found.
pub fn format_error_stub() -> String {
    SearchPayload::empty("format error").to_json()
}

/// Whether `text` claims to contain a product-list payload.
pub fn has_product_list_markers(text: &str) -> bool {
    text.contains(TYPE_MARKER) && text.contains(PRODUCT_LIST_TYPE)
}

/// Extract the product-list JSON object from `raw`, or pass `raw` through.
pub fn enforce(raw: &str) -> String {
    if !has_product_list_markers(raw) {
        return raw.to_string();
    }

    let mut from = 0;
    while let Some(offset) = raw[from..].find('{') {
        let start = from + offset;
        // an unclosed '{' may still contain a balanced object further in
        if let Some(end) = find_balanced_object(raw, start) {
            let candidate = &raw[start..=end];
            if is_product_list(candidate) {
                return candidate.to_string();
            }
        }
        from = start + 1;
    }

    tracing::warn!("product list markers present but no valid JSON object found");
    format_error_stub()
}

/// Byte index of the `}` closing the object opened at `start`.
///
/// Braces inside string literals are ignored; a backslash escapes the next
/// character so `\"` does not end the string.
pub fn find_balanced_object(text: &str, start: usize) -> Option<usize> {
    let bytes = text.as_bytes();
    if bytes.get(start) != Some(&b'{') {
        return None;
    }

    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (i, &b) in bytes.iter().enumerate().skip(start) {
        if in_string {
            if escaped {
                escaped = false;
            } else if b == b'\\' {
                escaped = true;
            } else if b == b'"' {
                in_string = false;
            }
            continue;
        }
        match b {
            b'"' => in_string = true,
            b'{' => depth += 1,
            b'}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(i);
                }
            }
            _ => {}
        }
    }
    None
}

fn is_product_list(candidate: &str) -> bool {
    serde_json::from_str::<Value>(candidate)
        .ok()
        .and_then(|v| v.get("type").and_then(|t| t.as_str()).map(|t| t == PRODUCT_LIST_TYPE))
        .unwrap_or(false)
}
