//! Projects loosely-typed backend product records onto [`ProductItem`].
//!
//! Backends and the underlying catalog serialize identifiers and numbers
//! inconsistently (`"abc"`, `{"$oid": "abc"}`, `12.5`, `"12.5"`,
//! `{"$numberLong": "12"}`), so every field is read through a total
//! get-or-default accessor. One malformed record never aborts a result set.

use serde_json::{Map, Value};

use crate::models::ProductItem;

pub const DEFAULT_NAME: &str = "(no name)";
pub const DEFAULT_IMAGE_URL: &str = "/img/default.png";

const VIDEO_SUFFIXES: &[&str] = &[".mp4", ".mov", ".webm", ".avi", ".mkv", ".m4v"];

/// Keys carrying the inner value of an extended-JSON wrapper.
const ID_WRAPPER_KEYS: &[&str] = &["$oid", "$id", "$uuid", "id"];
const NUMBER_WRAPPER_KEYS: &[&str] = &["$numberLong", "$numberDecimal", "$numberDouble", "$numberInt"];

/// Project a raw product record. Never fails.
pub fn project(product: &Map<String, Value>) -> ProductItem {
    let id = read_id(product);
    ProductItem {
        url: format!("/products/{}", id),
        name: read_name(product),
        description: read_string(product, "description").unwrap_or_default(),
        price: read_price(product),
        discount: product
            .get("percentDiscount")
            .and_then(coerce_number)
            .map(non_negative)
            .unwrap_or(0.0),
        image_url: pick_image_url(product.get("images")),
        id,
    }
}

/// Read `_id` (falling back to `id`), unwrapping reference wrappers.
pub fn read_id(product: &Map<String, Value>) -> String {
    product
        .get("_id")
        .filter(|v| !v.is_null())
        .or_else(|| product.get("id"))
        .map(stringify_id)
        .unwrap_or_default()
}

fn stringify_id(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        Value::Object(obj) => ID_WRAPPER_KEYS
            .iter()
            .find_map(|k| obj.get(*k))
            .map(stringify_id)
            .unwrap_or_else(|| value.to_string()),
        other => other.to_string(),
    }
}

fn read_name(product: &Map<String, Value>) -> String {
    ["name", "originalName"]
        .iter()
        .filter_map(|k| read_string(product, k))
        .map(|s| s.trim().to_string())
        .find(|s| !s.is_empty())
        .unwrap_or_else(|| DEFAULT_NAME.to_string())
}

fn read_string(product: &Map<String, Value>, key: &str) -> Option<String> {
    product.get(key).and_then(|v| v.as_str()).map(str::to_string)
}

/// Price of the first size/variant entry.
pub fn read_price(product: &Map<String, Value>) -> f64 {
    ["sizes", "variants"]
        .iter()
        .find_map(|k| product.get(*k).and_then(|v| v.as_array()))
        .and_then(|list| list.first())
        .and_then(|first| first.get("price"))
        .and_then(coerce_number)
        .map(non_negative)
        .unwrap_or(0.0)
}

/// Coerce a JSON value to a finite `f64`.
///
/// Accepts numbers, numeric strings and extended-JSON number wrappers
/// such as `{"$numberLong": "129000"}`.
pub fn coerce_number(value: &Value) -> Option<f64> {
    let n = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        Value::Object(obj) => NUMBER_WRAPPER_KEYS
            .iter()
            .find_map(|k| obj.get(*k))
            .and_then(coerce_number),
        _ => None,
    }?;
    n.is_finite().then_some(n)
}

fn non_negative(n: f64) -> f64 {
    n.max(0.0)
}

/// First non-video image URL, or [`DEFAULT_IMAGE_URL`].
///
/// Entries may be bare strings or objects with a `url` field.
pub fn pick_image_url(images: Option<&Value>) -> String {
    images
        .and_then(|v| v.as_array())
        .and_then(|list| {
            list.iter()
                .filter_map(|img| match img {
                    Value::String(s) => Some(s.as_str()),
                    Value::Object(obj) => obj.get("url").and_then(|u| u.as_str()),
                    _ => None,
                })
                .map(str::trim)
                .find(|url| !url.is_empty() && !is_video(url))
        })
        .map(str::to_string)
        .unwrap_or_else(|| DEFAULT_IMAGE_URL.to_string())
}

fn is_video(url: &str) -> bool {
    let path = url.split(['?', '#']).next().unwrap_or(url).to_lowercase();
    VIDEO_SUFFIXES.iter().any(|ext| path.ends_with(ext))
}
