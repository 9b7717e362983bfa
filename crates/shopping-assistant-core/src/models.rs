//! Core data models used throughout the shopping assistant.
//!
//! Everything here except [`Policy`] and [`ConversationTurn`] is
//! request-scoped: created and discarded within one chat call.

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::normalize::normalize_text;

/// Literal `type` tag carried by every product-list payload.
pub const PRODUCT_LIST_TYPE: &str = "product_list";

/// An incoming message together with its normalized form.
///
/// `normalized` is lowercase, diacritic-free and whitespace-collapsed. It is
/// used for classification and count extraction only; `raw` is what gets
/// forwarded to the search backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedQuery {
    pub raw: String,
    pub normalized: String,
}

impl NormalizedQuery {
    pub fn new(raw: &str) -> Self {
        Self {
            raw: raw.to_string(),
            normalized: normalize_text(raw),
        }
    }

    /// The original text with case and diacritics intact, trimmed and
    /// whitespace-collapsed.
    pub fn search_text(&self) -> String {
        self.raw.split_whitespace().collect::<Vec<_>>().join(" ")
    }
}

/// The inferred purpose of a user message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Intent {
    ProductSearch,
    PolicyLookup,
    GeneralChat,
}

impl Intent {
    pub fn as_str(&self) -> &'static str {
        match self {
            Intent::ProductSearch => "product_search",
            Intent::PolicyLookup => "policy_lookup",
            Intent::GeneralChat => "general_chat",
        }
    }

    /// Parses a label such as `"product_search"` or `"policy"`.
    pub fn from_label(label: &str) -> Option<Self> {
        match label.trim().to_lowercase().as_str() {
            "product_search" | "product" | "search" => Some(Intent::ProductSearch),
            "policy_lookup" | "policy" => Some(Intent::PolicyLookup),
            "general_chat" | "general" | "chat" => Some(Intent::GeneralChat),
            _ => None,
        }
    }
}

impl std::fmt::Display for Intent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Parameters for a single search invocation.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchSpec {
    /// Original-cased, trimmed query text.
    pub query: String,
    /// Maximum number of items in the payload (`> 0`).
    pub result_limit: u32,
    /// Minimum normalized similarity in `[0, 1]`.
    pub min_similarity: f64,
}

/// A record received as-is from a search backend. Untrusted.
#[derive(Debug, Clone, PartialEq)]
pub struct RawSearchResult {
    pub product: Map<String, Value>,
    pub raw_score: Option<f64>,
    pub matched_text: Option<String>,
}

/// A [`RawSearchResult`] after score normalization.
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedResult {
    pub product: Map<String, Value>,
    pub similarity: f64,
}

/// One product in the output payload. All fields are always present.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductItem {
    pub id: String,
    pub name: String,
    pub description: String,
    pub price: f64,
    /// Percentage.
    pub discount: f64,
    pub url: String,
    pub image_url: String,
}

/// The structured response contract for search results.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchPayload {
    #[serde(rename = "type")]
    pub kind: String,
    pub message: Option<String>,
    #[serde(default)]
    pub items: Vec<ProductItem>,
}

impl SearchPayload {
    pub fn new(message: Option<String>, items: Vec<ProductItem>) -> Self {
        Self {
            kind: PRODUCT_LIST_TYPE.to_string(),
            message,
            items,
        }
    }

    pub fn empty(message: impl Into<String>) -> Self {
        Self::new(Some(message.into()), Vec::new())
    }

    /// Serialize to a JSON string. Falls back to a hand-built empty payload
    /// if serialization fails, so callers always receive valid JSON.
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| {
            format!(
                r#"{{"type":"{}","message":"serialization error","items":[]}}"#,
                PRODUCT_LIST_TYPE
            )
        })
    }
}

/// Who produced a conversation turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "user" => Some(Role::User),
            "assistant" => Some(Role::Assistant),
            _ => None,
        }
    }
}

/// A single message in a conversation window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversationTurn {
    pub role: Role,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

impl ConversationTurn {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
            created_at: Utc::now(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
            created_at: Utc::now(),
        }
    }
}

/// A versioned policy document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Policy {
    pub id: String,
    pub code: String,
    pub title: String,
    pub version: String,
    pub content_markdown: String,
    pub effective_date: NaiveDateTime,
}

/// An uploaded image forwarded to the image search backend or the LLM.
#[derive(Debug, Clone, PartialEq)]
pub struct ImageUpload {
    pub bytes: Vec<u8>,
    pub filename: String,
    pub content_type: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn payload_serializes_type_first_with_null_message() {
        let json = SearchPayload::new(None, Vec::new()).to_json();
        assert_eq!(json, r#"{"type":"product_list","message":null,"items":[]}"#);
    }

    #[test]
    fn product_item_uses_camel_case() {
        let item = ProductItem {
            id: "p1".into(),
            name: "Hoodie".into(),
            description: String::new(),
            price: 250000.0,
            discount: 10.0,
            url: "/products/p1".into(),
            image_url: "/img/default.png".into(),
        };
        let v = serde_json::to_value(&item).unwrap();
        assert_eq!(v["imageUrl"], "/img/default.png");
        assert!(v.get("image_url").is_none());
    }

    #[test]
    fn search_text_keeps_case_and_accents() {
        let q = NormalizedQuery::new("  Tìm   Áo Hoodie ");
        assert_eq!(q.search_text(), "Tìm Áo Hoodie");
        assert_eq!(q.normalized, "tim ao hoodie");
    }

    #[test]
    fn intent_labels() {
        assert_eq!(Intent::from_label(" Policy "), Some(Intent::PolicyLookup));
        assert_eq!(Intent::from_label("product_search"), Some(Intent::ProductSearch));
        assert_eq!(Intent::from_label("weather"), None);
    }
}
