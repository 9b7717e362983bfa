//! Intent classification and result-count extraction.
//!
//! The default strategy is a keyword heuristic over normalized text
//! ([`KeywordClassifier`]). [`ModelAssistedClassifier`] delegates to a chat
//! model and falls back to the heuristic whenever the model is unavailable
//! or answers with an unknown label.
//!
//! # Product-search rule
//!
//! A message is a product search if it contains a category keyword, or if
//! it contains a search action together with a category, attribute, or
//! generic product noun. Recall is favored over precision: a false positive
//! lands on the search path whose empty result degrades gracefully. Short
//! words that double as everyday Vietnamese ("quan trong", "cam on") are
//! masked first, and colours that are also common words only count after
//! "mau".
//!
//! # Priority
//!
//! product search → policy lookup → general chat.

use async_trait::async_trait;
use regex::Regex;
use std::sync::{Arc, OnceLock};

use crate::backend::{ChatModel, ChatPrompt};
use crate::models::{Intent, NormalizedQuery};
use crate::normalize::tokens;

const SEARCH_ACTIONS: &[&str] = &[
    "tim",
    "tim kiem",
    "kiem",
    "co",
    "mua",
    "muon mua",
    "can mua",
    "dat mua",
    "xem",
    "cho",
    "cho xem",
    "goi y",
    "find",
    "search",
    "have",
    "buy",
    "want to buy",
    "looking for",
    "show",
    "recommend",
];

const CATEGORIES: &[&str] = &[
    // clothing
    "ao",
    "quan",
    "vay",
    "dam",
    "chan vay",
    "ao khoac",
    "khoac",
    "so mi",
    "thun",
    "polo",
    "hoodie",
    "sweater",
    "cardigan",
    "blazer",
    "jacket",
    "jean",
    "jeans",
    "kaki",
    "short",
    "legging",
    "shirt",
    "tshirt",
    "pants",
    "dress",
    "skirt",
    // footwear
    "giay",
    "sandal",
    "dep lao",
    "sneaker",
    "sneakers",
    "boot",
    "boots",
    "cao got",
    "shoes",
    "shoe",
    // accessories
    "tui",
    "tui xach",
    "balo",
    "mu",
    "non",
    "that lung",
    "kinh mat",
    "dong ho",
    "vi da",
    "phu kien",
    "trang suc",
    "day chuyen",
    "bag",
    "backpack",
    "hat",
    "cap",
    "belt",
    "wallet",
    "watch",
    "glasses",
];

const ATTRIBUTES: &[&str] = &[
    // color; bare "do", "den", "vang", "hong", "cam" are also common
    // non-colour words, so those only count through "mau"
    "mau",
    "xanh",
    "xam",
    "black",
    "white",
    "red",
    "blue",
    "green",
    "yellow",
    "pink",
    "grey",
    "gray",
    "brown",
    // size
    "size",
    "xs",
    "xl",
    "xxl",
    // style
    "form rong",
    "oversize",
    "oversized",
    "basic",
    "vintage",
    "the thao",
    "cong so",
    "du tiec",
    "slim fit",
    "phong cach",
    "style",
    // brand
    "nike",
    "adidas",
    "puma",
    "converse",
    "vans",
    "uniqlo",
    "zara",
    "gucci",
    "levis",
    "mlb",
    // price
    "gia",
    "gia re",
    "re",
    "duoi",
    "khoang",
    "trieu",
    "nghin",
    "ngan",
    "price",
    "cheap",
    "under",
    "budget",
];

/// Generic product nouns; only count together with a search action.
const PRODUCT_NOUNS: &[&str] = &[
    "san pham",
    "mon",
    "quan ao",
    "thoi trang",
    "item",
    "items",
    "product",
    "products",
    "fashion",
];

/// Everyday phrases whose tokens collide with category words
/// ("quan trong", "dam bao", "tui minh"). Masked before the product check.
const NON_PRODUCT_PHRASES: &[&str] = &[
    "quan trong",
    "quan tam",
    "quan ly",
    "quan he",
    "quan diem",
    "dam bao",
    "dam phan",
    "tui minh",
    "tui toi",
    "tui em",
    "cung cap",
    "cap nhat",
    "cam on",
];

const POLICY_TERMS: &[&str] = &[
    "chinh sach",
    "quy dinh",
    "dieu khoan",
    "hoan tien",
    "doi tra",
    "tra hang",
    "vi pham",
    "hang cam",
    "cam ban",
    "bao hanh",
    "policy",
    "policies",
    "refund",
    "return policy",
    "terms",
    "prohibited",
    "violation",
    "warranty",
];

/// Default number of products returned when the message names no count.
pub const DEFAULT_RESULT_LIMIT: u32 = 4;

const COUNT_NOUNS: &str = r"(?:san pham|mon|cai|chiec|doi|mau|ket qua|items?|products?|results?)";

fn action_count_noun() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(&format!(
            r"\b(?:cho(?: toi| minh| em| xem)?|hien thi|hien|lay|xem|goi y|tim|show(?: me)?|give(?: me)?|get|list|find)\s+(\d+)\s+{}\b",
            COUNT_NOUNS
        ))
        .expect("count grammar must compile")
    })
}

fn count_noun_ordinal() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(&format!(
            r"\b(\d+)\s+{}\s+(?:dau tien|dau|truoc|first|top)\b",
            COUNT_NOUNS
        ))
        .expect("ordinal grammar must compile")
    })
}

/// Whether `phrase` occurs as a contiguous run of whole tokens.
fn contains_phrase(haystack: &[&str], phrase: &str) -> bool {
    let needle: Vec<&str> = phrase.split(' ').collect();
    if needle.is_empty() || needle.len() > haystack.len() {
        return false;
    }
    haystack.windows(needle.len()).any(|w| w == needle.as_slice())
}

fn contains_any(haystack: &[&str], phrases: &[&str]) -> bool {
    phrases.iter().any(|p| contains_phrase(haystack, p))
}

/// Blank out every token covered by one of `phrases`.
fn mask_phrases<'a>(toks: &[&'a str], phrases: &[&str]) -> Vec<&'a str> {
    let mut masked = toks.to_vec();
    for phrase in phrases {
        let needle: Vec<&str> = phrase.split(' ').collect();
        if needle.len() > toks.len() {
            continue;
        }
        for start in 0..=toks.len() - needle.len() {
            if toks[start..start + needle.len()] == needle[..] {
                for slot in &mut masked[start..start + needle.len()] {
                    *slot = "";
                }
            }
        }
    }
    masked
}

/// Product-search heuristic over normalized text.
pub fn is_product_search(normalized: &str) -> bool {
    let toks = mask_phrases(&tokens(normalized), NON_PRODUCT_PHRASES);
    if contains_any(&toks, CATEGORIES) {
        return true;
    }
    contains_any(&toks, SEARCH_ACTIONS)
        && (contains_any(&toks, ATTRIBUTES) || contains_any(&toks, PRODUCT_NOUNS))
}

/// Policy heuristic over normalized text.
pub fn is_policy_lookup(normalized: &str) -> bool {
    contains_any(&tokens(normalized), POLICY_TERMS)
}

/// Keyword classification of normalized text.
pub fn classify(normalized: &str) -> Intent {
    if is_product_search(normalized) {
        Intent::ProductSearch
    } else if is_policy_lookup(normalized) {
        Intent::PolicyLookup
    } else {
        Intent::GeneralChat
    }
}

/// Policy vocabulary present in the message, in table order.
pub fn policy_terms(normalized: &str) -> Vec<&'static str> {
    let toks = tokens(normalized);
    POLICY_TERMS
        .iter()
        .copied()
        .filter(|t| contains_phrase(&toks, t))
        .collect()
}

/// Extract a requested result count, or `default`.
///
/// Tries `{action} {N} {noun}` then `{N} {noun} {ordinal}`. A number that
/// does not parse as a positive base-10 `u32` counts as no match. The
/// result is clamped to `max`.
pub fn extract_result_limit(normalized: &str, default: u32, max: u32) -> u32 {
    let found = [action_count_noun(), count_noun_ordinal()]
        .iter()
        .find_map(|re| {
            re.captures(normalized)
                .and_then(|caps| caps.get(1))
                .and_then(|m| m.as_str().parse::<u32>().ok())
                .filter(|n| *n > 0)
        });
    match found {
        Some(n) => n.min(max.max(1)),
        None => default,
    }
}

/// Pluggable intent classification strategy.
#[async_trait]
pub trait IntentClassifier: Send + Sync {
    /// Strategy name, for logs.
    fn name(&self) -> &str;

    async fn classify(&self, query: &NormalizedQuery) -> Intent;
}

/// The keyword heuristic.
#[derive(Debug, Default, Clone, Copy)]
pub struct KeywordClassifier;

#[async_trait]
impl IntentClassifier for KeywordClassifier {
    fn name(&self) -> &str {
        "keyword"
    }

    async fn classify(&self, query: &NormalizedQuery) -> Intent {
        classify(&query.normalized)
    }
}

const CLASSIFIER_PROMPT: &str = "You route messages for a fashion shop assistant. \
Reply with exactly one label and nothing else: product_search (the user wants to find or buy products), \
policy_lookup (the user asks about shop rules, refunds, returns, prohibited items, terms), \
or general_chat (anything else).";

/// Delegates classification to a chat model.
///
/// Keyword product-search hits are returned without consulting the model.
/// Model errors and unknown labels fall back to the keyword result.
pub struct ModelAssistedClassifier {
    model: Arc<dyn ChatModel>,
}

impl ModelAssistedClassifier {
    pub fn new(model: Arc<dyn ChatModel>) -> Self {
        Self { model }
    }
}

#[async_trait]
impl IntentClassifier for ModelAssistedClassifier {
    fn name(&self) -> &str {
        "model"
    }

    async fn classify(&self, query: &NormalizedQuery) -> Intent {
        let heuristic = classify(&query.normalized);
        if heuristic == Intent::ProductSearch {
            return heuristic;
        }

        let prompt = ChatPrompt {
            system: CLASSIFIER_PROMPT.to_string(),
            context: None,
            history: Vec::new(),
            message: query.raw.clone(),
            image: None,
            allow_tools: false,
        };
        match self.model.complete(prompt).await {
            Ok(answer) => {
                let label = answer.split_whitespace().next().unwrap_or("");
                let label = label.trim_matches(|c: char| !c.is_alphanumeric() && c != '_');
                Intent::from_label(label).unwrap_or_else(|| {
                    tracing::debug!(answer = %answer, "unrecognized intent label, using keyword result");
                    heuristic
                })
            }
            Err(e) => {
                tracing::warn!(error = %e, "intent model unavailable, using keyword result");
                heuristic
            }
        }
    }
}
