//! In-memory store implementations for tests and single-process use.
//!
//! Uses `HashMap`/`VecDeque` behind `std::sync::RwLock`.

use std::collections::{HashMap, VecDeque};
use std::sync::RwLock;

use anyhow::{anyhow, Result};
use async_trait::async_trait;

use crate::models::{ConversationTurn, Policy};
use crate::normalize::normalize_text;

use super::{ConversationMemory, PolicyStore, DEFAULT_MAX_TURNS};

/// Conversation memory that keeps the last `max_turns` turns per id.
pub struct InMemoryConversationMemory {
    max_turns: usize,
    turns: RwLock<HashMap<String, VecDeque<ConversationTurn>>>,
}

impl InMemoryConversationMemory {
    pub fn new(max_turns: usize) -> Self {
        Self {
            max_turns: max_turns.max(1),
            turns: RwLock::new(HashMap::new()),
        }
    }
}

impl Default for InMemoryConversationMemory {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_TURNS)
    }
}

#[async_trait]
impl ConversationMemory for InMemoryConversationMemory {
    async fn append(&self, conversation_id: &str, turn: ConversationTurn) -> Result<()> {
        let mut turns = self
            .turns
            .write()
            .map_err(|_| anyhow!("conversation memory lock poisoned"))?;
        let window = turns.entry(conversation_id.to_string()).or_default();
        window.push_back(turn);
        while window.len() > self.max_turns {
            window.pop_front();
        }
        Ok(())
    }

    async fn window(&self, conversation_id: &str) -> Result<Vec<ConversationTurn>> {
        let turns = self
            .turns
            .read()
            .map_err(|_| anyhow!("conversation memory lock poisoned"))?;
        Ok(turns
            .get(conversation_id)
            .map(|w| w.iter().cloned().collect())
            .unwrap_or_default())
    }
}

struct IndexedPolicy {
    policy: Policy,
    /// Normalized title + content.
    search_text: String,
}

/// Policy store over a fixed set of documents.
pub struct InMemoryPolicyStore {
    policies: RwLock<Vec<IndexedPolicy>>,
}

impl InMemoryPolicyStore {
    pub fn new() -> Self {
        Self {
            policies: RwLock::new(Vec::new()),
        }
    }

    pub fn with_policies(policies: impl IntoIterator<Item = Policy>) -> Self {
        let store = Self::new();
        for p in policies {
            // fresh lock, cannot be poisoned
            let _ = store.upsert(p);
        }
        store
    }

    /// Insert or replace a policy by code.
    pub fn upsert(&self, policy: Policy) -> Result<()> {
        let mut policies = self
            .policies
            .write()
            .map_err(|_| anyhow!("policy store lock poisoned"))?;
        policies.retain(|p| p.policy.code != policy.code);
        let search_text = normalize_text(&format!("{}\n{}", policy.title, policy.content_markdown));
        policies.push(IndexedPolicy {
            policy,
            search_text,
        });
        Ok(())
    }

    fn newest_first(&self, filter: impl Fn(&IndexedPolicy) -> bool, limit: usize) -> Result<Vec<Policy>> {
        let policies = self
            .policies
            .read()
            .map_err(|_| anyhow!("policy store lock poisoned"))?;
        let mut hits: Vec<&Policy> = policies.iter().filter(|p| filter(p)).map(|p| &p.policy).collect();
        hits.sort_by(|a, b| b.effective_date.cmp(&a.effective_date).then(a.code.cmp(&b.code)));
        Ok(hits.into_iter().take(limit.max(1)).cloned().collect())
    }
}

impl Default for InMemoryPolicyStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PolicyStore for InMemoryPolicyStore {
    async fn get_by_code(&self, code: &str) -> Result<Option<Policy>> {
        let policies = self
            .policies
            .read()
            .map_err(|_| anyhow!("policy store lock poisoned"))?;
        Ok(policies
            .iter()
            .find(|p| p.policy.code.eq_ignore_ascii_case(code.trim()))
            .map(|p| p.policy.clone()))
    }

    async fn search(&self, query: &str, limit: usize) -> Result<Vec<Policy>> {
        let needle = normalize_text(query);
        if needle.is_empty() {
            return Ok(Vec::new());
        }
        self.newest_first(|p| p.search_text.contains(&needle), limit)
    }

    async fn list_newest(&self, limit: usize) -> Result<Vec<Policy>> {
        self.newest_first(|_| true, limit)
    }
}
