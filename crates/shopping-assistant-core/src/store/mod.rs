//! Storage abstractions consumed by the assistant.
//!
//! Both stores are owned outside the core. The assistant only appends to
//! and reads from conversation memory, and only queries the policy store.
//!
//! Implementations must be `Send + Sync` to work with async runtimes.

pub mod memory;

use anyhow::Result;
use async_trait::async_trait;

use crate::models::{ConversationTurn, Policy};

/// Default window size for chat conversations.
pub const DEFAULT_MAX_TURNS: usize = 15;

/// Bounded sliding window of turns per conversation id.
///
/// | Method | Purpose |
/// |--------|---------|
/// | [`append`](ConversationMemory::append) | Record a turn |
/// | [`window`](ConversationMemory::window) | Most recent turns, oldest first |
#[async_trait]
pub trait ConversationMemory: Send + Sync {
    async fn append(&self, conversation_id: &str, turn: ConversationTurn) -> Result<()>;

    /// Up to `max_turns` most recent turns, oldest first.
    async fn window(&self, conversation_id: &str) -> Result<Vec<ConversationTurn>>;
}

/// Read-only access to versioned policy documents.
#[async_trait]
pub trait PolicyStore: Send + Sync {
    /// Exact lookup by policy code (e.g. `BUYER_REFUND`).
    async fn get_by_code(&self, code: &str) -> Result<Option<Policy>>;

    /// Diacritic-insensitive keyword search over title and content,
    /// newest effective date first.
    async fn search(&self, query: &str, limit: usize) -> Result<Vec<Policy>>;

    /// The `limit` policies with the latest effective date.
    async fn list_newest(&self, limit: usize) -> Result<Vec<Policy>>;
}
