//! Collaborator seams: search backends and the chat model.
//!
//! Concrete HTTP implementations live in the application crate. The
//! orchestrator receives both search backends at construction time.

use anyhow::Result;
use async_trait::async_trait;
use thiserror::Error;

use crate::models::{ConversationTurn, ImageUpload, RawSearchResult};

/// Failure classes for a search backend call.
#[derive(Debug, Error)]
pub enum BackendError {
    /// Connection, DNS, or timeout failure.
    #[error("search service unreachable: {0}")]
    Transport(String),
    /// Non-success HTTP status.
    #[error("search service returned {status}: {body}")]
    Status { status: u16, body: String },
    /// Response body was not the expected JSON shape.
    #[error("malformed search response: {0}")]
    Decode(String),
}

/// What a backend reported, before any filtering.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BackendReply {
    pub success: bool,
    /// `None` when the backend omitted the list or sent `null`.
    pub results: Option<Vec<RawSearchResult>>,
    /// Error text reported in-band by the backend, if any.
    pub error: Option<String>,
}

/// Request for the text-embedding search backend.
#[derive(Debug, Clone, PartialEq)]
pub struct TextSearchRequest {
    pub query: String,
    pub top_k: u32,
}

/// Request for the image-embedding search backend.
#[derive(Debug, Clone, PartialEq)]
pub struct ImageSearchRequest {
    pub image: ImageUpload,
    pub top_k: u32,
    pub candidate_k: u32,
    pub per_product_rerank: u32,
    pub min_similarity: f64,
}

#[async_trait]
pub trait TextSearchBackend: Send + Sync {
    async fn search(&self, request: &TextSearchRequest) -> Result<BackendReply, BackendError>;
}

#[async_trait]
pub trait ImageSearchBackend: Send + Sync {
    async fn search(&self, request: &ImageSearchRequest) -> Result<BackendReply, BackendError>;
}

/// One call to the chat model.
#[derive(Debug, Clone, Default)]
pub struct ChatPrompt {
    pub system: String,
    /// Extra grounding material appended to the system prompt.
    pub context: Option<String>,
    /// Prior turns, oldest first.
    pub history: Vec<ConversationTurn>,
    pub message: String,
    pub image: Option<ImageUpload>,
    /// Whether the model may call registered tools.
    pub allow_tools: bool,
}

/// The LLM collaborator. Returns raw text, which may embed tool JSON.
#[async_trait]
pub trait ChatModel: Send + Sync {
    async fn complete(&self, prompt: ChatPrompt) -> Result<String>;
}
