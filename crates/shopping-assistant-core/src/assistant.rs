//! Top-level chat coordinator.
//!
//! ```text
//! message ─▶ normalize ─▶ classify ─┬─ product search ─▶ orchestrator ─▶ payload JSON
//!                                   ├─ policy lookup  ─▶ policy store + LLM ─▶ enforce
//!                                   └─ general chat   ─▶ LLM (tools allowed) ─▶ enforce
//! ```
//!
//! With an image attached, a product-search or blank message goes to the
//! image backend; anything else goes to the LLM with the image.
//!
//! No path returns an error: backend failures become tagged empty payloads
//! and LLM failures become a fixed apology.

use std::sync::Arc;

use crate::backend::{ChatModel, ChatPrompt};
use crate::contract::enforce;
use crate::intent::{policy_terms, IntentClassifier};
use crate::models::{ConversationTurn, ImageUpload, Intent, NormalizedQuery, Policy};
use crate::orchestrator::{EmptyReason, SearchOrchestrator, SearchOutcome};
use crate::policy::{policy_list_payload, render_policy_context};
use crate::store::{ConversationMemory, PolicyStore};

pub const CHAT_FAILURE_REPLY: &str = "Oops, something went wrong! Please try again later 😅";
pub const IMAGE_FAILURE_REPLY: &str =
    "Oops, something went wrong while processing the image! Please try again later 😅";

pub const DEFAULT_SYSTEM_PROMPT: &str = "You are the Shopping AI Assistant for an e-commerce platform. \
You help users find products, answer product questions, and recommend items based on their preferences. \
Be polite, concise, and a bit playful (light humor, no sarcasm). \
If you don't know, say \"I don't know\". Reply in the user's language when possible. \
When a tool returns JSON with \"type\": \"product_list\", return that JSON verbatim and nothing else.";

#[derive(Debug, Clone)]
pub struct AssistantSettings {
    pub system_prompt: String,
    /// Policies handed to the model on the policy path.
    pub policy_limit: usize,
}

impl Default for AssistantSettings {
    fn default() -> Self {
        Self {
            system_prompt: DEFAULT_SYSTEM_PROMPT.to_string(),
            policy_limit: 5,
        }
    }
}

/// One inbound chat message.
#[derive(Debug, Clone, Default)]
pub struct ChatRequest {
    pub message: String,
    /// Blank or absent ⇒ a new id is generated.
    pub conversation_id: Option<String>,
    pub image: Option<ImageUpload>,
}

/// The answer to a chat message.
#[derive(Debug, Clone, PartialEq)]
pub struct ChatReply {
    pub conversation_id: String,
    pub intent: Intent,
    /// Product-list JSON, policy JSON, or conversational text.
    pub body: String,
    /// Set when a search ran and produced no items.
    pub empty_reason: Option<EmptyReason>,
}

/// Client-provided id, or a fresh UUID when blank/absent.
pub fn resolve_conversation_id(requested: Option<&str>) -> String {
    match requested.map(str::trim) {
        Some(id) if !id.is_empty() => id.to_string(),
        _ => uuid::Uuid::new_v4().to_string(),
    }
}

pub struct Assistant {
    classifier: Arc<dyn IntentClassifier>,
    orchestrator: Arc<SearchOrchestrator>,
    policies: Arc<dyn PolicyStore>,
    memory: Arc<dyn ConversationMemory>,
    model: Arc<dyn ChatModel>,
    settings: AssistantSettings,
}

impl Assistant {
    pub fn new(
        classifier: Arc<dyn IntentClassifier>,
        orchestrator: Arc<SearchOrchestrator>,
        policies: Arc<dyn PolicyStore>,
        memory: Arc<dyn ConversationMemory>,
        model: Arc<dyn ChatModel>,
        settings: AssistantSettings,
    ) -> Self {
        Self {
            classifier,
            orchestrator,
            policies,
            memory,
            model,
            settings,
        }
    }

    pub async fn chat(&self, request: ChatRequest) -> ChatReply {
        let conversation_id = resolve_conversation_id(request.conversation_id.as_deref());
        let query = NormalizedQuery::new(&request.message);

        if let Some(image) = request.image {
            return self.chat_with_image(conversation_id, query, image).await;
        }

        let intent = self.classifier.classify(&query).await;
        tracing::info!(
            conversation_id = %conversation_id,
            intent = %intent,
            classifier = self.classifier.name(),
            "classified message"
        );

        match intent {
            Intent::ProductSearch => {
                let spec = self.orchestrator.text_spec(&query);
                let outcome = self.orchestrator.search_text(&spec).await;
                search_reply(conversation_id, intent, outcome)
            }
            Intent::PolicyLookup => self.answer_policy(conversation_id, query).await,
            Intent::GeneralChat => {
                let prompt = self.prompt(&query.raw, None, None, true);
                let body = self
                    .converse(&conversation_id, prompt)
                    .await
                    .unwrap_or_else(|| CHAT_FAILURE_REPLY.to_string());
                ChatReply {
                    conversation_id,
                    intent,
                    body,
                    empty_reason: None,
                }
            }
        }
    }

    async fn chat_with_image(
        &self,
        conversation_id: String,
        query: NormalizedQuery,
        image: ImageUpload,
    ) -> ChatReply {
        let blank = query.normalized.is_empty();
        let intent = if blank {
            Intent::ProductSearch
        } else {
            self.classifier.classify(&query).await
        };
        tracing::info!(
            conversation_id = %conversation_id,
            intent = %intent,
            blank,
            "image message"
        );

        if intent == Intent::ProductSearch {
            let spec = self.orchestrator.image_spec(&query);
            let outcome = self.orchestrator.search_image(&spec, image).await;
            return search_reply(conversation_id, intent, outcome);
        }

        let prompt = self.prompt(&query.raw, None, Some(image), false);
        let body = self
            .converse(&conversation_id, prompt)
            .await
            .unwrap_or_else(|| IMAGE_FAILURE_REPLY.to_string());
        ChatReply {
            conversation_id,
            intent,
            body,
            empty_reason: None,
        }
    }

    async fn answer_policy(&self, conversation_id: String, query: NormalizedQuery) -> ChatReply {
        let documents = self.find_policies(&query).await;
        let context = (!documents.is_empty()).then(|| render_policy_context(&documents));
        let prompt = self.prompt(&query.raw, context, None, false);

        let body = match self.converse(&conversation_id, prompt).await {
            Some(answer) => answer,
            None if !documents.is_empty() => {
                policy_list_payload(Some(&query.normalized), &documents).to_string()
            }
            None => CHAT_FAILURE_REPLY.to_string(),
        };
        ChatReply {
            conversation_id,
            intent: Intent::PolicyLookup,
            body,
            empty_reason: None,
        }
    }

    /// Policies matching the message's policy vocabulary, else the newest.
    async fn find_policies(&self, query: &NormalizedQuery) -> Vec<Policy> {
        let limit = self.settings.policy_limit.max(1);
        let mut found: Vec<Policy> = Vec::new();

        for term in policy_terms(&query.normalized) {
            match self.policies.search(term, limit).await {
                Ok(hits) => {
                    for p in hits {
                        if !found.iter().any(|f| f.code == p.code) {
                            found.push(p);
                        }
                    }
                }
                Err(e) => tracing::warn!(term, error = %e, "policy search failed"),
            }
            if found.len() >= limit {
                break;
            }
        }
        found.truncate(limit);

        if found.is_empty() {
            match self.policies.list_newest(limit).await {
                Ok(newest) => found = newest,
                Err(e) => tracing::warn!(error = %e, "listing newest policies failed"),
            }
        }
        tracing::debug!(count = found.len(), "policies selected for context");
        found
    }

    fn prompt(
        &self,
        message: &str,
        context: Option<String>,
        image: Option<ImageUpload>,
        allow_tools: bool,
    ) -> ChatPrompt {
        ChatPrompt {
            system: self.settings.system_prompt.clone(),
            context,
            history: Vec::new(),
            message: message.to_string(),
            image,
            allow_tools,
        }
    }

    /// Call the model with the conversation window and record the exchange.
    ///
    /// Returns `None` when the model call fails.
    async fn converse(&self, conversation_id: &str, mut prompt: ChatPrompt) -> Option<String> {
        prompt.history = match self.memory.window(conversation_id).await {
            Ok(h) => h,
            Err(e) => {
                tracing::warn!(conversation_id, error = %e, "conversation window unavailable");
                Vec::new()
            }
        };
        let message = prompt.message.clone();

        let raw = match self.model.complete(prompt).await {
            Ok(raw) => raw,
            Err(e) => {
                tracing::error!(conversation_id, error = %e, "chat model call failed");
                return None;
            }
        };
        let body = enforce(&raw);

        for turn in [ConversationTurn::user(message), ConversationTurn::assistant(body.clone())] {
            if let Err(e) = self.memory.append(conversation_id, turn).await {
                tracing::warn!(conversation_id, error = %e, "failed to record conversation turn");
            }
        }
        Some(body)
    }
}

fn search_reply(conversation_id: String, intent: Intent, outcome: SearchOutcome) -> ChatReply {
    let empty_reason = outcome.empty_reason();
    if let Some(reason) = empty_reason {
        tracing::info!(conversation_id = %conversation_id, reason = reason.as_str(), "empty search result");
    }
    ChatReply {
        conversation_id,
        intent,
        body: outcome.into_payload().to_json(),
        empty_reason,
    }
}
