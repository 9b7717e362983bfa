//! Search orchestration: dispatch, score reconciliation, threshold, projection.
//!
//! # Pipeline
//!
//! 1. Call the text or image backend.
//! 2. Failure, `success=false`, or a missing/empty list → tagged empty payload.
//! 3. Normalize each score to a similarity ([`normalize_score`]).
//! 4. Keep results with `similarity >= min_similarity`.
//! 5. Truncate to `result_limit`. Backend order is authoritative; nothing is re-sorted.
//! 6. Project each record ([`project`]) and build the [`SearchPayload`].

use std::sync::Arc;

use crate::backend::{
    BackendError, BackendReply, ImageSearchBackend, ImageSearchRequest, TextSearchBackend,
    TextSearchRequest,
};
use crate::intent::extract_result_limit;
use crate::models::{ImageUpload, NormalizedQuery, NormalizedResult, RawSearchResult, SearchPayload, SearchSpec};
use crate::project::project;
use crate::score::normalize_score;

/// Message for every empty payload caused by the backend side.
pub const NO_MATCH_MESSAGE: &str = "no match (no results or search-service error)";

/// Tuning for the text-embedding backend.
#[derive(Debug, Clone, PartialEq)]
pub struct TextSearchSettings {
    pub top_k: u32,
    pub result_limit: u32,
    pub min_similarity: f64,
}

impl Default for TextSearchSettings {
    fn default() -> Self {
        Self {
            top_k: 10,
            result_limit: 4,
            min_similarity: 0.7,
        }
    }
}

/// Tuning for the image-embedding backend.
#[derive(Debug, Clone, PartialEq)]
pub struct ImageSearchSettings {
    pub top_k: u32,
    pub candidate_k: u32,
    pub per_product_rerank: u32,
    pub result_limit: u32,
    pub min_similarity: f64,
}

impl Default for ImageSearchSettings {
    fn default() -> Self {
        Self {
            top_k: 10,
            candidate_k: 50,
            per_product_rerank: 3,
            result_limit: 5,
            min_similarity: 0.8,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SearchSettings {
    pub text: TextSearchSettings,
    pub image: ImageSearchSettings,
    /// Upper bound for a count the user asks for.
    pub max_result_limit: u32,
}

impl Default for SearchSettings {
    fn default() -> Self {
        Self {
            text: TextSearchSettings::default(),
            image: ImageSearchSettings::default(),
            max_result_limit: 20,
        }
    }
}

/// Why a search produced no items.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmptyReason {
    /// The backend call failed (transport, status, decode).
    BackendError,
    /// The backend answered with `success=false`.
    BackendRejected,
    /// The backend returned a null or empty list.
    NoResults,
    /// Results came back but none reached `min_similarity`.
    BelowThreshold,
}

impl EmptyReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            EmptyReason::BackendError => "backend_error",
            EmptyReason::BackendRejected => "backend_rejected",
            EmptyReason::NoResults => "no_results",
            EmptyReason::BelowThreshold => "below_threshold",
        }
    }
}

/// Result of one orchestrated search.
#[derive(Debug, Clone, PartialEq)]
pub enum SearchOutcome {
    Found(SearchPayload),
    Empty {
        reason: EmptyReason,
        payload: SearchPayload,
    },
}

impl SearchOutcome {
    pub fn payload(&self) -> &SearchPayload {
        match self {
            SearchOutcome::Found(p) => p,
            SearchOutcome::Empty { payload, .. } => payload,
        }
    }

    pub fn into_payload(self) -> SearchPayload {
        match self {
            SearchOutcome::Found(p) => p,
            SearchOutcome::Empty { payload, .. } => payload,
        }
    }

    pub fn empty_reason(&self) -> Option<EmptyReason> {
        match self {
            SearchOutcome::Found(_) => None,
            SearchOutcome::Empty { reason, .. } => Some(*reason),
        }
    }

    fn empty(reason: EmptyReason, spec: &SearchSpec) -> Self {
        let message = match reason {
            EmptyReason::BelowThreshold => {
                format!("no match above similarity {:.2}", spec.min_similarity)
            }
            _ => NO_MATCH_MESSAGE.to_string(),
        };
        SearchOutcome::Empty {
            reason,
            payload: SearchPayload::empty(message),
        }
    }
}

/// Normalize, threshold and truncate, preserving backend order.
pub fn select_matches(results: Vec<RawSearchResult>, spec: &SearchSpec) -> Vec<NormalizedResult> {
    results
        .into_iter()
        .map(|r| NormalizedResult {
            similarity: normalize_score(r.raw_score),
            product: r.product,
        })
        .filter(|r| r.similarity >= spec.min_similarity)
        .take(spec.result_limit as usize)
        .collect()
}

fn plural(n: usize, word: &str) -> String {
    if n == 1 {
        format!("{} {}", n, word)
    } else {
        format!("{} {}s", n, word)
    }
}

/// Coordinates the two search backends.
pub struct SearchOrchestrator {
    text: Arc<dyn TextSearchBackend>,
    image: Arc<dyn ImageSearchBackend>,
    settings: SearchSettings,
}

impl SearchOrchestrator {
    pub fn new(
        text: Arc<dyn TextSearchBackend>,
        image: Arc<dyn ImageSearchBackend>,
        settings: SearchSettings,
    ) -> Self {
        Self {
            text,
            image,
            settings,
        }
    }

    pub fn settings(&self) -> &SearchSettings {
        &self.settings
    }

    /// Build a text [`SearchSpec`] from a message, extracting any requested count.
    pub fn text_spec(&self, query: &NormalizedQuery) -> SearchSpec {
        SearchSpec {
            query: query.search_text(),
            result_limit: extract_result_limit(
                &query.normalized,
                self.settings.text.result_limit,
                self.settings.max_result_limit,
            ),
            min_similarity: self.settings.text.min_similarity,
        }
    }

    /// Build an image [`SearchSpec`]; the message only contributes a count.
    pub fn image_spec(&self, query: &NormalizedQuery) -> SearchSpec {
        SearchSpec {
            query: query.search_text(),
            result_limit: extract_result_limit(
                &query.normalized,
                self.settings.image.result_limit,
                self.settings.max_result_limit,
            ),
            min_similarity: self.settings.image.min_similarity,
        }
    }

    /// Semantic text search.
    pub async fn search_text(&self, spec: &SearchSpec) -> SearchOutcome {
        if spec.query.trim().is_empty() {
            tracing::debug!("blank query, skipping text search");
            return SearchOutcome::empty(EmptyReason::NoResults, spec);
        }

        tracing::info!(query = %spec.query, limit = spec.result_limit, "text search");
        let request = TextSearchRequest {
            query: spec.query.clone(),
            top_k: self.settings.text.top_k.max(spec.result_limit),
        };
        let reply = self.text.search(&request).await;
        let query = spec.query.clone();
        self.finish(reply, spec, move |n| {
            format!("Results for \"{}\": {}", query, plural(n, "product"))
        })
    }

    /// Image similarity search.
    pub async fn search_image(&self, spec: &SearchSpec, image: ImageUpload) -> SearchOutcome {
        let settings = &self.settings.image;
        tracing::info!(
            filename = %image.filename,
            bytes = image.bytes.len(),
            limit = spec.result_limit,
            "image search"
        );
        let request = ImageSearchRequest {
            image,
            top_k: settings.top_k.max(spec.result_limit),
            candidate_k: settings.candidate_k,
            per_product_rerank: settings.per_product_rerank,
            min_similarity: spec.min_similarity,
        };
        let reply = self.image.search(&request).await;
        self.finish(reply, spec, |n| format!("Found {}", plural(n, "similar product")))
    }

    fn finish(
        &self,
        reply: Result<BackendReply, BackendError>,
        spec: &SearchSpec,
        message: impl FnOnce(usize) -> String,
    ) -> SearchOutcome {
        let reply = match reply {
            Ok(r) => r,
            Err(e) => {
                tracing::warn!(error = %e, "search backend call failed");
                return SearchOutcome::empty(EmptyReason::BackendError, spec);
            }
        };

        if !reply.success {
            tracing::warn!(error = ?reply.error, "search backend reported failure");
            return SearchOutcome::empty(EmptyReason::BackendRejected, spec);
        }

        let results = match reply.results {
            Some(r) if !r.is_empty() => r,
            _ => {
                tracing::info!("search backend returned no results");
                return SearchOutcome::empty(EmptyReason::NoResults, spec);
            }
        };

        let received = results.len();
        let matches = select_matches(results, spec);
        if matches.is_empty() {
            tracing::info!(
                received,
                min_similarity = spec.min_similarity,
                "no result reached the similarity threshold"
            );
            return SearchOutcome::empty(EmptyReason::BelowThreshold, spec);
        }

        let items: Vec<_> = matches.iter().map(|m| project(&m.product)).collect();
        tracing::info!(received, returned = items.len(), "search complete");
        SearchOutcome::Found(SearchPayload::new(Some(message(items.len())), items))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use serde_json::{json, Map, Value};
    use std::sync::Mutex;

    fn raw(id: &str, score: Option<f64>) -> RawSearchResult {
        let mut product = Map::new();
        product.insert("_id".into(), Value::String(id.into()));
        product.insert("name".into(), Value::String(format!("Product {}", id)));
        RawSearchResult {
            product,
            raw_score: score,
            matched_text: None,
        }
    }

    fn ids(payload: &SearchPayload) -> Vec<&str> {
        payload.items.iter().map(|i| i.id.as_str()).collect()
    }

    struct Scripted {
        reply: Mutex<Option<Result<BackendReply, BackendError>>>,
        seen: Mutex<Vec<TextSearchRequest>>,
    }

    impl Scripted {
        fn new(reply: Result<BackendReply, BackendError>) -> Arc<Self> {
            Arc::new(Self {
                reply: Mutex::new(Some(reply)),
                seen: Mutex::new(Vec::new()),
            })
        }

        fn ok(results: Option<Vec<RawSearchResult>>) -> Arc<Self> {
            Self::new(Ok(BackendReply {
                success: true,
                results,
                error: None,
            }))
        }
    }

    #[async_trait]
    impl TextSearchBackend for Scripted {
        async fn search(&self, request: &TextSearchRequest) -> Result<BackendReply, BackendError> {
            self.seen.lock().unwrap().push(request.clone());
            self.reply.lock().unwrap().take().expect("called once")
        }
    }

    #[async_trait]
    impl ImageSearchBackend for Scripted {
        async fn search(&self, _request: &ImageSearchRequest) -> Result<BackendReply, BackendError> {
            self.reply.lock().unwrap().take().expect("called once")
        }
    }

    fn orchestrator(backend: Arc<Scripted>) -> SearchOrchestrator {
        SearchOrchestrator::new(backend.clone(), backend, SearchSettings::default())
    }

    fn spec(limit: u32, min: f64) -> SearchSpec {
        SearchSpec {
            query: "áo hoodie đen".into(),
            result_limit: limit,
            min_similarity: min,
        }
    }

    #[test]
    fn threshold_then_truncate_in_backend_order() {
        let results = vec![
            raw("a", Some(0.9)),
            raw("b", Some(0.5)),
            raw("c", Some(0.8)),
            raw("d", Some(0.95)),
            raw("e", Some(0.75)),
        ];
        let kept = select_matches(results, &spec(3, 0.7));
        let kept_ids: Vec<_> = kept.iter().map(|r| r.product["_id"].as_str().unwrap()).collect();
        assert_eq!(kept_ids, vec!["a", "c", "d"]);
        assert!(kept.iter().all(|r| r.similarity >= 0.7));
    }

    #[test]
    fn distances_and_missing_scores_are_reconciled() {
        let results = vec![
            raw("exact", Some(0.0)),
            raw("far", Some(3.0)),
            raw("none", None),
            raw("near", Some(1.1)),
        ];
        let kept = select_matches(results, &spec(10, 0.25));
        let kept_ids: Vec<_> = kept.iter().map(|r| r.product["_id"].as_str().unwrap()).collect();
        // 0.0 is a similarity, not a distance
        assert_eq!(kept_ids, vec!["far", "near"]);
    }

    #[tokio::test]
    async fn five_results_two_above_threshold() {
        let backend = Scripted::ok(Some(vec![
            raw("p1", Some(0.4)),
            raw("p2", Some(0.91)),
            raw("p3", Some(0.2)),
            raw("p4", Some(0.72)),
            raw("p5", Some(0.69)),
        ]));
        let outcome = orchestrator(backend.clone()).search_text(&spec(4, 0.7)).await;
        assert_eq!(outcome.empty_reason(), None);
        let payload = outcome.payload();
        assert_eq!(payload.kind, "product_list");
        assert_eq!(ids(payload), vec!["p2", "p4"]);
        assert_eq!(
            payload.message.as_deref(),
            Some("Results for \"áo hoodie đen\": 2 products")
        );
        let seen = backend.seen.lock().unwrap();
        assert_eq!(seen[0].query, "áo hoodie đen");
        assert_eq!(seen[0].top_k, 10);
    }

    #[tokio::test]
    async fn empty_list_is_no_match() {
        let outcome = orchestrator(Scripted::ok(Some(vec![]))).search_text(&spec(4, 0.7)).await;
        assert_eq!(outcome.empty_reason(), Some(EmptyReason::NoResults));
        assert_eq!(
            outcome.payload().to_json(),
            r#"{"type":"product_list","message":"no match (no results or search-service error)","items":[]}"#
        );
    }

    #[tokio::test]
    async fn null_list_and_rejections_and_errors_are_tagged() {
        let outcome = orchestrator(Scripted::ok(None)).search_text(&spec(4, 0.7)).await;
        assert_eq!(outcome.empty_reason(), Some(EmptyReason::NoResults));

        let rejected = Scripted::new(Ok(BackendReply {
            success: false,
            results: Some(vec![raw("x", Some(0.99))]),
            error: Some("index not ready".into()),
        }));
        let outcome = orchestrator(rejected).search_text(&spec(4, 0.7)).await;
        assert_eq!(outcome.empty_reason(), Some(EmptyReason::BackendRejected));
        assert!(outcome.payload().items.is_empty());

        let failing = Scripted::new(Err(BackendError::Transport("connection refused".into())));
        let outcome = orchestrator(failing).search_text(&spec(4, 0.7)).await;
        assert_eq!(outcome.empty_reason(), Some(EmptyReason::BackendError));
        assert_eq!(outcome.payload().message.as_deref(), Some(NO_MATCH_MESSAGE));
    }

    #[tokio::test]
    async fn below_threshold_is_distinguishable() {
        let backend = Scripted::ok(Some(vec![raw("p1", Some(0.1)), raw("p2", Some(0.3))]));
        let outcome = orchestrator(backend).search_text(&spec(4, 0.7)).await;
        assert_eq!(outcome.empty_reason(), Some(EmptyReason::BelowThreshold));
        assert_eq!(
            outcome.payload().message.as_deref(),
            Some("no match above similarity 0.70")
        );
        assert_ne!(outcome.payload().message.as_deref(), Some(NO_MATCH_MESSAGE));
    }

    #[tokio::test]
    async fn blank_query_never_reaches_backend() {
        let backend = Scripted::ok(Some(vec![raw("p1", Some(0.9))]));
        let mut s = spec(4, 0.7);
        s.query = "   ".into();
        let outcome = orchestrator(backend.clone()).search_text(&s).await;
        assert_eq!(outcome.empty_reason(), Some(EmptyReason::NoResults));
        assert!(backend.seen.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn image_search_projects_matches() {
        let mut with_images = raw("img1", Some(0.88));
        with_images
            .product
            .insert("images".into(), json!(["clip.mp4", "front.png"]));
        let backend = Scripted::ok(Some(vec![with_images, raw("img2", Some(0.5))]));
        let image = ImageUpload {
            bytes: vec![0xFF, 0xD8],
            filename: "q.jpg".into(),
            content_type: "image/jpeg".into(),
        };
        let outcome = orchestrator(backend).search_image(&spec(5, 0.8), image).await;
        let payload = outcome.payload();
        assert_eq!(ids(payload), vec!["img1"]);
        assert_eq!(payload.items[0].image_url, "front.png");
        assert_eq!(payload.message.as_deref(), Some("Found 1 similar product"));
    }

    #[test]
    fn specs_use_per_backend_defaults() {
        let o = orchestrator(Scripted::ok(None));
        let q = NormalizedQuery::new("Tìm  áo hoodie màu đen");
        let text = o.text_spec(&q);
        assert_eq!(text.query, "Tìm áo hoodie màu đen");
        assert_eq!(text.result_limit, 4);
        assert_eq!(text.min_similarity, 0.7);

        let image = o.image_spec(&NormalizedQuery::new("cho 2 sản phẩm đầu"));
        assert_eq!(image.result_limit, 2);
        assert_eq!(image.min_similarity, 0.8);
    }
}
