//! Retrieval pipeline — the caller-facing API of the RAG core.
//!
//! load_document: chunk → embed every chunk → one all-or-nothing `add`.
//! ask:           embed question → top-k search → context → generate → record exchange.
//!
//! Every model call runs under a timeout and finishes before session state is touched,
//! so a failed operation leaves the session exactly as it was.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tracing::{error, info, warn};

use crate::llm_client::prompts::render;
use crate::llm_client::LlmError;
use crate::rag::chunker::Chunker;
use crate::rag::embedder::Embedder;
use crate::rag::errors::RagError;
use crate::rag::generator::Generator;
use crate::rag::prompts::{ANSWER_PROMPT_TEMPLATE, CONTEXT_SEPARATOR};
use crate::rag::session::{SessionStore, TranscriptEntry};
use crate::rag::vector_index::SearchHit;

/// Tunables for retrieval and the model-call budgets.
#[derive(Debug, Clone, Copy)]
pub struct RetrievalSettings {
    pub top_k: usize,
    pub embed_timeout: Duration,
    pub generation_timeout: Duration,
}

impl Default for RetrievalSettings {
    fn default() -> Self {
        Self {
            top_k: 3,
            embed_timeout: Duration::from_secs(30),
            generation_timeout: Duration::from_secs(120),
        }
    }
}

/// Result of a successful `ask`.
#[derive(Debug, Clone, Serialize)]
pub struct Answer {
    pub text: String,
    pub sources: Vec<SearchHit>,
    pub transcript: Vec<TranscriptEntry>,
}

pub struct RagPipeline {
    sessions: SessionStore,
    chunker: Chunker,
    embedder: Arc<dyn Embedder>,
    generator: Arc<dyn Generator>,
    settings: RetrievalSettings,
}

impl RagPipeline {
    pub fn new(
        sessions: SessionStore,
        chunker: Chunker,
        embedder: Arc<dyn Embedder>,
        generator: Arc<dyn Generator>,
        settings: RetrievalSettings,
    ) -> Self {
        Self {
            sessions,
            chunker,
            embedder,
            generator,
            settings,
        }
    }

    pub fn sessions(&self) -> &SessionStore {
        &self.sessions
    }

    pub fn embedder(&self) -> &dyn Embedder {
        self.embedder.as_ref()
    }

    pub fn generator(&self) -> &dyn Generator {
        self.generator.as_ref()
    }

    #[cfg(test)]
    pub fn settings(&self) -> RetrievalSettings {
        self.settings
    }

    /// Embeds `text` under the embedding budget.
    pub async fn embed(&self, text: &str) -> Result<Vec<f32>, RagError> {
        with_timeout(
            "embedding",
            self.settings.embed_timeout,
            self.embedder.embed(text),
        )
        .await?
        .map_err(|e| match e {
            LlmError::Timeout => timeout_error("embedding", self.settings.embed_timeout),
            other => RagError::EmbeddingFailure(other),
        })
    }

    /// Chunks and indexes `text` for `session_id`, returning the number of chunks added.
    ///
    /// A load clears the session's chat history; earlier documents stay indexed.
    pub async fn load_document(&self, session_id: &str, text: &str) -> Result<usize, RagError> {
        let chunks = self.chunker.split(text, session_id);

        let mut entries = Vec::with_capacity(chunks.len());
        for chunk in chunks {
            let vector = self.embed(&chunk.text).await?;
            entries.push((vector, chunk));
        }
        let count = entries.len();

        let handle = self.sessions.get_or_create(session_id).await;
        let mut session = handle.lock().await;
        session.index_mut().add(entries).inspect_err(|e| {
            if matches!(e, RagError::DimensionMismatch { .. }) {
                error!(session_id, "embedder returned inconsistent dimensions: {e}");
            }
        })?;
        session.clear_transcript();

        info!(
            session_id,
            chunks = count,
            indexed = session.index().len(),
            dimension = ?session.index().dimension(),
            "document loaded"
        );
        Ok(count)
    }

    /// Answers `question` from the session's indexed document and records the exchange.
    pub async fn ask(&self, session_id: &str, question: &str) -> Result<Answer, RagError> {
        if question.trim().is_empty() {
            return Err(RagError::Validation("question cannot be empty".to_string()));
        }

        let handle = self
            .sessions
            .get(session_id)
            .await
            .ok_or_else(|| RagError::NoDocumentLoaded(session_id.to_string()))?;

        // Held for the whole exchange: same-session questions are answered one at a time.
        let mut session = handle.lock().await;
        if session.index().is_empty() {
            return Err(RagError::NoDocumentLoaded(session_id.to_string()));
        }

        let query = self.embed(question).await.map_err(|e| match e {
            RagError::EmbeddingFailure(cause) => RagError::AnswerGenerationFailure(cause),
            other => other,
        })?;

        let hits = session
            .index()
            .search(&query, self.settings.top_k)
            .inspect_err(|e| error!(session_id, "search failed: {e}"))?;
        let context = build_context(&hits);
        let prompt = render(
            ANSWER_PROMPT_TEMPLATE,
            &[("question", question), ("context", &context)],
        );

        let text = with_timeout(
            "generation",
            self.settings.generation_timeout,
            self.generator.generate(&prompt),
        )
        .await?
        .map_err(|e| match e {
            LlmError::Timeout => timeout_error("generation", self.settings.generation_timeout),
            other => {
                warn!(session_id, "generation failed: {other}");
                RagError::AnswerGenerationFailure(other)
            }
        })?;

        // A delete that landed while the model was answering wins; nothing is recorded.
        if !self.sessions.is_current(session_id, &handle).await {
            warn!(session_id, "session deleted while answering");
            return Err(RagError::NoDocumentLoaded(session_id.to_string()));
        }

        session.record_exchange(question, &text);
        info!(
            session_id,
            retrieved = hits.len(),
            transcript_len = session.transcript().len(),
            "question answered"
        );

        Ok(Answer {
            text,
            sources: hits,
            transcript: session.transcript().to_vec(),
        })
    }

    pub async fn reset_session(&self, session_id: &str) {
        self.sessions.reset(session_id).await;
    }

    pub async fn delete_session(&self, session_id: &str) -> bool {
        self.sessions.delete(session_id).await
    }

    /// Empties the chat history but keeps the indexed document.
    pub async fn clear_chat(&self, session_id: &str) {
        if let Some(handle) = self.sessions.get(session_id).await {
            handle.lock().await.clear_transcript();
        }
    }

    /// Transcript of `session_id`; unknown sessions have an empty one.
    pub async fn messages(&self, session_id: &str) -> Vec<TranscriptEntry> {
        match self.sessions.get(session_id).await {
            Some(handle) => handle.lock().await.transcript().to_vec(),
            None => Vec::new(),
        }
    }
}

/// Joins retrieved chunk texts in ranked order.
pub fn build_context(hits: &[SearchHit]) -> String {
    hits.iter()
        .map(|h| h.chunk.text.as_str())
        .collect::<Vec<_>>()
        .join(CONTEXT_SEPARATOR)
}

async fn with_timeout<F: Future>(
    operation: &'static str,
    budget: Duration,
    fut: F,
) -> Result<F::Output, RagError> {
    tokio::time::timeout(budget, fut)
        .await
        .map_err(|_| timeout_error(operation, budget))
}

fn timeout_error(operation: &'static str, budget: Duration) -> RagError {
    warn!("{operation} exceeded its {}s budget", budget.as_secs());
    RagError::Timeout {
        operation,
        seconds: budget.as_secs(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rag::session::Role;
    use crate::rag::testing::{
        pipeline_with, ClientTimeoutEmbedder, FailingGenerator, HashEmbedder, RecordingGenerator,
        SlowEmbedder, SlowGenerator,
    };
    use crate::rag::vector_index::DistanceMetric;

    fn default_pipeline() -> RagPipeline {
        pipeline_with(
            Arc::new(HashEmbedder::default()),
            Arc::new(RecordingGenerator::default()),
        )
    }

    #[tokio::test]
    async fn test_load_document_reports_chunk_count() {
        let pipeline = default_pipeline();
        let text = "x".repeat(2500);
        assert_eq!(pipeline.load_document("s1", &text).await.unwrap(), 3);

        let handle = pipeline.sessions().get("s1").await.unwrap();
        assert_eq!(handle.lock().await.index().len(), 3);
    }

    #[tokio::test]
    async fn test_load_empty_text_indexes_nothing() {
        let pipeline = default_pipeline();
        assert_eq!(pipeline.load_document("s1", "").await.unwrap(), 0);
        let err = pipeline.ask("s1", "anything?").await.unwrap_err();
        assert!(matches!(err, RagError::NoDocumentLoaded(_)));
    }

    #[tokio::test]
    async fn test_ask_without_document_leaves_transcript_empty() {
        let pipeline = default_pipeline();
        let err = pipeline.ask("never-loaded", "hello?").await.unwrap_err();
        assert!(matches!(err, RagError::NoDocumentLoaded(_)));
        assert!(pipeline.messages("never-loaded").await.is_empty());
    }

    #[tokio::test]
    async fn test_two_questions_produce_alternating_transcript() {
        let pipeline = default_pipeline();
        pipeline
            .load_document("s1", "Rust is a systems programming language.")
            .await
            .unwrap();

        pipeline.ask("s1", "What is Rust?").await.unwrap();
        let answer = pipeline.ask("s1", "Is it fast?").await.unwrap();

        let roles: Vec<Role> = answer.transcript.iter().map(|e| e.role).collect();
        assert_eq!(
            roles,
            vec![Role::User, Role::Assistant, Role::User, Role::Assistant]
        );
        assert_eq!(answer.transcript[2].text, "Is it fast?");
        assert_eq!(pipeline.messages("s1").await.len(), 4);
    }

    #[tokio::test]
    async fn test_prompt_contains_question_and_ranked_context() {
        let generator = Arc::new(RecordingGenerator::default());
        let pipeline = pipeline_with(Arc::new(HashEmbedder::default()), generator.clone());
        pipeline.load_document("s1", "alpha beta gamma").await.unwrap();

        let answer = pipeline.ask("s1", "alpha beta gamma").await.unwrap();
        let prompt = generator.last_prompt().expect("generator was called");
        assert!(prompt.contains("Question: alpha beta gamma"));
        assert!(prompt.contains(&build_context(&answer.sources)));
        assert_eq!(answer.text, "answer #1");
    }

    #[tokio::test]
    async fn test_generation_failure_keeps_transcript() {
        let pipeline = pipeline_with(Arc::new(HashEmbedder::default()), Arc::new(FailingGenerator));
        pipeline.load_document("s1", "some document text").await.unwrap();

        let err = pipeline.ask("s1", "question?").await.unwrap_err();
        assert!(matches!(err, RagError::AnswerGenerationFailure(_)));
        assert!(pipeline.messages("s1").await.is_empty());
    }

    #[tokio::test]
    async fn test_embedding_failure_on_question_is_answer_failure() {
        let embedder = Arc::new(HashEmbedder::default());
        let pipeline = pipeline_with(embedder.clone(), Arc::new(RecordingGenerator::default()));
        pipeline.load_document("s1", "some document text").await.unwrap();

        embedder.fail_from_now_on();
        let err = pipeline.ask("s1", "question?").await.unwrap_err();
        assert!(matches!(err, RagError::AnswerGenerationFailure(_)));
        assert!(pipeline.messages("s1").await.is_empty());
    }

    #[tokio::test]
    async fn test_embedding_failure_on_load_leaves_session_unchanged() {
        let embedder = Arc::new(HashEmbedder::default());
        let pipeline = pipeline_with(embedder.clone(), Arc::new(RecordingGenerator::default()));
        pipeline.load_document("s1", "first document").await.unwrap();
        pipeline.ask("s1", "q").await.unwrap();

        embedder.fail_from_now_on();
        let err = pipeline.load_document("s1", "second document").await.unwrap_err();
        assert!(matches!(err, RagError::EmbeddingFailure(_)));

        let handle = pipeline.sessions().get("s1").await.unwrap();
        let session = handle.lock().await;
        assert_eq!(session.index().len(), 1);
        assert_eq!(session.transcript().len(), 2);
    }

    #[tokio::test]
    async fn test_load_clears_chat_and_appends_to_index() {
        let pipeline = default_pipeline();
        pipeline.load_document("s1", "first").await.unwrap();
        pipeline.ask("s1", "q").await.unwrap();
        pipeline.load_document("s1", "second").await.unwrap();

        assert!(pipeline.messages("s1").await.is_empty());
        let handle = pipeline.sessions().get("s1").await.unwrap();
        assert_eq!(handle.lock().await.index().len(), 2);
    }

    #[tokio::test]
    async fn test_clear_chat_keeps_document() {
        let pipeline = default_pipeline();
        pipeline.load_document("s1", "document").await.unwrap();
        pipeline.ask("s1", "q").await.unwrap();

        pipeline.clear_chat("s1").await;
        assert!(pipeline.messages("s1").await.is_empty());
        assert!(pipeline.ask("s1", "again").await.is_ok());
    }

    #[tokio::test]
    async fn test_reset_twice_then_ask_fails() {
        let pipeline = default_pipeline();
        pipeline.load_document("s1", "document").await.unwrap();
        pipeline.ask("s1", "q").await.unwrap();

        pipeline.reset_session("s1").await;
        pipeline.reset_session("s1").await;

        assert!(pipeline.messages("s1").await.is_empty());
        assert!(matches!(
            pipeline.ask("s1", "q").await,
            Err(RagError::NoDocumentLoaded(_))
        ));
    }

    #[tokio::test]
    async fn test_delete_session() {
        let pipeline = default_pipeline();
        pipeline.load_document("s1", "document").await.unwrap();
        assert!(pipeline.delete_session("s1").await);
        assert!(pipeline.sessions().get("s1").await.is_none());
    }

    #[tokio::test]
    async fn test_blank_question_rejected() {
        let pipeline = default_pipeline();
        pipeline.load_document("s1", "document").await.unwrap();
        assert!(matches!(
            pipeline.ask("s1", "   ").await,
            Err(RagError::Validation(_))
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_slow_generation_times_out() {
        let pipeline = pipeline_with(
            Arc::new(HashEmbedder::default()),
            Arc::new(SlowGenerator(Duration::from_secs(600))),
        );
        pipeline.load_document("s1", "document").await.unwrap();

        let err = pipeline.ask("s1", "q").await.unwrap_err();
        assert!(matches!(
            err,
            RagError::Timeout {
                operation: "generation",
                seconds: 120
            }
        ));
        assert!(pipeline.messages("s1").await.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_slow_embedding_on_load_times_out() {
        let embedder = Arc::new(SlowEmbedder::new(Duration::from_secs(600)));
        let pipeline = pipeline_with(embedder.clone(), Arc::new(RecordingGenerator::default()));
        pipeline.load_document("s1", "first document").await.unwrap();
        pipeline.ask("s1", "q").await.unwrap();

        embedder.slow_from_now_on();
        let err = pipeline
            .load_document("s1", "second document")
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            RagError::Timeout {
                operation: "embedding",
                seconds: 30
            }
        ));

        let handle = pipeline.sessions().get("s1").await.unwrap();
        let session = handle.lock().await;
        assert_eq!(session.index().len(), 1);
        assert_eq!(session.transcript().len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_slow_embedding_on_question_times_out() {
        let embedder = Arc::new(SlowEmbedder::new(Duration::from_secs(600)));
        let pipeline = pipeline_with(embedder.clone(), Arc::new(RecordingGenerator::default()));
        pipeline.load_document("s1", "document").await.unwrap();
        pipeline.ask("s1", "first").await.unwrap();

        embedder.slow_from_now_on();
        let err = pipeline.ask("s1", "second").await.unwrap_err();
        assert!(matches!(
            err,
            RagError::Timeout {
                operation: "embedding",
                seconds: 30
            }
        ));
        assert_eq!(pipeline.messages("s1").await.len(), 2);
    }

    #[tokio::test]
    async fn test_client_timeout_maps_to_timeout() {
        let pipeline = pipeline_with(
            Arc::new(ClientTimeoutEmbedder),
            Arc::new(RecordingGenerator::default()),
        );
        assert!(matches!(
            pipeline.embed("text").await,
            Err(RagError::Timeout {
                operation: "embedding",
                seconds: 30
            })
        ));
        assert!(matches!(
            pipeline.load_document("s1", "text").await,
            Err(RagError::Timeout { .. })
        ));
        assert!(pipeline.sessions().get("s1").await.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_same_session_serialised_other_sessions_parallel() {
        let delay = Duration::from_secs(10);
        let pipeline = pipeline_with(
            Arc::new(HashEmbedder::default()),
            Arc::new(SlowGenerator(delay)),
        );
        pipeline.load_document("a", "document a").await.unwrap();
        pipeline.load_document("b", "document b").await.unwrap();

        let start = tokio::time::Instant::now();
        let (first, second, other) = tokio::join!(
            pipeline.ask("a", "one"),
            pipeline.ask("a", "two"),
            pipeline.ask("b", "three"),
        );
        let elapsed = start.elapsed();
        first.unwrap();
        second.unwrap();
        other.unwrap();

        // Two back-to-back answers for "a"; "b" overlaps with the first of them.
        assert!(elapsed >= delay * 2, "elapsed {elapsed:?}");
        assert!(elapsed < delay * 3, "elapsed {elapsed:?}");

        let transcript = pipeline.messages("a").await;
        let roles: Vec<Role> = transcript.iter().map(|e| e.role).collect();
        assert_eq!(
            roles,
            vec![Role::User, Role::Assistant, Role::User, Role::Assistant]
        );
        assert_eq!(transcript[0].text, "one");
        assert_eq!(transcript[2].text, "two");
        assert_eq!(pipeline.messages("b").await.len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_delete_during_ask_discards_exchange() {
        let pipeline = pipeline_with(
            Arc::new(HashEmbedder::default()),
            Arc::new(SlowGenerator(Duration::from_secs(10))),
        );
        pipeline.load_document("s1", "document").await.unwrap();

        let (answer, deleted) = tokio::join!(pipeline.ask("s1", "q"), async {
            tokio::time::sleep(Duration::from_secs(1)).await;
            pipeline.delete_session("s1").await
        });

        assert!(deleted);
        assert!(matches!(answer, Err(RagError::NoDocumentLoaded(_))));
        assert!(pipeline.sessions().get("s1").await.is_none());
        assert!(pipeline.messages("s1").await.is_empty());
    }

    #[tokio::test]
    async fn test_top_k_limits_sources() {
        let pipeline = default_pipeline();
        let text = "abcdefghij".repeat(500);
        pipeline.load_document("s1", &text).await.unwrap();
        let answer = pipeline.ask("s1", "abc").await.unwrap();
        assert_eq!(answer.sources.len(), 3);
        assert!(answer
            .sources
            .windows(2)
            .all(|w| w[0].distance <= w[1].distance));
    }

    #[test]
    fn test_build_context_joins_with_blank_line() {
        use crate::rag::chunker::Chunk;
        let hit = |t: &str| SearchHit {
            chunk: Chunk {
                text: t.to_string(),
                source_offset: 0,
                session_id: "s".to_string(),
            },
            distance: 0.0,
        };
        assert_eq!(build_context(&[hit("one"), hit("two")]), "one\n\ntwo");
        assert_eq!(build_context(&[]), "");
    }

    #[test]
    fn test_cosine_pipeline_builds() {
        let store = SessionStore::new(DistanceMetric::Cosine);
        let pipeline = RagPipeline::new(
            store,
            Chunker::new(10, 2).unwrap(),
            Arc::new(HashEmbedder::default()),
            Arc::new(RecordingGenerator::default()),
            RetrievalSettings::default(),
        );
        assert_eq!(pipeline.settings().top_k, 3);
    }
}
