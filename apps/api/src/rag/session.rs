//! Session Store — in-memory sessions keyed by an opaque id.
//!
//! Each session lives behind its own async mutex, so two requests for the same id run one
//! after the other while different ids proceed in parallel. The map lock is only held
//! for lookups and inserts, never across a model call. Nothing is persisted.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::{Mutex, RwLock};
use tracing::debug;

use crate::rag::vector_index::{DistanceMetric, FlatIndex, VectorIndex};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TranscriptEntry {
    pub role: Role,
    pub text: String,
    pub at: DateTime<Utc>,
}

impl TranscriptEntry {
    pub fn new(role: Role, text: impl Into<String>) -> Self {
        Self {
            role,
            text: text.into(),
            at: Utc::now(),
        }
    }
}

/// One user's document index and chat history.
pub struct Session {
    id: String,
    index: Box<dyn VectorIndex>,
    transcript: Vec<TranscriptEntry>,
}

impl Session {
    fn new(id: String, index: Box<dyn VectorIndex>) -> Self {
        Self {
            id,
            index,
            transcript: Vec::new(),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn index(&self) -> &dyn VectorIndex {
        self.index.as_ref()
    }

    pub fn index_mut(&mut self) -> &mut dyn VectorIndex {
        self.index.as_mut()
    }

    pub fn transcript(&self) -> &[TranscriptEntry] {
        &self.transcript
    }

    /// Appends one question/answer exchange. Both entries go in together or not at all.
    pub fn record_exchange(&mut self, question: &str, answer: &str) {
        self.transcript.push(TranscriptEntry::new(Role::User, question));
        self.transcript
            .push(TranscriptEntry::new(Role::Assistant, answer));
    }

    pub fn clear_transcript(&mut self) {
        self.transcript.clear();
    }
}

pub type SessionHandle = Arc<Mutex<Session>>;

/// Owner of every live session. Constructed once at start-up and shared through `AppState`.
pub struct SessionStore {
    sessions: RwLock<HashMap<String, SessionHandle>>,
    metric: DistanceMetric,
}

impl SessionStore {
    pub fn new(metric: DistanceMetric) -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            metric,
        }
    }

    fn new_index(&self) -> Box<dyn VectorIndex> {
        Box::new(FlatIndex::new(self.metric))
    }

    pub async fn get(&self, session_id: &str) -> Option<SessionHandle> {
        self.sessions.read().await.get(session_id).cloned()
    }

    /// Returns the session for `session_id`, creating an empty one if needed.
    pub async fn get_or_create(&self, session_id: &str) -> SessionHandle {
        if let Some(existing) = self.get(session_id).await {
            return existing;
        }

        let mut sessions = self.sessions.write().await;
        sessions
            .entry(session_id.to_string())
            .or_insert_with(|| {
                debug!(session_id, "creating session");
                Arc::new(Mutex::new(Session::new(
                    session_id.to_string(),
                    self.new_index(),
                )))
            })
            .clone()
    }

    /// Swaps in an empty index and clears the transcript. The id stays registered.
    /// Unknown ids are ignored.
    pub async fn reset(&self, session_id: &str) {
        let Some(handle) = self.get(session_id).await else {
            return;
        };
        let mut session = handle.lock().await;
        session.index = self.new_index();
        session.transcript.clear();
        debug!(session_id = session.id(), "session reset");
    }

    /// Drops the session and its index. Returns whether it existed.
    pub async fn delete(&self, session_id: &str) -> bool {
        let removed = self.sessions.write().await.remove(session_id).is_some();
        if removed {
            debug!(session_id, "session deleted");
        }
        removed
    }

    /// Whether `handle` is still the session registered under `session_id`.
    /// False once the session was deleted, even if the id has since been reused.
    pub async fn is_current(&self, session_id: &str, handle: &SessionHandle) -> bool {
        self.sessions
            .read()
            .await
            .get(session_id)
            .is_some_and(|current| Arc::ptr_eq(current, handle))
    }

    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    #[cfg(test)]
    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}
