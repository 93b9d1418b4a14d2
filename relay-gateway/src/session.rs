//! Rolling per-session conversation history.
//!
//! Each session keeps at most `max_context` turns; appending past the cap
//! evicts the oldest turns first.

use async_trait::async_trait;
use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};

/// Default number of turns retained per session.
pub const MAX_CONTEXT: usize = 10;

/// Speaker of a turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

impl Role {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Assistant => "assistant",
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One message within a session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Turn {
    pub role: Role,
    pub message: String,
    /// ISO-8601 UTC timestamp
    pub timestamp: String,
}

impl Turn {
    /// Create a turn stamped with the current UTC time.
    pub fn now(role: Role, message: impl Into<String>) -> Self {
        Self {
            role,
            message: message.into(),
            timestamp: Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true),
        }
    }
}

/// Key-value style store of session histories.
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Append a turn, creating the session if absent, then trim to the cap.
    async fn append(&self, session_id: &str, role: Role, message: &str);

    /// Current history, oldest first. Unknown sessions are empty.
    async fn get(&self, session_id: &str) -> Vec<Turn>;

    /// Number of turns currently held for a session.
    async fn history_len(&self, session_id: &str) -> usize;

    /// Number of distinct sessions held.
    async fn session_count(&self) -> usize;
}

type SessionSlot = Arc<Mutex<VecDeque<Turn>>>;

/// In-process session store.
///
/// The map lock is only held to look up or insert a slot; each session's
/// append-and-trim runs under that session's own mutex.
pub struct InMemorySessionStore {
    sessions: RwLock<HashMap<String, SessionSlot>>,
    max_context: usize,
}

impl InMemorySessionStore {
    pub fn new(max_context: usize) -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            max_context: max_context.max(1),
        }
    }

    async fn slot(&self, session_id: &str) -> SessionSlot {
        if let Some(slot) = self.sessions.read().await.get(session_id) {
            return Arc::clone(slot);
        }

        let mut sessions = self.sessions.write().await;
        let slot = sessions.entry(session_id.to_string()).or_insert_with(|| {
            tracing::debug!(session_id, "Creating session");
            Arc::new(Mutex::new(VecDeque::with_capacity(self.max_context + 1)))
        });
        Arc::clone(slot)
    }
}

impl Default for InMemorySessionStore {
    fn default() -> Self {
        Self::new(MAX_CONTEXT)
    }
}

#[async_trait]
impl SessionStore for InMemorySessionStore {
    async fn append(&self, session_id: &str, role: Role, message: &str) {
        let slot = self.slot(session_id).await;
        let mut turns = slot.lock().await;

        turns.push_back(Turn::now(role, message));
        while turns.len() > self.max_context {
            turns.pop_front();
        }
    }

    async fn get(&self, session_id: &str) -> Vec<Turn> {
        let slot = match self.sessions.read().await.get(session_id) {
            Some(slot) => Arc::clone(slot),
            None => return Vec::new(),
        };
        let turns = slot.lock().await;
        turns.iter().cloned().collect()
    }

    async fn history_len(&self, session_id: &str) -> usize {
        let slot = match self.sessions.read().await.get(session_id) {
            Some(slot) => Arc::clone(slot),
            None => return 0,
        };
        let len = slot.lock().await.len();
        len
    }

    async fn session_count(&self) -> usize {
        self.sessions.read().await.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn absent_session_is_empty() {
        let store = InMemorySessionStore::default();
        assert!(store.get("nobody").await.is_empty());
        assert_eq!(store.session_count().await, 0);
    }

    #[tokio::test]
    async fn append_creates_session_lazily() {
        let store = InMemorySessionStore::default();
        store.append("s1", Role::User, "hello").await;

        let history = store.get("s1").await;
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].role, Role::User);
        assert_eq!(history[0].message, "hello");
        assert_eq!(store.session_count().await, 1);
    }

    #[tokio::test]
    async fn history_is_capped_and_keeps_newest_in_order() {
        let store = InMemorySessionStore::default();
        for i in 0..11 {
            store.append("s1", Role::User, &format!("m{i}")).await;
        }

        let history = store.get("s1").await;
        assert_eq!(history.len(), MAX_CONTEXT);
        let messages: Vec<_> = history.iter().map(|t| t.message.as_str()).collect();
        let expected: Vec<String> = (1..11).map(|i| format!("m{i}")).collect();
        assert_eq!(messages, expected);
    }

    #[tokio::test]
    async fn history_len_reports_trimmed_length() {
        let store = InMemorySessionStore::default();
        assert_eq!(store.history_len("s1").await, 0);

        for i in 0..MAX_CONTEXT {
            store.append("s1", Role::User, &format!("m{i}")).await;
        }
        assert_eq!(store.history_len("s1").await, MAX_CONTEXT);

        store.append("s1", Role::Assistant, "one past the cap").await;
        assert_eq!(store.history_len("s1").await, MAX_CONTEXT);
        assert_eq!(store.get("s1").await.len(), MAX_CONTEXT);
    }

    #[tokio::test]
    async fn sessions_are_isolated() {
        let store = InMemorySessionStore::default();
        store.append("a", Role::User, "for a").await;
        store.append("b", Role::Assistant, "for b").await;

        assert_eq!(store.get("a").await[0].message, "for a");
        assert_eq!(store.get("b").await[0].role, Role::Assistant);
        assert_eq!(store.session_count().await, 2);
    }

    #[tokio::test]
    async fn custom_cap_is_respected() {
        let store = InMemorySessionStore::new(3);
        for i in 0..5 {
            store.append("s", Role::User, &i.to_string()).await;
        }
        let history = store.get("s").await;
        assert_eq!(history.len(), 3);
        assert_eq!(history[0].message, "2");
        assert_eq!(history[2].message, "4");
    }

    #[test]
    fn zero_cap_is_raised_to_one() {
        let store = InMemorySessionStore::new(0);
        tokio_test::block_on(store.append("s", Role::User, "first"));
        tokio_test::block_on(store.append("s", Role::User, "only"));
        let history = tokio_test::block_on(store.get("s"));
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].message, "only");
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_appends_to_one_session_are_not_lost() {
        let store = Arc::new(InMemorySessionStore::new(1_000));
        let mut handles = Vec::new();
        for i in 0..50 {
            let store = Arc::clone(&store);
            handles.push(tokio::spawn(async move {
                store.append("shared", Role::User, &i.to_string()).await;
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        assert_eq!(store.get("shared").await.len(), 50);
        assert_eq!(store.session_count().await, 1);
    }

    #[test]
    fn turn_timestamp_is_utc_iso8601() {
        let turn = Turn::now(Role::Assistant, "hi");
        assert!(turn.timestamp.ends_with('Z'));
        assert!(chrono::DateTime::parse_from_rfc3339(&turn.timestamp).is_ok());
    }

    #[test]
    fn role_serializes_lowercase() {
        let json = serde_json::to_string(&Role::Assistant).unwrap();
        assert_eq!(json, "\"assistant\"");
        assert_eq!(Role::User.to_string(), "user");
    }
}
