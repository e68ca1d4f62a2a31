//! Conversation session state and the in-memory session store.
//!
//! The store owns the canonical copy of every session. Handlers receive a
//! cloned value, mutate it locally, and the caller writes it back. Map
//! integrity is guarded by a lock; two simultaneous updates to the *same*
//! session id are last-writer-wins by contract (callers serialize requests
//! per session).

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::sync::RwLock;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Identifier of a node in the conversation state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeId {
    /// Initial node: asks for and stores the user's name.
    CollectName,
    /// Main node: answers university questions via the RAG endpoint.
    UniversityChat,
    /// Terminal node: says farewell and ends the conversation.
    Goodbye,
}

impl NodeId {
    /// Wire name of this node.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::CollectName => "collect_name",
            Self::UniversityChat => "university_chat",
            Self::Goodbye => "goodbye",
        }
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for NodeId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        // A historical `_node` suffix is accepted for compatibility.
        match s.trim().trim_end_matches("_node") {
            "collect_name" => Ok(Self::CollectName),
            "university_chat" => Ok(Self::UniversityChat),
            "goodbye" => Ok(Self::Goodbye),
            other => Err(format!("unknown node: {other}")),
        }
    }
}

/// Who produced a history entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Speaker {
    Assistant,
    User,
}

/// One utterance in a conversation, in insertion order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub speaker: Speaker,
    pub text: String,
}

impl HistoryEntry {
    #[must_use]
    pub fn assistant(text: impl Into<String>) -> Self {
        Self {
            speaker: Speaker::Assistant,
            text: text.into(),
        }
    }

    #[must_use]
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            speaker: Speaker::User,
            text: text.into(),
        }
    }
}

/// Full state of one conversation session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionState {
    /// Store-assigned identifier, embedded on create.
    pub session_id: String,
    /// The user's name, once collected.
    pub name: Option<String>,
    /// Node the session is currently in.
    pub current_node: NodeId,
    /// Last message surfaced to the user.
    pub next_question: String,
    /// Most recent user utterance.
    pub last_query: String,
    /// Append-only conversation transcript.
    pub history: Vec<HistoryEntry>,
    /// Consecutive re-prompts within the current node.
    pub retry_count: u32,
    /// Monotonic false→true once the goodbye node runs.
    pub conversation_ended: bool,
    /// Set when a node handler failed; the turn degraded to an apology.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl SessionState {
    /// Fresh state positioned at the initial node.
    #[must_use]
    pub fn new() -> Self {
        Self {
            session_id: String::new(),
            name: None,
            current_node: NodeId::CollectName,
            next_question: String::new(),
            last_query: String::new(),
            history: Vec::new(),
            retry_count: 0,
            conversation_ended: false,
            error: None,
        }
    }
}

impl Default for SessionState {
    fn default() -> Self {
        Self::new()
    }
}

/// In-memory session store.
///
/// `get`/`update`/`delete` report absence distinctly (`None`/`false`), never
/// as an empty or default state.
#[derive(Debug, Default)]
pub struct SessionStore {
    sessions: RwLock<HashMap<String, SessionState>>,
}

impl SessionStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert `state` under a freshly generated identifier and return it.
    ///
    /// The identifier is embedded into the stored state. No two sessions
    /// ever receive the same identifier for the lifetime of the process.
    pub fn create(&self, mut state: SessionState) -> String {
        let mut sessions = self.write();
        let session_id = loop {
            let candidate = Uuid::new_v4().to_string();
            if !sessions.contains_key(&candidate) {
                break candidate;
            }
        };
        state.session_id = session_id.clone();
        sessions.insert(session_id.clone(), state);
        info!("created session: {session_id}");
        session_id
    }

    /// Fetch a copy of a session's state.
    #[must_use]
    pub fn get(&self, session_id: &str) -> Option<SessionState> {
        let found = self.read().get(session_id).cloned();
        if found.is_none() {
            warn!("session not found: {session_id}");
        }
        found
    }

    /// Replace a session's state. Returns false when the id is unknown.
    pub fn update(&self, session_id: &str, state: SessionState) -> bool {
        let mut sessions = self.write();
        match sessions.get_mut(session_id) {
            Some(slot) => {
                *slot = state;
                debug!("updated session: {session_id}");
                true
            }
            None => {
                warn!("failed to update session: {session_id} not found");
                false
            }
        }
    }

    /// Remove a session. Returns false when the id is unknown.
    pub fn delete(&self, session_id: &str) -> bool {
        let removed = self.write().remove(session_id).is_some();
        if removed {
            info!("deleted session: {session_id}");
        } else {
            warn!("failed to delete session: {session_id} not found");
        }
        removed
    }

    /// Snapshot of all sessions.
    #[must_use]
    pub fn list_all(&self) -> HashMap<String, SessionState> {
        self.read().clone()
    }

    /// Identifiers of all sessions.
    #[must_use]
    pub fn session_ids(&self) -> Vec<String> {
        self.read().keys().cloned().collect()
    }

    /// Number of active sessions.
    #[must_use]
    pub fn count(&self) -> usize {
        self.read().len()
    }

    /// Sessions currently at a specific node.
    #[must_use]
    pub fn sessions_by_node(&self, node: NodeId) -> HashMap<String, SessionState> {
        self.read()
            .iter()
            .filter(|(_, state)| state.current_node == node)
            .map(|(id, state)| (id.clone(), state.clone()))
            .collect()
    }

    /// Remove every session.
    pub fn clear(&self) {
        let mut sessions = self.write();
        let count = sessions.len();
        sessions.clear();
        info!("cleared all sessions: {count} removed");
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, HashMap<String, SessionState>> {
        self.sessions.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, HashMap<String, SessionState>> {
        self.sessions.write().unwrap_or_else(|e| e.into_inner())
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

    use super::*;
    use std::collections::HashSet;

    #[test]
    fn node_id_round_trips_through_strings() {
        for node in [NodeId::CollectName, NodeId::UniversityChat, NodeId::Goodbye] {
            assert_eq!(node.as_str().parse::<NodeId>().unwrap(), node);
        }
        assert_eq!("collect_name_node".parse::<NodeId>().unwrap(), NodeId::CollectName);
        assert!("daydream".parse::<NodeId>().is_err());
    }

    #[test]
    fn node_id_serializes_snake_case() {
        let json = serde_json::to_string(&NodeId::UniversityChat).unwrap();
        assert_eq!(json, "\"university_chat\"");
    }

    #[test]
    fn create_yields_distinct_ids() {
        let store = SessionStore::new();
        let mut ids = HashSet::new();
        for _ in 0..50 {
            let id = store.create(SessionState::new());
            assert!(ids.insert(id), "duplicate session id");
        }
        assert_eq!(store.count(), 50);
    }

    #[test]
    fn create_embeds_id_into_state() {
        let store = SessionStore::new();
        let id = store.create(SessionState::new());
        let state = store.get(&id).unwrap();
        assert_eq!(state.session_id, id);
    }

    #[test]
    fn get_after_delete_is_not_found() {
        let store = SessionStore::new();
        let id = store.create(SessionState::new());
        assert!(store.delete(&id));
        assert!(store.get(&id).is_none());
        assert!(!store.delete(&id));
    }

    #[test]
    fn update_unknown_id_reports_failure() {
        let store = SessionStore::new();
        assert!(!store.update("missing", SessionState::new()));
    }

    #[test]
    fn update_replaces_state() {
        let store = SessionStore::new();
        let id = store.create(SessionState::new());
        let mut state = store.get(&id).unwrap();
        state.name = Some("Alice".to_owned());
        state.current_node = NodeId::UniversityChat;
        assert!(store.update(&id, state));
        let reread = store.get(&id).unwrap();
        assert_eq!(reread.name.as_deref(), Some("Alice"));
        assert_eq!(reread.current_node, NodeId::UniversityChat);
    }

    #[test]
    fn sessions_by_node_filters() {
        let store = SessionStore::new();
        let a = store.create(SessionState::new());
        let b = store.create(SessionState::new());
        let mut chatting = store.get(&b).unwrap();
        chatting.current_node = NodeId::UniversityChat;
        store.update(&b, chatting);

        let collecting = store.sessions_by_node(NodeId::CollectName);
        assert!(collecting.contains_key(&a));
        assert!(!collecting.contains_key(&b));
        assert_eq!(store.sessions_by_node(NodeId::Goodbye).len(), 0);
    }

    #[test]
    fn clear_empties_store() {
        let store = SessionStore::new();
        store.create(SessionState::new());
        store.create(SessionState::new());
        store.clear();
        assert_eq!(store.count(), 0);
        assert!(store.session_ids().is_empty());
    }
}
