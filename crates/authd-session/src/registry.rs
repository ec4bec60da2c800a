//! The session registry: the authoritative map from session id to session
//! state.

use std::collections::HashMap;

use tokio::sync::RwLock;

use crate::record::SessionRecord;

/// The only error the session registry produces: the session is gone,
/// either because it never existed or because `EndSession` already dropped
/// it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionNotFound {
    pub session_id: String,
}

impl std::fmt::Display for SessionNotFound {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "session not found: {}", self.session_id)
    }
}

impl std::error::Error for SessionNotFound {}

/// Maps session id to session record, guarded by a single readers–writer
/// lock. `insert`/`lookup`/`update`/`delete` are the only ways callers touch
/// session state; every other component works off the snapshot `lookup`
/// returns and writes mutations back with `update`.
#[derive(Default)]
pub struct SessionRegistry {
    sessions: RwLock<HashMap<String, SessionRecord>>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a freshly created session (`NewSession`). Callers are
    /// responsible for generating a unique id before calling this.
    pub async fn insert(&self, record: SessionRecord) {
        self.sessions.write().await.insert(record.id.clone(), record);
    }

    /// Snapshot a session's current state.
    pub async fn lookup(&self, id: &str) -> Result<SessionRecord, SessionNotFound> {
        self.sessions
            .read()
            .await
            .get(id)
            .cloned()
            .ok_or_else(|| SessionNotFound {
                session_id: id.to_string(),
            })
    }

    /// Write a mutated record back. Re-checks existence under the write
    /// lock so a session concurrently dropped by `EndSession` is not
    /// resurrected by a stale update racing behind it.
    pub async fn update(&self, id: &str, record: SessionRecord) -> Result<(), SessionNotFound> {
        let mut guard = self.sessions.write().await;
        if !guard.contains_key(id) {
            return Err(SessionNotFound {
                session_id: id.to_string(),
            });
        }
        guard.insert(id.to_string(), record);
        Ok(())
    }

    /// Drop a session's state (`EndSession`). No-op if already gone.
    pub async fn delete(&self, id: &str) {
        self.sessions.write().await.remove(id);
    }

    /// Whether a session id is currently present. Used by tests and by
    /// `EndSession` to decide whether there is anything left to cancel.
    pub async fn contains(&self, id: &str) -> bool {
        self.sessions.read().await.contains_key(id)
    }
}
