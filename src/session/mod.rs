//! Session storage: an opaque per-session key/value capability.
//!
//! The cart core only ever sees `get`/`put`/`delete` over byte blobs, so the
//! serialization format and the backing store stay swappable. The bundled
//! implementation keeps sessions in memory and expires them lazily after a
//! configurable idle period.

use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use uuid::Uuid;

/// Identity threaded explicitly through every cart and checkout call.
/// There is no ambient request state.
#[derive(Clone, Debug)]
pub struct SessionContext {
    pub session_id: String,
    pub user_id: Option<Uuid>,
}

impl SessionContext {
    pub fn anonymous(session_id: impl Into<String>) -> Self {
        Self {
            session_id: session_id.into(),
            user_id: None,
        }
    }

    pub fn for_user(session_id: impl Into<String>, user_id: Uuid) -> Self {
        Self {
            session_id: session_id.into(),
            user_id: Some(user_id),
        }
    }
}

#[async_trait]
pub trait SessionStore: Send + Sync {
    async fn get(&self, session_id: &str, key: &str) -> Option<Vec<u8>>;
    async fn put(&self, session_id: &str, key: &str, value: Vec<u8>);
    async fn delete(&self, session_id: &str, key: &str);
}

struct Session {
    values: HashMap<String, Vec<u8>>,
    last_seen: Instant,
}

/// In-memory session store with idle expiry. Any access to a session past
/// its idle deadline drops the whole session first.
pub struct MemorySessionStore {
    idle: Duration,
    sessions: Mutex<HashMap<String, Session>>,
}

impl MemorySessionStore {
    pub fn new(idle: Duration) -> Self {
        Self {
            idle,
            sessions: Mutex::new(HashMap::new()),
        }
    }

    fn with_live_session<T>(
        &self,
        session_id: &str,
        create: bool,
        f: impl FnOnce(&mut Session) -> T,
    ) -> Option<T> {
        let mut sessions = self
            .sessions
            .lock()
            .unwrap_or_else(PoisonError::into_inner);

        let expired = sessions
            .get(session_id)
            .is_some_and(|s| s.last_seen.elapsed() > self.idle);
        if expired {
            sessions.remove(session_id);
        }

        if create {
            let session = sessions
                .entry(session_id.to_string())
                .or_insert_with(|| Session {
                    values: HashMap::new(),
                    last_seen: Instant::now(),
                });
            session.last_seen = Instant::now();
            Some(f(session))
        } else {
            let session = sessions.get_mut(session_id)?;
            session.last_seen = Instant::now();
            Some(f(session))
        }
    }
}

#[async_trait]
impl SessionStore for MemorySessionStore {
    async fn get(&self, session_id: &str, key: &str) -> Option<Vec<u8>> {
        self.with_live_session(session_id, false, |s| s.values.get(key).cloned())
            .flatten()
    }

    async fn put(&self, session_id: &str, key: &str, value: Vec<u8>) {
        self.with_live_session(session_id, true, |s| {
            s.values.insert(key.to_string(), value);
        });
    }

    async fn delete(&self, session_id: &str, key: &str) {
        self.with_live_session(session_id, false, |s| {
            s.values.remove(key);
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn round_trips_values_per_session() {
        let store = MemorySessionStore::new(Duration::from_secs(60));
        store.put("s1", "cart", b"one".to_vec()).await;
        store.put("s2", "cart", b"two".to_vec()).await;

        assert_eq!(store.get("s1", "cart").await, Some(b"one".to_vec()));
        assert_eq!(store.get("s2", "cart").await, Some(b"two".to_vec()));
        assert_eq!(store.get("s1", "other").await, None);

        store.delete("s1", "cart").await;
        assert_eq!(store.get("s1", "cart").await, None);
        assert_eq!(store.get("s2", "cart").await, Some(b"two".to_vec()));
    }

    #[tokio::test]
    async fn idle_sessions_expire_on_access() {
        let store = MemorySessionStore::new(Duration::from_millis(10));
        store.put("s1", "cart", b"payload".to_vec()).await;

        tokio::time::sleep(Duration::from_millis(30)).await;
        assert_eq!(store.get("s1", "cart").await, None);

        // A fresh write revives the session id.
        store.put("s1", "cart", b"again".to_vec()).await;
        assert_eq!(store.get("s1", "cart").await, Some(b"again".to_vec()));
    }
}
