use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use std::sync::Arc;
use std::time::Duration;

use crate::{
    error::{ConduitError, Result},
    session::Session,
};

/// Storage key for a session id
pub fn session_key(session_id: &str) -> String {
    format!("conduit:session:{session_id}")
}

/// Trait for storing and retrieving in-flight sessions
///
/// Implementations own their timeouts and retries. A plain per-key
/// last-writer-wins store is enough: one session id never has two requests
/// in flight at the same time.
#[async_trait]
pub trait SessionStore: Send + Sync {
    async fn get(&self, session_id: &str) -> Result<Option<Session>>;
    async fn set(&self, session: &Session, ttl: Duration) -> Result<()>;
    async fn delete(&self, session_id: &str) -> Result<()>;
}

/// Trait for the expiring counters behind rate limiting
#[async_trait]
pub trait CounterStore: Send + Sync {
    /// Increment `key` and return the new count. A fresh counter expires
    /// after `window`.
    async fn increment(&self, key: &str, window: Duration) -> Result<u64>;
}

fn expiry_after(ttl: Duration) -> Result<DateTime<Utc>> {
    let ttl = chrono::Duration::from_std(ttl)
        .map_err(|e| ConduitError::Storage(format!("invalid ttl: {e}")))?;
    Ok(Utc::now() + ttl)
}

struct Entry {
    payload: String,
    expires_at: DateTime<Utc>,
}

/// In-memory implementation of SessionStore
///
/// Sessions are kept in their serialized JSON form, the same shape a
/// networked cache would hold.
#[derive(Clone, Default)]
pub struct InMemorySessionStore {
    sessions: Arc<DashMap<String, Entry>>,
}

impl InMemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of live entries
    pub fn len(&self) -> usize {
        let now = Utc::now();
        self.sessions
            .iter()
            .filter(|entry| entry.expires_at > now)
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl SessionStore for InMemorySessionStore {
    async fn get(&self, session_id: &str) -> Result<Option<Session>> {
        let key = session_key(session_id);
        let live = self
            .sessions
            .get(&key)
            .map(|entry| (entry.expires_at > Utc::now()).then(|| entry.payload.clone()));

        match live {
            Some(Some(payload)) => Ok(Some(Session::from_json(&payload)?)),
            Some(None) => {
                self.sessions.remove(&key);
                Ok(None)
            }
            None => Ok(None),
        }
    }

    async fn set(&self, session: &Session, ttl: Duration) -> Result<()> {
        let entry = Entry {
            payload: session.to_json()?,
            expires_at: expiry_after(ttl)?,
        };
        self.sessions.insert(session_key(&session.id), entry);
        Ok(())
    }

    async fn delete(&self, session_id: &str) -> Result<()> {
        self.sessions.remove(&session_key(session_id));
        Ok(())
    }
}

struct Counter {
    count: u64,
    expires_at: DateTime<Utc>,
}

/// In-memory implementation of CounterStore
#[derive(Clone, Default)]
pub struct InMemoryCounterStore {
    counters: Arc<DashMap<String, Counter>>,
}

impl InMemoryCounterStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CounterStore for InMemoryCounterStore {
    async fn increment(&self, key: &str, window: Duration) -> Result<u64> {
        let now = Utc::now();
        let expires_at = expiry_after(window)?;
        let mut counter = self.counters.entry(key.to_string()).or_insert(Counter {
            count: 0,
            expires_at,
        });
        if counter.expires_at <= now {
            counter.count = 0;
            counter.expires_at = expires_at;
        }
        counter.count += 1;
        Ok(counter.count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_session_round_trip() {
        let store = InMemorySessionStore::new();
        let mut session = Session::new("session1", "254700000000", "*123#");
        session.navigate_to("welcome");
        session.set("amount", 250).unwrap();

        store.set(&session, Duration::from_secs(90)).await.unwrap();
        let loaded = store.get("session1").await.unwrap().unwrap();
        assert_eq!(loaded, session);
        assert_eq!(store.len(), 1);

        store.delete("session1").await.unwrap();
        assert!(store.get("session1").await.unwrap().is_none());
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn test_missing_session() {
        let store = InMemorySessionStore::new();
        assert!(store.get("nope").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_entries_expire_with_ttl() {
        let store = InMemorySessionStore::new();
        let session = Session::new("short", "254700000000", "*123#");

        store.set(&session, Duration::ZERO).await.unwrap();
        assert!(store.get("short").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_counter_counts_within_window() {
        let counters = InMemoryCounterStore::new();
        let window = Duration::from_secs(60);
        assert_eq!(counters.increment("throttle:1", window).await.unwrap(), 1);
        assert_eq!(counters.increment("throttle:1", window).await.unwrap(), 2);
        assert_eq!(counters.increment("throttle:2", window).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_counter_resets_after_window() {
        let counters = InMemoryCounterStore::new();
        assert_eq!(counters.increment("k", Duration::ZERO).await.unwrap(), 1);
        // the zero-length window has already lapsed
        assert_eq!(counters.increment("k", Duration::ZERO).await.unwrap(), 1);
    }

    #[test]
    fn test_key_namespace() {
        assert_eq!(session_key("abc"), "conduit:session:abc");
    }
}
