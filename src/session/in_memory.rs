use crate::error::Result;
use crate::traits::session::{SessionData, SessionStore};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;

/// In-memory session store
///
/// Suitable for development and tests. Sessions are lost on restart and are
/// not shared across instances.
#[derive(Clone)]
pub struct InMemorySessionStore {
    sessions: Arc<RwLock<HashMap<String, SessionData>>>,
    default_ttl: Duration,
}

impl InMemorySessionStore {
    pub fn new(default_ttl: Duration) -> Self {
        Self {
            sessions: Arc::new(RwLock::new(HashMap::new())),
            default_ttl,
        }
    }

    /// Start a new, empty session using the store's default TTL
    pub fn new_session(&self) -> SessionData {
        SessionData::new(self.default_ttl)
    }
}

#[async_trait]
impl SessionStore for InMemorySessionStore {
    async fn load(&self, session_id: &str) -> Result<Option<SessionData>> {
        let sessions = self.sessions.read().await;

        match sessions.get(session_id) {
            None => return Ok(None),
            Some(session) if !session.is_expired() => return Ok(Some(session.clone())),
            Some(_) => {}
        }

        drop(sessions);
        self.sessions.write().await.remove(session_id);
        Ok(None)
    }

    async fn save(&self, session_id: &str, data: SessionData) -> Result<()> {
        self.sessions.write().await.insert(session_id.to_string(), data);
        Ok(())
    }

    async fn delete(&self, session_id: &str) -> Result<()> {
        self.sessions.write().await.remove(session_id);
        Ok(())
    }

    async fn cleanup_expired(&self) -> Result<usize> {
        let mut sessions = self.sessions.write().await;
        let before = sessions.len();
        sessions.retain(|_, session| !session.is_expired());
        Ok(before - sessions.len())
    }
}

impl Default for InMemorySessionStore {
    fn default() -> Self {
        Self::new(Duration::from_secs(3600 * 24))
    }
}
