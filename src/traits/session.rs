//! Session storage trait
//!
//! Persistence of sessions is left to the application. The crate only reads
//! and writes flashes on [`SessionData`], and any store implementing
//! [`SessionStore`] can carry them between requests.

use crate::error::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::{Duration, SystemTime};

/// Session data stored in the session store
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionData {
    /// Session data as key-value pairs
    pub data: HashMap<String, String>,

    /// When the session was created
    pub created_at: SystemTime,

    /// When the session expires
    pub expires_at: SystemTime,
}

impl SessionData {
    /// Create a new session with expiration
    pub fn new(ttl: Duration) -> Self {
        let now = SystemTime::now();
        Self {
            data: HashMap::new(),
            created_at: now,
            expires_at: now + ttl,
        }
    }

    pub fn is_expired(&self) -> bool {
        SystemTime::now() > self.expires_at
    }

    pub fn get(&self, key: &str) -> Option<&String> {
        self.data.get(key)
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.data.insert(key.into(), value.into());
    }

    pub fn remove(&mut self, key: &str) -> Option<String> {
        self.data.remove(key)
    }

    /// Queue a flash value under `key`.
    ///
    /// Flashes are kept as a JSON list, so several values can be queued
    /// under the same key before they are read.
    pub fn add_flash<T: Serialize + ?Sized>(&mut self, key: &str, value: &T) -> Result<()> {
        let mut flashes = self
            .data
            .get(key)
            .and_then(|raw| serde_json::from_str::<Vec<serde_json::Value>>(raw).ok())
            .unwrap_or_default();

        flashes.push(serde_json::to_value(value)?);
        self.data.insert(key.to_string(), serde_json::to_string(&flashes)?);
        Ok(())
    }

    /// Take the flashes queued under `key`, removing them from the session.
    ///
    /// Returns an empty list if there are none or they cannot be decoded.
    pub fn flashes(&mut self, key: &str) -> Vec<serde_json::Value> {
        self.data
            .remove(key)
            .and_then(|raw| serde_json::from_str(&raw).ok())
            .unwrap_or_default()
    }
}

/// Session storage trait
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Load session data by session ID
    ///
    /// Returns `Ok(None)` if the session doesn't exist or has expired.
    async fn load(&self, session_id: &str) -> Result<Option<SessionData>>;

    /// Save session data with a session ID
    async fn save(&self, session_id: &str, data: SessionData) -> Result<()>;

    async fn delete(&self, session_id: &str) -> Result<()>;

    /// Clean up expired sessions, returning how many were removed
    async fn cleanup_expired(&self) -> Result<usize>;
}
