//! Session registry
//!
//! One lock guards the whole map. Reads share it; create, refresh, delete and
//! the janitor's sweep take it exclusively.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, TimeDelta, Utc};
use kubethor_cluster::ClusterClient;
use parking_lot::RwLock;
use tracing::{debug, info};

use crate::clock::{Clock, SystemClock};
use crate::config::SessionConfig;
use crate::error::SessionError;
use crate::session::Session;

/// Concurrency-safe map from session id to [`Session`]
pub struct SessionRegistry {
    sessions: RwLock<HashMap<String, Session>>,
    clock: Arc<dyn Clock>,
    config: SessionConfig,
}

impl SessionRegistry {
    /// Registry on the system clock
    pub fn new(config: SessionConfig) -> Self {
        Self::with_clock(config, Arc::new(SystemClock))
    }

    /// Registry on a custom clock
    pub fn with_clock(config: SessionConfig, clock: Arc<dyn Clock>) -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            clock,
            config,
        }
    }

    /// Settings this registry was built with
    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    fn expiry_from(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        let ttl = TimeDelta::from_std(self.config.ttl).unwrap_or(TimeDelta::MAX);
        now.checked_add_signed(ttl).unwrap_or(DateTime::<Utc>::MAX_UTC)
    }

    fn retire(&self, session: &Session) {
        if self.config.cancel_streams_on_evict {
            session.cancel_streams();
        }
    }

    /// Insert a session, replacing any session already under `id`
    ///
    /// A replaced session has its streams cancelled when
    /// `cancel_streams_on_evict` is set.
    pub fn create(
        &self,
        id: impl Into<String>,
        client: Option<Arc<dyn ClusterClient>>,
        namespace: impl Into<String>,
        namespace_list: Vec<String>,
    ) -> Session {
        let id = id.into();
        let session = Session::new(
            id.clone(),
            client,
            namespace.into(),
            namespace_list,
            self.expiry_from(self.clock.now()),
        );

        let replaced = self.sessions.write().insert(id.clone(), session.clone());
        if let Some(old) = replaced {
            info!(session_id = %id, "Replacing existing session");
            self.retire(&old);
        } else {
            debug!(session_id = %id, expires_at = %session.expires_at, "Session created");
        }
        session
    }

    /// Look up a session; never extends its expiry
    pub fn get(&self, id: &str) -> Result<Session, SessionError> {
        self.sessions
            .read()
            .get(id)
            .cloned()
            .ok_or_else(|| SessionError::NotFound(id.to_string()))
    }

    /// Push a session's expiry to now + ttl, returning the new expiry
    pub fn refresh(&self, id: &str) -> Result<DateTime<Utc>, SessionError> {
        let expires_at = self.expiry_from(self.clock.now());
        let mut sessions = self.sessions.write();
        let session = sessions
            .get_mut(id)
            .ok_or_else(|| SessionError::NotFound(id.to_string()))?;
        session.expires_at = expires_at;
        debug!(session_id = %id, expires_at = %expires_at, "Session refreshed");
        Ok(expires_at)
    }

    /// Remove a session
    pub fn delete(&self, id: &str) -> Result<(), SessionError> {
        let removed = self
            .sessions
            .write()
            .remove(id)
            .ok_or_else(|| SessionError::NotFound(id.to_string()))?;
        info!(session_id = %id, "Session deleted");
        self.retire(&removed);
        Ok(())
    }

    /// Remove every session whose expiry is strictly before now
    ///
    /// Returns how many were evicted.
    pub fn evict_expired(&self) -> usize {
        let now = self.clock.now();
        let evicted: Vec<Session> = {
            let mut sessions = self.sessions.write();
            let expired: Vec<String> = sessions
                .values()
                .filter(|s| s.is_expired(now))
                .map(|s| s.id.clone())
                .collect();
            expired
                .iter()
                .filter_map(|id| sessions.remove(id))
                .collect()
        };

        for session in &evicted {
            debug!(session_id = %session.id, expires_at = %session.expires_at, "Session expired");
            self.retire(session);
        }
        evicted.len()
    }

    /// Number of registered sessions
    pub fn len(&self) -> usize {
        self.sessions.read().len()
    }

    /// Whether no sessions are registered
    pub fn is_empty(&self) -> bool {
        self.sessions.read().is_empty()
    }
}
