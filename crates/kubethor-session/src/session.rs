//! Session record

use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use kubethor_cluster::ClusterClient;
use tokio_util::sync::CancellationToken;

/// A time-bounded binding of an operator id to a cluster client
///
/// Clones share the client handle and the root cancellation token; the
/// registry hands out clones and keeps the original.
#[derive(Clone)]
pub struct Session {
    /// Opaque operator id
    pub id: String,
    /// Cluster handle; `None` when bootstrap registered the id without one
    pub client: Option<Arc<dyn ClusterClient>>,
    /// Namespace the operator works in by default
    pub namespace: String,
    /// Namespaces visible to the operator, in listing order
    pub namespace_list: Vec<String>,
    /// Instant after which the janitor may evict the session
    pub expires_at: DateTime<Utc>,
    cancel: CancellationToken,
}

impl Session {
    pub(crate) fn new(
        id: String,
        client: Option<Arc<dyn ClusterClient>>,
        namespace: String,
        namespace_list: Vec<String>,
        expires_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            client,
            namespace,
            namespace_list,
            expires_at,
            cancel: CancellationToken::new(),
        }
    }

    /// Whether the session is past its expiry at `now`
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at < now
    }

    /// Token for one stream opened under this session
    ///
    /// Cancelled when the session's streams are torn down; cancelling it
    /// affects only that stream.
    pub fn stream_token(&self) -> CancellationToken {
        self.cancel.child_token()
    }

    /// Whether the session's streams have been torn down
    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    pub(crate) fn cancel_streams(&self) {
        self.cancel.cancel();
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("id", &self.id)
            .field("has_client", &self.client.is_some())
            .field("namespace", &self.namespace)
            .field("namespace_list", &self.namespace_list)
            .field("expires_at", &self.expires_at)
            .finish()
    }
}
