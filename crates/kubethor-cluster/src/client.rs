//! Cluster Control API abstraction
//!
//! `ClusterClient` is the per-session handle the core talks to. Objects cross
//! this boundary as raw JSON; typing happens in the projector.

use std::pin::Pin;

use async_trait::async_trait;
use futures::stream::BoxStream;

use crate::error::ClusterError;
use crate::kind::{ChangeType, ResourceKind};

/// A cluster object as returned by the API server
pub type RawObject = serde_json::Value;

/// One notification from an upstream watch
#[derive(Debug, Clone, PartialEq)]
pub struct RawEvent {
    /// What happened to the object
    pub change: ChangeType,
    /// The object (or a status payload for `Error`)
    pub object: RawObject,
}

impl RawEvent {
    /// Build an event
    pub fn new(change: ChangeType, object: RawObject) -> Self {
        Self { change, object }
    }

    /// An `Error` event carrying a plain message
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            change: ChangeType::Error,
            object: serde_json::json!({ "message": message.into() }),
        }
    }

    /// Message carried by an `Error` event, if any
    pub fn error_message(&self) -> Option<&str> {
        self.object.get("message").and_then(|m| m.as_str())
    }
}

/// Lazy sequence of upstream notifications
pub type RawEventStream = BoxStream<'static, RawEvent>;

/// Followed container log bytes
pub type LogStream = Pin<Box<dyn futures::io::AsyncRead + Send>>;

/// Releases the server-side watch
///
/// `stop` consumes the handle so a release can only happen once per handle.
pub trait WatchHandle: Send {
    /// Stop the underlying watch
    fn stop(self: Box<Self>);
}

/// An open upstream watch: the event feed plus the handle that stops it
pub struct UpstreamWatch {
    /// Notifications in the order the API server emitted them
    pub events: RawEventStream,
    /// Releases the watch
    pub handle: Box<dyn WatchHandle>,
}

/// Per-kind operations against one cluster
///
/// Implementations must tolerate concurrent calls: several watches opened
/// under the same session share one client.
#[async_trait]
pub trait ClusterClient: Send + Sync {
    /// Fetch one object
    async fn get(
        &self,
        kind: ResourceKind,
        namespace: &str,
        name: &str,
    ) -> Result<RawObject, ClusterError>;

    /// List objects of a kind
    async fn list(&self, kind: ResourceKind, namespace: &str)
        -> Result<Vec<RawObject>, ClusterError>;

    /// Create an object
    async fn create(
        &self,
        kind: ResourceKind,
        namespace: &str,
        object: RawObject,
    ) -> Result<RawObject, ClusterError>;

    /// Replace an object (name taken from its metadata)
    async fn update(
        &self,
        kind: ResourceKind,
        namespace: &str,
        object: RawObject,
    ) -> Result<RawObject, ClusterError>;

    /// Delete an object
    async fn delete(&self, kind: ResourceKind, namespace: &str, name: &str)
        -> Result<(), ClusterError>;

    /// Open a watch. Failing to start is reported here, not on the stream.
    async fn watch(&self, kind: ResourceKind, namespace: &str)
        -> Result<UpstreamWatch, ClusterError>;

    /// Follow a container's log
    async fn logs(
        &self,
        namespace: &str,
        pod: &str,
        container: &str,
    ) -> Result<LogStream, ClusterError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_event_carries_message() {
        let ev = RawEvent::error("too old resource version");
        assert_eq!(ev.change, ChangeType::Error);
        assert_eq!(ev.error_message(), Some("too old resource version"));
    }

    #[test]
    fn test_error_message_absent_on_objects() {
        let ev = RawEvent::new(
            ChangeType::Added,
            serde_json::json!({"metadata": {"name": "web"}}),
        );
        assert_eq!(ev.error_message(), None);
    }
}
