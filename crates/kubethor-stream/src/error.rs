//! Stream error taxonomy

use kubethor_cluster::{ClusterError, ProjectionError, UnsupportedResourceKind};
use thiserror::Error;

/// Errors raised while opening or running a stream
#[derive(Debug, Error)]
pub enum StreamError {
    /// No session under the given id
    #[error("session not found: {0}")]
    SessionNotFound(String),

    /// The session exists but carries no cluster client
    #[error("cluster client not initialized for this session")]
    ClientNotInitialized,

    /// The requested kind is not supported
    #[error(transparent)]
    UnsupportedResourceKind(#[from] UnsupportedResourceKind),

    /// The cluster refused or failed to start the watch or log follow
    #[error("{message}")]
    WatchSetupFailure {
        /// What went wrong
        message: String,
        /// The cluster error behind it, if any
        cluster_error: Option<ClusterError>,
    },

    /// One event could not be projected; the stream carries on
    #[error("projection failed: {0}")]
    ProjectionFailure(#[from] ProjectionError),

    /// Writing to the peer failed; the stream tears down
    #[error("peer write failed: {0}")]
    PeerWriteFailure(String),

    /// The upstream watch ended on its own
    #[error("upstream watch closed")]
    UpstreamWatchClosed,
}

impl StreamError {
    /// Cluster error carried by a setup failure
    pub fn cluster_error(&self) -> Option<&ClusterError> {
        match self {
            StreamError::WatchSetupFailure { cluster_error, .. } => cluster_error.as_ref(),
            _ => None,
        }
    }
}

impl From<ClusterError> for StreamError {
    fn from(e: ClusterError) -> Self {
        StreamError::WatchSetupFailure {
            message: e.detail().to_string(),
            cluster_error: Some(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cluster_error_becomes_setup_failure() {
        let err = StreamError::from(ClusterError::Unauthorized("token expired".to_string()));
        assert_eq!(err.to_string(), "token expired");
        assert_eq!(
            err.cluster_error(),
            Some(&ClusterError::Unauthorized("token expired".to_string()))
        );
    }

    #[test]
    fn test_unsupported_kind_message() {
        let err = StreamError::from(UnsupportedResourceKind("Widget".to_string()));
        assert_eq!(err.to_string(), "unsupported resource type: Widget");
        assert!(err.cluster_error().is_none());
    }
}
