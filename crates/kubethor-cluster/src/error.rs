//! Error types for Cluster Control API calls and event projection

use thiserror::Error;

/// Errors surfaced by the Cluster Control API
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ClusterError {
    /// The requested object does not exist
    #[error("not found: {0}")]
    NotFound(String),

    /// The write conflicted with the current object state
    #[error("conflict: {0}")]
    Conflict(String),

    /// The credential was rejected (401/403)
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    /// The API server could not be reached or the connection broke
    #[error("transport error: {0}")]
    Transport(String),

    /// Anything else the API server or client reported
    #[error("{0}")]
    Generic(String),
}

impl ClusterError {
    /// Human-readable detail without the category prefix
    pub fn detail(&self) -> &str {
        match self {
            ClusterError::NotFound(m)
            | ClusterError::Conflict(m)
            | ClusterError::Unauthorized(m)
            | ClusterError::Transport(m)
            | ClusterError::Generic(m) => m,
        }
    }
}

impl From<kube::Error> for ClusterError {
    fn from(e: kube::Error) -> Self {
        match e {
            kube::Error::Api(resp) => match resp.code {
                404 => ClusterError::NotFound(resp.message),
                409 => ClusterError::Conflict(resp.message),
                401 | 403 => ClusterError::Unauthorized(resp.message),
                _ => ClusterError::Generic(resp.message),
            },
            kube::Error::Auth(e) => ClusterError::Unauthorized(e.to_string()),
            e @ (kube::Error::HyperError(_)
            | kube::Error::Service(_)
            | kube::Error::ReadEvents(_)) => ClusterError::Transport(e.to_string()),
            other => ClusterError::Generic(other.to_string()),
        }
    }
}

/// A raw object could not be projected into its kind's summary
#[derive(Debug, Error)]
pub enum ProjectionError {
    /// The object did not decode as the registered kind
    #[error("failed to decode {kind}: {source}")]
    Decode {
        /// Kind the object was expected to be
        kind: String,
        /// Underlying decode failure
        #[source]
        source: serde_json::Error,
    },

    /// No capability record is registered for the kind
    #[error("no projection registered for {0}")]
    Unregistered(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    fn api_error(code: u16) -> kube::Error {
        kube::Error::Api(kube::core::ErrorResponse {
            status: "Failure".to_string(),
            message: format!("status {code}"),
            reason: "Test".to_string(),
            code,
        })
    }

    #[test]
    fn test_api_errors_are_classified_by_status_code() {
        assert!(matches!(ClusterError::from(api_error(404)), ClusterError::NotFound(_)));
        assert!(matches!(ClusterError::from(api_error(409)), ClusterError::Conflict(_)));
        assert!(matches!(ClusterError::from(api_error(401)), ClusterError::Unauthorized(_)));
        assert!(matches!(ClusterError::from(api_error(403)), ClusterError::Unauthorized(_)));
        assert!(matches!(ClusterError::from(api_error(500)), ClusterError::Generic(_)));
    }

    #[test]
    fn test_detail_strips_category() {
        let err = ClusterError::NotFound("pods \"web\" not found".to_string());
        assert_eq!(err.detail(), "pods \"web\" not found");
        assert_eq!(err.to_string(), "not found: pods \"web\" not found");
    }
}
