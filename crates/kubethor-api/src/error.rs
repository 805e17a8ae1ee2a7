//! Error types for the HTTP surface

use axum::extract::ws::rejection::WebSocketUpgradeRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use kubethor_session::SessionError;
use serde::Serialize;

use crate::bootstrap::BootstrapError;

/// Result type for HTTP handlers
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for HTTP handlers
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The request did not name a session
    #[error("sessionID not provided")]
    MissingSessionId,

    /// The request body or parameters were malformed
    #[error("bad request: {0}")]
    BadRequest(String),

    /// No session under the given id
    #[error("session not found: {0}")]
    SessionNotFound(String),

    /// The session exists but has no cluster client
    #[error("cluster client not initialized for session {0}")]
    ClientNotInitialized(String),

    /// Building the cluster client from a kubeconfig failed
    #[error(transparent)]
    Bootstrap(#[from] BootstrapError),

    /// The request could not be upgraded to a WebSocket
    #[error(transparent)]
    Upgrade(#[from] WebSocketUpgradeRejection),

    /// Internal server error
    #[error("internal error: {0}")]
    Internal(String),
}

impl From<SessionError> for Error {
    fn from(e: SessionError) -> Self {
        match e {
            SessionError::NotFound(id) => Error::SessionNotFound(id),
        }
    }
}

#[derive(Serialize)]
struct ErrorBody {
    message: String,
    success: bool,
}

impl Error {
    fn status(&self) -> StatusCode {
        match self {
            Error::MissingSessionId | Error::BadRequest(_) => StatusCode::BAD_REQUEST,
            Error::SessionNotFound(_) => StatusCode::NOT_FOUND,
            Error::ClientNotInitialized(_) => StatusCode::CONFLICT,
            Error::Bootstrap(BootstrapError::InvalidKubeconfig(_)) => StatusCode::BAD_REQUEST,
            Error::Bootstrap(_) | Error::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Error::Upgrade(rejection) => rejection.status(),
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = %self, "Request failed");
        } else {
            tracing::debug!(error = %self, status = %status, "Request rejected");
        }

        let body = ErrorBody {
            message: self.to_string(),
            success: false,
        };
        (status, axum::Json(body)).into_response()
    }
}
