//! Session errors

use thiserror::Error;

/// Errors returned by the session registry
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SessionError {
    /// No session is registered under the id
    #[error("session not found: {0}")]
    NotFound(String),
}
