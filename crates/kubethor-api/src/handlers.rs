//! Session lifecycle and probe handlers

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::HeaderMap;
use axum::Json;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{Error, Result};
use crate::server::AppState;

/// Header carrying the session id on HTTP endpoints
pub const SESSION_HEADER: &str = "X-Session-Id";

/// Session id from the `X-Session-Id` header
pub fn session_id(headers: &HeaderMap) -> Result<String> {
    headers
        .get(SESSION_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .map(str::to_string)
        .ok_or(Error::MissingSessionId)
}

/// `POST /api/k8s/set-client` body
#[derive(Debug, Deserialize)]
pub struct SetClientRequest {
    /// Kubeconfig YAML
    pub kubeconfig: String,
}

/// `POST /api/k8s/set-client` response
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SetClientResponse {
    /// Human-readable outcome
    pub message: String,
    /// Whether the session now has a connected client
    pub connected: bool,
    /// HTTP status, echoed for the client
    pub status: u16,
    /// Namespaces visible to the credential
    pub namespace_list: Vec<String>,
    /// Namespace the session starts in
    pub current_context_namespace: String,
}

/// Simple outcome body
#[derive(Debug, Serialize)]
pub struct MessageResponse {
    /// Human-readable outcome
    pub message: String,
    /// Always true; failures use the error body
    pub success: bool,
}

impl MessageResponse {
    fn ok(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            success: true,
        }
    }
}

/// `GET /api/k8s/cluster-connected` response
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClusterStatus {
    /// Whether the session has a client
    pub is_connected: bool,
    /// Session namespace
    pub current_context_namespace: String,
    /// Namespaces visible to the credential
    pub namespace_list: Vec<String>,
}

/// Build a cluster client from the uploaded kubeconfig and register the session
///
/// An existing session under the same id is replaced.
pub async fn set_client(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: std::result::Result<Json<SetClientRequest>, JsonRejection>,
) -> Result<Json<SetClientResponse>> {
    let id = session_id(&headers)?;
    let Json(request) = body.map_err(|e| Error::BadRequest(e.body_text()))?;

    let cluster = state.bootstrap.connect(&request.kubeconfig).await?;
    state.registry.create(
        id.clone(),
        Some(cluster.client),
        cluster.namespace.clone(),
        cluster.namespace_list.clone(),
    );
    info!(session_id = %id, namespace = %cluster.namespace, "Session connected");

    Ok(Json(SetClientResponse {
        message: "KUBECONFIG Clientset is Connected!!!".to_string(),
        connected: true,
        status: 200,
        namespace_list: cluster.namespace_list,
        current_context_namespace: cluster.namespace,
    }))
}

/// Extend the session's expiry
pub async fn refresh_session(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<MessageResponse>> {
    let id = session_id(&headers)?;
    let expires_at = state.registry.refresh(&id)?;
    debug!(session_id = %id, expires_at = %expires_at, "Session refreshed");
    Ok(Json(MessageResponse::ok("Session refreshed successfully")))
}

/// Report the session's namespace context
pub async fn cluster_connected(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<ClusterStatus>> {
    let id = session_id(&headers)?;
    let session = state.registry.get(&id)?;
    if session.client.is_none() {
        return Err(Error::ClientNotInitialized(id));
    }
    Ok(Json(ClusterStatus {
        is_connected: true,
        current_context_namespace: session.namespace,
        namespace_list: session.namespace_list,
    }))
}

/// Drop the session; idempotent
pub async fn disconnect(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<MessageResponse>> {
    let id = session_id(&headers)?;
    match state.registry.delete(&id) {
        Ok(()) => info!(session_id = %id, "Session disconnected"),
        Err(e) => debug!(session_id = %id, error = %e, "Disconnect for unknown session"),
    }
    Ok(Json(MessageResponse::ok(format!(
        "Clientset has been set to nil for session {id}"
    ))))
}

/// Liveness and readiness probe
pub async fn health() -> &'static str {
    "OK"
}
