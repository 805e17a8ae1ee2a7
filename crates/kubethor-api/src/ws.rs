//! WebSocket stream endpoints and the axum peer adapter

use async_trait::async_trait;
use axum::body::Bytes;
use axum::extract::rejection::QueryRejection;
use axum::extract::ws::rejection::WebSocketUpgradeRejection;
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Path, Query, State};
use axum::response::Response;
use futures::stream::{SplitSink, SplitStream};
use futures::{SinkExt, StreamExt};
use kubethor_stream::{FrameSink, FrameSource, PeerError, StreamPeer};
use serde::Deserialize;
use tracing::debug;

use crate::error::{Error, Result};
use crate::server::AppState;

/// Query string of the stream endpoints
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StreamQuery {
    /// Session to stream under
    pub session_id: Option<String>,
}

impl StreamQuery {
    fn require_session(
        query: std::result::Result<Query<StreamQuery>, QueryRejection>,
    ) -> Result<String> {
        let Query(query) = query.map_err(|e| Error::BadRequest(e.body_text()))?;
        query
            .session_id
            .filter(|id| !id.is_empty())
            .ok_or(Error::MissingSessionId)
    }
}

/// Write half of an axum WebSocket
pub struct WsSink(SplitSink<WebSocket, Message>);

/// Read half of an axum WebSocket
pub struct WsSource(SplitStream<WebSocket>);

fn transport(e: axum::Error) -> PeerError {
    PeerError::Transport(e.to_string())
}

#[async_trait]
impl FrameSink for WsSink {
    async fn send_text(&mut self, text: String) -> std::result::Result<(), PeerError> {
        self.0.send(Message::Text(text.into())).await.map_err(transport)
    }

    async fn ping(&mut self) -> std::result::Result<(), PeerError> {
        self.0.send(Message::Ping(Bytes::new())).await.map_err(transport)
    }

    async fn close(&mut self) -> std::result::Result<(), PeerError> {
        self.0.close().await.map_err(transport)
    }
}

#[async_trait]
impl FrameSource for WsSource {
    async fn recv(&mut self) -> std::result::Result<(), PeerError> {
        match self.0.next().await {
            Some(Ok(Message::Close(_))) | None => Err(PeerError::Closed),
            Some(Ok(_)) => Ok(()),
            Some(Err(e)) => Err(transport(e)),
        }
    }
}

/// Split an upgraded socket into a stream peer
pub fn peer(socket: WebSocket) -> StreamPeer {
    let (sink, source) = socket.split();
    StreamPeer::new(WsSink(sink), WsSource(source))
}

/// `GET /api/k8s/ws/resource-watcher/list/{resource_type}/{namespace_name}`
pub async fn watch_resources(
    State(state): State<AppState>,
    Path((resource_type, namespace)): Path<(String, String)>,
    query: std::result::Result<Query<StreamQuery>, QueryRejection>,
    ws: std::result::Result<WebSocketUpgrade, WebSocketUpgradeRejection>,
) -> Result<Response> {
    let session_id = StreamQuery::require_session(query)?;
    let ws = ws?;

    Ok(ws.on_upgrade(move |socket| async move {
        let report = state
            .streams
            .watch_resources(&session_id, &resource_type, &namespace, peer(socket))
            .await;
        debug!(
            session_id = %session_id,
            resource_type = %resource_type,
            reason = ?report.close_reason,
            frames_sent = report.frames_sent,
            error = ?report.error,
            "Resource watch socket finished"
        );
    }))
}

/// `GET /api/k8s/ws/resource-watcher/pod-logs/{namespace_name}/{pod_name}/{container_name}`
pub async fn pod_logs(
    State(state): State<AppState>,
    Path((namespace, pod, container)): Path<(String, String, String)>,
    query: std::result::Result<Query<StreamQuery>, QueryRejection>,
    ws: std::result::Result<WebSocketUpgrade, WebSocketUpgradeRejection>,
) -> Result<Response> {
    let session_id = StreamQuery::require_session(query)?;
    let ws = ws?;

    Ok(ws.on_upgrade(move |socket| async move {
        let report = state
            .streams
            .tail_logs(&session_id, &namespace, &pod, &container, peer(socket))
            .await;
        debug!(
            session_id = %session_id,
            pod = %pod,
            container = %container,
            reason = ?report.close_reason,
            frames_sent = report.frames_sent,
            error = ?report.error,
            "Log socket finished"
        );
    }))
}
