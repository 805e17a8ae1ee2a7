//! Outbound frame payloads
//!
//! Every frame is a self-describing JSON object written as one text message.

use futures::stream::BoxStream;
use kubethor_cluster::{ChangeType, ProjectedEvent};
use serde::Serialize;

/// Lazy sequence of frames a pump delivers
pub type FrameStream = BoxStream<'static, OutboundFrame>;

/// `{eventType: "ERROR", error}` for watch-level errors
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WatchErrorFrame {
    /// Always `ERROR`
    pub event_type: ChangeType,
    /// `watch error: <detail>`
    pub error: String,
}

impl WatchErrorFrame {
    /// Frame for an upstream error detail
    pub fn new(detail: &str) -> Self {
        Self {
            event_type: ChangeType::Error,
            error: format!("watch error: {detail}"),
        }
    }
}

/// One chunk of followed container log
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LogFrame {
    /// RFC 3339 time the chunk was read
    pub timestamp: String,
    /// Chunk text (lossy UTF-8)
    pub log: String,
}

/// Sent once when a stream cannot start
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SetupErrorFrame {
    /// Human-readable failure
    pub error: String,
    /// Cluster error detail, when the cluster caused the failure
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cluster_error: Option<String>,
}

/// Anything a pump can write
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum OutboundFrame {
    /// Projected watch event
    Event(ProjectedEvent),
    /// Watch error or terminal marker
    WatchError(WatchErrorFrame),
    /// Log chunk
    Log(LogFrame),
    /// Stream setup failure
    SetupError(SetupErrorFrame),
}

impl OutboundFrame {
    /// JSON text of the frame
    pub fn encode(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_watch_error_frame_shape() {
        let frame = OutboundFrame::WatchError(WatchErrorFrame::new("upstream watch closed"));
        let wire: serde_json::Value = serde_json::from_str(&frame.encode().unwrap()).unwrap();
        assert_eq!(
            wire,
            json!({ "eventType": "ERROR", "error": "watch error: upstream watch closed" })
        );
    }

    #[test]
    fn test_setup_error_frame_omits_absent_cluster_error() {
        let frame = OutboundFrame::SetupError(SetupErrorFrame {
            error: "Resource: Pod for Namespace: default - session not found: x".to_string(),
            cluster_error: None,
        });
        let wire: serde_json::Value = serde_json::from_str(&frame.encode().unwrap()).unwrap();
        assert!(wire.get("clusterError").is_none());

        let frame = OutboundFrame::SetupError(SetupErrorFrame {
            error: "Resource: Pod for Namespace: default - forbidden".to_string(),
            cluster_error: Some("unauthorized: forbidden".to_string()),
        });
        let wire: serde_json::Value = serde_json::from_str(&frame.encode().unwrap()).unwrap();
        assert_eq!(wire["clusterError"], "unauthorized: forbidden");
    }

    #[test]
    fn test_log_frame_shape() {
        let frame = OutboundFrame::Log(LogFrame {
            timestamp: "2024-06-01T12:00:00Z".to_string(),
            log: "listening on :8080\n".to_string(),
        });
        let wire: serde_json::Value = serde_json::from_str(&frame.encode().unwrap()).unwrap();
        assert_eq!(
            wire,
            json!({ "timestamp": "2024-06-01T12:00:00Z", "log": "listening on :8080\n" })
        );
    }
}
