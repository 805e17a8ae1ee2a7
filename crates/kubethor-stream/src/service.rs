//! Session-aware stream entry points
//!
//! Resolve the session, open the source, and hand both to a pump. Every
//! stream runs on a child of its session's token, so tearing the session
//! down tears its streams down.

use std::sync::Arc;

use chrono::Utc;
use futures::StreamExt;
use kubethor_cluster::{ChangeType, EventProjector, RawEvent, ResourceKind};
use kubethor_session::{Session, SessionRegistry};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::error::StreamError;
use crate::frame::{FrameStream, OutboundFrame, SetupErrorFrame, WatchErrorFrame};
use crate::logs::{log_frames, LogTailConfig};
use crate::peer::StreamPeer;
use crate::pump::{PumpReport, StreamPump};
use crate::subscription::WatchSubscription;

/// Watch and log streaming over a session registry
#[derive(Clone)]
pub struct StreamService {
    registry: Arc<SessionRegistry>,
    projector: EventProjector,
    pump: StreamPump,
    log_tail: LogTailConfig,
}

impl StreamService {
    /// Build the service
    pub fn new(
        registry: Arc<SessionRegistry>,
        projector: EventProjector,
        pump: StreamPump,
        log_tail: LogTailConfig,
    ) -> Self {
        Self {
            registry,
            projector,
            pump,
            log_tail,
        }
    }

    fn lookup(&self, session_id: &str) -> (Result<Session, StreamError>, CancellationToken) {
        match self.registry.get(session_id) {
            Ok(session) => {
                let token = session.stream_token();
                (Ok(session), token)
            }
            Err(_) => (
                Err(StreamError::SessionNotFound(session_id.to_string())),
                CancellationToken::new(),
            ),
        }
    }

    /// Stream projected watch events of `resource_type` in `namespace`
    pub async fn watch_resources(
        &self,
        session_id: &str,
        resource_type: &str,
        namespace: &str,
        peer: StreamPeer,
    ) -> PumpReport {
        let (session, cancel) = self.lookup(session_id);
        info!(
            session_id = %session_id,
            resource_type = %resource_type,
            namespace = %namespace,
            "Resource watch requested"
        );

        let parent = cancel.clone();
        let open = async move {
            let session = session?;
            let kind: ResourceKind = resource_type.parse()?;
            let subscription = WatchSubscription::open(&session, kind, namespace, &parent).await?;
            let projector = self.projector.clone();
            let frames: FrameStream = subscription
                .map(move |event| watch_frame(&projector, kind, event))
                .boxed();
            Ok::<_, StreamError>(frames)
        };
        let open = async move {
            open.await.map_err(|e: StreamError| SetupErrorFrame {
                error: format!("Resource: {resource_type} for Namespace: {namespace} - {e}"),
                cluster_error: e.cluster_error().map(ToString::to_string),
            })
        };

        self.pump.serve(peer, cancel, open).await
    }

    /// Stream a followed container log
    pub async fn tail_logs(
        &self,
        session_id: &str,
        namespace: &str,
        pod: &str,
        container: &str,
        peer: StreamPeer,
    ) -> PumpReport {
        let (session, cancel) = self.lookup(session_id);
        info!(
            session_id = %session_id,
            namespace = %namespace,
            pod = %pod,
            container = %container,
            "Log tail requested"
        );

        let chunk_size = self.log_tail.chunk_size;
        let open = async move {
            let session = session?;
            let client = session
                .client
                .clone()
                .ok_or(StreamError::ClientNotInitialized)?;
            let reader = client.logs(namespace, pod, container).await?;
            Ok::<_, StreamError>(log_frames(reader, chunk_size))
        };
        let open = async move {
            open.await.map_err(|e: StreamError| SetupErrorFrame {
                error: format!("Pod: {pod} Container: {container} for Namespace: {namespace} - {e}"),
                cluster_error: e.cluster_error().map(ToString::to_string),
            })
        };

        self.pump.serve(peer, cancel, open).await
    }
}

/// Frame for one raw watch event
fn watch_frame(projector: &EventProjector, kind: ResourceKind, event: RawEvent) -> OutboundFrame {
    if event.change == ChangeType::Error {
        let detail = event.error_message().unwrap_or("unknown");
        return OutboundFrame::WatchError(WatchErrorFrame::new(detail));
    }

    let now = Utc::now();
    let projected = projector
        .try_project(kind, event.change, &event.object, now)
        .unwrap_or_else(|e| {
            let err = StreamError::ProjectionFailure(e);
            warn!(kind = %kind, error = %err, "Sending default summary");
            projector.fallback(kind, event.change, &event.object, now)
        });
    OutboundFrame::Event(projected)
}

#[cfg(test)]
mod tests {
    use super::*;
    use kubethor_cluster::KindRegistry;

    fn projector() -> EventProjector {
        EventProjector::new(Arc::new(KindRegistry::builtin()))
    }

    #[test]
    fn test_error_event_becomes_watch_error_frame() {
        let frame = watch_frame(
            &projector(),
            ResourceKind::Pod,
            RawEvent::error(StreamError::UpstreamWatchClosed.to_string()),
        );
        assert_eq!(
            frame,
            OutboundFrame::WatchError(WatchErrorFrame::new("upstream watch closed"))
        );
    }

    #[test]
    fn test_undecodable_object_still_produces_event() {
        let event = RawEvent::new(
            ChangeType::Added,
            serde_json::json!({
                "metadata": { "name": "web", "namespace": "default" },
                "spec": { "replicas": "three" }
            }),
        );
        let OutboundFrame::Event(projected) =
            watch_frame(&projector(), ResourceKind::Deployment, event)
        else {
            panic!("expected event frame");
        };
        assert_eq!(projected.event_type, ChangeType::Added);
        let wire = serde_json::to_value(&projected).unwrap();
        assert_eq!(wire["name"], "web");
        assert_eq!(wire["runningPods"], 0);
    }
}
