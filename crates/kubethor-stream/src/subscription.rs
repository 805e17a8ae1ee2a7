//! One upstream watch, owned by one stream
//!
//! A forwarder task moves raw events from the cluster watch into a bounded
//! single-reader channel. The subscription ends in one of two ways:
//!
//! - cancelled by its owner: the watch is stopped and the sequence ends with
//!   no further elements
//! - the upstream feed closes on its own: one synthetic `Error` event is
//!   yielded, then the sequence ends
//!
//! The cluster-side watch is released exactly once whichever path runs first.

use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use futures::{Stream, StreamExt};
use kubethor_cluster::{RawEvent, ResourceKind, UpstreamWatch, WatchHandle};
use kubethor_session::Session;
use parking_lot::Mutex;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::error::StreamError;

const SUBSCRIPTION_BUFFER: usize = 16;

/// Single-fire guard around the watch handle
struct ReleaseLatch {
    handle: Mutex<Option<Box<dyn WatchHandle>>>,
}

impl ReleaseLatch {
    fn new(handle: Box<dyn WatchHandle>) -> Self {
        Self {
            handle: Mutex::new(Some(handle)),
        }
    }

    /// Stop the watch if nobody has yet; true if this call stopped it
    fn release(&self) -> bool {
        // Take under the lock, stop outside it
        let handle = self.handle.lock().take();
        match handle {
            Some(handle) => {
                handle.stop();
                true
            }
            None => false,
        }
    }
}

/// Cloneable handle that cancels a subscription from any task
#[derive(Clone)]
pub struct SubscriptionCanceller {
    token: CancellationToken,
    latch: Arc<ReleaseLatch>,
}

impl SubscriptionCanceller {
    /// Cancel the subscription; later calls are no-ops
    pub fn cancel(&self) {
        self.token.cancel();
        if self.latch.release() {
            debug!("Upstream watch released on cancel");
        }
    }
}

/// Raw event feed of one (kind, namespace) watch
pub struct WatchSubscription {
    kind: ResourceKind,
    namespace: String,
    events: ReceiverStream<RawEvent>,
    canceller: SubscriptionCanceller,
}

impl WatchSubscription {
    /// Open a watch through the session's cluster client
    ///
    /// The subscription is cancelled along with `parent`. Failing to start is
    /// reported here and nothing is left running.
    pub async fn open(
        session: &Session,
        kind: ResourceKind,
        namespace: &str,
        parent: &CancellationToken,
    ) -> Result<Self, StreamError> {
        let client = session
            .client
            .clone()
            .ok_or(StreamError::ClientNotInitialized)?;
        let upstream = client.watch(kind, namespace).await?;
        info!(session_id = %session.id, kind = %kind, namespace = %namespace, "Watch opened");
        Ok(Self::from_upstream(kind, namespace, upstream, parent))
    }

    /// Wrap an already-open upstream watch
    pub fn from_upstream(
        kind: ResourceKind,
        namespace: &str,
        upstream: UpstreamWatch,
        parent: &CancellationToken,
    ) -> Self {
        let UpstreamWatch { events, handle } = upstream;
        let token = parent.child_token();
        let latch = Arc::new(ReleaseLatch::new(handle));
        let (tx, rx) = mpsc::channel(SUBSCRIPTION_BUFFER);

        tokio::spawn(forward(events, tx, token.clone(), latch.clone()));

        Self {
            kind,
            namespace: namespace.to_string(),
            events: ReceiverStream::new(rx),
            canceller: SubscriptionCanceller { token, latch },
        }
    }

    /// Kind being watched
    pub fn kind(&self) -> ResourceKind {
        self.kind
    }

    /// Namespace being watched
    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// Handle for cancelling from another task
    pub fn canceller(&self) -> SubscriptionCanceller {
        self.canceller.clone()
    }

    /// Stop the watch; idempotent
    pub fn cancel(&self) {
        self.canceller.cancel();
    }
}

async fn forward(
    mut events: kubethor_cluster::RawEventStream,
    tx: mpsc::Sender<RawEvent>,
    token: CancellationToken,
    latch: Arc<ReleaseLatch>,
) {
    loop {
        let next = tokio::select! {
            biased;
            _ = token.cancelled() => break,
            next = events.next() => next,
        };

        let (event, last) = match next {
            Some(event) => (event, false),
            None => {
                debug!("Upstream watch channel closed");
                (RawEvent::error(StreamError::UpstreamWatchClosed.to_string()), true)
            }
        };

        let delivered = tokio::select! {
            biased;
            _ = token.cancelled() => false,
            sent = tx.send(event) => sent.is_ok(),
        };
        if !delivered || last {
            break;
        }
    }

    latch.release();
}

impl Stream for WatchSubscription {
    type Item = RawEvent;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<RawEvent>> {
        if self.canceller.token.is_cancelled() {
            return Poll::Ready(None);
        }
        Pin::new(&mut self.events).poll_next(cx)
    }
}

impl Drop for WatchSubscription {
    fn drop(&mut self) {
        self.canceller.cancel();
    }
}
