//! Paced, heartbeated delivery of frames to one peer
//!
//! A pump runs four roles on separate tasks, all bound to one cancellation
//! token:
//!
//! - **producer**: pulls frames from the source and queues them
//! - **sender**: writes queued frames to the peer, sleeping `pacing` after
//!   each write
//! - **heartbeat**: pings the peer every `heartbeat_interval`
//! - **monitor**: reads the peer; any read error means the peer is gone
//!
//! The first role to fail records a [`CloseReason`] and cancels the token.
//! A write already in flight is allowed to finish; no new write starts after
//! cancellation. Once every role has exited the source is dropped (releasing
//! the upstream watch) and the peer is closed exactly once.

use std::future::Future;
use std::sync::{Arc, OnceLock};
use std::time::Duration;

use futures::StreamExt;
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::error::StreamError;
use crate::frame::{FrameStream, OutboundFrame, SetupErrorFrame};
use crate::peer::{FrameSink, FrameSource, StreamPeer};

/// Default minimum delay between frames
pub const DEFAULT_PACING: Duration = Duration::from_millis(100);

/// Default liveness probe period
pub const DEFAULT_HEARTBEAT_INTERVAL: Duration = Duration::from_secs(30);

/// Default producer to sender queue depth
pub const DEFAULT_QUEUE_CAPACITY: usize = 64;

/// Pump timing and buffering
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PumpConfig {
    /// Sleep after every frame written
    pub pacing: Duration,
    /// Ping period
    pub heartbeat_interval: Duration,
    /// Frames buffered between producer and sender
    pub queue_capacity: usize,
}

impl Default for PumpConfig {
    fn default() -> Self {
        Self {
            pacing: DEFAULT_PACING,
            heartbeat_interval: DEFAULT_HEARTBEAT_INTERVAL,
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
        }
    }
}

/// Lifecycle of one pump
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PumpState {
    /// Waiting for the source to open
    Starting,
    /// All roles running
    Streaming,
    /// Cancellation observed, roles winding down
    Draining,
    /// Source released and peer closed; terminal
    Closed,
}

/// Why a pump stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloseReason {
    /// The source could not be opened
    SetupFailed,
    /// The source ended and every queued frame was written
    Completed,
    /// The peer went away
    PeerClosed,
    /// A liveness probe could not be written
    HeartbeatFailed,
    /// A frame could not be written
    WriteFailed,
    /// Cancelled from outside (session deleted or evicted)
    Cancelled,
}

/// Outcome of one pump run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PumpReport {
    /// States entered, in order
    pub transitions: Vec<PumpState>,
    /// First recorded reason for stopping
    pub close_reason: CloseReason,
    /// Frames written to the peer
    pub frames_sent: usize,
    /// First error that stopped the stream, if one did
    pub error: Option<String>,
}

type SharedSink = Arc<Mutex<Box<dyn FrameSink>>>;

/// Records the first close reason and cancels the pump
#[derive(Clone)]
struct Trigger {
    reason: Arc<OnceLock<CloseReason>>,
    error: Arc<OnceLock<StreamError>>,
    cancel: CancellationToken,
}

impl Trigger {
    fn new(cancel: CancellationToken) -> Self {
        Self {
            reason: Arc::new(OnceLock::new()),
            error: Arc::new(OnceLock::new()),
            cancel,
        }
    }

    fn fire(&self, reason: CloseReason) {
        if self.reason.set(reason).is_ok() {
            debug!(reason = ?reason, "Pump cancellation triggered");
        }
        self.cancel.cancel();
    }

    /// Like `fire`, keeping `error` when this is the first reason recorded
    fn fail(&self, reason: CloseReason, error: StreamError) {
        if self.reason.set(reason).is_ok() {
            debug!(reason = ?reason, error = %error, "Pump failed");
            let _ = self.error.set(error);
        }
        self.cancel.cancel();
    }

    fn error(&self) -> Option<String> {
        self.error.get().map(ToString::to_string)
    }

    fn reason(&self) -> CloseReason {
        self.reason.get().copied().unwrap_or(CloseReason::Cancelled)
    }
}

/// Bridges a frame source to a peer
#[derive(Debug, Clone, Default)]
pub struct StreamPump {
    config: PumpConfig,
}

impl StreamPump {
    /// Pump with the given settings
    pub fn new(config: PumpConfig) -> Self {
        Self { config }
    }

    /// Settings of this pump
    pub fn config(&self) -> &PumpConfig {
        &self.config
    }

    /// Run one stream to completion
    ///
    /// `open` yields the frame source, or the single error frame to send when
    /// the source cannot start. `cancel` stops the stream from outside.
    pub async fn serve<F>(&self, peer: StreamPeer, cancel: CancellationToken, open: F) -> PumpReport
    where
        F: Future<Output = Result<FrameStream, SetupErrorFrame>>,
    {
        let mut transitions = vec![PumpState::Starting];
        let StreamPeer { mut sink, source } = peer;

        let opened = tokio::select! {
            biased;
            _ = cancel.cancelled() => None,
            opened = open => Some(opened),
        };

        let frames = match opened {
            Some(Ok(frames)) => frames,
            Some(Err(setup_error)) => {
                warn!(error = %setup_error.error, "Stream setup failed");
                let error = Some(setup_error.error.clone());
                let frame = OutboundFrame::SetupError(setup_error);
                let mut frames_sent = 0;
                match frame.encode() {
                    Ok(text) => match sink.send_text(text).await {
                        Ok(()) => frames_sent = 1,
                        Err(e) => debug!(error = %e, "Could not deliver setup error"),
                    },
                    Err(e) => warn!(error = %e, "Could not encode setup error"),
                }
                close_peer(sink.as_mut()).await;
                transitions.push(PumpState::Closed);
                return PumpReport {
                    transitions,
                    close_reason: CloseReason::SetupFailed,
                    frames_sent,
                    error,
                };
            }
            None => {
                close_peer(sink.as_mut()).await;
                transitions.push(PumpState::Closed);
                return PumpReport {
                    transitions,
                    close_reason: CloseReason::Cancelled,
                    frames_sent: 0,
                    error: None,
                };
            }
        };

        transitions.push(PumpState::Streaming);
        debug!("Stream pump started");

        let trigger = Trigger::new(cancel.clone());
        let sink: SharedSink = Arc::new(Mutex::new(sink));
        let (tx, rx) = mpsc::channel(self.config.queue_capacity.max(1));

        let producer = tokio::spawn(produce(frames, tx, cancel.clone()));
        let sender = tokio::spawn(send(
            rx,
            sink.clone(),
            self.config.pacing,
            trigger.clone(),
        ));
        let heartbeat = tokio::spawn(heartbeat(
            sink.clone(),
            self.config.heartbeat_interval,
            trigger.clone(),
        ));
        let monitor = tokio::spawn(monitor(source, trigger.clone()));

        cancel.cancelled().await;
        transitions.push(PumpState::Draining);

        let frames_sent = join_role("sender", sender).await.unwrap_or(0);
        join_role("producer", producer).await;
        join_role("heartbeat", heartbeat).await;
        join_role("monitor", monitor).await;

        close_peer(sink.lock().await.as_mut()).await;
        transitions.push(PumpState::Closed);

        let close_reason = trigger.reason();
        let error = trigger.error();
        info!(reason = ?close_reason, frames_sent, error = ?error, "Stream closed");
        PumpReport {
            transitions,
            close_reason,
            frames_sent,
            error,
        }
    }
}

async fn join_role<T>(role: &str, handle: JoinHandle<T>) -> Option<T> {
    match handle.await {
        Ok(value) => Some(value),
        Err(e) => {
            warn!(role, error = %e, "Pump role ended abnormally");
            None
        }
    }
}

async fn close_peer(sink: &mut dyn FrameSink) {
    if let Err(e) = sink.close().await {
        debug!(error = %e, "Peer close failed");
    }
}

/// Pull frames into the queue until the source ends or the pump is cancelled
///
/// Dropping `frames` on exit releases whatever backs it.
async fn produce(mut frames: FrameStream, tx: mpsc::Sender<OutboundFrame>, cancel: CancellationToken) {
    loop {
        let next = tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            next = frames.next() => next,
        };
        let Some(frame) = next else {
            debug!("Frame source ended");
            break;
        };
        let queued = tokio::select! {
            biased;
            _ = cancel.cancelled() => false,
            sent = tx.send(frame) => sent.is_ok(),
        };
        if !queued {
            break;
        }
    }
}

/// Write queued frames in order, pacing between them
async fn send(
    mut rx: mpsc::Receiver<OutboundFrame>,
    sink: SharedSink,
    pacing: Duration,
    trigger: Trigger,
) -> usize {
    let mut sent = 0;
    loop {
        let next = tokio::select! {
            biased;
            _ = trigger.cancel.cancelled() => break,
            next = rx.recv() => next,
        };
        let Some(frame) = next else {
            trigger.fire(CloseReason::Completed);
            break;
        };

        let text = match frame.encode() {
            Ok(text) => text,
            Err(e) => {
                warn!(error = %e, "Dropping frame that failed to encode");
                continue;
            }
        };

        // An in-flight write is not raced against cancellation
        let written = sink.lock().await.send_text(text).await;
        if let Err(e) = written {
            trigger.fail(
                CloseReason::WriteFailed,
                StreamError::PeerWriteFailure(e.to_string()),
            );
            break;
        }
        sent += 1;

        tokio::select! {
            biased;
            _ = trigger.cancel.cancelled() => break,
            _ = tokio::time::sleep(pacing) => {}
        }
    }
    sent
}

async fn heartbeat(sink: SharedSink, period: Duration, trigger: Trigger) {
    let mut ticker = tokio::time::interval_at(tokio::time::Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            biased;
            _ = trigger.cancel.cancelled() => break,
            _ = ticker.tick() => {
                if let Err(e) = sink.lock().await.ping().await {
                    trigger.fail(
                        CloseReason::HeartbeatFailed,
                        StreamError::PeerWriteFailure(e.to_string()),
                    );
                    break;
                }
            }
        }
    }
}

async fn monitor(mut source: Box<dyn FrameSource>, trigger: Trigger) {
    loop {
        tokio::select! {
            biased;
            _ = trigger.cancel.cancelled() => break,
            read = source.recv() => {
                if let Err(e) = read {
                    debug!(error = %e, "Peer read ended");
                    trigger.fire(CloseReason::PeerClosed);
                    break;
                }
            }
        }
    }
}
