//! In-memory cluster and peer doubles shared by the stream scenarios

#![allow(dead_code)]

use std::io;
use std::pin::Pin;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::Duration;

use async_trait::async_trait;
use futures::stream::{self, StreamExt};
use kubethor_cluster::{
    ChangeType, ClusterClient, ClusterError, LogStream, RawEvent, RawObject, ResourceKind,
    UpstreamWatch, WatchHandle,
};
use kubethor_stream::{FrameSink, FrameSource, PeerError, StreamPeer};
use parking_lot::Mutex;
use tokio_util::sync::CancellationToken;

/// What the fake cluster's next watch call returns
pub enum WatchScript {
    /// Emit these events, then keep the channel open
    Open(Vec<RawEvent>),
    /// Emit these events, then close the channel
    Closing(Vec<RawEvent>),
    /// Refuse to start the watch
    Refuse(ClusterError),
}

struct CountingHandle(Arc<AtomicUsize>);

impl WatchHandle for CountingHandle {
    fn stop(self: Box<Self>) {
        self.0.fetch_add(1, Ordering::SeqCst);
    }
}

/// Cluster whose watches follow a script and count releases
pub struct FakeCluster {
    script: Mutex<Option<WatchScript>>,
    log: Mutex<Option<LogStream>>,
    pub releases: Arc<AtomicUsize>,
    pub watch_calls: Mutex<Vec<(ResourceKind, String)>>,
}

impl FakeCluster {
    pub fn new(script: WatchScript) -> Arc<Self> {
        Arc::new(Self {
            script: Mutex::new(Some(script)),
            log: Mutex::new(None),
            releases: Arc::new(AtomicUsize::new(0)),
            watch_calls: Mutex::new(Vec::new()),
        })
    }

    pub fn with_logs(bytes: &[u8]) -> Arc<Self> {
        Self::with_log_reader(Box::pin(futures::io::Cursor::new(bytes.to_vec())))
    }

    /// Logs that deliver `bytes` and then fail mid-follow
    pub fn with_broken_logs(bytes: &[u8]) -> Arc<Self> {
        Self::with_log_reader(Box::pin(ResetAfter::new(bytes)))
    }

    fn with_log_reader(reader: LogStream) -> Arc<Self> {
        let cluster = Self::new(WatchScript::Open(Vec::new()));
        *cluster.log.lock() = Some(reader);
        cluster
    }

    pub fn releases(&self) -> usize {
        self.releases.load(Ordering::SeqCst)
    }
}

fn unsupported() -> ClusterError {
    ClusterError::Generic("not supported by the fake cluster".to_string())
}

#[async_trait]
impl ClusterClient for FakeCluster {
    async fn get(&self, _: ResourceKind, _: &str, _: &str) -> Result<RawObject, ClusterError> {
        Err(unsupported())
    }

    async fn list(&self, _: ResourceKind, _: &str) -> Result<Vec<RawObject>, ClusterError> {
        Err(unsupported())
    }

    async fn create(&self, _: ResourceKind, _: &str, _: RawObject) -> Result<RawObject, ClusterError> {
        Err(unsupported())
    }

    async fn update(&self, _: ResourceKind, _: &str, _: RawObject) -> Result<RawObject, ClusterError> {
        Err(unsupported())
    }

    async fn delete(&self, _: ResourceKind, _: &str, _: &str) -> Result<(), ClusterError> {
        Err(unsupported())
    }

    async fn watch(&self, kind: ResourceKind, namespace: &str) -> Result<UpstreamWatch, ClusterError> {
        self.watch_calls.lock().push((kind, namespace.to_string()));
        let script = self.script.lock().take().unwrap_or(WatchScript::Open(Vec::new()));
        let events = match script {
            WatchScript::Open(events) => stream::iter(events).chain(stream::pending()).boxed(),
            WatchScript::Closing(events) => stream::iter(events).boxed(),
            WatchScript::Refuse(err) => return Err(err),
        };
        Ok(UpstreamWatch {
            events,
            handle: Box::new(CountingHandle(self.releases.clone())),
        })
    }

    async fn logs(&self, _: &str, _: &str, _: &str) -> Result<LogStream, ClusterError> {
        match self.log.lock().take() {
            Some(reader) => Ok(reader),
            None => Err(ClusterError::NotFound("container \"app\" not found".to_string())),
        }
    }
}

/// Reader that yields one chunk, then a connection reset
pub struct ResetAfter {
    chunk: Option<Vec<u8>>,
}

impl ResetAfter {
    pub fn new(chunk: &[u8]) -> Self {
        Self {
            chunk: Some(chunk.to_vec()),
        }
    }
}

impl futures::io::AsyncRead for ResetAfter {
    fn poll_read(mut self: Pin<&mut Self>, _: &mut Context<'_>, buf: &mut [u8]) -> Poll<io::Result<usize>> {
        match self.chunk.take() {
            Some(chunk) => {
                let n = chunk.len().min(buf.len());
                buf[..n].copy_from_slice(&chunk[..n]);
                Poll::Ready(Ok(n))
            }
            None => Poll::Ready(Err(io::Error::new(
                io::ErrorKind::ConnectionReset,
                "connection reset by peer",
            ))),
        }
    }
}

/// A raw Deployment event
pub fn deployment(change: ChangeType, name: &str) -> RawEvent {
    RawEvent::new(
        change,
        serde_json::json!({
            "apiVersion": "apps/v1",
            "kind": "Deployment",
            "metadata": { "name": name, "namespace": "default" },
            "spec": { "replicas": 2, "selector": {}, "template": {} },
            "status": { "replicas": 2, "availableReplicas": 2 }
        }),
    )
}

/// Everything the fake peer saw
#[derive(Default)]
pub struct PeerRecord {
    pub frames: Vec<serde_json::Value>,
    pub pings: usize,
    pub closes: usize,
    pub writes_started: usize,
}

/// Recording peer with a remotely triggered disconnect
#[derive(Clone)]
pub struct FakePeer {
    pub record: Arc<Mutex<PeerRecord>>,
    pub disconnect: CancellationToken,
    write_delay: Duration,
}

impl FakePeer {
    pub fn new() -> Self {
        Self::with_write_delay(Duration::ZERO)
    }

    pub fn with_write_delay(write_delay: Duration) -> Self {
        Self {
            record: Arc::new(Mutex::new(PeerRecord::default())),
            disconnect: CancellationToken::new(),
            write_delay,
        }
    }

    pub fn peer(&self) -> StreamPeer {
        StreamPeer::new(
            FakeSink {
                record: self.record.clone(),
                write_delay: self.write_delay,
            },
            FakeSource {
                disconnect: self.disconnect.clone(),
            },
        )
    }

    pub fn frames(&self) -> Vec<serde_json::Value> {
        self.record.lock().frames.clone()
    }

    pub fn closes(&self) -> usize {
        self.record.lock().closes
    }
}

struct FakeSink {
    record: Arc<Mutex<PeerRecord>>,
    write_delay: Duration,
}

#[async_trait]
impl FrameSink for FakeSink {
    async fn send_text(&mut self, text: String) -> Result<(), PeerError> {
        self.record.lock().writes_started += 1;
        if !self.write_delay.is_zero() {
            tokio::time::sleep(self.write_delay).await;
        }
        let value = serde_json::from_str(&text).map_err(|e| PeerError::Transport(e.to_string()))?;
        self.record.lock().frames.push(value);
        Ok(())
    }

    async fn ping(&mut self) -> Result<(), PeerError> {
        self.record.lock().pings += 1;
        Ok(())
    }

    async fn close(&mut self) -> Result<(), PeerError> {
        self.record.lock().closes += 1;
        Ok(())
    }
}

struct FakeSource {
    disconnect: CancellationToken,
}

#[async_trait]
impl FrameSource for FakeSource {
    async fn recv(&mut self) -> Result<(), PeerError> {
        self.disconnect.cancelled().await;
        Err(PeerError::Closed)
    }
}
