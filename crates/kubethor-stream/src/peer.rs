//! Duplex connection seam
//!
//! The transport layer hands the pump a [`StreamPeer`]: a write half and a
//! read half. The pump writes frames and pings, watches the read half for
//! the peer going away, and closes the write half once.

use async_trait::async_trait;
use thiserror::Error;

/// Failure on the peer connection
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PeerError {
    /// The peer closed the connection
    #[error("peer closed the connection")]
    Closed,
    /// The transport failed
    #[error("transport error: {0}")]
    Transport(String),
}

/// Write half of a peer connection
#[async_trait]
pub trait FrameSink: Send {
    /// Send one text frame
    async fn send_text(&mut self, text: String) -> Result<(), PeerError>;

    /// Send a liveness probe
    async fn ping(&mut self) -> Result<(), PeerError>;

    /// Close the connection
    async fn close(&mut self) -> Result<(), PeerError>;
}

/// Read half of a peer connection
#[async_trait]
pub trait FrameSource: Send {
    /// Wait for the next inbound frame
    ///
    /// Errors once the peer is gone, including an orderly close.
    async fn recv(&mut self) -> Result<(), PeerError>;
}

/// A duplex connection to one remote peer
pub struct StreamPeer {
    /// Write half
    pub sink: Box<dyn FrameSink>,
    /// Read half
    pub source: Box<dyn FrameSource>,
}

impl StreamPeer {
    /// Pair a write half and a read half
    pub fn new(sink: impl FrameSink + 'static, source: impl FrameSource + 'static) -> Self {
        Self {
            sink: Box::new(sink),
            source: Box::new(source),
        }
    }
}
