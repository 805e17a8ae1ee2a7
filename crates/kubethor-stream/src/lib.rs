//! Kubethor streaming core
//!
//! Turns a live cluster watch (or a followed container log) into an ordered,
//! paced, heartbeated stream of JSON frames delivered to one remote peer.
//!
//! # Architecture
//!
//! ```text
//! ClusterClient::watch ─► WatchSubscription ─► EventProjector ─► StreamPump ─► StreamPeer
//!                          (forwarder task)                       producer
//!                                                                 sender (paced)
//!                                                                 heartbeat
//!                                                                 monitor
//! ```
//!
//! Every role of a pump runs on its own task and shares one cancellation
//! token, derived from the owning session's token. Whichever role fails first
//! cancels the token; the others observe it, the watch is released, and the
//! peer is closed once.

#![deny(missing_docs)]

mod error;
pub mod frame;
pub mod logs;
pub mod peer;
pub mod pump;
pub mod service;
pub mod subscription;

pub use error::StreamError;
pub use frame::{FrameStream, LogFrame, OutboundFrame, SetupErrorFrame, WatchErrorFrame};
pub use logs::{log_frames, LogTailConfig};
pub use peer::{FrameSink, FrameSource, PeerError, StreamPeer};
pub use pump::{CloseReason, PumpConfig, PumpReport, PumpState, StreamPump};
pub use service::StreamService;
pub use subscription::{SubscriptionCanceller, WatchSubscription};
