//! Kubethor session layer
//!
//! A session binds an opaque operator id to a cluster client handle and its
//! namespace context for a bounded time:
//!
//! - [`SessionRegistry`] - concurrency-safe id to session map with expiry
//! - [`SessionJanitor`] - periodic sweep that evicts expired sessions
//! - [`Clock`] - time source, injectable for tests
//!
//! Each session owns a root cancellation token. Streams opened under it run
//! on child tokens, so deleting or evicting a session can tear them down.

#![deny(missing_docs)]

mod clock;
mod config;
mod error;
mod janitor;
mod registry;
mod session;

pub use clock::{Clock, SystemClock};
pub use config::SessionConfig;
pub use error::SessionError;
pub use janitor::SessionJanitor;
pub use registry::SessionRegistry;
pub use session::Session;

#[cfg(test)]
pub(crate) use clock::MockClock;
