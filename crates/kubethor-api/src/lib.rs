//! Kubethor HTTP surface
//!
//! Session bootstrap and lifecycle endpoints plus the two WebSocket stream
//! endpoints, served with axum.
//!
//! # Endpoints
//!
//! - `POST /api/k8s/set-client` - build a cluster client from a kubeconfig and register the session
//! - `GET /api/k8s/refresh-session` - extend the session's expiry
//! - `GET /api/k8s/cluster-connected` - session namespace context
//! - `GET /api/k8s/disconnect` - drop the session and cancel its streams
//! - `GET /api/k8s/ws/resource-watcher/list/{resource_type}/{namespace_name}` - resource watch stream
//! - `GET /api/k8s/ws/resource-watcher/pod-logs/{namespace_name}/{pod_name}/{container_name}` - log tail stream
//! - `GET /healthz`, `GET /ready` - probes
//!
//! HTTP endpoints take the session id from the `X-Session-Id` header;
//! WebSocket endpoints take it from the `sessionId` query parameter.

#![deny(missing_docs)]

pub mod bootstrap;
pub mod error;
pub mod handlers;
pub mod server;
pub mod ws;

pub use bootstrap::{BootstrapError, BootstrappedCluster, KubeconfigBootstrap, SessionBootstrap};
pub use error::{Error, Result};
pub use server::{router, AppState, Server, ServerConfig};
