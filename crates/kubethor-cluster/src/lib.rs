//! Kubethor cluster layer
//!
//! Everything the streaming core needs to know about the Kubernetes control
//! plane, and nothing about sessions or transports:
//!
//! - [`kind`] - supported resource kinds and watch change types
//! - [`client`] - the `ClusterClient` trait (get/list/create/update/delete/watch/logs)
//! - [`kube_client`] - kube-rs implementation backed by `Api<DynamicObject>`
//! - [`registry`] - per-kind capability records (API resource + projection)
//! - [`projector`] - pure projections from raw objects to compact summaries
//! - [`error`] - cluster error taxonomy

#![deny(missing_docs)]

pub mod client;
pub mod error;
pub mod kind;
pub mod kube_client;
pub mod projector;
pub mod registry;

pub use client::{ClusterClient, LogStream, RawEvent, RawEventStream, RawObject, UpstreamWatch, WatchHandle};
pub use error::{ClusterError, ProjectionError};
pub use kind::{ChangeType, ResourceKind, UnsupportedResourceKind};
pub use kube_client::KubeClusterClient;
pub use projector::{format_age, EventProjector, ProjectedEvent, Summary};
pub use registry::{KindRegistry, KindSpec};
