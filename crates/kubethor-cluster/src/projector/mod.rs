//! Raw object to view-model projection
//!
//! Each kind projects into a compact summary record. Projection never fails a
//! stream: an object that does not decode as its kind falls back to a default
//! summary built from whatever metadata survived.

mod cluster;
mod config;
mod network;
mod workloads;

use std::sync::Arc;

use chrono::{DateTime, Utc};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::{ObjectMeta, Time};
use kube::ResourceExt;
use serde::de::DeserializeOwned;
use serde::Serialize;

pub use cluster::{EventSummary, NamespaceSummary, NodeSummary};
pub use config::{ConfigMapSummary, PersistentVolumeClaimSummary, SecretSummary};
pub use network::{EndpointsSummary, IngressSummary, ServiceSummary};
pub use workloads::{
    ContainerSummary, DeploymentConditions, DeploymentSummary, HorizontalPodAutoscalerSummary,
    InitContainerSummary, JobSummary, PodSummary,
};

use crate::client::RawObject;
use crate::error::ProjectionError;
use crate::kind::{ChangeType, ResourceKind};
use crate::registry::KindRegistry;

/// Compact age of an object, e.g. `2d`, `5h`, `30m`, `15s`
///
/// Missing or future timestamps read as `0s`.
pub fn format_age(timestamp: Option<&Time>, now: DateTime<Utc>) -> String {
    let Some(Time(created)) = timestamp else {
        return "0s".to_string();
    };
    let duration = now.signed_duration_since(*created);

    let total_secs = duration.num_seconds();
    if total_secs < 0 {
        return "0s".to_string();
    }

    let days = duration.num_days();
    if days > 0 {
        return format!("{}d", days);
    }

    let hours = duration.num_hours();
    if hours > 0 {
        return format!("{}h", hours);
    }

    let minutes = duration.num_minutes();
    if minutes > 0 {
        return format!("{}m", minutes);
    }

    format!("{}s", total_secs)
}

/// Fields every summary carries
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ObjectSummary {
    /// Object name
    pub name: String,
    /// Object namespace (absent for cluster-scoped kinds)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,
    /// Compact age since creation
    pub age: String,
}

impl ObjectSummary {
    /// Base fields of a typed object
    pub fn of<K: kube::Resource>(obj: &K, now: DateTime<Utc>) -> Self {
        Self {
            name: obj.name_any(),
            namespace: obj.namespace(),
            age: format_age(obj.meta().creation_timestamp.as_ref(), now),
        }
    }

    /// Base fields salvaged from a raw object's metadata
    pub fn from_raw(raw: &RawObject, now: DateTime<Utc>) -> Self {
        let meta = raw_metadata(raw);
        Self {
            name: meta.name.unwrap_or_default(),
            namespace: meta.namespace,
            age: format_age(meta.creation_timestamp.as_ref(), now),
        }
    }
}

/// Kind-specific summary record
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Summary {
    /// Pod
    Pod(PodSummary),
    /// Deployment
    Deployment(DeploymentSummary),
    /// ConfigMap
    ConfigMap(ConfigMapSummary),
    /// Job
    Job(JobSummary),
    /// Service
    Service(ServiceSummary),
    /// Secret
    Secret(SecretSummary),
    /// HorizontalPodAutoscaler
    HorizontalPodAutoscaler(HorizontalPodAutoscalerSummary),
    /// Ingress
    Ingress(IngressSummary),
    /// Endpoints
    Endpoints(EndpointsSummary),
    /// PersistentVolumeClaim
    PersistentVolumeClaim(PersistentVolumeClaimSummary),
    /// Namespace
    Namespace(NamespaceSummary),
    /// Node
    Node(NodeSummary),
    /// Event
    Event(EventSummary),
    /// Base fields only (ServiceAccount, unregistered kinds)
    Object(ObjectSummary),
}

/// A typed kind that knows how to summarize itself
pub trait Summarize: DeserializeOwned + Default + kube::Resource<DynamicType = ()> {
    /// Build the summary; must not fail on absent optional fields
    fn summarize(&self, now: DateTime<Utc>) -> Summary;
}

fn raw_metadata(raw: &RawObject) -> ObjectMeta {
    raw.get("metadata")
        .cloned()
        .and_then(|m| serde_json::from_value(m).ok())
        .unwrap_or_default()
}

/// Decode `raw` as `K` and summarize it
pub fn project_typed<K: Summarize>(
    raw: &RawObject,
    now: DateTime<Utc>,
) -> Result<Summary, ProjectionError> {
    let obj: K = serde_json::from_value(raw.clone()).map_err(|source| ProjectionError::Decode {
        kind: K::kind(&()).to_string(),
        source,
    })?;
    Ok(obj.summarize(now))
}

/// Summarize a default `K` carrying only the raw object's metadata
pub fn fallback_typed<K: Summarize>(raw: &RawObject, now: DateTime<Utc>) -> Summary {
    let mut obj = K::default();
    *obj.meta_mut() = raw_metadata(raw);
    obj.summarize(now)
}

/// A projected watch notification as sent to the peer
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectedEvent {
    /// Kind of the object
    pub kind: ResourceKind,
    /// Change that produced this event
    pub event_type: ChangeType,
    /// Kind-specific fields
    #[serde(flatten)]
    pub summary: Summary,
}

/// Projects raw events through the kind registry
#[derive(Debug, Clone)]
pub struct EventProjector {
    registry: Arc<KindRegistry>,
}

impl EventProjector {
    /// Projector over `registry`
    pub fn new(registry: Arc<KindRegistry>) -> Self {
        Self { registry }
    }

    /// Strict projection
    pub fn try_project(
        &self,
        kind: ResourceKind,
        change: ChangeType,
        raw: &RawObject,
        now: DateTime<Utc>,
    ) -> Result<ProjectedEvent, ProjectionError> {
        let spec = self
            .registry
            .get(kind)
            .ok_or_else(|| ProjectionError::Unregistered(kind.to_string()))?;
        let summary = (spec.project)(raw, now)?;
        Ok(ProjectedEvent {
            kind,
            event_type: change,
            summary,
        })
    }

    /// Default projection: the kind's summary with only metadata filled in
    pub fn fallback(
        &self,
        kind: ResourceKind,
        change: ChangeType,
        raw: &RawObject,
        now: DateTime<Utc>,
    ) -> ProjectedEvent {
        let summary = match self.registry.get(kind) {
            Some(spec) => (spec.fallback)(raw, now),
            None => Summary::Object(ObjectSummary::from_raw(raw, now)),
        };
        ProjectedEvent {
            kind,
            event_type: change,
            summary,
        }
    }
}
