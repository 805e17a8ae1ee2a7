//! Per-kind capability records
//!
//! One `KindSpec` per resource kind carries everything kind-specific: how to
//! address it on the API server and how to project its objects. Clients and
//! projectors look kinds up here instead of switching on the kind.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use k8s_openapi::api::apps::v1::Deployment;
use k8s_openapi::api::autoscaling::v1::HorizontalPodAutoscaler;
use k8s_openapi::api::batch::v1::Job;
use k8s_openapi::api::core::v1::{
    ConfigMap, Endpoints, Event, Namespace, Node, PersistentVolumeClaim, Pod, Secret, Service,
    ServiceAccount,
};
use k8s_openapi::api::networking::v1::Ingress;
use kube::api::ApiResource;

use crate::client::RawObject;
use crate::error::ProjectionError;
use crate::kind::ResourceKind;
use crate::projector::{self, Summarize, Summary};

/// Projects a raw object, failing if it does not decode
pub type ProjectFn = fn(&RawObject, DateTime<Utc>) -> Result<Summary, ProjectionError>;

/// Projects whatever can be salvaged from an undecodable object
pub type FallbackFn = fn(&RawObject, DateTime<Utc>) -> Summary;

/// Capability record for one kind
#[derive(Clone)]
pub struct KindSpec {
    /// The kind this record describes
    pub kind: ResourceKind,
    /// Group/version/plural used to build dynamic API handles
    pub api_resource: ApiResource,
    /// Strict projection
    pub project: ProjectFn,
    /// Default projection used when `project` fails
    pub fallback: FallbackFn,
}

impl KindSpec {
    /// Build the record for a typed kind
    pub fn of<K>(kind: ResourceKind) -> Self
    where
        K: Summarize + kube::Resource<DynamicType = ()>,
    {
        Self {
            kind,
            api_resource: ApiResource::erase::<K>(&()),
            project: projector::project_typed::<K>,
            fallback: projector::fallback_typed::<K>,
        }
    }
}

impl std::fmt::Debug for KindSpec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KindSpec")
            .field("kind", &self.kind)
            .field("api_version", &self.api_resource.api_version)
            .field("plural", &self.api_resource.plural)
            .finish()
    }
}

/// Lookup table from kind to capability record
#[derive(Debug, Clone, Default)]
pub struct KindRegistry {
    specs: HashMap<ResourceKind, KindSpec>,
}

impl KindRegistry {
    /// An empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with every built-in kind
    pub fn builtin() -> Self {
        let mut registry = Self::new();
        registry.register(KindSpec::of::<Pod>(ResourceKind::Pod));
        registry.register(KindSpec::of::<Deployment>(ResourceKind::Deployment));
        registry.register(KindSpec::of::<ConfigMap>(ResourceKind::ConfigMap));
        registry.register(KindSpec::of::<Job>(ResourceKind::Job));
        registry.register(KindSpec::of::<Service>(ResourceKind::Service));
        registry.register(KindSpec::of::<Secret>(ResourceKind::Secret));
        registry.register(KindSpec::of::<HorizontalPodAutoscaler>(
            ResourceKind::HorizontalPodAutoscaler,
        ));
        registry.register(KindSpec::of::<Ingress>(ResourceKind::Ingress));
        registry.register(KindSpec::of::<Endpoints>(ResourceKind::Endpoints));
        registry.register(KindSpec::of::<ServiceAccount>(ResourceKind::ServiceAccount));
        registry.register(KindSpec::of::<PersistentVolumeClaim>(
            ResourceKind::PersistentVolumeClaim,
        ));
        registry.register(KindSpec::of::<Namespace>(ResourceKind::Namespace));
        registry.register(KindSpec::of::<Node>(ResourceKind::Node));
        registry.register(KindSpec::of::<Event>(ResourceKind::Event));
        registry
    }

    /// Add or replace a record
    pub fn register(&mut self, spec: KindSpec) {
        self.specs.insert(spec.kind, spec);
    }

    /// Record for `kind`, if registered
    pub fn get(&self, kind: ResourceKind) -> Option<&KindSpec> {
        self.specs.get(&kind)
    }

    /// Whether `kind` has a record
    pub fn supports(&self, kind: ResourceKind) -> bool {
        self.specs.contains_key(&kind)
    }
}
