//! Resource kinds and watch change types

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Resource kinds that can be watched and projected
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ResourceKind {
    /// core/v1 Pod
    Pod,
    /// apps/v1 Deployment
    Deployment,
    /// core/v1 ConfigMap
    ConfigMap,
    /// batch/v1 Job
    Job,
    /// core/v1 Service
    Service,
    /// core/v1 Secret
    Secret,
    /// autoscaling/v1 HorizontalPodAutoscaler
    HorizontalPodAutoscaler,
    /// networking.k8s.io/v1 Ingress
    Ingress,
    /// core/v1 Endpoints
    Endpoints,
    /// core/v1 ServiceAccount
    ServiceAccount,
    /// core/v1 PersistentVolumeClaim
    PersistentVolumeClaim,
    /// core/v1 Namespace (cluster scoped)
    Namespace,
    /// core/v1 Node (cluster scoped)
    Node,
    /// core/v1 Event
    Event,
}

impl ResourceKind {
    /// Every supported kind, in registration order
    pub const ALL: [ResourceKind; 14] = [
        ResourceKind::Pod,
        ResourceKind::Deployment,
        ResourceKind::ConfigMap,
        ResourceKind::Job,
        ResourceKind::Service,
        ResourceKind::Secret,
        ResourceKind::HorizontalPodAutoscaler,
        ResourceKind::Ingress,
        ResourceKind::Endpoints,
        ResourceKind::ServiceAccount,
        ResourceKind::PersistentVolumeClaim,
        ResourceKind::Namespace,
        ResourceKind::Node,
        ResourceKind::Event,
    ];

    /// Kind name as it appears in `kind:` fields
    pub fn as_str(&self) -> &'static str {
        match self {
            ResourceKind::Pod => "Pod",
            ResourceKind::Deployment => "Deployment",
            ResourceKind::ConfigMap => "ConfigMap",
            ResourceKind::Job => "Job",
            ResourceKind::Service => "Service",
            ResourceKind::Secret => "Secret",
            ResourceKind::HorizontalPodAutoscaler => "HorizontalPodAutoscaler",
            ResourceKind::Ingress => "Ingress",
            ResourceKind::Endpoints => "Endpoints",
            ResourceKind::ServiceAccount => "ServiceAccount",
            ResourceKind::PersistentVolumeClaim => "PersistentVolumeClaim",
            ResourceKind::Namespace => "Namespace",
            ResourceKind::Node => "Node",
            ResourceKind::Event => "Event",
        }
    }

    /// Lowercase plural used in API paths
    pub fn plural(&self) -> &'static str {
        match self {
            ResourceKind::Pod => "pods",
            ResourceKind::Deployment => "deployments",
            ResourceKind::ConfigMap => "configmaps",
            ResourceKind::Job => "jobs",
            ResourceKind::Service => "services",
            ResourceKind::Secret => "secrets",
            ResourceKind::HorizontalPodAutoscaler => "horizontalpodautoscalers",
            ResourceKind::Ingress => "ingresses",
            ResourceKind::Endpoints => "endpoints",
            ResourceKind::ServiceAccount => "serviceaccounts",
            ResourceKind::PersistentVolumeClaim => "persistentvolumeclaims",
            ResourceKind::Namespace => "namespaces",
            ResourceKind::Node => "nodes",
            ResourceKind::Event => "events",
        }
    }

    /// Whether objects of this kind live inside a namespace
    pub fn is_namespaced(&self) -> bool {
        !matches!(self, ResourceKind::Namespace | ResourceKind::Node)
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The requested kind name is not one this system knows how to watch
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unsupported resource type: {0}")]
pub struct UnsupportedResourceKind(pub String);

impl FromStr for ResourceKind {
    type Err = UnsupportedResourceKind;

    /// Accepts the kind name or its plural, case-insensitively
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ResourceKind::ALL
            .into_iter()
            .find(|k| k.as_str().eq_ignore_ascii_case(s) || k.plural().eq_ignore_ascii_case(s))
            .ok_or_else(|| UnsupportedResourceKind(s.to_string()))
    }
}

/// Nature of a watch notification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ChangeType {
    /// Object appeared (including the initial listing)
    Added,
    /// Object changed
    Modified,
    /// Object was removed
    Deleted,
    /// Watch-level error or terminal marker
    Error,
}

impl ChangeType {
    /// Wire form (`ADDED`, `MODIFIED`, `DELETED`, `ERROR`)
    pub fn as_str(&self) -> &'static str {
        match self {
            ChangeType::Added => "ADDED",
            ChangeType::Modified => "MODIFIED",
            ChangeType::Deleted => "DELETED",
            ChangeType::Error => "ERROR",
        }
    }
}

impl fmt::Display for ChangeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_kind_name_and_plural() {
        assert_eq!("Pod".parse::<ResourceKind>(), Ok(ResourceKind::Pod));
        assert_eq!("pods".parse::<ResourceKind>(), Ok(ResourceKind::Pod));
        assert_eq!(
            "horizontalpodautoscaler".parse::<ResourceKind>(),
            Ok(ResourceKind::HorizontalPodAutoscaler)
        );
        assert_eq!("Endpoints".parse::<ResourceKind>(), Ok(ResourceKind::Endpoints));
    }

    #[test]
    fn test_parse_unknown_kind() {
        let err = "StatefulSet".parse::<ResourceKind>().unwrap_err();
        assert_eq!(err, UnsupportedResourceKind("StatefulSet".to_string()));
        assert_eq!(err.to_string(), "unsupported resource type: StatefulSet");
    }

    #[test]
    fn test_every_kind_round_trips_through_its_name() {
        for kind in ResourceKind::ALL {
            assert_eq!(kind.as_str().parse::<ResourceKind>(), Ok(kind));
        }
    }

    #[test]
    fn test_cluster_scoped_kinds() {
        assert!(!ResourceKind::Namespace.is_namespaced());
        assert!(!ResourceKind::Node.is_namespaced());
        assert!(ResourceKind::Pod.is_namespaced());
    }

    #[test]
    fn test_change_type_wire_form() {
        assert_eq!(serde_json::to_string(&ChangeType::Added).unwrap(), "\"ADDED\"");
        assert_eq!(serde_json::to_string(&ChangeType::Error).unwrap(), "\"ERROR\"");
        assert_eq!(ChangeType::Modified.to_string(), "MODIFIED");
    }
}
