//! Cluster-scoped kinds and events

use chrono::{DateTime, Utc};
use k8s_openapi::api::core::v1::{Event, Namespace, Node};
use serde::Serialize;

use super::{format_age, ObjectSummary, Summarize, Summary};

const NODE_ROLE_PREFIX: &str = "node-role.kubernetes.io/";

/// Namespace row
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NamespaceSummary {
    /// Name and age
    #[serde(flatten)]
    pub base: ObjectSummary,
    /// Phase (`Active`, `Terminating`)
    pub status: String,
}

impl Summarize for Namespace {
    fn summarize(&self, now: DateTime<Utc>) -> Summary {
        Summary::Namespace(NamespaceSummary {
            base: ObjectSummary::of(self, now),
            status: self
                .status
                .as_ref()
                .and_then(|s| s.phase.clone())
                .unwrap_or_default(),
        })
    }
}

/// Node row
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NodeSummary {
    /// Name and age
    #[serde(flatten)]
    pub base: ObjectSummary,
    /// `key=value:effect`
    pub taints: Vec<String>,
    /// Roles from `node-role.kubernetes.io/*` labels
    pub roles: Vec<String>,
    /// Kubelet version
    pub version: String,
}

impl Summarize for Node {
    fn summarize(&self, now: DateTime<Utc>) -> Summary {
        let taints = self
            .spec
            .as_ref()
            .and_then(|s| s.taints.as_ref())
            .map(|taints| {
                taints
                    .iter()
                    .map(|t| {
                        format!(
                            "{}={}:{}",
                            t.key,
                            t.value.as_deref().unwrap_or_default(),
                            t.effect
                        )
                    })
                    .collect()
            })
            .unwrap_or_default();

        // Role labels are usually valued "" or "true"; the key alone names the role
        let roles = self
            .metadata
            .labels
            .iter()
            .flatten()
            .filter_map(|(key, _)| key.strip_prefix(NODE_ROLE_PREFIX))
            .filter(|role| !role.is_empty())
            .map(str::to_string)
            .collect();

        Summary::Node(NodeSummary {
            base: ObjectSummary::of(self, now),
            taints,
            roles,
            version: self
                .status
                .as_ref()
                .and_then(|s| s.node_info.as_ref())
                .map(|info| info.kubelet_version.clone())
                .unwrap_or_default(),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
/// Event row
#[serde(rename_all = "camelCase")]
pub struct EventSummary {
    /// Name, namespace and age
    #[serde(flatten)]
    pub base: ObjectSummary,
    /// `Normal` or `Warning`
    #[serde(rename = "type")]
    pub type_: String,
    /// Event text
    pub message: String,
    /// `Kind/name`
    pub involved_object: String,
    /// Reporting component
    pub source: String,
    /// Occurrences
    pub count: i32,
    /// Age of the last occurrence
    pub last_seen: String,
}

impl Summarize for Event {
    fn summarize(&self, now: DateTime<Utc>) -> Summary {
        let involved = &self.involved_object;
        Summary::Event(EventSummary {
            base: ObjectSummary::of(self, now),
            type_: self.type_.clone().unwrap_or_default(),
            message: self.message.clone().unwrap_or_default(),
            involved_object: format!(
                "{}/{}",
                involved.kind.as_deref().unwrap_or_default(),
                involved.name.as_deref().unwrap_or_default()
            ),
            source: self
                .source
                .as_ref()
                .and_then(|s| s.component.clone())
                .unwrap_or_default(),
            count: self.count.unwrap_or(0),
            last_seen: format_age(self.last_timestamp.as_ref(), now),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::super::project_typed;
    use super::super::test_support::{created_ago, now};
    use super::*;
    use serde_json::json;

    #[test]
    fn test_namespace_has_no_namespace_field() {
        let raw = json!({
            "apiVersion": "v1",
            "kind": "Namespace",
            "metadata": { "name": "shop", "creationTimestamp": created_ago(90_000) },
            "status": { "phase": "Active" }
        });
        let summary = project_typed::<Namespace>(&raw, now()).unwrap();
        let wire = serde_json::to_value(&summary).unwrap();
        assert_eq!(wire, json!({ "name": "shop", "age": "1d", "status": "Active" }));
    }

    #[test]
    fn test_node_taints_and_roles() {
        let raw = json!({
            "apiVersion": "v1",
            "kind": "Node",
            "metadata": {
                "name": "cp-0",
                "labels": {
                    "node-role.kubernetes.io/control-plane": "",
                    "node-role.kubernetes.io/etcd": "true",
                    "kubernetes.io/hostname": "cp-0"
                }
            },
            "spec": {
                "taints": [
                    { "key": "node-role.kubernetes.io/control-plane", "effect": "NoSchedule" },
                    { "key": "dedicated", "value": "infra", "effect": "NoExecute" }
                ]
            },
            "status": {
                "nodeInfo": {
                    "architecture": "amd64",
                    "bootID": "",
                    "containerRuntimeVersion": "containerd://1.7",
                    "kernelVersion": "6.1",
                    "kubeProxyVersion": "v1.31.0",
                    "kubeletVersion": "v1.31.0",
                    "machineID": "",
                    "operatingSystem": "linux",
                    "osImage": "Debian",
                    "systemUUID": ""
                }
            }
        });

        let Summary::Node(node) = project_typed::<Node>(&raw, now()).unwrap() else {
            panic!("expected node summary");
        };
        assert_eq!(
            node.taints,
            vec![
                "node-role.kubernetes.io/control-plane=:NoSchedule",
                "dedicated=infra:NoExecute"
            ]
        );
        assert_eq!(node.roles, vec!["control-plane", "etcd"]);
        assert_eq!(node.version, "v1.31.0");
    }

    #[test]
    fn test_event_summary() {
        let raw = json!({
            "apiVersion": "v1",
            "kind": "Event",
            "metadata": {
                "name": "web-0.17d",
                "namespace": "default",
                "creationTimestamp": created_ago(600)
            },
            "involvedObject": { "kind": "Pod", "name": "web-0" },
            "type": "Warning",
            "reason": "BackOff",
            "message": "Back-off restarting failed container",
            "source": { "component": "kubelet" },
            "count": 7,
            "lastTimestamp": created_ago(45)
        });

        let Summary::Event(ev) = project_typed::<Event>(&raw, now()).unwrap() else {
            panic!("expected event summary");
        };
        assert_eq!(ev.base.age, "10m");
        assert_eq!(ev.type_, "Warning");
        assert_eq!(ev.involved_object, "Pod/web-0");
        assert_eq!(ev.source, "kubelet");
        assert_eq!(ev.count, 7);
        assert_eq!(ev.last_seen, "45s");
    }
}
