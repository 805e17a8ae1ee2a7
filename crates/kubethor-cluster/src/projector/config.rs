//! Configuration, credentials and storage claims

use chrono::{DateTime, Utc};
use k8s_openapi::api::core::v1::{ConfigMap, PersistentVolumeClaim, Secret, ServiceAccount};
use serde::Serialize;

use super::{ObjectSummary, Summarize, Summary};

/// ConfigMap row
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConfigMapSummary {
    /// Name, namespace and age
    #[serde(flatten)]
    pub base: ObjectSummary,
    /// Data keys, sorted
    pub keys: Vec<String>,
}

impl Summarize for ConfigMap {
    fn summarize(&self, now: DateTime<Utc>) -> Summary {
        Summary::ConfigMap(ConfigMapSummary {
            base: ObjectSummary::of(self, now),
            keys: self
                .data
                .as_ref()
                .map(|d| d.keys().cloned().collect())
                .unwrap_or_default(),
        })
    }
}

/// Secret row
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SecretSummary {
    /// Name, namespace and age
    #[serde(flatten)]
    pub base: ObjectSummary,
    /// Data keys, sorted; values are never projected
    pub keys: Vec<String>,
    /// Secret type, e.g. `Opaque`
    #[serde(rename = "type")]
    pub type_: String,
}

impl Summarize for Secret {
    fn summarize(&self, now: DateTime<Utc>) -> Summary {
        Summary::Secret(SecretSummary {
            base: ObjectSummary::of(self, now),
            keys: self
                .data
                .as_ref()
                .map(|d| d.keys().cloned().collect())
                .unwrap_or_default(),
            type_: self.type_.clone().unwrap_or_default(),
        })
    }
}

impl Summarize for ServiceAccount {
    fn summarize(&self, now: DateTime<Utc>) -> Summary {
        Summary::Object(ObjectSummary::of(self, now))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
/// PersistentVolumeClaim row
#[serde(rename_all = "camelCase")]
pub struct PersistentVolumeClaimSummary {
    /// Name, namespace and age
    #[serde(flatten)]
    pub base: ObjectSummary,
    /// Storage class, omitted when the claim names none
    #[serde(skip_serializing_if = "Option::is_none")]
    pub storage_class: Option<String>,
}

impl Summarize for PersistentVolumeClaim {
    fn summarize(&self, now: DateTime<Utc>) -> Summary {
        Summary::PersistentVolumeClaim(PersistentVolumeClaimSummary {
            base: ObjectSummary::of(self, now),
            storage_class: self
                .spec
                .as_ref()
                .and_then(|s| s.storage_class_name.clone()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::super::project_typed;
    use super::super::test_support::now;
    use super::*;
    use serde_json::json;

    #[test]
    fn test_config_map_keys_sorted() {
        let raw = json!({
            "apiVersion": "v1",
            "kind": "ConfigMap",
            "metadata": { "name": "settings", "namespace": "default" },
            "data": { "zeta": "1", "alpha": "2", "mid": "3" }
        });
        let Summary::ConfigMap(cm) = project_typed::<ConfigMap>(&raw, now()).unwrap() else {
            panic!("expected configmap summary");
        };
        assert_eq!(cm.keys, vec!["alpha", "mid", "zeta"]);
    }

    #[test]
    fn test_secret_hides_values() {
        let raw = json!({
            "apiVersion": "v1",
            "kind": "Secret",
            "metadata": { "name": "db-creds", "namespace": "default" },
            "type": "Opaque",
            "data": { "password": "aHVudGVyMg==", "user": "YWRtaW4=" }
        });
        let summary = project_typed::<Secret>(&raw, now()).unwrap();
        let wire = serde_json::to_string(&summary).unwrap();
        assert!(!wire.contains("aHVudGVyMg=="));

        let Summary::Secret(secret) = summary else {
            panic!("expected secret summary");
        };
        assert_eq!(secret.keys, vec!["password", "user"]);
        assert_eq!(secret.type_, "Opaque");
    }

    #[test]
    fn test_pvc_storage_class_omitted_when_absent() {
        let raw = json!({
            "apiVersion": "v1",
            "kind": "PersistentVolumeClaim",
            "metadata": { "name": "data", "namespace": "default" },
            "spec": {}
        });
        let summary = project_typed::<PersistentVolumeClaim>(&raw, now()).unwrap();
        let wire = serde_json::to_value(&summary).unwrap();
        assert!(wire.get("storageClass").is_none());

        let raw = json!({
            "apiVersion": "v1",
            "kind": "PersistentVolumeClaim",
            "metadata": { "name": "data", "namespace": "default" },
            "spec": { "storageClassName": "fast-ssd" }
        });
        let summary = project_typed::<PersistentVolumeClaim>(&raw, now()).unwrap();
        let wire = serde_json::to_value(&summary).unwrap();
        assert_eq!(wire["storageClass"], "fast-ssd");
    }
}
