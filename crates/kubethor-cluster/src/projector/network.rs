//! Services, ingresses and endpoints

use chrono::{DateTime, Utc};
use k8s_openapi::api::core::v1::{EndpointSubset, Endpoints, Service, ServicePort};
use k8s_openapi::api::networking::v1::{Ingress, IngressRule};
use serde::Serialize;

use super::{ObjectSummary, Summarize, Summary};

/// Service row
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceSummary {
    /// Name, namespace and age
    #[serde(flatten)]
    pub base: ObjectSummary,
    /// `ClusterIP`, `NodePort`, `LoadBalancer` or `ExternalName`
    #[serde(rename = "type")]
    pub type_: String,
    /// Cluster IP; the literal `None` for headless services
    #[serde(rename = "clusterIP")]
    pub cluster_ip: String,
    /// Exposed ports as declared
    pub ports: Vec<ServicePort>,
    /// External IPs as declared
    #[serde(rename = "externalIPs")]
    pub external_ips: Vec<String>,
}

impl Summarize for Service {
    fn summarize(&self, now: DateTime<Utc>) -> Summary {
        let spec = self.spec.clone().unwrap_or_default();
        Summary::Service(ServiceSummary {
            base: ObjectSummary::of(self, now),
            type_: spec.type_.unwrap_or_default(),
            cluster_ip: spec.cluster_ip.unwrap_or_default(),
            ports: spec.ports.unwrap_or_default(),
            external_ips: spec.external_ips.unwrap_or_default(),
        })
    }
}

/// Ingress row
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IngressSummary {
    /// Name, namespace and age
    #[serde(flatten)]
    pub base: ObjectSummary,
    /// Load balancer IPs, or hostnames where no IP is assigned
    pub load_balancers: Vec<String>,
    /// Host and path rules as declared
    pub rules: Vec<IngressRule>,
}

impl Summarize for Ingress {
    fn summarize(&self, now: DateTime<Utc>) -> Summary {
        let load_balancers = self
            .status
            .as_ref()
            .and_then(|s| s.load_balancer.as_ref())
            .and_then(|lb| lb.ingress.as_ref())
            .map(|entries| {
                entries
                    .iter()
                    .map(|e| e.ip.clone().or_else(|| e.hostname.clone()).unwrap_or_default())
                    .collect()
            })
            .unwrap_or_default();

        Summary::Ingress(IngressSummary {
            base: ObjectSummary::of(self, now),
            load_balancers,
            rules: self
                .spec
                .as_ref()
                .and_then(|s| s.rules.clone())
                .unwrap_or_default(),
        })
    }
}

/// Endpoints row
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EndpointsSummary {
    /// Name, namespace and age
    #[serde(flatten)]
    pub base: ObjectSummary,
    /// Addresses and ports as reported
    pub subsets: Vec<EndpointSubset>,
}

impl Summarize for Endpoints {
    fn summarize(&self, now: DateTime<Utc>) -> Summary {
        Summary::Endpoints(EndpointsSummary {
            base: ObjectSummary::of(self, now),
            subsets: self.subsets.clone().unwrap_or_default(),
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
    fn test_service_wire_names() {
        let raw = json!({
            "apiVersion": "v1",
            "kind": "Service",
            "metadata": { "name": "web", "namespace": "default" },
            "spec": {
                "type": "LoadBalancer",
                "clusterIP": "10.0.0.12",
                "externalIPs": ["192.0.2.10"],
                "ports": [{ "port": 80, "protocol": "TCP" }]
            }
        });

        let summary = project_typed::<Service>(&raw, now()).unwrap();
        let wire = serde_json::to_value(&summary).unwrap();
        assert_eq!(wire["type"], "LoadBalancer");
        assert_eq!(wire["clusterIP"], "10.0.0.12");
        assert_eq!(wire["externalIPs"], json!(["192.0.2.10"]));
        assert_eq!(wire["ports"][0]["port"], 80);
    }

    #[test]
    fn test_headless_service_defaults() {
        let raw = json!({
            "apiVersion": "v1",
            "kind": "Service",
            "metadata": { "name": "db", "namespace": "default" }
        });
        let Summary::Service(svc) = project_typed::<Service>(&raw, now()).unwrap() else {
            panic!("expected service summary");
        };
        assert_eq!(svc.type_, "");
        assert!(svc.ports.is_empty());
        assert!(svc.external_ips.is_empty());
    }

    #[test]
    fn test_ingress_load_balancer_ip_or_hostname() {
        let raw = json!({
            "apiVersion": "networking.k8s.io/v1",
            "kind": "Ingress",
            "metadata": { "name": "edge", "namespace": "default" },
            "spec": { "rules": [{ "host": "shop.example.com" }] },
            "status": {
                "loadBalancer": {
                    "ingress": [
                        { "ip": "203.0.113.7" },
                        { "hostname": "lb.example.net" }
                    ]
                }
            }
        });

        let Summary::Ingress(ing) = project_typed::<Ingress>(&raw, now()).unwrap() else {
            panic!("expected ingress summary");
        };
        assert_eq!(ing.load_balancers, vec!["203.0.113.7", "lb.example.net"]);
        assert_eq!(ing.rules.len(), 1);
        assert_eq!(ing.rules[0].host.as_deref(), Some("shop.example.com"));
    }

    #[test]
    fn test_endpoints_without_subsets() {
        let raw = json!({
            "apiVersion": "v1",
            "kind": "Endpoints",
            "metadata": { "name": "web", "namespace": "default" }
        });
        let Summary::Endpoints(ep) = project_typed::<Endpoints>(&raw, now()).unwrap() else {
            panic!("expected endpoints summary");
        };
        assert!(ep.subsets.is_empty());
    }
}
