//! Pods and the controllers that run them

use std::collections::BTreeMap;

use chrono::{DateTime, SecondsFormat, Utc};
use k8s_openapi::api::apps::v1::Deployment;
use k8s_openapi::api::autoscaling::v1::HorizontalPodAutoscaler;
use k8s_openapi::api::batch::v1::Job;
use k8s_openapi::api::core::v1::{ContainerState, Pod};
use serde::Serialize;

use super::{ObjectSummary, Summarize, Summary};

/// Runtime state of one app container
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ContainerSummary {
    /// Name from the container status
    pub container_name: String,
    /// `running`, `waiting`, `terminated`, or empty when unknown
    pub container_state: String,
    /// Waiting or terminated reason
    pub container_state_reason: String,
    /// RFC 3339, empty when the container never started
    pub container_started_at: String,
}

/// Runtime state of one init container
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InitContainerSummary {
    /// Name from the init container status
    pub container_name: String,
    /// `running`, `waiting`, `terminated`, or empty when unknown
    pub container_state: String,
}

/// Pod row
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PodSummary {
    /// Name, namespace and age
    #[serde(flatten)]
    pub base: ObjectSummary,
    /// App containers keyed by name
    pub containers: BTreeMap<String, ContainerSummary>,
    /// Init containers keyed by name
    pub init_containers: BTreeMap<String, InitContainerSummary>,
    /// Restart count of the first container status
    pub restarts: i32,
    /// Name of the first owner reference
    pub controlled_by: String,
    /// Node the pod is scheduled on
    pub node: String,
    /// QoS class
    pub qos: String,
    /// Phase
    pub status: String,
    /// Reason reported with the phase
    pub status_reason: String,
    /// Pod labels
    pub labels: BTreeMap<String, String>,
}

fn state_name(state: Option<&ContainerState>) -> &'static str {
    match state {
        Some(s) if s.running.is_some() => "running",
        Some(s) if s.waiting.is_some() => "waiting",
        Some(s) if s.terminated.is_some() => "terminated",
        _ => "",
    }
}

fn state_details(state: Option<&ContainerState>) -> (String, String) {
    let Some(state) = state else {
        return (String::new(), String::new());
    };
    let rfc3339 = |t: &DateTime<Utc>| t.to_rfc3339_opts(SecondsFormat::Secs, true);

    if let Some(running) = &state.running {
        let started = running.started_at.as_ref().map(|t| rfc3339(&t.0));
        (String::new(), started.unwrap_or_default())
    } else if let Some(waiting) = &state.waiting {
        (waiting.reason.clone().unwrap_or_default(), String::new())
    } else if let Some(terminated) = &state.terminated {
        let started = terminated.started_at.as_ref().map(|t| rfc3339(&t.0));
        (
            terminated.reason.clone().unwrap_or_default(),
            started.unwrap_or_default(),
        )
    } else {
        (String::new(), String::new())
    }
}

impl Summarize for Pod {
    fn summarize(&self, now: DateTime<Utc>) -> Summary {
        let status = self.status.clone().unwrap_or_default();
        let statuses = status.container_statuses.unwrap_or_default();

        let containers = statuses
            .iter()
            .map(|cs| {
                let (reason, started_at) = state_details(cs.state.as_ref());
                let summary = ContainerSummary {
                    container_name: cs.name.clone(),
                    container_state: state_name(cs.state.as_ref()).to_string(),
                    container_state_reason: reason,
                    container_started_at: started_at,
                };
                (cs.name.clone(), summary)
            })
            .collect();

        let init_containers = status
            .init_container_statuses
            .unwrap_or_default()
            .into_iter()
            .map(|cs| {
                let summary = InitContainerSummary {
                    container_name: cs.name.clone(),
                    container_state: state_name(cs.state.as_ref()).to_string(),
                };
                (cs.name, summary)
            })
            .collect();

        let controlled_by = self
            .metadata
            .owner_references
            .as_ref()
            .and_then(|refs| refs.first())
            .map(|owner| owner.name.clone())
            .unwrap_or_default();

        Summary::Pod(PodSummary {
            base: ObjectSummary::of(self, now),
            containers,
            init_containers,
            restarts: statuses.first().map(|cs| cs.restart_count).unwrap_or(0),
            controlled_by,
            node: self
                .spec
                .as_ref()
                .and_then(|s| s.node_name.clone())
                .unwrap_or_default(),
            qos: status.qos_class.unwrap_or_default(),
            status: status.phase.unwrap_or_default(),
            status_reason: status.reason.unwrap_or_default(),
            labels: self.metadata.labels.clone().unwrap_or_default(),
        })
    }
}

/// Status of the `Available` and `Progressing` conditions
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeploymentConditions {
    /// Status of `Available`, empty when absent
    pub available: String,
    /// Status of `Progressing`, empty when absent
    pub progressing: String,
}

/// Deployment row
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeploymentSummary {
    /// Name, namespace and age
    #[serde(flatten)]
    pub base: ObjectSummary,
    /// Available replicas
    pub running_pods: i32,
    /// Observed replicas
    pub total_pods: i32,
    /// Desired replicas, falling back to the observed count
    pub replicas: i32,
    /// Rollout conditions
    pub conditions: DeploymentConditions,
}

impl Summarize for Deployment {
    fn summarize(&self, now: DateTime<Utc>) -> Summary {
        let status = self.status.clone().unwrap_or_default();
        let condition = |type_: &str| {
            status
                .conditions
                .iter()
                .flatten()
                .find(|c| c.type_ == type_)
                .map(|c| c.status.clone())
                .unwrap_or_default()
        };
        let total = status.replicas.unwrap_or(0);

        Summary::Deployment(DeploymentSummary {
            base: ObjectSummary::of(self, now),
            running_pods: status.available_replicas.unwrap_or(0),
            total_pods: total,
            replicas: self
                .spec
                .as_ref()
                .and_then(|s| s.replicas)
                .unwrap_or(total),
            conditions: DeploymentConditions {
                available: condition("Available"),
                progressing: condition("Progressing"),
            },
        })
    }
}

/// Job row
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JobSummary {
    /// Name, namespace and age
    #[serde(flatten)]
    pub base: ObjectSummary,
    /// Type of the most recent condition, `Unknown` when there is none
    pub condition_status: String,
    /// `succeeded/desired`
    pub completions: String,
}

impl Summarize for Job {
    fn summarize(&self, now: DateTime<Utc>) -> Summary {
        let status = self.status.clone().unwrap_or_default();
        let condition_status = status
            .conditions
            .as_ref()
            .and_then(|c| c.last())
            .map(|c| c.type_.clone())
            .unwrap_or_else(|| "Unknown".to_string());
        let desired = self
            .spec
            .as_ref()
            .and_then(|s| s.completions)
            .unwrap_or(1);

        Summary::Job(JobSummary {
            base: ObjectSummary::of(self, now),
            condition_status,
            completions: format!("{}/{}", status.succeeded.unwrap_or(0), desired),
        })
    }
}

/// HorizontalPodAutoscaler row
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HorizontalPodAutoscalerSummary {
    /// Name, namespace and age
    #[serde(flatten)]
    pub base: ObjectSummary,
    /// Lower replica bound, 1 when unset
    pub min_pods: i32,
    /// Upper replica bound
    pub max_pods: i32,
    /// Current replica count
    pub replicas: i32,
    /// Kind of the scaled object
    pub target_kind: String,
    /// Name of the scaled object
    pub target_name: String,
}

impl Summarize for HorizontalPodAutoscaler {
    fn summarize(&self, now: DateTime<Utc>) -> Summary {
        let spec = self.spec.clone().unwrap_or_default();

        Summary::HorizontalPodAutoscaler(HorizontalPodAutoscalerSummary {
            base: ObjectSummary::of(self, now),
            min_pods: spec.min_replicas.unwrap_or(1),
            max_pods: spec.max_replicas,
            replicas: self.status.as_ref().map(|s| s.current_replicas).unwrap_or(0),
            target_kind: spec.scale_target_ref.kind,
            target_name: spec.scale_target_ref.name,
        })
    }
}
