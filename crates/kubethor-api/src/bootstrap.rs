//! Cluster client bootstrap from an uploaded kubeconfig
//!
//! The kubeconfig never touches disk: it is parsed in memory, turned into a
//! kube `Config` with explicit timeouts, and probed by listing namespaces.
//!
//! Each session gets two kube clients over the same config. Unary calls use
//! the read timeout; watches and followed logs use a client without one,
//! since a quiet namespace or container sends nothing for long stretches.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use kube::config::{KubeConfigOptions, Kubeconfig};
use kube::{Client, Config};
use kubethor_cluster::{ClusterClient, ClusterError, KindRegistry, KubeClusterClient, ResourceKind};
use tracing::{debug, info};

#[cfg(test)]
use mockall::automock;

/// Connect timeout for clients built from uploaded kubeconfigs
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// Read timeout for unary calls made with uploaded kubeconfigs
pub const DEFAULT_READ_TIMEOUT: Duration = Duration::from_secs(30);

/// Errors raised while building a session's cluster client
#[derive(Debug, thiserror::Error)]
pub enum BootstrapError {
    /// The kubeconfig did not parse
    #[error("invalid kubeconfig: {0}")]
    InvalidKubeconfig(String),

    /// The kubeconfig parsed but no client could be built from it
    #[error("error creating cluster client: {0}")]
    Client(String),

    /// The cluster rejected the namespace probe
    #[error("error fetching namespace list: {0}")]
    Cluster(#[from] ClusterError),
}

/// A connected cluster and the namespace context to start the session with
pub struct BootstrappedCluster {
    /// Client for every later call under the session
    pub client: Arc<dyn ClusterClient>,
    /// Namespace the operator starts in
    pub namespace: String,
    /// Every namespace visible to the credential
    pub namespace_list: Vec<String>,
}

/// Turns an uploaded kubeconfig into a connected cluster
#[cfg_attr(test, automock)]
#[async_trait]
pub trait SessionBootstrap: Send + Sync {
    /// Build a client, probe the cluster, and resolve the namespace context
    async fn connect(&self, kubeconfig: &str) -> Result<BootstrappedCluster, BootstrapError>;
}

/// `SessionBootstrap` backed by kube-rs
pub struct KubeconfigBootstrap {
    kinds: Arc<KindRegistry>,
    connect_timeout: Duration,
    read_timeout: Duration,
}

impl KubeconfigBootstrap {
    /// Bootstrap resolving kinds through `kinds`, with default timeouts
    pub fn new(kinds: Arc<KindRegistry>) -> Self {
        Self {
            kinds,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            read_timeout: DEFAULT_READ_TIMEOUT,
        }
    }

    /// Override the connect and read timeouts
    pub fn with_timeouts(mut self, connect_timeout: Duration, read_timeout: Duration) -> Self {
        self.connect_timeout = connect_timeout;
        self.read_timeout = read_timeout;
        self
    }

    async fn cluster_client(&self, kubeconfig: Kubeconfig) -> Result<KubeClusterClient, BootstrapError> {
        let mut config = Config::from_custom_kubeconfig(kubeconfig, &KubeConfigOptions::default())
            .await
            .map_err(|e| BootstrapError::Client(e.to_string()))?;
        config.connect_timeout = Some(self.connect_timeout);

        let mut stream_config = config.clone();
        stream_config.read_timeout = None;
        config.read_timeout = Some(self.read_timeout);

        let client = Client::try_from(config).map_err(|e| BootstrapError::Client(e.to_string()))?;
        let stream_client =
            Client::try_from(stream_config).map_err(|e| BootstrapError::Client(e.to_string()))?;
        Ok(KubeClusterClient::new(client, self.kinds.clone()).with_stream_client(stream_client))
    }
}

#[async_trait]
impl SessionBootstrap for KubeconfigBootstrap {
    async fn connect(&self, kubeconfig: &str) -> Result<BootstrappedCluster, BootstrapError> {
        let parsed = Kubeconfig::from_yaml(kubeconfig)
            .map_err(|e| BootstrapError::InvalidKubeconfig(e.to_string()))?;
        let context_namespace = context_namespace(&parsed);

        let client: Arc<dyn ClusterClient> = Arc::new(self.cluster_client(parsed).await?);

        let namespaces = client.list(ResourceKind::Namespace, "").await?;
        let namespace_list: Vec<String> = namespaces
            .iter()
            .filter_map(|ns| ns.pointer("/metadata/name").and_then(|n| n.as_str()))
            .map(str::to_string)
            .collect();
        debug!(count = namespace_list.len(), "Listed namespaces");

        let namespace = resolve_namespace(context_namespace, &namespace_list);
        info!(namespace = %namespace, "Cluster client connected");

        Ok(BootstrappedCluster {
            client,
            namespace,
            namespace_list,
        })
    }
}

/// Namespace named by the current context, else by the first context that names one
pub fn context_namespace(kubeconfig: &Kubeconfig) -> Option<String> {
    let named = |name: &str| {
        kubeconfig
            .contexts
            .iter()
            .find(|c| c.name == name)
            .and_then(|c| c.context.as_ref())
            .and_then(|c| c.namespace.clone())
            .filter(|ns| !ns.is_empty())
    };

    kubeconfig
        .current_context
        .as_deref()
        .and_then(named)
        .or_else(|| {
            kubeconfig
                .contexts
                .iter()
                .filter_map(|c| c.context.as_ref())
                .filter_map(|c| c.namespace.clone())
                .find(|ns| !ns.is_empty())
        })
}

/// Context namespace, falling back to the first listed namespace
pub fn resolve_namespace(context_namespace: Option<String>, namespace_list: &[String]) -> String {
    context_namespace
        .or_else(|| namespace_list.first().cloned())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kubeconfig(current: &str, contexts: &[(&str, Option<&str>)]) -> Kubeconfig {
        let contexts: String = contexts
            .iter()
            .map(|(name, ns)| {
                let ns = ns.map(|n| format!("\n    namespace: {n}")).unwrap_or_default();
                format!("- name: {name}\n  context:\n    cluster: dev\n    user: admin{ns}\n")
            })
            .collect();
        let yaml = format!(
            "apiVersion: v1\nkind: Config\ncurrent-context: {current}\nclusters:\n- name: dev\n  cluster:\n    server: https://127.0.0.1:6443\nusers:\n- name: admin\n  user:\n    token: abc\ncontexts:\n{contexts}"
        );
        Kubeconfig::from_yaml(&yaml).unwrap()
    }

    #[test]
    fn test_current_context_namespace_wins() {
        let kc = kubeconfig("prod", &[("dev", Some("team-a")), ("prod", Some("payments"))]);
        assert_eq!(context_namespace(&kc).as_deref(), Some("payments"));
    }

    #[test]
    fn test_falls_back_to_first_context_with_namespace() {
        let kc = kubeconfig("prod", &[("dev", None), ("staging", Some("team-b")), ("prod", None)]);
        assert_eq!(context_namespace(&kc).as_deref(), Some("team-b"));
    }

    #[test]
    fn test_no_context_namespace() {
        let kc = kubeconfig("dev", &[("dev", None)]);
        assert_eq!(context_namespace(&kc), None);
    }

    #[test]
    fn test_resolve_namespace_falls_back_to_list() {
        let list = vec!["default".to_string(), "kube-system".to_string()];
        assert_eq!(resolve_namespace(Some("team-a".into()), &list), "team-a");
        assert_eq!(resolve_namespace(None, &list), "default");
        assert_eq!(resolve_namespace(None, &[]), "");
    }

    #[tokio::test]
    async fn test_unparsable_kubeconfig_is_rejected() {
        let bootstrap = KubeconfigBootstrap::new(Arc::new(KindRegistry::builtin()));
        let result = bootstrap.connect("clusters: [not: valid").await;
        assert!(matches!(result, Err(BootstrapError::InvalidKubeconfig(_))));
    }
}
