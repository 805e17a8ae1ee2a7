//! kube-rs backed `ClusterClient`
//!
//! Every kind goes through `Api<DynamicObject>` built from the kind's
//! registered `ApiResource`, so adding a kind never touches this file.
//!
//! Watches and followed logs go through a separate streaming client. A
//! read timeout on that client would end any watch or log that stays quiet
//! longer than the timeout, so it is built without one.

use std::sync::Arc;

use async_trait::async_trait;
use futures::StreamExt;
use k8s_openapi::api::core::v1::Pod;
use kube::api::{
    Api, DeleteParams, DynamicObject, ListParams, LogParams, PostParams, WatchEvent, WatchParams,
};
use kube::Client;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::client::{ClusterClient, LogStream, RawEvent, RawObject, UpstreamWatch, WatchHandle};
use crate::error::ClusterError;
use crate::kind::{ChangeType, ResourceKind};
use crate::registry::KindRegistry;

/// `ClusterClient` over a kube-rs `Client`
#[derive(Clone)]
pub struct KubeClusterClient {
    client: Client,
    stream_client: Client,
    registry: Arc<KindRegistry>,
}

impl KubeClusterClient {
    /// Wrap a kube client; kinds are resolved through `registry`
    ///
    /// The same client serves watches and log follows unless
    /// [`with_stream_client`](Self::with_stream_client) replaces it.
    pub fn new(client: Client, registry: Arc<KindRegistry>) -> Self {
        Self {
            stream_client: client.clone(),
            client,
            registry,
        }
    }

    /// Use `client` for watches and followed logs
    pub fn with_stream_client(mut self, client: Client) -> Self {
        self.stream_client = client;
        self
    }

    fn api(&self, kind: ResourceKind, namespace: &str) -> Result<Api<DynamicObject>, ClusterError> {
        self.api_with(self.client.clone(), kind, namespace)
    }

    fn api_with(
        &self,
        client: Client,
        kind: ResourceKind,
        namespace: &str,
    ) -> Result<Api<DynamicObject>, ClusterError> {
        let spec = self
            .registry
            .get(kind)
            .ok_or_else(|| ClusterError::Generic(format!("unsupported resource type: {kind}")))?;

        Ok(if kind.is_namespaced() {
            Api::namespaced_with(client, namespace, &spec.api_resource)
        } else {
            Api::all_with(client, &spec.api_resource)
        })
    }
}

fn to_raw(obj: &DynamicObject) -> Result<RawObject, ClusterError> {
    serde_json::to_value(obj).map_err(|e| ClusterError::Generic(format!("encode object: {e}")))
}

fn from_raw(obj: RawObject) -> Result<DynamicObject, ClusterError> {
    serde_json::from_value(obj).map_err(|e| ClusterError::Generic(format!("decode object: {e}")))
}

fn change_event(change: ChangeType, obj: &DynamicObject) -> RawEvent {
    match to_raw(obj) {
        Ok(raw) => RawEvent::new(change, raw),
        Err(e) => RawEvent::error(e.to_string()),
    }
}

/// Maps one kube watch item to a raw event; bookmarks are dropped
fn map_watch_event(item: kube::Result<WatchEvent<DynamicObject>>) -> Option<RawEvent> {
    match item {
        Ok(WatchEvent::Added(obj)) => Some(change_event(ChangeType::Added, &obj)),
        Ok(WatchEvent::Modified(obj)) => Some(change_event(ChangeType::Modified, &obj)),
        Ok(WatchEvent::Deleted(obj)) => Some(change_event(ChangeType::Deleted, &obj)),
        Ok(WatchEvent::Bookmark(_)) => None,
        Ok(WatchEvent::Error(status)) => Some(RawEvent::error(status.message)),
        Err(e) => Some(RawEvent::error(e.to_string())),
    }
}

/// Stops a kube watch by ending its event stream
struct TokenWatchHandle(CancellationToken);

impl WatchHandle for TokenWatchHandle {
    fn stop(self: Box<Self>) {
        self.0.cancel();
    }
}

#[async_trait]
impl ClusterClient for KubeClusterClient {
    async fn get(
        &self,
        kind: ResourceKind,
        namespace: &str,
        name: &str,
    ) -> Result<RawObject, ClusterError> {
        let obj = self.api(kind, namespace)?.get(name).await?;
        to_raw(&obj)
    }

    async fn list(
        &self,
        kind: ResourceKind,
        namespace: &str,
    ) -> Result<Vec<RawObject>, ClusterError> {
        let list = self.api(kind, namespace)?.list(&ListParams::default()).await?;
        list.items.iter().map(to_raw).collect()
    }

    async fn create(
        &self,
        kind: ResourceKind,
        namespace: &str,
        object: RawObject,
    ) -> Result<RawObject, ClusterError> {
        let obj = from_raw(object)?;
        let created = self
            .api(kind, namespace)?
            .create(&PostParams::default(), &obj)
            .await?;
        to_raw(&created)
    }

    async fn update(
        &self,
        kind: ResourceKind,
        namespace: &str,
        object: RawObject,
    ) -> Result<RawObject, ClusterError> {
        let obj = from_raw(object)?;
        let name = obj
            .metadata
            .name
            .clone()
            .ok_or_else(|| ClusterError::Generic("object has no metadata.name".to_string()))?;
        let replaced = self
            .api(kind, namespace)?
            .replace(&name, &PostParams::default(), &obj)
            .await?;
        to_raw(&replaced)
    }

    async fn delete(
        &self,
        kind: ResourceKind,
        namespace: &str,
        name: &str,
    ) -> Result<(), ClusterError> {
        self.api(kind, namespace)?
            .delete(name, &DeleteParams::default())
            .await?;
        Ok(())
    }

    async fn watch(
        &self,
        kind: ResourceKind,
        namespace: &str,
    ) -> Result<UpstreamWatch, ClusterError> {
        let api = self.api_with(self.stream_client.clone(), kind, namespace)?;
        // "0" asks for the current state first, delivered as ADDED events
        let stream = api.watch(&WatchParams::default(), "0").await?;
        debug!(kind = %kind, namespace = %namespace, "Upstream watch opened");

        let stop = CancellationToken::new();
        let events = stream
            .filter_map(|item| futures::future::ready(map_watch_event(item)))
            .take_until(stop.clone().cancelled_owned())
            .boxed();

        Ok(UpstreamWatch {
            events,
            handle: Box::new(TokenWatchHandle(stop)),
        })
    }

    async fn logs(
        &self,
        namespace: &str,
        pod: &str,
        container: &str,
    ) -> Result<LogStream, ClusterError> {
        let pods: Api<Pod> = Api::namespaced(self.stream_client.clone(), namespace);
        let params = LogParams {
            container: Some(container.to_string()),
            follow: true,
            ..Default::default()
        };
        let reader = pods.log_stream(pod, &params).await?;
        Ok(Box::pin(reader))
    }
}
