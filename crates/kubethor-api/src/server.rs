//! HTTP server wiring

use std::net::SocketAddr;
use std::sync::Arc;

use axum::routing::{get, post};
use axum::Router;
use kubethor_cluster::{EventProjector, KindRegistry};
use kubethor_session::{SessionConfig, SessionRegistry};
use kubethor_stream::{LogTailConfig, PumpConfig, StreamPump, StreamService};
use tokio_util::sync::CancellationToken;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::bootstrap::{KubeconfigBootstrap, SessionBootstrap};
use crate::error::Error;
use crate::handlers::{cluster_connected, disconnect, health, refresh_session, set_client};
use crate::ws::{pod_logs, watch_resources};

/// Server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address to bind the server
    pub addr: SocketAddr,
    /// Session lifetime and janitor settings
    pub session: SessionConfig,
    /// Stream pacing, heartbeat and buffering
    pub pump: PumpConfig,
    /// Log tail chunking
    pub log_tail: LogTailConfig,
}

/// Shared state for handlers
#[derive(Clone)]
pub struct AppState {
    /// Live sessions
    pub registry: Arc<SessionRegistry>,
    /// Builds cluster clients from uploaded kubeconfigs
    pub bootstrap: Arc<dyn SessionBootstrap>,
    /// Watch and log streaming
    pub streams: StreamService,
}

impl AppState {
    /// Wire the stream service over `registry`
    pub fn new(
        registry: Arc<SessionRegistry>,
        bootstrap: Arc<dyn SessionBootstrap>,
        kinds: Arc<KindRegistry>,
        pump: PumpConfig,
        log_tail: LogTailConfig,
    ) -> Self {
        let streams = StreamService::new(
            registry.clone(),
            EventProjector::new(kinds),
            StreamPump::new(pump),
            log_tail,
        );
        Self {
            registry,
            bootstrap,
            streams,
        }
    }
}

/// Build the router with every endpoint
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/k8s/set-client", post(set_client))
        .route("/api/k8s/refresh-session", get(refresh_session))
        .route("/api/k8s/cluster-connected", get(cluster_connected))
        .route("/api/k8s/disconnect", get(disconnect))
        .route(
            "/api/k8s/ws/resource-watcher/list/{resource_type}/{namespace_name}",
            get(watch_resources),
        )
        .route(
            "/api/k8s/ws/resource-watcher/pod-logs/{namespace_name}/{pod_name}/{container_name}",
            get(pod_logs),
        )
        .route("/healthz", get(health))
        .route("/ready", get(health))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// The kubethor HTTP server
pub struct Server {
    addr: SocketAddr,
    state: AppState,
}

impl Server {
    /// Build the server with the kube-rs bootstrap and built-in kinds
    pub fn new(config: ServerConfig) -> Self {
        let kinds = Arc::new(KindRegistry::builtin());
        let registry = Arc::new(SessionRegistry::new(config.session));
        let bootstrap = Arc::new(KubeconfigBootstrap::new(kinds.clone()));
        let state = AppState::new(registry, bootstrap, kinds, config.pump, config.log_tail);
        Self {
            addr: config.addr,
            state,
        }
    }

    /// Session registry the server serves from
    pub fn registry(&self) -> Arc<SessionRegistry> {
        self.state.registry.clone()
    }

    /// Serve until `shutdown` is cancelled
    pub async fn run(self, shutdown: CancellationToken) -> Result<(), Error> {
        let listener = tokio::net::TcpListener::bind(self.addr)
            .await
            .map_err(|e| Error::Internal(format!("failed to bind {}: {}", self.addr, e)))?;

        info!(addr = %self.addr, "Starting kubethor server");

        axum::serve(listener, router(self.state))
            .with_graceful_shutdown(shutdown.cancelled_owned())
            .await
            .map_err(|e| Error::Internal(format!("server error: {}", e)))
    }
}
