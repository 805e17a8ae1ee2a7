//! Kubethor - session-scoped Kubernetes watch streaming over WebSockets

mod telemetry;

use std::net::SocketAddr;
use std::time::Duration;

use clap::Parser;
use kubethor_api::{Server, ServerConfig};
use kubethor_session::{SessionConfig, SessionJanitor};
use kubethor_stream::{LogTailConfig, PumpConfig};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::telemetry::{init_telemetry, LogFormat};

/// Kubethor backend - per-operator cluster sessions and live resource streams
#[derive(Parser, Debug)]
#[command(name = "kubethor", version, about, long_about = None)]
struct Cli {
    /// Address to serve HTTP and WebSocket traffic on
    #[arg(long, env = "KUBETHOR_BIND", default_value = "0.0.0.0:8080")]
    bind: SocketAddr,

    /// Session lifetime after creation or refresh
    #[arg(long, env = "KUBETHOR_SESSION_TTL_SECS", default_value = "3600")]
    session_ttl_secs: u64,

    /// Period of the expired-session sweep
    #[arg(long, env = "KUBETHOR_SWEEP_INTERVAL_SECS", default_value = "3600")]
    sweep_interval_secs: u64,

    /// Delay after every frame written to a stream
    #[arg(long, env = "KUBETHOR_PACING_MS", default_value = "100")]
    pacing_ms: u64,

    /// Ping period on open streams
    #[arg(long, env = "KUBETHOR_HEARTBEAT_SECS", default_value = "30")]
    heartbeat_secs: u64,

    /// Frames buffered between a stream's source and its writer
    #[arg(long, env = "KUBETHOR_QUEUE_CAPACITY", default_value = "64")]
    queue_capacity: usize,

    /// Maximum bytes per log frame
    #[arg(long, env = "KUBETHOR_LOG_CHUNK_BYTES", default_value = "1024")]
    log_chunk_bytes: usize,

    /// Cancel a session's live streams when it is deleted, replaced or evicted
    #[arg(
        long,
        env = "KUBETHOR_EVICT_CANCELS_STREAMS",
        default_value_t = true,
        action = clap::ArgAction::Set
    )]
    evict_cancels_streams: bool,

    /// Log line format
    #[arg(long, env = "KUBETHOR_LOG_FORMAT", value_enum, default_value = "json")]
    log_format: LogFormat,
}

impl Cli {
    fn server_config(&self) -> ServerConfig {
        ServerConfig {
            addr: self.bind,
            session: SessionConfig {
                ttl: Duration::from_secs(self.session_ttl_secs),
                sweep_interval: Duration::from_secs(self.sweep_interval_secs),
                cancel_streams_on_evict: self.evict_cancels_streams,
            },
            pump: PumpConfig {
                pacing: Duration::from_millis(self.pacing_ms),
                heartbeat_interval: Duration::from_secs(self.heartbeat_secs),
                queue_capacity: self.queue_capacity,
            },
            log_tail: LogTailConfig {
                chunk_size: self.log_chunk_bytes,
            },
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // kube's rustls transport needs a process-wide crypto provider
    if let Err(e) = rustls::crypto::aws_lc_rs::default_provider().install_default() {
        anyhow::bail!("failed to install crypto provider: {:?}", e);
    }

    let cli = Cli::parse();
    init_telemetry(cli.log_format)?;

    let config = cli.server_config();
    info!(
        addr = %config.addr,
        session_ttl_secs = cli.session_ttl_secs,
        cancel_streams_on_evict = config.session.cancel_streams_on_evict,
        "Starting kubethor"
    );

    let shutdown = CancellationToken::new();
    let server = Server::new(config);
    let janitor = SessionJanitor::new(server.registry()).spawn(shutdown.clone());

    let signal = shutdown.clone();
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => info!("Received ctrl-c, shutting down"),
            Err(e) => warn!(error = %e, "Could not listen for ctrl-c, shutting down"),
        }
        signal.cancel();
    });

    let served = server.run(shutdown.clone()).await;
    shutdown.cancel();
    if let Err(e) = janitor.await {
        warn!(error = %e, "Session janitor ended abnormally");
    }

    served?;
    info!("Kubethor stopped");
    Ok(())
}
