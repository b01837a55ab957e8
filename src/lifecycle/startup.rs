//! Startup orchestration.
//!
//! # Responsibilities
//! - Build the registry and packet-filter backend from configuration
//! - Connect to the health-check engine and the parent
//! - Bind the control socket
//! - Start the metrics exporter when enabled
//!
//! # Design Decisions
//! - Fail fast: any startup error is fatal
//! - The control socket is bound last (clients only once peers are up)

use tokio::net::UnixStream;

use crate::config::{ConfigError, HoststateConfig};
use crate::control::ControlListener;
use crate::daemon::Daemon;
use crate::engine::Engine;
use crate::error::PfeError;
use crate::filter;
use crate::ipc::Peer;
use crate::model::Registry;
use crate::observability::metrics;

/// Build the engine from a validated configuration.
pub fn build_engine(config: &HoststateConfig) -> Result<Engine, PfeError> {
    let registry = Registry::new(config).map_err(ConfigError::Validation)?;
    let filter = filter::from_config(&config.filter);
    Ok(Engine::new(registry, filter))
}

/// Bring up every subsystem and return a daemon ready to run.
pub async fn start(config: &HoststateConfig) -> Result<Daemon<UnixStream>, PfeError> {
    let engine = build_engine(config)?;

    if config.observability.metrics_enabled {
        let addr = config
            .observability
            .metrics_address
            .parse()
            .map_err(|e: std::net::AddrParseError| PfeError::Metrics(e.to_string()))?;
        metrics::init_metrics(addr).map_err(PfeError::Metrics)?;
    }

    let hce = connect(Peer::Hce, &config.ipc.hce_socket).await?;
    let parent = connect(Peer::Parent, &config.ipc.parent_socket).await?;

    let control = ControlListener::bind(&config.ipc.control_socket, config.ipc.control_socket_mode)
        .map_err(|source| PfeError::ControlSocket {
            path: config.ipc.control_socket.clone(),
            source,
        })?;

    tracing::info!(
        services = engine.registry().services().count(),
        tables = engine.registry().tables().count(),
        hosts = engine.registry().hosts().count(),
        "Engine initialized"
    );
    Ok(Daemon::new(engine, hce, parent, control))
}

async fn connect(peer: Peer, path: &std::path::Path) -> Result<UnixStream, PfeError> {
    let stream = UnixStream::connect(path).await.map_err(|source| PfeError::Connect {
        peer,
        path: path.to_path_buf(),
        source,
    })?;
    tracing::info!(%peer, path = %path.display(), "Connected");
    Ok(stream)
}
