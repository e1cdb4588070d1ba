//! Startup orchestration.
//!
//! # Responsibilities
//! - Log the resolved configuration
//! - Start the metrics exporter when configured
//! - Bind the listener and serve until shutdown

use std::sync::Arc;

use metrics_exporter_prometheus::BuildError;
use tokio::sync::broadcast;

use crate::config::ProxyConfig;
use crate::credential::CredentialStore;
use crate::http::HttpServer;
use crate::net::{listener, ClientError, ListenerError};
use crate::observability::metrics;

/// Anything that stops the proxy from becoming ready.
#[derive(Debug, thiserror::Error)]
pub enum StartupError {
    #[error(transparent)]
    Listener(#[from] ListenerError),

    #[error(transparent)]
    Client(#[from] ClientError),

    #[error("failed to start metrics exporter: {0}")]
    Metrics(#[from] BuildError),

    #[error("server error: {0}")]
    Serve(#[from] std::io::Error),
}

/// Run the proxy until `shutdown` fires.
pub async fn run(config: ProxyConfig, shutdown: broadcast::Receiver<()>) -> Result<(), StartupError> {
    let header_names: Vec<&str> = config.extra_headers.names().map(|n| n.as_str()).collect();
    tracing::info!(
        upstream = %config.upstream,
        listen = %config.listener.socket_addr(),
        extra_headers = ?header_names,
        capture_cookie = %config.capture.cookie_name,
        capture_policy = ?config.capture.policy,
        upstream_timeout = ?config.forwarding.timeout(),
        "Configuration loaded"
    );

    if let Some(addr) = config.observability.metrics_address {
        metrics::init_metrics(addr)?;
    }

    let server = HttpServer::new(&config, Arc::new(CredentialStore::new()))?;
    let listener = listener::bind(&config.listener).await?;

    server.run(listener, shutdown).await?;
    Ok(())
}
