//! Startup orchestration.
//!
//! Order: output directory, metrics exporter, listener. Any failure is fatal
//! and nothing starts accepting until every step succeeded.

use std::net::SocketAddr;

use thiserror::Error;

use crate::config::UploadConfig;
use crate::http::UploadServer;
use crate::net::{Listener, ListenerError};
use crate::observability::metrics;
use crate::storage::{StorageError, StorageSink};

#[derive(Debug, Error)]
pub enum StartupError {
    #[error("output directory: {0}")]
    Storage(#[from] StorageError),

    #[error("listener: {0}")]
    Listener(#[from] ListenerError),

    #[error("metrics exporter: {0}")]
    Metrics(#[from] metrics_exporter_prometheus::BuildError),

    #[error("invalid metrics address {0:?}")]
    MetricsAddress(String),
}

/// A bound, ready-to-run server.
pub struct Started {
    pub server: UploadServer,
    pub listener: Listener,
    pub local_addr: SocketAddr,
}

/// Prepare everything `config` asks for and bind the listener.
pub async fn start(config: &UploadConfig) -> Result<Started, StartupError> {
    let sink = StorageSink::new(config.storage.output_dir.clone());
    if config.storage.create_dir {
        sink.ensure_directory()?;
    }
    tracing::info!(output_dir = %sink.directory().display(), "Output directory ready");

    if config.observability.metrics_enabled {
        let addr: SocketAddr = config
            .observability
            .metrics_address
            .parse()
            .map_err(|_| StartupError::MetricsAddress(config.observability.metrics_address.clone()))?;
        metrics::init_metrics(addr)?;
    }

    let listener = Listener::bind(&config.listener).await?;
    let local_addr = listener.local_addr().map_err(ListenerError::Bind)?;

    Ok(Started {
        server: UploadServer::new(config),
        listener,
        local_addr,
    })
}
