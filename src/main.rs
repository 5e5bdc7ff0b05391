//! ECG upload server.
//!
//! # Architecture Overview
//!
//! ```text
//!     ECG cart                ┌──────────────────────────────────────────────┐
//!     POST/PUT/OPTIONS        │                UPLOAD SERVER                 │
//!     ────────────────────────┼─▶ net::listener ─▶ http::dispatcher          │
//!                             │                       │                      │
//!                             │             ┌─────────┴─────────┐            │
//!                             │             ▼                   ▼            │
//!                             │         extract             storage ─────────┼──▶ output dir
//!                             │                                              │
//!     device response         │                                              │
//!     ◀───────────────────────┼── http::response (fixed header set, close)   │
//!                             └──────────────────────────────────────────────┘
//! ```

use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;

use ecg_upload_server::config::validation::validate_config;
use ecg_upload_server::config::{load_config, ConfigError, ResponseMode, UploadConfig};
use ecg_upload_server::lifecycle::{self, signals, Shutdown};
use ecg_upload_server::observability::logging;

#[derive(Parser)]
#[command(name = "ecg-upload-server")]
#[command(about = "Receives uploads from ECG machines and extracts embedded PDF reports", long_about = None)]
struct Cli {
    /// TOML configuration file.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override the listen address (e.g. 0.0.0.0:8080).
    #[arg(short, long)]
    bind: Option<String>,

    /// Override the output directory.
    #[arg(short, long)]
    output_dir: Option<PathBuf>,

    /// Report storage failures to the device instead of always answering success.
    #[arg(long)]
    strict: bool,

    /// Seconds to wait for in-flight uploads on shutdown.
    #[arg(long, default_value_t = 30)]
    drain_secs: u64,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => load_config(path)?,
        None => UploadConfig::default(),
    };
    if let Some(bind) = cli.bind {
        config.listener.bind_address = bind;
    }
    if let Some(dir) = cli.output_dir {
        config.storage.output_dir = dir;
    }
    if cli.strict {
        config.response.mode = ResponseMode::Strict;
    }
    validate_config(&config).map_err(ConfigError::Validation)?;

    logging::init_logging(&config.observability.log_level);

    tracing::info!(
        bind_address = %config.listener.bind_address,
        max_connections = config.listener.max_connections,
        auth_enabled = config.auth.enabled,
        mode = ?config.response.mode,
        "Configuration loaded"
    );

    let started = lifecycle::start(&config).await?;
    tracing::info!(address = %started.local_addr, "Listening for device uploads");

    let shutdown = Shutdown::new();
    let server = started
        .server
        .with_drain_timeout(Duration::from_secs(cli.drain_secs));
    let handle = tokio::spawn(server.run(started.listener, shutdown.subscribe()));

    signals::wait_for_signal().await;
    shutdown.trigger();
    handle.await??;

    tracing::info!("Shutdown complete");
    Ok(())
}
