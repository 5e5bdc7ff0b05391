//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the upload
//! server. All types derive Serde traits for deserialization from config files.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Root configuration for the upload server.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct UploadConfig {
    /// Listener configuration (bind address, connection limit).
    pub listener: ListenerConfig,

    /// Device credentials.
    pub auth: AuthConfig,

    /// Where artifacts are written.
    pub storage: StorageConfig,

    /// Request size limits.
    pub limits: LimitsConfig,

    /// How storage outcomes are reported to the device.
    pub response: ResponseConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    pub bind_address: String,

    /// Maximum concurrent connections (backpressure).
    pub max_connections: usize,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
            max_connections: 256,
        }
    }
}

/// HTTP Basic credentials expected from the device.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AuthConfig {
    /// Require credentials on POST/PUT.
    pub enabled: bool,

    pub username: String,

    pub password: String,

    /// Realm advertised in `WWW-Authenticate`.
    pub realm: String,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            // Factory default of most ECG carts' upload profile.
            username: "admin".to_string(),
            password: "admin123".to_string(),
            realm: "ECG Upload Server".to_string(),
        }
    }
}

/// Output directory settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Directory receiving raw payloads and extracted PDFs.
    pub output_dir: PathBuf,

    /// Create the directory at startup if missing.
    pub create_dir: bool,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("ftp_data"),
            create_dir: true,
        }
    }
}

/// Request size limits.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LimitsConfig {
    /// Maximum body size in bytes.
    pub max_body_size: usize,

    /// Maximum size of the request line plus headers.
    pub max_header_bytes: usize,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_body_size: 64 * 1024 * 1024, // 64MB
            max_header_bytes: 16 * 1024,
        }
    }
}

/// Response policy towards the device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ResponseMode {
    /// Always report success once the body was received, even if storing it
    /// failed. Embedded clients treat any error reply as fatal and may retry
    /// destructively or lock up.
    #[default]
    Compatibility,
    /// Report `500 Upload failed` when the raw payload could not be stored.
    Strict,
}

#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct ResponseConfig {
    pub mode: ResponseMode,
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}
