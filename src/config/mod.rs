//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML, optional)
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → UploadConfig (validated, immutable)
//!     → handed to the dispatcher at construction
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; there are no module-level globals
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, parse_config, ConfigError};
pub use schema::{
    AuthConfig, LimitsConfig, ListenerConfig, ObservabilityConfig, ResponseConfig, ResponseMode,
    StorageConfig, UploadConfig,
};
