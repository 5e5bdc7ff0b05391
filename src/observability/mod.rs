//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! Dispatcher, storage and server produce:
//!     → logging.rs (tracing subscriber, structured fields)
//!     → metrics.rs (counters, optional Prometheus endpoint)
//! ```
//!
//! # Design Decisions
//! - Request ID and peer address ride on every upload log line
//! - Operators only ever see failures here; the device never does

pub mod logging;
pub mod metrics;
