//! HTTP upload server for ECG carts, with embedded PDF recovery.

pub mod config;
pub mod error;
pub mod extract;
pub mod http;
pub mod lifecycle;
pub mod net;
pub mod observability;
pub mod storage;

pub use config::UploadConfig;
pub use error::{ProtocolError, UploadError};
pub use extract::{extract, ExtractionOutcome, ExtractionResult};
pub use http::{Dispatcher, UploadServer};
pub use lifecycle::Shutdown;
pub use storage::{store, StorageError, StorageSink, StoredFile};
