//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (accept loop, one task per connection)
//!     → dispatcher.rs (state machine for the single exchange)
//!         → request.rs (head, body, request ID)
//!         → auth.rs (Basic credentials on POST/PUT)
//!         → extract + storage
//!     → response.rs (device-compatible bytes)
//!     → close
//! ```

pub mod auth;
pub mod dispatcher;
pub mod request;
pub mod response;
pub mod server;

pub use dispatcher::{process_upload, Dispatcher, UploadReport};
pub use request::{RequestHead, RequestId, UploadRequest};
pub use response::{format_continue, format_error, format_preflight, format_success, format_unauthorized, DeviceResponse};
pub use server::UploadServer;
