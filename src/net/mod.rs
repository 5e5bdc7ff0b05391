//! Network layer subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming TCP connection
//!     → listener.rs (accept loop, connection limits)
//!     → connection.rs (lifecycle tracking, state machine)
//!     → Hand off to the HTTP dispatcher
//!
//! Connection States:
//!     AwaitRequest → ReadHeaders → ReadBody → Dispatch → RespondAndClose → Closed
//! ```
//!
//! # Design Decisions
//! - Semaphore acquired before accept, so a full server stops accepting
//! - Each connection tracked for graceful shutdown
//! - One request per connection; there is no keep-alive state

pub mod connection;
pub mod listener;

pub use connection::{ConnectionGuard, ConnectionId, ConnectionState, ConnectionTracker};
pub use listener::{ConnectionPermit, Listener, ListenerError};
