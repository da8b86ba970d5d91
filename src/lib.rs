//! shoutback: a concurrent TCP request/response server and client.
//!
//! The server accepts connections, runs one handler task per connection,
//! and applies a pluggable transform to each message (uppercase by
//! default). Shutdown is cooperative: termination signals map to an
//! idempotent cancellation token, the accept loop stops, and in-flight
//! handlers get a bounded grace period.
//!
//! The client opens a timeout-bounded connection and exchanges one
//! message per request/response cycle, either one-shot or over a
//! held-open connection.
//!
//! Wire format: raw UTF-8 text, no framing; message boundaries equal read
//! boundaries up to [`RECV_BUFFER_SIZE`] bytes. Responses starting with
//! `ERROR` report processing-detected faults.

pub mod client;
pub mod config;
mod connection;
pub mod message;
pub mod server;
pub mod shutdown;

pub use client::{Client, ClientError};
pub use config::{ClientConfig, ServerConfig};
pub use message::{Transform, Uppercase};
pub use server::{Server, ServerError};
pub use shutdown::{Shutdown, ShutdownHandle, ShutdownToken};

/// Receive buffer ceiling per read, in bytes. Larger single messages are
/// not guaranteed to arrive intact in one read.
pub const RECV_BUFFER_SIZE: usize = 1024;
