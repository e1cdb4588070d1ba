//! Network layer subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming TCP connection
//!     → listener.rs (bind, hand off to axum)
//!
//! Outgoing upstream request
//!     → client.rs (pooled HTTP/HTTPS client, optional deadline)
//! ```

pub mod client;
pub mod listener;

pub use client::{ClientError, UpstreamClient};
pub use listener::ListenerError;
