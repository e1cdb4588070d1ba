//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, middleware)
//!     → request.rs (request ID, span)
//!     → proxy.rs (pipeline)
//!         → rewrite.rs (headers, cookie, URI)
//!         → net/client.rs (upstream call)
//!         → credential capture
//!     → response.rs (gateway errors only)
//!     → Send to client
//! ```

pub mod proxy;
pub mod request;
pub mod response;
pub mod rewrite;
pub mod server;

pub use proxy::ReverseProxy;
pub use request::X_REQUEST_ID;
pub use response::ProxyError;
pub use server::HttpServer;
