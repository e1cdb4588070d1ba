//! Single-upstream reverse proxy with SSO cookie relay.
//!
//! Every request is forwarded to one fixed upstream with a set of static
//! headers added. The first authentication cookie the upstream sets
//! (`CF_Authorization` by default) is captured and attached to every later
//! request, so callers are pre-authenticated without presenting it.

pub mod cli;
pub mod config;
pub mod credential;
pub mod http;
pub mod lifecycle;
pub mod net;
pub mod observability;

pub use config::{resolve, ConfigError, ProxyConfig};
pub use credential::{CapturePolicy, CredentialStore};
pub use http::{HttpServer, ReverseProxy};
pub use lifecycle::Shutdown;
