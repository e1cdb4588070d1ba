//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! command line flags ──┐
//!                      ├─→ cli.rs (merge, flags win)
//! config file (TOML) ──┘     → resolver.rs (target URL + header specs)
//!                            → validation.rs (semantic checks)
//!                            → ProxyConfig (validated, immutable)
//!                            → shared via Arc with the proxy
//! ```
//!
//! # Design Decisions
//! - Config is immutable once resolved; it is never reloaded
//! - Every field but the target has a default
//! - Resolution is pure and returns errors; exiting is left to `main`

pub mod error;
pub mod loader;
pub mod resolver;
pub mod schema;
pub mod upstream;
pub mod validation;

pub use error::ConfigError;
pub use resolver::{parse_header_spec, resolve};
pub use schema::{
    CaptureConfig, ConfigFile, ExtraHeaders, ForwardingConfig, ListenerConfig, LogFormat,
    ObservabilityConfig, ProxyConfig,
};
pub use upstream::Upstream;
pub use validation::{validate_config, ValidationError};
