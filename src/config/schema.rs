//! Configuration schema definitions.
//!
//! `ConfigFile` is the on-disk TOML shape; `ProxyConfig` is the resolved,
//! immutable configuration handed to the proxy. Section types are shared by
//! both and derive Serde traits with defaults so minimal files stay valid.

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::time::Duration;

use axum::http::{HeaderMap, HeaderName, HeaderValue};
use serde::{Deserialize, Serialize};

use crate::config::upstream::Upstream;
use crate::credential::CapturePolicy;

/// Cookie name the proxy captures by default.
pub const DEFAULT_CAPTURE_COOKIE: &str = "CF_Authorization";

/// Resolved configuration for the proxy.
#[derive(Debug, Clone)]
pub struct ProxyConfig {
    /// The single upstream all requests are forwarded to.
    pub upstream: Upstream,

    /// Listener configuration (bind address, port).
    pub listener: ListenerConfig,

    /// Headers appended to every forwarded request.
    pub extra_headers: ExtraHeaders,

    /// Upstream forwarding behavior.
    pub forwarding: ForwardingConfig,

    /// Credential capture settings.
    pub capture: CaptureConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

impl ProxyConfig {
    /// Build a configuration with defaults for everything but the upstream
    /// and its extra headers.
    pub fn new(upstream: Upstream, extra_headers: ExtraHeaders) -> Self {
        Self {
            upstream,
            listener: ListenerConfig::default(),
            extra_headers,
            forwarding: ForwardingConfig::default(),
            capture: CaptureConfig::default(),
            observability: ObservabilityConfig::default(),
        }
    }
}

/// Headers injected into each forwarded request.
///
/// Names are unique and compared case-insensitively; inserting a name twice
/// keeps the last value.
#[derive(Debug, Clone, Default)]
pub struct ExtraHeaders(HeaderMap);

impl ExtraHeaders {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: HeaderName, value: HeaderValue) {
        self.0.insert(name, value);
    }

    pub fn get(&self, name: &str) -> Option<&HeaderValue> {
        self.0.get(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&HeaderName, &HeaderValue)> {
        self.0.iter()
    }

    pub fn names(&self) -> impl Iterator<Item = &HeaderName> {
        self.0.keys()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Interface to bind.
    pub address: IpAddr,

    /// Port to listen on.
    pub port: u16,
}

impl ListenerConfig {
    pub fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.address, self.port)
    }
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            address: IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            port: 8080,
        }
    }
}

/// How requests are forwarded upstream.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ForwardingConfig {
    /// Deadline for the upstream to produce response headers. None waits
    /// as long as the HTTP client does.
    pub timeout_secs: Option<u64>,

    /// Append the caller's IP to `X-Forwarded-For`.
    pub forwarded_for: bool,
}

impl ForwardingConfig {
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_secs.map(Duration::from_secs)
    }
}

impl Default for ForwardingConfig {
    fn default() -> Self {
        Self {
            timeout_secs: None,
            forwarded_for: true,
        }
    }
}

/// Authentication cookie capture settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct CaptureConfig {
    /// Name of the cookie to capture from upstream responses.
    pub cookie_name: String,

    /// Whether a later sighting replaces a held credential.
    pub policy: CapturePolicy,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            cookie_name: DEFAULT_CAPTURE_COOKIE.to_string(),
            policy: CapturePolicy::default(),
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human readable lines.
    #[default]
    Pretty,
    /// One JSON object per event.
    Json,
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Log output format.
    pub log_format: LogFormat,

    /// Prometheus endpoint bind address. Metrics are not exported when unset.
    pub metrics_address: Option<SocketAddr>,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: LogFormat::default(),
            metrics_address: None,
        }
    }
}

/// On-disk configuration file.
///
/// ```toml
/// target = "https://app.example.com"
/// headers = ["X-Env: staging"]
///
/// [listener]
/// port = 8080
///
/// [capture]
/// policy = "first-wins"
/// ```
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct ConfigFile {
    /// Upstream URL.
    pub target: Option<String>,

    /// Header specs of the form `Key: Value`.
    pub headers: Vec<String>,

    pub listener: ListenerConfig,
    pub forwarding: ForwardingConfig,
    pub capture: CaptureConfig,
    pub observability: ObservabilityConfig,
}
