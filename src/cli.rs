//! Command line interface.

use std::net::SocketAddr;
use std::path::PathBuf;

use clap::Parser;

use crate::config::{
    loader::load_config_file, resolve, validate_config, ConfigError, ConfigFile, LogFormat,
    ProxyConfig,
};
use crate::credential::CapturePolicy;

/// Reverse proxy that injects headers and replays the upstream's SSO cookie.
#[derive(Debug, Parser)]
#[command(name = "auth-relay-proxy", version, about, long_about = None)]
pub struct Cli {
    /// URL of the upstream server (e.g. https://kubernetes.default.svc.cluster.local)
    #[arg(short, long)]
    pub target: Option<String>,

    /// Port for the proxy to listen on [default: 8080]
    #[arg(short, long, value_parser = clap::value_parser!(u16).range(1..))]
    pub port: Option<u16>,

    /// Header to add to forwarded requests, as 'Key: Value'. Repeatable.
    #[arg(short = 'H', long = "header", value_name = "KEY: VALUE")]
    pub headers: Vec<String>,

    /// TOML configuration file. Flags override its values.
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Give up on the upstream after this many seconds (504)
    #[arg(long)]
    pub upstream_timeout_secs: Option<u64>,

    /// Whether a newer upstream cookie replaces the captured one
    #[arg(long, value_enum)]
    pub capture_policy: Option<CapturePolicy>,

    /// Name of the cookie to capture [default: CF_Authorization]
    #[arg(long)]
    pub capture_cookie: Option<String>,

    /// Do not append the caller's IP to X-Forwarded-For
    #[arg(long)]
    pub no_forwarded_for: bool,

    /// Log level (trace, debug, info, warn, error). RUST_LOG takes precedence.
    #[arg(long)]
    pub log_level: Option<String>,

    #[arg(long, value_enum)]
    pub log_format: Option<LogFormat>,

    /// Expose Prometheus metrics on this address
    #[arg(long)]
    pub metrics_address: Option<SocketAddr>,
}

impl Cli {
    /// Merge flags over the optional config file and resolve the result.
    pub fn into_config(self) -> Result<ProxyConfig, ConfigError> {
        let file = match &self.config {
            Some(path) => load_config_file(path)?,
            None => ConfigFile::default(),
        };

        let target = self.target.or(file.target).ok_or(ConfigError::MissingTarget)?;

        let mut header_specs = file.headers;
        header_specs.extend(self.headers);

        let mut config = resolve(&target, header_specs.as_slice())?;
        config.listener = file.listener;
        config.forwarding = file.forwarding;
        config.capture = file.capture;
        config.observability = file.observability;

        if let Some(port) = self.port {
            config.listener.port = port;
        }
        if let Some(secs) = self.upstream_timeout_secs {
            config.forwarding.timeout_secs = Some(secs);
        }
        if self.no_forwarded_for {
            config.forwarding.forwarded_for = false;
        }
        if let Some(policy) = self.capture_policy {
            config.capture.policy = policy;
        }
        if let Some(name) = self.capture_cookie {
            config.capture.cookie_name = name;
        }
        if let Some(level) = self.log_level {
            config.observability.log_level = level;
        }
        if let Some(format) = self.log_format {
            config.observability.log_format = format;
        }
        if let Some(addr) = self.metrics_address {
            config.observability.metrics_address = Some(addr);
        }

        validate_config(&config).map_err(ConfigError::Validation)?;
        Ok(config)
    }
}
