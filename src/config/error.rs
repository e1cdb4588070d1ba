//! Configuration error types.

use std::path::PathBuf;

use crate::config::validation::ValidationError;

/// Errors raised while resolving the proxy configuration.
///
/// All of these are fatal at startup: the proxy never starts serving with a
/// configuration that produced one.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Neither the command line nor the config file named an upstream.
    #[error("no target URL provided")]
    MissingTarget,

    /// The target does not parse as a URL, or has no scheme or host.
    #[error("invalid target URL {url:?}: {reason}")]
    InvalidTarget { url: String, reason: String },

    /// A header spec is not of the form `Key: Value`.
    #[error("invalid header spec {spec:?}: {reason}")]
    InvalidHeaderSpec { spec: String, reason: String },

    #[error("failed to read config file {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config file {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    /// Semantic checks failed. Carries every failure, not just the first.
    #[error("invalid configuration: {}", join_errors(.0))]
    Validation(Vec<ValidationError>),
}

fn join_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}
