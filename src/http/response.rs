//! Response handling.
//!
//! # Responsibilities
//! - Map upstream failures to gateway status codes
//!
//! # Design Decisions
//! - Upstream responses are relayed untouched; only failures produce a
//!   response of our own
//! - Connection and protocol failures result in 502 Bad Gateway
//! - Upstream timeouts result in 504 Gateway Timeout
//! - A 101 for a protocol the caller never asked for is a 502

use std::time::Duration;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

/// Failure while forwarding a single request.
///
/// Always local to one request; the server keeps serving others.
#[derive(Debug, thiserror::Error)]
pub enum ProxyError {
    #[error("upstream request failed: {0}")]
    Upstream(#[source] hyper_util::client::legacy::Error),

    #[error("upstream did not respond within {0:?}")]
    Timeout(Duration),

    #[error("failed to build upstream request: {0}")]
    Rewrite(#[from] axum::http::Error),

    /// The upstream answered 101 with a protocol the caller did not ask for.
    #[error("upstream switched to protocol {offered:?} when {requested:?} was requested")]
    ProtocolSwitch { requested: String, offered: String },
}

impl ProxyError {
    pub fn status(&self) -> StatusCode {
        match self {
            ProxyError::Upstream(_) | ProxyError::ProtocolSwitch { .. } => StatusCode::BAD_GATEWAY,
            ProxyError::Timeout(_) => StatusCode::GATEWAY_TIMEOUT,
            ProxyError::Rewrite(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Short label used for metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            ProxyError::Upstream(e) if e.is_connect() => "connect",
            ProxyError::Upstream(_) => "protocol",
            ProxyError::Timeout(_) => "timeout",
            ProxyError::Rewrite(_) => "rewrite",
            ProxyError::ProtocolSwitch { .. } => "upgrade",
        }
    }
}

impl IntoResponse for ProxyError {
    fn into_response(self) -> Response {
        let message = match self {
            ProxyError::Upstream(_) => "Upstream request failed",
            ProxyError::Timeout(_) => "Upstream request timed out",
            ProxyError::Rewrite(_) => "Failed to build upstream request",
            ProxyError::ProtocolSwitch { .. } => "Upstream switched to an unexpected protocol",
        };
        (self.status(), message).into_response()
    }
}
