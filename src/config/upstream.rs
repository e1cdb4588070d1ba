//! The single upstream every request is forwarded to.

use std::str::FromStr;

use axum::http::{
    uri::{Authority, Scheme},
    HeaderValue,
};
use url::Url;

use crate::config::error::ConfigError;

/// A parsed upstream target.
///
/// Scheme, authority and `Host` header value are derived once at startup so
/// the request path never has to re-validate them.
#[derive(Debug, Clone)]
pub struct Upstream {
    url: Url,
    scheme: Scheme,
    authority: Authority,
    host_header: HeaderValue,
}

impl Upstream {
    /// Parse a target URL. The URL must carry both a scheme and a host.
    pub fn parse(target: &str) -> Result<Self, ConfigError> {
        let invalid = |reason: String| ConfigError::InvalidTarget {
            url: target.to_string(),
            reason,
        };

        let url = Url::parse(target).map_err(|e| invalid(e.to_string()))?;

        let host = match url.host_str() {
            Some(host) if !host.is_empty() => host,
            _ => return Err(invalid("missing host".into())),
        };
        if url.scheme().is_empty() {
            return Err(invalid("missing scheme".into()));
        }

        let authority = match url.port() {
            Some(port) => format!("{host}:{port}"),
            None => host.to_string(),
        };

        let scheme = Scheme::from_str(url.scheme()).map_err(|e| invalid(e.to_string()))?;
        let host_header = HeaderValue::from_str(&authority).map_err(|e| invalid(e.to_string()))?;
        let authority = Authority::from_str(&authority).map_err(|e| invalid(e.to_string()))?;

        Ok(Self {
            url,
            scheme,
            authority,
            host_header,
        })
    }

    pub fn scheme(&self) -> &Scheme {
        &self.scheme
    }

    /// Host plus explicit port, e.g. `localhost:9000`.
    pub fn authority(&self) -> &Authority {
        &self.authority
    }

    /// Value forwarded in the `Host` header.
    pub fn host_header(&self) -> &HeaderValue {
        &self.host_header
    }

    /// Path prefix carried by the target URL (`/` when none was given).
    pub fn base_path(&self) -> &str {
        self.url.path()
    }

    /// Query carried by the target URL, if any.
    pub fn base_query(&self) -> Option<&str> {
        self.url.query().filter(|q| !q.is_empty())
    }
}

impl std::fmt::Display for Upstream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.url)
    }
}
