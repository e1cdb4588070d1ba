//! Resolve the upstream target and header specs into a `ProxyConfig`.

use axum::http::{HeaderName, HeaderValue};

use crate::config::error::ConfigError;
use crate::config::schema::{ExtraHeaders, ProxyConfig};
use crate::config::upstream::Upstream;

/// Build a configuration from a target URL and `Key: Value` header specs.
///
/// Everything besides the upstream and its headers takes its default; callers
/// layer file and flag overrides on the result.
pub fn resolve<S: AsRef<str>>(target: &str, header_specs: &[S]) -> Result<ProxyConfig, ConfigError> {
    let upstream = Upstream::parse(target)?;

    let mut extra_headers = ExtraHeaders::new();
    for spec in header_specs {
        let (name, value) = parse_header_spec(spec.as_ref())?;
        extra_headers.insert(name, value);
    }

    Ok(ProxyConfig::new(upstream, extra_headers))
}

/// Parse a single `Key: Value` spec.
///
/// The first colon splits key from value and both sides are trimmed, so
/// `"X-Trace: a:b"` yields the value `a:b`.
pub fn parse_header_spec(spec: &str) -> Result<(HeaderName, HeaderValue), ConfigError> {
    let invalid = |reason: &str| ConfigError::InvalidHeaderSpec {
        spec: spec.to_string(),
        reason: reason.to_string(),
    };

    let (key, value) = spec
        .split_once(':')
        .ok_or_else(|| invalid("expected 'Key: Value'"))?;

    let name = HeaderName::from_bytes(key.trim().as_bytes())
        .map_err(|_| invalid("not a valid header name"))?;
    let value = HeaderValue::from_str(value.trim())
        .map_err(|_| invalid("not a valid header value"))?;

    Ok((name, value))
}
