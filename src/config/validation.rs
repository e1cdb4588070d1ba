//! Configuration validation.
//!
//! Serde and the resolver handle syntax; this checks value ranges and
//! cross-field rules after file and flag settings have been merged.
//! Returns every failure rather than stopping at the first.

use std::str::FromStr;

use crate::config::schema::ProxyConfig;

/// A single semantic configuration problem.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("listener port must be between 1 and 65535")]
    ZeroPort,

    #[error("capture cookie name must not be empty")]
    EmptyCookieName,

    #[error("capture cookie name {0:?} is not a valid cookie name")]
    InvalidCookieName(String),

    #[error("upstream timeout must be greater than zero")]
    ZeroTimeout,

    #[error("unknown log level {0:?}")]
    InvalidLogLevel(String),
}

pub fn validate_config(config: &ProxyConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.port == 0 {
        errors.push(ValidationError::ZeroPort);
    }

    let cookie_name = &config.capture.cookie_name;
    if cookie_name.is_empty() {
        errors.push(ValidationError::EmptyCookieName);
    } else if !cookie_name.chars().all(is_token_char) {
        errors.push(ValidationError::InvalidCookieName(cookie_name.clone()));
    }

    if config.forwarding.timeout_secs == Some(0) {
        errors.push(ValidationError::ZeroTimeout);
    }

    if tracing::Level::from_str(&config.observability.log_level).is_err() {
        errors.push(ValidationError::InvalidLogLevel(
            config.observability.log_level.clone(),
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

/// RFC 6265 cookie-name characters (an RFC 7230 token).
fn is_token_char(c: char) -> bool {
    c.is_ascii_graphic() && !"()<>@,;:\\\"/[]?={}".contains(c)
}
