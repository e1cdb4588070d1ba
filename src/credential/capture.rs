//! Response inspection for the authentication cookie.

use std::sync::Arc;

use axum::http::{header::SET_COOKIE, response::Parts, HeaderMap};
use cookie::Cookie;

use crate::config::CaptureConfig;
use crate::credential::store::{Adoption, CapturePolicy, Credential, CredentialStore};
use crate::observability::metrics;

/// Hook run on every upstream response before it is relayed to the caller.
///
/// Registered once when the proxy is built. Implementations only observe:
/// they cannot alter or block the response.
pub trait ResponseInterceptor: Send + Sync {
    fn intercept(&self, response: &Parts);
}

/// Captures a named `Set-Cookie` from upstream responses into a
/// [`CredentialStore`].
pub struct CookieCapture {
    store: Arc<CredentialStore>,
    cookie_name: String,
    policy: CapturePolicy,
}

impl CookieCapture {
    pub fn new(store: Arc<CredentialStore>, config: &CaptureConfig) -> Self {
        Self {
            store,
            cookie_name: config.cookie_name.clone(),
            policy: config.policy,
        }
    }
}

impl ResponseInterceptor for CookieCapture {
    fn intercept(&self, response: &Parts) {
        if self.policy == CapturePolicy::FirstWins && self.store.is_held() {
            return;
        }

        let Some(credential) = find_cookie(&response.headers, &self.cookie_name) else {
            return;
        };

        match self.store.offer(credential, self.policy) {
            Adoption::Adopted => {
                tracing::info!(cookie = %self.cookie_name, "Captured upstream credential");
                metrics::record_credential_capture("adopted");
            }
            Adoption::Refreshed => {
                tracing::info!(cookie = %self.cookie_name, "Refreshed upstream credential");
                metrics::record_credential_capture("refreshed");
            }
            Adoption::Ignored => {
                tracing::debug!(cookie = %self.cookie_name, "Credential already held, ignoring");
            }
        }
    }
}

/// First well-formed `Set-Cookie` named `name`.
///
/// Values that are not UTF-8 or do not parse as a cookie are skipped.
pub fn find_cookie(headers: &HeaderMap, name: &str) -> Option<Credential> {
    headers
        .get_all(SET_COOKIE)
        .iter()
        .filter_map(|value| match value.to_str() {
            Ok(s) => Some(s),
            Err(_) => {
                tracing::debug!("Skipping non UTF-8 Set-Cookie header");
                None
            }
        })
        .filter_map(|s| match Cookie::parse(s.to_owned()) {
            Ok(cookie) => Some(cookie),
            Err(e) => {
                tracing::debug!(error = %e, "Skipping malformed Set-Cookie header");
                None
            }
        })
        .find(|cookie| cookie.name() == name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::{HeaderValue, Response};

    fn parts_with(cookies: &[&'static str]) -> Parts {
        let mut builder = Response::builder().status(200);
        for &c in cookies {
            builder = builder.header(SET_COOKIE, HeaderValue::from_static(c));
        }
        builder.body(()).unwrap().into_parts().0
    }

    fn capture(policy: CapturePolicy) -> (Arc<CredentialStore>, CookieCapture) {
        let store = Arc::new(CredentialStore::new());
        let config = CaptureConfig {
            policy,
            ..CaptureConfig::default()
        };
        (Arc::clone(&store), CookieCapture::new(store, &config))
    }

    #[test]
    fn test_find_cookie_among_several() {
        let parts = parts_with(&[
            "theme=dark; Path=/",
            "CF_Authorization=abc123; Path=/; Secure; HttpOnly",
        ]);
        let cookie = find_cookie(&parts.headers, "CF_Authorization").unwrap();
        assert_eq!(cookie.value(), "abc123");
        assert_eq!(cookie.secure(), Some(true));
    }

    #[test]
    fn test_find_cookie_takes_first_match() {
        let parts = parts_with(&["CF_Authorization=one", "CF_Authorization=two"]);
        assert_eq!(find_cookie(&parts.headers, "CF_Authorization").unwrap().value(), "one");
    }

    #[test]
    fn test_find_cookie_skips_malformed() {
        let parts = parts_with(&["garbage-without-equals", "=nameless", "CF_Authorization=ok"]);
        assert_eq!(find_cookie(&parts.headers, "CF_Authorization").unwrap().value(), "ok");
    }

    #[test]
    fn test_find_cookie_is_case_sensitive() {
        let parts = parts_with(&["cf_authorization=abc"]);
        assert!(find_cookie(&parts.headers, "CF_Authorization").is_none());
    }

    #[test]
    fn test_intercept_captures_once() {
        let (store, capture) = capture(CapturePolicy::FirstWins);

        capture.intercept(&parts_with(&[]));
        assert!(!store.is_held());

        capture.intercept(&parts_with(&["CF_Authorization=abc123; Path=/"]));
        capture.intercept(&parts_with(&["CF_Authorization=rotated; Path=/"]));
        assert_eq!(store.current().unwrap().value(), "abc123");
    }

    #[test]
    fn test_intercept_refresh_policy() {
        let (store, capture) = capture(CapturePolicy::Refresh);

        capture.intercept(&parts_with(&["CF_Authorization=abc123"]));
        capture.intercept(&parts_with(&["CF_Authorization=rotated"]));
        assert_eq!(store.current().unwrap().value(), "rotated");
    }

    #[test]
    fn test_intercept_ignores_malformed() {
        let (store, capture) = capture(CapturePolicy::FirstWins);
        capture.intercept(&parts_with(&["CF_Authorization"]));
        assert!(!store.is_held());
    }
}
