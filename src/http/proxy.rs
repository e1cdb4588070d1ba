//! The request/response pipeline.
//!
//! # Data Flow
//! ```text
//! inbound request
//!     → log original request line
//!     → strip hop-by-hop headers
//!     → append extra headers
//!     → append captured credential (if held)
//!     → append X-Forwarded-For
//!     → retarget URI + Host at the upstream
//!     → forward (the only await)
//!     → response interceptors (credential capture)
//!     → relay response untouched
//!     → on 101, splice caller and upstream connections
//! ```
//!
//! # Design Decisions
//! - Interceptors are registered once at construction
//! - Upstream failures are per request: 502 or 504, never retried
//! - If the caller goes away the handler future is dropped, which drops
//!   the upstream request with it
//! - Upgraded connections are relayed as raw bytes in a detached task

use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;
use std::time::Instant;

use axum::body::Body;
use axum::extract::ConnectInfo;
use axum::http::{header, HeaderValue, Request, StatusCode, Version};
use axum::response::{IntoResponse, Response};
use hyper::body::Incoming;
use hyper::upgrade::OnUpgrade;
use hyper_util::rt::TokioIo;

use crate::config::{ExtraHeaders, ProxyConfig, Upstream};
use crate::credential::{CookieCapture, CredentialStore, ResponseInterceptor};
use crate::http::response::ProxyError;
use crate::http::rewrite;
use crate::net::{ClientError, UpstreamClient};
use crate::observability::metrics;

/// Reverse proxy for a single upstream.
pub struct ReverseProxy {
    upstream: Upstream,
    extra_headers: ExtraHeaders,
    forwarded_for: bool,
    client: UpstreamClient,
    credentials: Arc<CredentialStore>,
    interceptors: Vec<Arc<dyn ResponseInterceptor>>,
}

impl ReverseProxy {
    /// Build a proxy that stores captured credentials in `credentials`.
    pub fn new(config: &ProxyConfig, credentials: Arc<CredentialStore>) -> Result<Self, ClientError> {
        let client = UpstreamClient::new(config.forwarding.timeout())?;
        let capture = CookieCapture::new(Arc::clone(&credentials), &config.capture);

        Ok(Self {
            upstream: config.upstream.clone(),
            extra_headers: config.extra_headers.clone(),
            forwarded_for: config.forwarding.forwarded_for,
            client,
            credentials,
            interceptors: vec![Arc::new(capture)],
        })
    }

    /// Register another response interceptor. Runs after those already
    /// registered.
    pub fn with_interceptor(mut self, interceptor: Arc<dyn ResponseInterceptor>) -> Self {
        self.interceptors.push(interceptor);
        self
    }

    pub fn credentials(&self) -> &Arc<CredentialStore> {
        &self.credentials
    }

    pub fn upstream(&self) -> &Upstream {
        &self.upstream
    }

    /// Proxy one request and produce the response for the caller.
    pub async fn handle(&self, mut request: Request<Body>) -> Response {
        let start = Instant::now();
        let method = request.method().clone();
        let upgrade = rewrite::upgrade_type(request.headers());
        let caller_upgrade = upgrade.as_ref().map(|_| hyper::upgrade::on(&mut request));

        tracing::info!(
            method = %method,
            uri = %request.uri(),
            host = ?request.headers().get(header::HOST),
            "Original request"
        );

        let outbound = match self.rewrite(request) {
            Ok(outbound) => outbound,
            Err(e) => return self.fail(e, method.as_str(), start),
        };

        tracing::debug!(
            uri = %outbound.uri(),
            host = ?outbound.headers().get(header::HOST),
            "Modified request"
        );
        tracing::trace!(
            headers = ?outbound.headers().keys().collect::<Vec<_>>(),
            "Forwarding headers"
        );

        match self.client.send(outbound).await {
            Ok(mut response) => {
                if response.status() == StatusCode::SWITCHING_PROTOCOLS {
                    if let Err(e) = self.switch_protocols(upgrade.as_ref(), caller_upgrade, &mut response) {
                        return self.fail(e, method.as_str(), start);
                    }
                }

                let (parts, body) = response.into_parts();
                for interceptor in &self.interceptors {
                    interceptor.intercept(&parts);
                }

                tracing::debug!(status = %parts.status, "Upstream responded");
                metrics::record_request(method.as_str(), parts.status.as_u16(), start);
                Response::from_parts(parts, Body::new(body))
            }
            Err(e) => self.fail(e, method.as_str(), start),
        }
    }

    /// Turn an inbound request into the request sent upstream.
    pub fn rewrite(&self, request: Request<Body>) -> Result<Request<Body>, ProxyError> {
        let client_ip = client_ip(&request);
        let (mut parts, body) = request.into_parts();

        rewrite::strip_hop_by_hop(&mut parts.headers);
        rewrite::append_extra_headers(&mut parts.headers, &self.extra_headers);

        if let Some(credential) = self.credentials.current() {
            if !rewrite::append_cookie(&mut parts.headers, &credential) {
                tracing::warn!(cookie = %credential.name(), "Captured credential is not a valid header value, not attaching");
            }
        }

        if self.forwarded_for {
            if let Some(ip) = client_ip {
                rewrite::append_forwarded_for(&mut parts.headers, ip);
            }
        }

        parts.uri = rewrite::upstream_uri(&self.upstream, &parts.uri)?;
        parts.headers.insert(header::HOST, self.upstream.host_header().clone());
        parts.version = Version::HTTP_11;

        Ok(Request::from_parts(parts, body))
    }

    /// Accept the upstream's 101 and tunnel the two connections once both
    /// sides have upgraded.
    fn switch_protocols(
        &self,
        requested: Option<&HeaderValue>,
        caller: Option<OnUpgrade>,
        response: &mut Response<Incoming>,
    ) -> Result<(), ProxyError> {
        let offered = rewrite::upgrade_type(response.headers());
        let (Some(requested), Some(caller)) = (requested, caller) else {
            return Err(ProxyError::ProtocolSwitch {
                requested: String::new(),
                offered: lossy(offered.as_ref()),
            });
        };
        if !offered
            .as_ref()
            .is_some_and(|o| o.as_bytes().eq_ignore_ascii_case(requested.as_bytes()))
        {
            return Err(ProxyError::ProtocolSwitch {
                requested: lossy(Some(requested)),
                offered: lossy(offered.as_ref()),
            });
        }

        tracing::info!(upstream = %self.upstream, protocol = %lossy(Some(requested)), "Switching protocols");
        let upstream = hyper::upgrade::on(response);
        tokio::spawn(tunnel(caller, upstream));
        Ok(())
    }

    fn fail(&self, error: ProxyError, method: &str, start: Instant) -> Response {
        match &error {
            ProxyError::Timeout(limit) => {
                tracing::warn!(upstream = %self.upstream, timeout = ?limit, "Upstream timed out")
            }
            _ => tracing::error!(upstream = %self.upstream, error = %error, "Upstream request failed"),
        }
        metrics::record_upstream_error(error.kind());
        metrics::record_request(method, error.status().as_u16(), start);
        error.into_response()
    }
}

async fn tunnel(caller: OnUpgrade, upstream: OnUpgrade) {
    let (caller, upstream) = match tokio::try_join!(caller, upstream) {
        Ok(pair) => pair,
        Err(e) => {
            tracing::warn!(error = %e, "Protocol upgrade failed");
            return;
        }
    };

    let mut caller = TokioIo::new(caller);
    let mut upstream = TokioIo::new(upstream);
    match tokio::io::copy_bidirectional(&mut caller, &mut upstream).await {
        Ok((sent, received)) => tracing::debug!(sent, received, "Upgraded connection closed"),
        Err(e) => tracing::debug!(error = %e, "Upgraded connection ended"),
    }
}

fn lossy(value: Option<&HeaderValue>) -> String {
    value
        .map(|v| String::from_utf8_lossy(v.as_bytes()).into_owned())
        .unwrap_or_default()
}

fn client_ip<B>(request: &Request<B>) -> Option<IpAddr> {
    request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip())
}
