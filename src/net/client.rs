//! Pooled HTTP client for the upstream.
//!
//! # Responsibilities
//! - Hold one connection pool shared by every request task
//! - Speak HTTP or HTTPS depending on the upstream scheme
//! - Enforce the optional response deadline
//!
//! # Design Decisions
//! - rustls with the ring provider and webpki roots, so no system TLS
//!   library is needed
//! - Dropping the `send` future aborts the upstream exchange

use std::time::Duration;

use axum::body::Body;
use axum::http::{Request, Response};
use hyper::body::Incoming;
use hyper_rustls::{HttpsConnector, HttpsConnectorBuilder};
use hyper_util::{
    client::legacy::{connect::HttpConnector, Client},
    rt::TokioExecutor,
};

use crate::http::response::ProxyError;

/// Error building the upstream client.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("failed to configure TLS for the upstream client: {0}")]
    Tls(#[from] rustls::Error),
}

/// Shared, cheaply cloneable upstream client.
#[derive(Clone)]
pub struct UpstreamClient {
    inner: Client<HttpsConnector<HttpConnector>, Body>,
    timeout: Option<Duration>,
}

impl UpstreamClient {
    pub fn new(timeout: Option<Duration>) -> Result<Self, ClientError> {
        let connector = HttpsConnectorBuilder::new()
            .with_provider_and_webpki_roots(rustls::crypto::ring::default_provider())?
            .https_or_http()
            .enable_http1()
            .build();

        let inner = Client::builder(TokioExecutor::new()).build(connector);

        Ok(Self { inner, timeout })
    }

    /// Send a fully rewritten request and wait for the response head.
    pub async fn send(&self, request: Request<Body>) -> Result<Response<Incoming>, ProxyError> {
        let pending = self.inner.request(request);

        match self.timeout {
            Some(limit) => tokio::time::timeout(limit, pending)
                .await
                .map_err(|_| ProxyError::Timeout(limit))?
                .map_err(ProxyError::Upstream),
            None => pending.await.map_err(ProxyError::Upstream),
        }
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }
}
