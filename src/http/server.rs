//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create the Axum router with a catch-all proxy handler
//! - Wire up middleware (request ID, tracing)
//! - Serve on a bound listener until shutdown is signalled

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    body::Body,
    extract::State,
    http::Request,
    response::Response,
    routing::any,
    Router,
};
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower_http::trace::TraceLayer;

use crate::config::ProxyConfig;
use crate::credential::CredentialStore;
use crate::http::proxy::ReverseProxy;
use crate::http::request::{make_request_span, request_id_layer};
use crate::net::ClientError;

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub proxy: Arc<ReverseProxy>,
}

/// HTTP server for the reverse proxy.
pub struct HttpServer {
    router: Router,
    proxy: Arc<ReverseProxy>,
}

impl HttpServer {
    /// Create a server whose captured credential lives in `credentials`.
    pub fn new(config: &ProxyConfig, credentials: Arc<CredentialStore>) -> Result<Self, ClientError> {
        let proxy = Arc::new(ReverseProxy::new(config, credentials)?);
        Ok(Self::from_proxy(proxy))
    }

    /// Serve an already built proxy.
    pub fn from_proxy(proxy: Arc<ReverseProxy>) -> Self {
        let state = AppState {
            proxy: Arc::clone(&proxy),
        };
        let router = Self::build_router(state);
        Self { router, proxy }
    }

    /// Build the Axum router with all middleware layers.
    fn build_router(state: AppState) -> Router {
        Router::new()
            .route("/", any(proxy_handler))
            .route("/{*path}", any(proxy_handler))
            .with_state(state)
            .layer(TraceLayer::new_for_http().make_span_with(make_request_span::<Body>))
            .layer(request_id_layer())
    }

    /// The router, for serving in-process without a socket.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    pub fn credentials(&self) -> &Arc<CredentialStore> {
        self.proxy.credentials()
    }

    /// Run the server, accepting connections on the given listener until
    /// `shutdown` fires.
    pub async fn run(
        self,
        listener: TcpListener,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(
            address = %addr,
            upstream = %self.proxy.upstream(),
            "HTTP server starting"
        );

        let app = self.router.into_make_service_with_connect_info::<SocketAddr>();

        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
                tracing::info!("Shutdown signal received");
            })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}

/// Catch-all handler: every method and path goes upstream.
async fn proxy_handler(State(state): State<AppState>, request: Request<Body>) -> Response {
    state.proxy.handle(request).await
}
