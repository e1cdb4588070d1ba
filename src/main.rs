//! auth-relay-proxy
//!
//! ```text
//!                 ┌──────────────────────────────────────────────┐
//!   Client        │                 auth-relay-proxy             │
//!   ─────────────▶│ listener ─▶ rewrite ─▶ upstream client ──────┼──▶ Upstream
//!                 │   (axum)    + extra headers                  │
//!                 │             + captured cookie                │
//!   ◀─────────────┼───────────── relay ◀── cookie capture ◀──────┼─── Response
//!                 └──────────────────────────────────────────────┘
//! ```

use std::process::ExitCode;

use clap::Parser;

use auth_relay_proxy::cli::Cli;
use auth_relay_proxy::lifecycle::{signals, startup, Shutdown};
use auth_relay_proxy::observability::logging;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let config = match cli.into_config() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("error: {e}");
            return ExitCode::FAILURE;
        }
    };

    logging::init(&config.observability);
    tracing::info!(version = env!("CARGO_PKG_VERSION"), "auth-relay-proxy starting");

    let shutdown = Shutdown::new();
    let server_shutdown = shutdown.subscribe();
    let trigger = shutdown.clone();
    tokio::spawn(async move {
        signals::wait_for_signal().await;
        trigger.trigger();
    });

    match startup::run(config, server_shutdown).await {
        Ok(()) => {
            tracing::info!("Shutdown complete");
            ExitCode::SUCCESS
        }
        Err(e) => {
            tracing::error!(error = %e, "Proxy failed");
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}
