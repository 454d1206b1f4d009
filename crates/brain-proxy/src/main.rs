//! brain-proxy – entry point.
//!
//! Startup order:
//! 1. Parse configuration from environment variables.
//! 2. Initialise tracing (JSON with `BRAIN_LOG_JSON=1`, plain text otherwise).
//! 3. Build the upstream provider.
//! 4. Build the Axum router and serve with graceful shutdown.

use std::net::SocketAddr;
use std::sync::Arc;

use brain_ai::providers::openai::OpenAIProvider;
use brain_proxy::{AppState, ProxyConfig};
use tracing::{info, warn};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cfg = ProxyConfig::from_env();

    let env_filter = match cfg.log_level.parse::<tracing_subscriber::EnvFilter>() {
        Ok(f) => f,
        Err(e) => {
            eprintln!(
                "WARN: BRAIN_LOG='{}' is not a valid tracing filter ({}); falling back to 'info'",
                cfg.log_level, e
            );
            tracing_subscriber::EnvFilter::new("info")
        }
    };

    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(true);

    if cfg.log_json {
        subscriber.json().init();
    } else {
        subscriber.init();
    }

    info!(version = env!("CARGO_PKG_VERSION"), "brain-proxy starting");

    // A missing key is not fatal: the upstream rejects the request and the
    // caller gets a 502.
    if cfg.missing_api_key() {
        warn!(
            provider = cfg.provider.name(),
            env_var = cfg.provider.api_key_env_var().unwrap_or_default(),
            "no upstream API key configured"
        );
    }
    let provider = Arc::new(OpenAIProvider::with_optional_key(cfg.api_key.clone()));

    let addr: SocketAddr = cfg.bind_address.parse()?;
    let state = Arc::new(AppState::new(cfg, provider));
    info!(
        model = %state.model.id,
        upstream = %state.model.base_url,
        "upstream configured"
    );

    let app = brain_proxy::app(state);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(%addr, "HTTP server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("brain-proxy stopped");
    Ok(())
}

/// Resolves when SIGINT (Ctrl-C) or SIGTERM is received.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "failed to install CTRL+C signal handler");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{SignalKind, signal};
        match signal(SignalKind::terminate()) {
            Ok(mut s) => {
                s.recv().await;
            }
            Err(e) => warn!(error = %e, "failed to install SIGTERM handler"),
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }

    info!("shutdown signal received; starting graceful shutdown");
}
