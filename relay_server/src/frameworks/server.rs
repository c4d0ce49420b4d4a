// Framework bootstrap for the relay runtime.

use crate::frameworks::config::{self, RelayConfig};
use crate::interface_adapters::net::ws_handler;
use crate::interface_adapters::state::AppState;

use axum::{Router, routing::get};
use std::future::{Future, pending};
use std::io::Result;
use std::net::SocketAddr;
use std::sync::Arc;

fn init_runtime() {
    let _ = dotenvy::dotenv();

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    let json = matches!(std::env::var("LOG_FORMAT").as_deref(), Ok("json"));
    if json {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .json()
            .with_current_span(true)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .compact()
            .init();
    }

    // Session tasks are isolated by tokio; a panic is logged and only that pair is lost.
    std::panic::set_hook(Box::new(|info| {
        let backtrace = std::backtrace::Backtrace::capture();
        tracing::error!(%info, ?backtrace, "panic");
    }));
}

fn app(config: &RelayConfig) -> Router {
    let state = Arc::new(AppState {
        upstream_addr: Arc::from(config.upstream_addr()),
        max_line_bytes: config.max_line_bytes,
    });

    // Browsers opening `ws://host:port` request `/`; `/ws` is kept for explicit clients.
    Router::new()
        .route("/", get(ws_handler))
        .route("/ws", get(ws_handler))
        .with_state(state)
}

/// Serves relay sessions on `listener` until the process exits.
pub async fn run(listener: tokio::net::TcpListener, config: RelayConfig) -> Result<()> {
    run_until(listener, config, pending()).await
}

/// Serves relay sessions until `shutdown` resolves, then stops accepting connections.
pub async fn run_until<F>(
    listener: tokio::net::TcpListener,
    config: RelayConfig,
    shutdown: F,
) -> Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let address = listener.local_addr()?;
    let app = app(&config);

    tracing::info!(
        %address,
        upstream = %config.upstream_addr(),
        max_line_bytes = config.max_line_bytes,
        "relay listening"
    );

    // Serve app and report errors rather than panicking
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown)
    .await
    .inspect_err(|e| {
        tracing::error!(error = %e, "server error");
    })?;

    tracing::info!("relay stopped");
    Ok(())
}

pub async fn run_with_config() -> Result<()> {
    init_runtime();

    let address = SocketAddr::from((config::listen_host(), config::listen_port()));

    // Bind TCP listener with error handling
    let listener = tokio::net::TcpListener::bind(address)
        .await
        .inspect_err(|e| {
            tracing::error!(%address, error = %e, "failed to bind");
        })?;

    run_until(listener, RelayConfig::from_env(), shutdown_signal()).await
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to listen for ctrl-c");
            pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to listen for SIGTERM");
                pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("shutdown signal received; closing listener");
}
