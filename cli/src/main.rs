//! Taskboard binary.
//!
//! # Startup
//!
//! ```text
//! init_tracing() -> Settings::load() -> compose() -> bind listeners -> serve
//!                                                          |
//!                                     SIGINT / SIGTERM -> stop accepting -> close store
//! ```
//!
//! Any composition failure (store init, missing or invalid peer address, bad
//! configuration) is fatal: the process logs it and exits non-zero before
//! binding a port.

use std::sync::Arc;

use anyhow::{Context, Result};
use taskboard_config::Settings;
use taskboard_metrics::Metrics;
use taskboard_server::{App, Surface, VERSION, compose, serve};
use tokio::net::TcpListener;
use tokio::sync::watch;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new("info"))
        .unwrap_or_else(|_| EnvFilter::new("warn"));

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(env_filter)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();
    if let Err(err) = run().await {
        tracing::error!("{err:#}");
        return Err(err);
    }
    Ok(())
}

async fn run() -> Result<()> {
    let settings = Settings::load().context("failed to load configuration")?;

    let metrics = Arc::new(Metrics::new());
    metrics.set_gauge(
        "taskboard_info",
        &[("mode", settings.mode.as_str()), ("version", VERSION)],
        1.0,
    );

    let composition = compose(&settings, Arc::clone(&metrics))
        .await
        .with_context(|| format!("failed to start in {} mode", settings.mode))?;
    let app = Arc::new(App::new(composition, metrics));

    let main_addr = settings.listen_addr();
    let main_listener = TcpListener::bind(main_addr)
        .await
        .with_context(|| format!("failed to bind {main_addr}"))?;
    let metrics_listener = match settings.metrics_addr() {
        Some(addr) => Some(
            TcpListener::bind(addr)
                .await
                .with_context(|| format!("failed to bind metrics port {addr}"))?,
        ),
        None => None,
    };

    tracing::info!(
        mode = %settings.mode,
        version = VERSION,
        addr = %main_addr,
        metrics_addr = ?settings.metrics_addr(),
        "Taskboard listening"
    );

    let (stop_tx, stop_rx) = watch::channel(false);
    let mut servers = vec![tokio::spawn(serve(
        main_listener,
        Arc::clone(&app),
        Surface::Main,
        stopped(stop_rx.clone()),
    ))];
    if let Some(listener) = metrics_listener {
        servers.push(tokio::spawn(serve(
            listener,
            Arc::clone(&app),
            Surface::Metrics,
            stopped(stop_rx),
        )));
    }

    shutdown_signal().await;
    tracing::info!("Shutdown signal received");
    let _ = stop_tx.send(true);
    for server in servers {
        if let Err(err) = server.await {
            tracing::warn!(error = %err, "Listener task failed");
        }
    }

    app.composition().items.close().await;
    tracing::info!("Taskboard stopped");
    Ok(())
}

async fn stopped(mut rx: watch::Receiver<bool>) {
    let _ = rx.wait_for(|stop| *stop).await;
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            tracing::warn!(error = %err, "Failed to listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{SignalKind, signal};
        match signal(SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(err) => {
                tracing::warn!(error = %err, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {}
        () = terminate => {}
    }
}
