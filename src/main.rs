//! Cross-chain router service
//!
//! Loads the chain and token configuration, registers one bridge per enabled
//! chain and serves the verification API alongside Prometheus metrics.

use anyhow::Result;
use std::future::Future;
use tokio::signal;
use tokio::sync::watch;
use tracing::{error, info};

use crosschain_router::api;
use crosschain_router::config::Settings;
use crosschain_router::metrics::MetricsServer;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    init_logging();

    info!("Starting cross-chain router v{}", env!("CARGO_PKG_VERSION"));

    // Load configuration
    let settings = Settings::load()?;
    info!(
        instance_id = %settings.router.instance_id,
        swap_type = %settings.router.swap_type,
        "Loaded configuration for {} chains",
        settings.enabled_chains().len()
    );

    let router = settings.build_router()?;
    info!("Registered bridges for chains {:?}", router.chain_ids());

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let mut handles = Vec::new();

    // Start API server
    if settings.api.enabled {
        let config = settings.api.clone();
        let router = router.clone();
        let shutdown = wait_for_shutdown(shutdown_rx.clone());
        handles.push(tokio::spawn(async move {
            if let Err(e) = api::run_server(config, router, shutdown).await {
                error!("API server error: {}", e);
            }
        }));
        info!("API server: http://{}:{}", settings.api.host, settings.api.port);
    }

    // Start metrics server
    if settings.metrics.enabled {
        let server = MetricsServer::new(settings.metrics.port);
        let shutdown = wait_for_shutdown(shutdown_rx.clone());
        handles.push(tokio::spawn(async move {
            if let Err(e) = server.run(shutdown).await {
                error!("Metrics server error: {}", e);
            }
        }));
        info!("Metrics: http://0.0.0.0:{}/metrics", settings.metrics.port);
    }

    info!("Cross-chain router is running");

    // Wait for shutdown signal
    shutdown_signal().await;

    info!("Shutdown signal received, stopping...");
    let _ = shutdown_tx.send(true);

    for handle in handles {
        if let Err(e) = handle.await {
            error!("Server task failed: {}", e);
        }
    }

    info!("Cross-chain router stopped");
    Ok(())
}

fn init_logging() {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new("info,crosschain_router=debug,hyper=warn,reqwest=warn")
    });

    let json = std::env::var("LOG_FORMAT")
        .map(|v| v.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    if json {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json().with_target(true))
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().with_target(true).with_thread_ids(true))
            .init();
    }
}

fn wait_for_shutdown(mut rx: watch::Receiver<bool>) -> impl Future<Output = ()> + Send + 'static {
    async move {
        let _ = rx.wait_for(|stopped| *stopped).await;
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
