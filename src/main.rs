// src/main.rs
use anyhow::Result;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::signal;
use tracing::{error, info, warn};

use weighted_proxy::{
    config,
    load_balancer::WeightedRandomBalancer,
    proxy::{BackendRegistry, Proxy},
    server::{RequestHandler, ServerBuilder},
};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("weighted_proxy=debug".parse()?)
                .add_directive("hyper=info".parse()?),
        )
        .init();

    // Optional config file; the environment is layered on top either way.
    let config_path = std::env::args().nth(1).map(PathBuf::from);
    match &config_path {
        Some(path) => info!("Loading configuration from: {}", path.display()),
        None => info!("No config file given, using defaults and environment"),
    }
    let config = config::load(config_path.as_deref()).await?;

    let registry = Arc::new(BackendRegistry::new(config.backend_set()));
    let snapshot = registry.snapshot();
    if snapshot.total_weight() <= 0.0 {
        warn!(
            "No selectable backends configured ({} listed); requests will get 503 until a reload",
            snapshot.len()
        );
    }
    for backend in snapshot.iter() {
        info!("Backend {}", backend);
    }

    let proxy = Arc::new(Proxy::new(
        &config,
        registry.clone(),
        Arc::new(WeightedRandomBalancer::new()),
    ));

    tokio::spawn(reload_on_hangup(config_path, registry));

    let addr = config.listen_addr()?;
    info!(
        "Starting weighted proxy on {} (forward mode {:?}, timeout {:?})",
        addr,
        config.forward_mode,
        config.timeouts.request()
    );

    ServerBuilder::new(addr)
        .with_handler(RequestHandler::new(proxy))
        .serve_with_shutdown(shutdown_signal())
        .await?;

    info!("Weighted proxy stopped");
    Ok(())
}

/// Re-read the configuration on SIGHUP and swap in the new backend set. A bad
/// reload keeps the current set. Only the backend list is hot-swapped.
#[cfg(unix)]
async fn reload_on_hangup(path: Option<PathBuf>, registry: Arc<BackendRegistry>) {
    let mut hangup = match signal::unix::signal(signal::unix::SignalKind::hangup()) {
        Ok(hangup) => hangup,
        Err(e) => {
            error!("Failed to install SIGHUP handler, reload disabled: {}", e);
            return;
        }
    };

    while hangup.recv().await.is_some() {
        info!("SIGHUP received, reloading backends");
        reload(path.as_deref(), &registry).await;
    }
}

#[cfg(not(unix))]
async fn reload_on_hangup(_path: Option<PathBuf>, _registry: Arc<BackendRegistry>) {}

#[cfg_attr(not(unix), allow(dead_code))]
async fn reload(path: Option<&Path>, registry: &BackendRegistry) {
    match config::load(path).await {
        Ok(config) => registry.replace(config.backend_set()),
        Err(e) => error!("Reload failed, keeping current backends: {:#}", e),
    }
}

// Graceful shutdown handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut term) => {
                term.recv().await;
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

    info!("Shutdown signal received");
}
