//! Startup orchestration.
//!
//! Brings the guard up in dependency order: metrics, guard state, background
//! tasks, then the listener. Any failure before the listener binds is fatal.

use std::path::PathBuf;
use std::sync::Arc;

use thiserror::Error;
use tokio::net::TcpListener;

use crate::config::watcher::ConfigWatcher;
use crate::config::GuardConfig;
use crate::guard::{AdmissionGuard, GuardLimits, IdleEvictor};
use crate::http::GuardServer;
use crate::lifecycle::shutdown::Shutdown;
use crate::lifecycle::signals::spawn_signal_handler;
use crate::observability::metrics;
use crate::security::access_control::{SharedPolicy, StaticTokenPolicy};

#[derive(Debug, Error)]
pub enum StartupError {
    #[error("failed to bind {address}: {source}")]
    Bind {
        address: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to watch config file: {0}")]
    Watch(#[from] notify::Error),

    #[error("server error: {0}")]
    Serve(#[source] std::io::Error),
}

/// Options for a single run of the service.
#[derive(Debug, Clone, Default)]
pub struct StartupOptions {
    /// File the config was loaded from, if any.
    pub config_path: Option<PathBuf>,
    /// Hot-reload limits when the config file changes.
    pub watch: bool,
}

/// Run the guard service until a termination signal arrives.
pub async fn run(config: GuardConfig, options: StartupOptions) -> Result<(), StartupError> {
    let shutdown = Shutdown::new();
    spawn_signal_handler(shutdown.clone());
    run_with_shutdown(config, options, shutdown).await
}

/// Run the guard service until `shutdown` is triggered.
pub async fn run_with_shutdown(
    config: GuardConfig,
    options: StartupOptions,
    shutdown: Shutdown,
) -> Result<(), StartupError> {
    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    let guard = Arc::new(AdmissionGuard::from_config(&config.limits));
    let policy: SharedPolicy = Arc::new(StaticTokenPolicy::new(config.admin.api_key.clone()));

    tracing::info!(
        window_secs = config.limits.window_secs,
        global_max = config.limits.global_max,
        client_max = config.limits.client_max,
        block_threshold = config.limits.block_threshold,
        block_duration_secs = config.limits.block_duration_secs,
        "Guard limits loaded"
    );

    tokio::spawn(IdleEvictor::new(guard.clone(), config.eviction.clone()).run(shutdown.subscribe()));

    // Dropping the watcher stops notifications, so it lives as long as run().
    let _watcher = match (&options.config_path, options.watch) {
        (Some(path), true) => Some(spawn_config_reload(path, guard.clone())?),
        (None, true) => {
            tracing::warn!("--watch given without a config file; hot reload disabled");
            None
        }
        _ => None,
    };

    let listener = TcpListener::bind(&config.listener.bind_address)
        .await
        .map_err(|source| StartupError::Bind {
            address: config.listener.bind_address.clone(),
            source,
        })?;

    let server = GuardServer::new(&config, guard, policy);
    server
        .run(listener, shutdown.subscribe())
        .await
        .map_err(StartupError::Serve)?;

    tracing::info!("Shutdown complete");
    Ok(())
}

fn spawn_config_reload(
    path: &std::path::Path,
    guard: Arc<AdmissionGuard>,
) -> Result<notify::RecommendedWatcher, StartupError> {
    let (watcher, mut updates) = ConfigWatcher::new(path);
    let handle = watcher.run()?;

    tokio::spawn(async move {
        while let Some(config) = updates.recv().await {
            guard.update_limits(GuardLimits::from(&config.limits));
        }
    });

    tracing::info!(path = %path.display(), "Watching config for limit changes");
    Ok(handle)
}
