use std::path::PathBuf;

use clap::Parser;

use admission_guard::config::{load_config, GuardConfig};
use admission_guard::lifecycle::{self, StartupOptions};
use admission_guard::observability::logging::init_logging;

#[derive(Parser)]
#[command(name = "admission-guard")]
#[command(about = "Per-client and global request admission control", long_about = None)]
struct Args {
    /// Path to a TOML config file. Defaults are used when omitted.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Reload limits when the config file changes.
    #[arg(short, long)]
    watch: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let config = match &args.config {
        Some(path) => load_config(path)?,
        None => GuardConfig::default(),
    };

    init_logging(&config.observability);

    tracing::info!(version = env!("CARGO_PKG_VERSION"), "admission-guard starting");
    tracing::info!(
        bind_address = %config.listener.bind_address,
        request_timeout_secs = config.timeouts.request_secs,
        eviction_enabled = config.eviction.enabled,
        "Configuration loaded"
    );

    lifecycle::run(
        config,
        StartupOptions {
            config_path: args.config,
            watch: args.watch,
        },
    )
    .await?;

    Ok(())
}
