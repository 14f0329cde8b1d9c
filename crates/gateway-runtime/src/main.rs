//! # Module Gateway
//!
//! Loads a gateway configuration, starts every module it names and runs until
//! Ctrl+C.
//!
//! ## Configuration Lookup
//!
//! 1. `--config <PATH>`
//! 2. `GATEWAY_CONFIG` environment variable
//! 3. `./gateway.json`
//!
//! Logging is controlled by `GATEWAY_LOG_LEVEL` (or `RUST_LOG`) and
//! `GATEWAY_JSON_LOGS`.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use gateway_runtime::{Gateway, GatewayConfig, ModuleRegistry};
use gateway_telemetry::{init_telemetry, TelemetryConfig};
use tracing::info;

const DEFAULT_CONFIG_PATH: &str = "gateway.json";

/// Module gateway: hosts modules on a broadcast message bus
#[derive(Parser, Debug)]
#[command(name = "gateway")]
#[command(about = "Host modules on a broadcast message bus")]
struct Args {
    /// Gateway configuration file (JSON)
    #[arg(short, long, env = "GATEWAY_CONFIG", default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    /// Log filter, overriding GATEWAY_LOG_LEVEL / RUST_LOG
    #[arg(long)]
    log_level: Option<String>,

    /// List the module kinds this build can host and exit
    #[arg(long)]
    list_kinds: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let mut telemetry = TelemetryConfig::from_env();
    if let Some(level) = args.log_level.clone() {
        telemetry = telemetry.with_log_level(level);
    }
    let _telemetry = init_telemetry(&telemetry).context("Failed to initialize telemetry")?;

    let registry = ModuleRegistry::with_builtins();
    if args.list_kinds {
        for kind in registry.kinds() {
            println!("{kind}");
        }
        return Ok(());
    }

    let config = GatewayConfig::from_path(&args.config)
        .with_context(|| format!("Failed to load {}", args.config.display()))?;

    info!(
        config = %args.config.display(),
        modules = config.modules.len(),
        "Starting gateway"
    );
    let gateway = Gateway::create(config, &registry)
        .await
        .context("Failed to create gateway")?;

    info!(modules = ?gateway.module_names(), "Gateway is running. Press Ctrl+C to stop.");
    tokio::signal::ctrl_c().await?;

    info!("Initiating graceful shutdown...");
    // Outlives the gateway so teardown discards are counted
    let bus = gateway.bus().clone();
    gateway.destroy().await;
    let stats = bus.stats();
    info!(
        published = stats.published,
        delivered = stats.delivered,
        dropped = stats.dropped,
        discarded = stats.discarded,
        "Shutdown complete"
    );

    Ok(())
}
