//! RadonEye Service - Background poller and Prometheus endpoint.
//!
//! Run with: `cargo run -p radoneye-service -- --radon-sensors AA:BB:CC:DD:EE:FF:Bedroom`

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use radoneye_core::{BleLink, Registry};
use radoneye_service::config::parse_sensor_arg;
use radoneye_service::{
    AppState, Collector, Config, DeviceConfig, FileSink, NullSink, SnapshotSink, api,
};
use radoneye_types::Unit;

/// RadonEye Service - polls RD200 radon detectors and serves Prometheus metrics.
#[derive(Parser, Debug)]
#[command(name = "radoneye-service")]
#[command(version, about, long_about = None)]
struct Args {
    /// Path to configuration file.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Bind address (overrides config).
    #[arg(long)]
    bind: Option<String>,

    /// Report Bq/m³ instead of pCi/L.
    #[arg(short, long)]
    becquerel: bool,

    /// Verbose logging, including HTTP access logs.
    #[arg(short, long)]
    verbose: bool,

    /// Detectors to monitor, as MAC:Name pairs (added to configured devices).
    #[arg(long, num_args = 1.., value_name = "MAC:NAME")]
    radon_sensors: Vec<String>,

    /// Protocol selector for --radon-sensors entries (0 = RD200, 1 = RD200 v2).
    #[arg(long, default_value_t = 1)]
    device_type: u8,

    /// Snapshot mirror file (overrides config and enables the mirror).
    #[arg(long)]
    dump_file: Option<PathBuf>,

    /// Disable the snapshot mirror file.
    #[arg(long, conflicts_with = "dump_file")]
    no_dump: bool,

    /// Disable the background collector (serve only).
    #[arg(long)]
    no_collector: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    init_logging(args.verbose)?;

    let mut config = match &args.config {
        Some(path) => Config::load(path)?,
        None => Config::load_default()?,
    };
    apply_args(&mut config, &args);
    config.validate()?;

    let registry = Arc::new(Registry::new(config.registrations()?)?);
    for device in registry.iter() {
        info!(
            "Registered {} ({}, {})",
            device.name, device.address, device.device_type
        );
    }

    let sink: Arc<dyn SnapshotSink> = if config.dump.enabled {
        info!("Mirroring scrapes to {:?}", config.dump.path);
        Arc::new(FileSink::new(&config.dump.path))
    } else {
        Arc::new(NullSink)
    };

    let unit = config.polling.unit;
    let state = AppState::new(Arc::clone(&registry), unit, sink);
    info!("Reporting radon in {}", unit.symbol());

    // The collector starts before the listener accepts connections.
    let collector = if args.no_collector {
        info!("Background collector disabled");
        None
    } else if registry.is_empty() {
        warn!("No devices configured; /metrics will stay empty");
        None
    } else {
        let link = BleLink::new(config.ble.to_ble_config())
            .await
            .context("Failed to open Bluetooth adapter")?;
        Collector::new(Arc::clone(&state)).start(link, config.polling.to_poll_config())
    };

    let app = api::router()
        .layer(ServiceBuilder::new().layer(TraceLayer::new_for_http()))
        .with_state(Arc::clone(&state));

    let listener = tokio::net::TcpListener::bind(config.server.bind.as_str())
        .await
        .with_context(|| format!("Failed to bind {}", config.server.bind))?;
    info!("Starting server on {}", listener.local_addr()?);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(Arc::clone(&state)))
        .await?;

    if let Some(handle) = collector {
        handle.abort();
    }
    info!("Shut down");

    Ok(())
}

fn init_logging(verbose: bool) -> anyhow::Result<()> {
    let level = if verbose { "debug" } else { "info" };
    let mut filter = EnvFilter::from_default_env()
        .add_directive(format!("radoneye_service={}", level).parse()?)
        .add_directive(format!("radoneye_core={}", level).parse()?);
    if verbose {
        filter = filter.add_directive("tower_http=debug".parse()?);
    }

    tracing_subscriber::fmt().with_env_filter(filter).init();
    Ok(())
}

/// Fold command line overrides into the loaded configuration.
fn apply_args(config: &mut Config, args: &Args) {
    if let Some(bind) = &args.bind {
        config.server.bind = bind.clone();
    }
    if args.becquerel {
        config.polling.unit = Unit::Becquerel;
    }
    if let Some(path) = &args.dump_file {
        config.dump.enabled = true;
        config.dump.path = path.clone();
    }
    if args.no_dump {
        config.dump.enabled = false;
    }

    for entry in &args.radon_sensors {
        match parse_sensor_arg(entry) {
            Some((address, name)) => config
                .devices
                .push(DeviceConfig::new(address, name, args.device_type)),
            None => warn!("Ignoring sensor '{}': expected MAC:Name", entry),
        }
    }
}

/// Resolve on ctrl-c and stop the collector.
async fn shutdown_signal(state: Arc<AppState>) {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for ctrl-c: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown requested");
    state.collector.signal_stop();
}
