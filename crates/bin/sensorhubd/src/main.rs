//! # sensorhubd — sensorhub device agent
//!
//! Composition root that wires all adapters together and runs the agent.
//!
//! ## Responsibilities
//! - Load configuration (config file, env vars)
//! - Build the driver catalog and the JSON definition store
//! - Restore stored sensors into a [`DeviceContext`]
//! - Answer `sensor_command` messages read line by line from stdin
//! - Publish periodic readings to stdout
//! - Release every sensor on shutdown (EOF or SIGINT)
//!
//! ## Dependency rule
//! This is the **only** crate that depends on all other crates.
//! It is the wiring layer — no domain logic belongs here.

mod config;
mod stdio;

use std::sync::Arc;

use anyhow::{Context, Result};
use sensorhub_adapter_storage_json::JsonFileStore;
use sensorhub_app::context::DeviceContext;
use tokio::io::BufReader;
use tokio::sync::watch;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use crate::config::Config;
use crate::stdio::LinePublisher;

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::load().context("failed to load configuration")?;

    // Logs go to stderr; stdout carries the transport.
    let filter = EnvFilter::try_new(&config.logging.filter)
        .with_context(|| format!("invalid log filter `{}`", config.logging.filter))?;
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    info!(
        device_id = %config.device.id,
        version = env!("CARGO_PKG_VERSION"),
        "sensorhubd starting"
    );

    // Store and sensors
    let store = JsonFileStore::new(config.store_path());
    info!(path = %store.path().display(), "using sensor store");
    let context = DeviceContext::init(
        sensorhub_adapter_virtual::catalog(),
        store,
        config.driver_timeout(),
    )
    .await;

    if !config.seed_sensors.is_empty() {
        let seeded = context.seed(&config.seed_sensors).await;
        info!(seeded, "applied seed sensors from environment");
    }

    // Periodic publishing
    let publisher = Arc::new(LinePublisher::stdout());
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let publisher_task = match config.publish_interval() {
        Some(interval) => {
            let publisher_loop =
                context.publisher(config.device.id.clone(), Arc::clone(&publisher), interval);
            Some(tokio::spawn(publisher_loop.run(shutdown_rx)))
        }
        None => {
            info!("periodic publishing disabled");
            None
        }
    };

    // Commands
    let dispatcher = context.dispatcher();
    let input = BufReader::new(tokio::io::stdin());
    tokio::select! {
        served = stdio::serve_lines(input, &dispatcher, publisher.as_ref()) => match served {
            Ok(answered) => info!(answered, "input closed"),
            Err(err) => error!(error = %err, "failed to read commands"),
        },
        signal = tokio::signal::ctrl_c() => {
            if let Err(err) = signal {
                warn!(error = %err, "failed to listen for shutdown signal");
            }
            info!("shutdown requested");
        }
    }

    // Shutdown
    let _ = shutdown_tx.send(true);
    if let Some(task) = publisher_task
        && let Err(err) = task.await
    {
        warn!(error = %err, "publisher loop ended abnormally");
    }
    drop(dispatcher);
    context.teardown();
    info!("sensorhubd stopped");

    Ok(())
}
