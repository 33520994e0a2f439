mod adapters;
mod config;
mod domain;
mod error;
mod ports;
mod service;

use crate::adapters::{MqttAdapter, TimescaleSink};
use crate::config::AppConfig;
use crate::service::ingest::{run_ingest_loop, IngestProcessor};
use anyhow::Context;
use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;
use tracing::{error, info};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 1. Initialize Structured Logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    info!("Starting UNS Historian Connector...");

    // 2. Load Configuration
    let config = match AppConfig::load() {
        Ok(c) => c,
        Err(e) => {
            error!("Failed to load configuration: {:?}", e);
            std::process::exit(1);
        }
    };
    info!("Configuration loaded.");

    // 3. Initialize Metrics (bind failure is fatal)
    metrics_exporter_prometheus::PrometheusBuilder::new()
        .with_http_listener(([0, 0, 0, 0], config.metrics_port))
        .install()
        .context("failed to install Prometheus recorder")?;
    info!("Prometheus metrics listening on 0.0.0.0:{}", config.metrics_port);

    // 4. Initialize Database Pool (lazy: a store that is down at startup
    // surfaces per message as a counted error, not a crash)
    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect_lazy(&config.database_url())
        .context("invalid database configuration")?;
    let sink = Arc::new(TimescaleSink::new(pool, config.store_write_timeout));

    // 5. Initialize Bus Client
    let (client, eventloop) = MqttAdapter::build(&config);
    let processor = IngestProcessor::new(sink);

    // 6. Start Ingest Loop
    let (shutdown_tx, shutdown_rx) = tokio::sync::watch::channel(false);
    let topic_filter = config.mqtt_topic.clone();
    let ingest_handle = tokio::spawn(async move {
        if let Err(e) = run_ingest_loop(eventloop, client, processor, topic_filter, shutdown_rx).await {
            error!("Ingest loop error: {:?}", e);
        }
    });

    info!(
        "System running. {}:{} topic '{}' -> measurements. Press Ctrl+C to stop.",
        config.mqtt_host, config.mqtt_port, config.mqtt_topic
    );

    // 7. Shutdown Signal
    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("Shutdown signal received..."),
        Err(err) => error!("Unable to listen for shutdown signal: {}", err),
    }

    // 8. Graceful Shutdown
    let _ = shutdown_tx.send(true);
    let _ = tokio::join!(ingest_handle);
    info!("Shutdown complete.");

    Ok(())
}
