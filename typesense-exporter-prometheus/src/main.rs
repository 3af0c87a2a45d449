//! Prometheus exporter binary for Typesense clusters.

use std::process;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use tokio::sync::watch;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use typesense_exporter_prometheus::config::{Config, EXIT_CONFIG_ERROR, LogFormat};
use typesense_exporter_prometheus::{HttpServer, TypesenseCollector};

/// Export Typesense cluster diagnostics as Prometheus metrics.
#[derive(Parser, Debug)]
#[command(name = "typesense-exporter-prometheus")]
#[command(about = "Export Typesense cluster diagnostics as Prometheus metrics")]
#[command(version)]
struct Args {
    /// Listen port for the scrape endpoint (overrides METRICS_PORT).
    #[arg(long)]
    port: Option<u16>,

    /// Log level: trace, debug, info, warn, error (overrides LOG_LEVEL).
    #[arg(long)]
    log_level: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Logging is configured from the environment too, so configuration
    // failures go straight to stderr.
    let mut config = match Config::from_env() {
        Ok(config) => config,
        Err(err) => {
            eprintln!("parsing environment variables failed: {err}");
            process::exit(EXIT_CONFIG_ERROR);
        }
    };

    if let Some(port) = args.port {
        config.metrics_port = port;
    }
    if let Some(log_level) = args.log_level {
        config.log_level = log_level;
    }

    let filter = EnvFilter::from_default_env()
        .add_directive(format!("typesense_exporter_prometheus={}", config.log_level).parse()?);

    match config.log_format {
        LogFormat::Json => {
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .json()
                .init();
        }
        LogFormat::Text => {
            tracing_subscriber::fmt().with_env_filter(filter).init();
        }
    }

    info!(
        cluster = %config.cluster,
        namespace = %config.namespace,
        upstream = %config.base_url(),
        "starting Typesense Prometheus exporter"
    );

    // Create shutdown signal
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let collector = Arc::new(TypesenseCollector::new(&config, shutdown_rx.clone())?);
    info!(
        descriptors = collector.describe().count(),
        "descriptor tables ready"
    );

    // Start HTTP server
    let http_server = HttpServer::new(collector, config.listen_addr());
    let http_shutdown = shutdown_rx.clone();
    let http_task = tokio::spawn(async move {
        if let Err(e) = http_server.run(http_shutdown).await {
            error!("HTTP server error: {}", e);
        }
    });

    // Wait for shutdown signal
    tokio::select! {
        _ = tokio::signal::ctrl_c() => {
            info!("received Ctrl+C, shutting down...");
        }
        _ = async {
            #[cfg(unix)]
            {
                let mut sigterm = tokio::signal::unix::signal(
                    tokio::signal::unix::SignalKind::terminate()
                ).unwrap();
                sigterm.recv().await;
            }
            #[cfg(not(unix))]
            {
                std::future::pending::<()>().await;
            }
        } => {
            info!("received SIGTERM, shutting down...");
        }
    }

    // Signal shutdown
    shutdown_tx.send(true)?;

    // Wait for the server to drain
    let _ = tokio::time::timeout(Duration::from_secs(5), http_task).await;

    info!("exporter stopped");
    Ok(())
}
