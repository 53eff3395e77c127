use std::net::SocketAddr;

use anyhow::{
    Context,
    Result,
};
use clap::Parser;
use ringroute::{
    app,
    cluster::Cluster,
    config::{
        OtelConfig,
        RingConfig,
        SentryConfig,
    },
    observability,
};
use sentry_tower::{
    NewSentryLayer,
    SentryHttpLayer,
};
use tracing::info;

#[derive(Debug, Parser, Clone)]
#[command(name = "ringroute", about = "A consistent-hash request router.")]
struct Config {
    #[arg(long, env = "RINGROUTE_HTTP_ADDR", value_parser = clap::value_parser!(SocketAddr), default_value = "0.0.0.0:5000")]
    http_addr: SocketAddr,

    #[clap(flatten)]
    ring: RingConfig,

    #[clap(flatten)]
    sentry: SentryConfig,

    #[clap(flatten)]
    otel: OtelConfig,
}

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::parse();
    let version = env!("CARGO_PKG_VERSION");
    let _sentry = observability::init_tracing_and_sentry(config.sentry.clone());

    // Initialize OpenTelemetry metrics
    observability::init_otel_metrics(config.otel.clone()).expect("Failed to initialize OpenTelemetry metrics");

    info!(config = ?config, version = version, "Starting ringroute");

    let cluster = Cluster::new(config.ring.replicas, config.ring.slots, &config.ring.initial_nodes)
        .context("Failed to build initial ring")?;

    let observability_layers = tower::ServiceBuilder::new()
        .layer(NewSentryLayer::new_from_top())
        .layer(SentryHttpLayer::new().enable_transaction())
        .layer(observability::ObservabilityLayer);

    let app = app(cluster).layer(observability_layers);

    let listener = tokio::net::TcpListener::bind(config.http_addr)
        .await
        .with_context(|| format!("Failed to bind {}", config.http_addr))?;

    axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>())
        .with_graceful_shutdown(async {
            let mut terminate = tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
                .expect("Failed to install SIGTERM handler");

            tokio::select! {
                _ = tokio::signal::ctrl_c() => {
                    tracing::info!("Received SIGINT, shutting down");
                },
                _ = terminate.recv() => {
                    tracing::info!("Received SIGTERM, shutting down");
                },
            }
        })
        .await?;

    info!("HTTP server stopped");
    Ok(())
}
