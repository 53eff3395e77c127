use clap::Parser;
use clap::builder::TypedValueParser as _;

use crate::ring;

#[derive(Debug, Parser, Clone)]
pub struct RingConfig {
    /// Virtual replicas placed per node. More replicas smooth the load
    /// distribution at the cost of memory and lookup work.
    #[arg(long, env = "RINGROUTE_REPLICAS", default_value_t = ring::DEFAULT_REPLICAS,
          value_parser = clap::value_parser!(u64).range(1..).map(|v| v as usize))]
    pub replicas: usize,

    /// Size of the modular hash space.
    #[arg(long, env = "RINGROUTE_SLOTS", default_value_t = ring::DEFAULT_SLOTS,
          value_parser = clap::value_parser!(u64).range(1..))]
    pub slots: u64,

    /// Nodes placed on the ring at startup. Membership is not persisted; the
    /// ring is rebuilt from this list on every start.
    #[arg(long = "node", env = "RINGROUTE_INITIAL_NODES", value_delimiter = ',')]
    pub initial_nodes: Vec<String>,
}

#[derive(Debug, Parser, Clone)]
pub struct SentryConfig {
    #[arg(long, env = "SENTRY_DSN", default_value = "")]
    pub dsn: String,

    #[arg(long, env = "SENTRY_SAMPLE_RATE", default_value = "0.0")]
    pub sample_rate: f32,
}

#[derive(Debug, Parser, Clone)]
pub struct OtelConfig {
    #[arg(long, env = "OTEL_EXPORTER_OTLP_ENDPOINT", default_value = "")]
    pub endpoint: String,

    #[arg(long, env = "OTEL_EXPORTER_OTLP_PROTOCOL", default_value = "http")]
    pub protocol: String,
}
