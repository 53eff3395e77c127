use std::{
    future::Future,
    pin::Pin,
    task::{
        Context,
        Poll,
    },
    time::Instant,
};

use opentelemetry::{
    KeyValue,
    global,
    metrics::{
        Counter,
        Histogram,
    },
};
use opentelemetry_otlp::WithExportConfig;
use opentelemetry_sdk::Resource;
use sentry::ClientInitGuard;
use sentry_tracing::EventFilter;
use tower::{
    Layer,
    Service,
};
use tracing::{
    debug,
    error,
};
use tracing_subscriber::{
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

use crate::config::{
    OtelConfig,
    SentryConfig,
};

pub fn init_tracing_and_sentry(sentry_config: SentryConfig) -> Option<ClientInitGuard> {
    let guard = if sentry_config.dsn.is_empty() {
        None
    } else {
        Some(sentry::init((
            sentry_config.dsn,
            sentry::ClientOptions {
                release: Some(env!("CARGO_PKG_VERSION").into()),
                traces_sample_rate: sentry_config.sample_rate,
                ..Default::default()
            },
        )))
    };

    let fmt_layer = tracing_subscriber::fmt::layer()
        .compact()
        .with_file(true)
        .with_line_number(true)
        .with_thread_ids(true);

    let sentry_layer = sentry_tracing::layer().event_filter(|md| match md.level() {
        &tracing::Level::ERROR => EventFilter::Event,
        _ => EventFilter::Ignore,
    });

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::from_default_env())
        .with(fmt_layer)
        .with(sentry_layer)
        .init();

    guard
}

pub fn init_otel_metrics(otel_config: OtelConfig) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    if otel_config.endpoint.is_empty() {
        tracing::info!("No OTEL endpoint configured, skipping metrics initialization");
        return Ok(());
    }

    // Create OTLP metrics exporter
    let exporter = opentelemetry_otlp::MetricExporter::builder()
        .with_http()
        .with_endpoint(&otel_config.endpoint)
        .build()?;

    // Create a meter provider with the OTLP exporter
    let provider = opentelemetry_sdk::metrics::SdkMeterProvider::builder()
        .with_periodic_exporter(exporter)
        .with_resource(
            Resource::builder()
                .with_attributes(vec![KeyValue::new("service.name", "ringroute")])
                .build(),
        )
        .build();

    global::set_meter_provider(provider);
    tracing::info!(
        "OpenTelemetry metrics initialized with OTLP exporter endpoint: {}",
        otel_config.endpoint
    );
    Ok(())
}

#[derive(Clone, Copy)]
pub struct ObservabilityLayer;

impl<S> Layer<S> for ObservabilityLayer {
    type Service = ObservabilityService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        ObservabilityService::new(inner)
    }
}

#[derive(Clone)]
pub struct ObservabilityService<S> {
    inner: S,

    request_counter: Counter<u64>,
    duration_histogram: Histogram<f64>,
}

impl<S> ObservabilityService<S> {
    fn new(inner: S) -> Self {
        Self {
            inner,
            request_counter: global::meter("ringroute")
                .u64_counter("ringroute_server_http_requests_total")
                .build(),
            duration_histogram: global::meter("ringroute")
                .f64_histogram("ringroute_server_http_request_duration_seconds")
                .build(),
        }
    }
}

impl<S, ReqBody, ResBody> Service<http::Request<ReqBody>> for ObservabilityService<S>
where
    S: Service<http::Request<ReqBody>, Response = http::Response<ResBody>> + Clone + Send + 'static,
    S::Future: Send + 'static,
    S::Error: 'static,
    ReqBody: Send + 'static,
    ResBody: 'static,
{
    type Error = S::Error;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send + 'static>>;
    type Response = S::Response;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, req: http::Request<ReqBody>) -> Self::Future {
        let start = Instant::now();
        let method = req.method().to_string();
        let path = req.uri().path().to_string();
        let fut = self.inner.call(req);
        let service_clone = self.clone();

        Box::pin(async move {
            let result = fut.await;
            let elapsed = start.elapsed();

            let status = match &result {
                Ok(response) => response.status().as_u16().to_string(),
                Err(_) => "unknown".to_string(),
            };

            let attributes = vec![
                KeyValue::new("method", method.clone()),
                KeyValue::new("path", path.clone()),
                KeyValue::new("http_status", status.clone()),
                KeyValue::new("status", status_category(&status).to_string()),
            ];
            service_clone
                .duration_histogram
                .record(elapsed.as_secs_f64(), &attributes);
            service_clone.request_counter.add(1, &attributes);

            match status_category(&status) {
                "ok" => debug!(
                    method = %method,
                    path = %path,
                    http_status = %status,
                    duration_ms = elapsed.as_millis(),
                    "request completed"
                ),
                "client_error" => tracing::warn!(
                    method = %method,
                    path = %path,
                    http_status = %status,
                    duration_ms = elapsed.as_millis(),
                    "request completed with client error"
                ),
                _ => error!(
                    method = %method,
                    path = %path,
                    http_status = %status,
                    duration_ms = elapsed.as_millis(),
                    "request failed"
                ),
            }

            result
        })
    }
}

fn status_category(status: &str) -> &'static str {
    match status.parse::<u16>() {
        Ok(code) if (100..400).contains(&code) => "ok",
        Ok(code) if (400..500).contains(&code) => "client_error",
        _ => "server_error",
    }
}
