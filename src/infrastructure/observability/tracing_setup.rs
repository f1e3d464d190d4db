//! Subscriber setup with optional OpenTelemetry export

use opentelemetry::{global, trace::TracerProvider as _, KeyValue};
use opentelemetry_otlp::WithExportConfig;
use opentelemetry_sdk::{
    runtime,
    trace::{RandomIdGenerator, Sampler, TracerProvider},
    Resource,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use super::config::TracingConfig;
use crate::config::LoggingConfig;
use crate::infrastructure::logging::{env_filter, fmt_layer};

/// Initialize logging and tracing, exporting spans over OTLP when enabled
pub fn init_tracing(logging_config: &LoggingConfig, tracing_config: &TracingConfig) {
    let mut otel_error = None;

    let telemetry_layer = if tracing_config.enabled {
        match init_otel_tracing(tracing_config) {
            Ok(provider) => {
                let tracer = provider.tracer(tracing_config.service_name.clone());
                global::set_tracer_provider(provider);
                Some(tracing_opentelemetry::layer().with_tracer(tracer))
            }
            Err(e) => {
                otel_error = Some(e);
                None
            }
        }
    } else {
        None
    };

    let exporting = telemetry_layer.is_some();

    tracing_subscriber::registry()
        .with(env_filter(logging_config))
        .with(fmt_layer(&logging_config.format))
        .with(telemetry_layer)
        .init();

    match otel_error {
        Some(e) => tracing::warn!(error = %e, "Failed to initialize OpenTelemetry, export disabled"),
        None if exporting => tracing::info!(
            endpoint = %tracing_config.otlp_endpoint,
            level = %logging_config.level,
            "Tracing initialized with OpenTelemetry export"
        ),
        None => tracing::info!(level = %logging_config.level, "Tracing initialized"),
    }
}

/// Sampler for a configured ratio
fn sampler_for(ratio: f64) -> Sampler {
    if ratio >= 1.0 {
        Sampler::AlwaysOn
    } else if ratio <= 0.0 {
        Sampler::AlwaysOff
    } else {
        Sampler::TraceIdRatioBased(ratio)
    }
}

fn init_otel_tracing(
    config: &TracingConfig,
) -> Result<TracerProvider, opentelemetry::trace::TraceError> {
    let resource = Resource::new(vec![KeyValue::new(
        "service.name",
        config.service_name.clone(),
    )]);

    let exporter = opentelemetry_otlp::SpanExporter::builder()
        .with_tonic()
        .with_endpoint(&config.otlp_endpoint)
        .build()?;

    let provider = TracerProvider::builder()
        .with_sampler(sampler_for(config.sampling_ratio))
        .with_id_generator(RandomIdGenerator::default())
        .with_resource(resource)
        .with_batch_exporter(exporter, runtime::Tokio)
        .build();

    Ok(provider)
}

/// Shutdown tracing and flush pending spans
pub fn shutdown_tracing() {
    global::shutdown_tracer_provider();
    tracing::info!("Tracing shutdown complete");
}
