use opentelemetry::{KeyValue, global, trace::TracerProvider as _};
use opentelemetry_sdk::{
    Resource,
    metrics::{PeriodicReader, SdkMeterProvider},
    trace::{SdkTracer, SdkTracerProvider},
};
use opentelemetry_semantic_conventions::resource::{SERVICE_NAME, SERVICE_VERSION};
use tracing::Subscriber;
use tracing::subscriber::set_global_default;
use tracing_bunyan_formatter::{BunyanFormattingLayer, JsonStorageLayer};
use tracing_log::LogTracer;
use tracing_subscriber::{EnvFilter, Registry, layer::SubscriberExt};

pub const OTLP_ENDPOINT_VAR: &str = "OTEL_EXPORTER_OTLP_ENDPOINT";

pub fn resource() -> Resource {
    Resource::builder()
        .with_attributes([
            KeyValue::new(SERVICE_NAME, env!("CARGO_PKG_NAME")),
            KeyValue::new(SERVICE_VERSION, env!("CARGO_PKG_VERSION")),
        ])
        .build()
}

/// OTLP export is opt-in through the standard endpoint variable.
pub fn otlp_enabled() -> bool {
    std::env::var(OTLP_ENDPOINT_VAR).is_ok_and(|v| !v.trim().is_empty())
}

/// Build the OTLP trace pipeline and install the OTLP meter provider.
///
/// Must run inside a tokio runtime. Returns `None` when export is disabled or
/// an exporter cannot be built.
fn otlp_tracer(name: &str) -> Option<SdkTracer> {
    if !otlp_enabled() {
        return None;
    }

    let exporter = match opentelemetry_otlp::SpanExporter::builder().with_tonic().build() {
        Ok(exporter) => exporter,
        Err(e) => {
            eprintln!("Failed to build OTLP span exporter: {}", e);
            return None;
        }
    };

    let provider = SdkTracerProvider::builder()
        .with_batch_exporter(exporter)
        .with_resource(resource())
        .build();
    global::set_tracer_provider(provider.clone());

    match opentelemetry_otlp::MetricExporter::builder()
        .with_tonic()
        .with_temporality(opentelemetry_sdk::metrics::Temporality::default())
        .build()
    {
        Ok(metrics_exporter) => {
            let reader = PeriodicReader::builder(metrics_exporter)
                .with_interval(std::time::Duration::from_secs(30))
                .build();
            let meter_provider = SdkMeterProvider::builder()
                .with_resource(resource())
                .with_reader(reader)
                .build();
            global::set_meter_provider(meter_provider);
        }
        Err(e) => eprintln!("Failed to build OTLP metric exporter: {}", e),
    }

    Some(provider.tracer(name.to_string()))
}

pub fn get_subscriber(name: String, env_filter: String) -> impl Subscriber + Send + Sync {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(env_filter));
    let telemetry = otlp_tracer(&name).map(|tracer| tracing_opentelemetry::layer().with_tracer(tracer));
    let formatting_layer = BunyanFormattingLayer::new(name, std::io::stdout);

    Registry::default()
        .with(env_filter)
        .with(JsonStorageLayer)
        .with(formatting_layer)
        .with(telemetry)
}

pub fn init_subscriber(subscriber: impl Subscriber + Send + Sync) {
    match LogTracer::init() {
        Ok(_) => (),
        Err(e) => eprintln!("Failed to set logger: {}", e),
    };
    set_global_default(subscriber).expect("Failed to set subscriber");
}
