//! Logging and optional OTLP trace export.
//!
//! Logs always go to stdout. Spans are additionally exported over gRPC when
//! `OTEL_EXPORTER_OTLP_ENDPOINT` is set.

use anyhow::{Result, anyhow};
use base64::{Engine, engine::general_purpose};
use once_cell::sync::OnceCell;
use opentelemetry::propagation::TextMapCompositePropagator;
use opentelemetry::{KeyValue, global, trace::TracerProvider as _};
use opentelemetry_otlp::{Compression, WithExportConfig, WithTonicConfig};
use opentelemetry_sdk::{
    Resource,
    propagation::{BaggagePropagator, TraceContextPropagator},
    trace::{SdkTracerProvider, Tracer},
};
use std::{collections::HashMap, env::var, time::Duration};
use tonic::{
    metadata::{Ascii, Binary, MetadataKey, MetadataMap, MetadataValue},
    transport::ClientTlsConfig,
};
use tracing::{Level, debug};
use tracing_subscriber::{EnvFilter, Registry, fmt, layer::SubscriberExt};
use ulid::Ulid;

const ENV_ENDPOINT: &str = "OTEL_EXPORTER_OTLP_ENDPOINT";
const ENV_HEADERS: &str = "OTEL_EXPORTER_OTLP_HEADERS";
const ENV_PROTOCOL: &str = "OTEL_EXPORTER_OTLP_PROTOCOL";
const ENV_INSTANCE_ID: &str = "OTEL_SERVICE_INSTANCE_ID";

static TRACER_PROVIDER: OnceCell<SdkTracerProvider> = OnceCell::new();

/// Exporter settings read from the standard `OTEL_*` variables.
#[derive(Debug, Clone, PartialEq, Eq)]
struct ExporterSettings {
    endpoint: String,
    headers: HashMap<String, String>,
    instance_id: String,
}

impl ExporterSettings {
    fn from_env() -> Option<Self> {
        let endpoint = var(ENV_ENDPOINT).ok()?;
        if endpoint.trim().is_empty() {
            return None;
        }

        if let Ok(protocol) = var(ENV_PROTOCOL)
            && protocol != "grpc"
        {
            debug!("{ENV_PROTOCOL}='{protocol}' ignored, spans are exported over grpc");
        }

        Some(Self {
            endpoint: normalize_endpoint(endpoint.trim()),
            headers: var(ENV_HEADERS)
                .map(|raw| parse_headers(&raw))
                .unwrap_or_default(),
            instance_id: var(ENV_INSTANCE_ID).unwrap_or_else(|_| Ulid::new().to_string()),
        })
    }

    /// Host used for TLS server name verification, only for `https` endpoints.
    fn tls_domain(&self) -> Option<&str> {
        self.endpoint
            .strip_prefix("https://")
            .and_then(|rest| rest.split('/').next())
            .and_then(|authority| authority.split(':').next())
            .filter(|host| !host.is_empty())
    }
}

/// Parse `key=value` pairs separated by commas. Pairs without `=` are dropped.
fn parse_headers(raw: &str) -> HashMap<String, String> {
    raw.split(',')
        .filter_map(|pair| {
            let (key, value) = pair.split_once('=')?;
            let key = key.trim();
            (!key.is_empty()).then(|| (key.to_string(), value.trim().to_string()))
        })
        .collect()
}

// Keys ending in `-bin` carry base64 encoded binary values.
fn headers_to_metadata(headers: &HashMap<String, String>) -> Result<MetadataMap> {
    let mut metadata = MetadataMap::with_capacity(headers.len());

    for (name, value) in headers {
        let name = name.to_ascii_lowercase();

        if name.ends_with("-bin") {
            let bytes = general_purpose::STANDARD
                .decode(value.as_bytes())
                .map_err(|e| anyhow!("failed to base64-decode value for key {name}: {e}"))?;
            let key = MetadataKey::<Binary>::from_bytes(name.as_bytes())
                .map_err(|e| anyhow!("invalid binary metadata key {name}: {e}"))?;
            metadata.insert_bin(key, MetadataValue::from_bytes(&bytes));
        } else {
            let key = MetadataKey::<Ascii>::from_bytes(name.as_bytes())
                .map_err(|e| anyhow!("invalid metadata key {name}: {e}"))?;
            let value: MetadataValue<Ascii> = value
                .parse()
                .map_err(|e| anyhow!("invalid metadata value for key {name}: {e}"))?;
            metadata.insert(key, value);
        }
    }

    Ok(metadata)
}

fn normalize_endpoint(endpoint: &str) -> String {
    if endpoint.starts_with("http://") || endpoint.starts_with("https://") {
        endpoint.to_string()
    } else {
        format!("https://{}", endpoint.trim_end_matches('/'))
    }
}

fn init_tracer(settings: &ExporterSettings) -> Result<Tracer> {
    let mut builder = opentelemetry_otlp::SpanExporter::builder()
        .with_tonic()
        .with_endpoint(&settings.endpoint)
        .with_compression(Compression::Gzip)
        .with_timeout(Duration::from_secs(3));

    if let Some(domain) = settings.tls_domain() {
        builder = builder.with_tls_config(
            ClientTlsConfig::new()
                .domain_name(domain.to_string())
                .with_native_roots(),
        );
    }

    if !settings.headers.is_empty() {
        builder = builder.with_metadata(headers_to_metadata(&settings.headers)?);
    }

    let provider = SdkTracerProvider::builder()
        .with_batch_exporter(builder.build()?)
        .with_resource(
            Resource::builder_empty()
                .with_attributes(vec![
                    KeyValue::new("service.name", env!("CARGO_PKG_NAME")),
                    KeyValue::new("service.version", env!("CARGO_PKG_VERSION")),
                    KeyValue::new("service.instance.id", settings.instance_id.clone()),
                ])
                .build(),
        )
        .build();

    let _ = TRACER_PROVIDER.set(provider.clone());

    global::set_tracer_provider(provider.clone());
    global::set_text_map_propagator(TextMapCompositePropagator::new(vec![
        Box::new(TraceContextPropagator::new()),
        Box::new(BaggagePropagator::new()),
    ]));

    Ok(provider.tracer(env!("CARGO_PKG_NAME")))
}

/// Install the global subscriber. `RUST_LOG` overrides the verbosity level.
///
/// # Errors
///
/// Returns an error if the exporter cannot be built or a subscriber is already set.
pub fn init(verbosity_level: Option<Level>) -> Result<()> {
    let verbosity_level = verbosity_level.unwrap_or(Level::ERROR);

    let fmt_layer = fmt::layer()
        .with_file(false)
        .with_line_number(false)
        .with_thread_ids(false)
        .with_target(false);

    let filter = EnvFilter::builder()
        .with_default_directive(verbosity_level.into())
        .from_env_lossy()
        .add_directive("hyper=error".parse()?)
        .add_directive("tokio=error".parse()?)
        .add_directive("sqlx=warn".parse()?)
        .add_directive("opentelemetry_sdk=warn".parse()?);

    if let Some(settings) = ExporterSettings::from_env() {
        let tracer = init_tracer(&settings)?;
        let subscriber = Registry::default()
            .with(fmt_layer)
            .with(tracing_opentelemetry::layer().with_tracer(tracer))
            .with(filter);
        tracing::subscriber::set_global_default(subscriber)?;
    } else {
        let subscriber = Registry::default().with(fmt_layer).with(filter);
        tracing::subscriber::set_global_default(subscriber)?;
    }

    Ok(())
}

/// Flush and stop the span exporter, if one was started.
pub fn shutdown_tracer() {
    if let Some(provider) = TRACER_PROVIDER.get() {
        debug!("shutting down tracer provider");
        if let Err(err) = provider.shutdown() {
            debug!("tracer provider shutdown failed: {err}");
        }
    }
}
