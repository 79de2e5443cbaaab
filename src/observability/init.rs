//! Tracing initialization and subscriber setup.

use super::exporter::{create_tracer_provider, SCOPE_NAME};
use crate::domain::error::Result;
use crate::Config;
use opentelemetry::trace::TracerProvider as _;
use opentelemetry_sdk::resource::Resource;
use opentelemetry_sdk::trace::TracerProvider;
use tracing_opentelemetry::OpenTelemetryLayer;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Keeps span export alive; shuts the tracer provider down when dropped.
#[derive(Debug, Default)]
#[must_use = "dropping the guard stops span export"]
pub struct TracingGuard {
    provider: Option<TracerProvider>,
}

impl Drop for TracingGuard {
    fn drop(&mut self) {
        if let Some(provider) = self.provider.take() {
            if let Err(e) = provider.shutdown() {
                eprintln!("tracelens: failed to shut down span export: {e}");
            }
        }
    }
}

/// Resolves the log filter: `RUST_LOG`, then `config.log_level`, then `"info"`.
fn env_filter(config: &Config) -> EnvFilter {
    EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.log_level.as_deref().unwrap_or("info")))
}

/// Installs the global tracing subscriber.
///
/// Log events go to stderr through a `fmt` layer. When `config.trace_file` is
/// set, spans are additionally exported as OTLP/JSON lines to that file.
///
/// Calling this more than once keeps the first subscriber.
///
/// # Errors
///
/// Returns an error if the trace file cannot be opened.
///
/// # Example
///
/// ```no_run
/// use tracelens::observability::init_tracing;
/// use tracelens::Config;
///
/// let config = Config {
///     log_level: Some("debug".to_string()),
///     ..Config::default()
/// };
///
/// let _guard = init_tracing(&config)?;
/// tracing::debug!("tracing is now active");
/// # Ok::<(), tracelens::TracelensError>(())
/// ```
pub fn init_tracing(config: &Config) -> Result<TracingGuard> {
    let provider = match &config.trace_file {
        Some(path) => {
            let resource = Resource::new(vec![
                opentelemetry::KeyValue::new("service.name", "tracelens"),
                opentelemetry::KeyValue::new("service.version", env!("CARGO_PKG_VERSION")),
            ]);
            Some(create_tracer_provider(path, resource)?)
        }
        None => None,
    };

    let otel_layer = provider
        .as_ref()
        .map(|provider| OpenTelemetryLayer::new(provider.tracer(SCOPE_NAME)));

    let subscriber = tracing_subscriber::registry()
        .with(env_filter(config))
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(otel_layer);

    if subscriber.try_init().is_err() {
        tracing::debug!("tracing subscriber already installed");
    }

    Ok(TracingGuard { provider })
}
