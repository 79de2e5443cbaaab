//! Logging and self-tracing.
//!
//! Log events are written to stderr. Optionally, the tool's own spans are
//! exported through OpenTelemetry to a local file in OTLP/JSON format:
//!
//! ```text
//! tracing → tracing-opentelemetry → OpenTelemetry SDK → FileSpanExporter → JSON lines
//! ```
//!
//! Each line of the trace file is a complete `TracesData` document, readable
//! with [`crate::otlp`] and accepted by `tracelens transform`.
//!
//! # Configuration
//!
//! Verbosity is controlled via:
//! 1. `RUST_LOG` environment variable (highest priority)
//! 2. `log_level` in the configuration file or `--log-level`
//! 3. Default: `"info"`
//!
//! Span export is enabled by `trace_file` / `--trace-file`.

mod exporter;
mod init;

pub use exporter::{create_tracer_provider, to_traces_data, FileSpanExporter, SCOPE_NAME};
pub use init::{init_tracing, TracingGuard};
