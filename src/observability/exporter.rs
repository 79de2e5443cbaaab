//! File-backed OpenTelemetry span exporter.
//!
//! Each exported batch is converted into an [`otlp::TracesData`] document and
//! appended to the trace file as one JSON line, so the file can be fed back
//! into `tracelens transform` one line at a time.

use crate::otlp::{self, AnyValue, Enumeration, InstrumentationScope, ResourceSpans, ScopeSpans};
use futures_util::future::BoxFuture;
use opentelemetry::trace::{SpanId, SpanKind, Status, TraceError};
use opentelemetry::{Array, Value};
use opentelemetry_sdk::export::trace::{ExportResult, SpanData, SpanExporter};
use opentelemetry_sdk::resource::Resource;
use opentelemetry_sdk::trace::TracerProvider;
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};

/// Instrumentation scope name recorded on exported spans.
pub const SCOPE_NAME: &str = "tracelens";

/// Span exporter appending OTLP/JSON lines to a file.
#[derive(Debug)]
pub struct FileSpanExporter {
    file: File,
    resource: Resource,
    is_shutdown: bool,
}

impl FileSpanExporter {
    /// Opens (or creates) `path` for appending.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be opened.
    pub fn new(path: &Path, resource: Resource) -> std::io::Result<Self> {
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(Self {
            file,
            resource,
            is_shutdown: false,
        })
    }

    fn write_batch(&mut self, batch: &[SpanData]) -> std::io::Result<()> {
        let document = to_traces_data(&self.resource, batch);
        let line = serde_json::to_string(&document)?;
        writeln!(self.file, "{line}")?;
        self.file.flush()
    }
}

impl SpanExporter for FileSpanExporter {
    fn export(&mut self, batch: Vec<SpanData>) -> BoxFuture<'static, ExportResult> {
        if self.is_shutdown {
            return Box::pin(std::future::ready(Err(TraceError::from(
                "exporter is shut down",
            ))));
        }

        let result = self
            .write_batch(&batch)
            .map_err(|e| TraceError::from(e.to_string()));
        Box::pin(std::future::ready(result))
    }

    fn shutdown(&mut self) {
        self.is_shutdown = true;
    }

    fn set_resource(&mut self, resource: &Resource) {
        self.resource = resource.clone();
    }
}

/// Builds a tracer provider exporting every finished span to `path`.
///
/// # Errors
///
/// Returns an error if the trace file cannot be opened.
pub fn create_tracer_provider(path: &Path, resource: Resource) -> std::io::Result<TracerProvider> {
    let exporter = FileSpanExporter::new(path, resource.clone())?;

    Ok(TracerProvider::builder()
        .with_config(opentelemetry_sdk::trace::Config::default().with_resource(resource))
        .with_simple_exporter(exporter)
        .build())
}

/// Converts a batch of SDK spans into one OTLP document.
#[must_use]
pub fn to_traces_data(resource: &Resource, batch: &[SpanData]) -> otlp::TracesData {
    let attributes = resource
        .iter()
        .map(|(key, value)| otlp::KeyValue::new(key.as_str(), any_value(value)))
        .collect();

    otlp::TracesData {
        resource_spans: vec![ResourceSpans {
            resource: Some(otlp::Resource {
                attributes: Some(attributes),
            }),
            scope_spans: vec![ScopeSpans {
                scope: Some(InstrumentationScope {
                    name: Some(SCOPE_NAME.to_string()),
                }),
                spans: batch.iter().map(span).collect(),
            }],
        }],
    }
}

fn unix_nanos(time: SystemTime) -> String {
    time.duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_nanos()
        .to_string()
}

fn key_values(attributes: &[opentelemetry::KeyValue]) -> Vec<otlp::KeyValue> {
    attributes
        .iter()
        .map(|kv| otlp::KeyValue::new(kv.key.as_str(), any_value(&kv.value)))
        .collect()
}

#[allow(unreachable_patterns)]
fn any_value(value: &Value) -> AnyValue {
    match value {
        Value::Bool(b) => AnyValue::Bool(*b),
        Value::I64(i) => AnyValue::from(*i),
        Value::F64(f) => AnyValue::Double(*f),
        Value::String(s) => AnyValue::String(s.to_string()),
        Value::Array(array) => AnyValue::Array(array_values(array)),
        other => AnyValue::String(other.to_string()),
    }
}

#[allow(unreachable_patterns)]
fn array_values(array: &Array) -> Vec<AnyValue> {
    match array {
        Array::Bool(values) => values.iter().map(|b| AnyValue::Bool(*b)).collect(),
        Array::I64(values) => values.iter().map(|i| AnyValue::from(*i)).collect(),
        Array::F64(values) => values.iter().map(|f| AnyValue::Double(*f)).collect(),
        Array::String(values) => values
            .iter()
            .map(|s| AnyValue::String(s.to_string()))
            .collect(),
        _ => Vec::new(),
    }
}

const fn span_kind(kind: &SpanKind) -> i64 {
    match kind {
        SpanKind::Internal => 1,
        SpanKind::Server => 2,
        SpanKind::Client => 3,
        SpanKind::Producer => 4,
        SpanKind::Consumer => 5,
    }
}

fn status(status: &Status) -> Option<otlp::Status> {
    match status {
        Status::Unset => None,
        Status::Ok => Some(otlp::Status {
            code: Some(Enumeration::Code(1)),
            message: None,
        }),
        Status::Error { description } => Some(otlp::Status {
            code: Some(Enumeration::Code(2)),
            message: Some(description.to_string()).filter(|m| !m.is_empty()),
        }),
    }
}

fn span(data: &SpanData) -> otlp::Span {
    let parent_span_id = (data.parent_span_id != SpanId::INVALID)
        .then(|| format!("{:016x}", data.parent_span_id));

    otlp::Span {
        trace_id: Some(format!("{:032x}", data.span_context.trace_id())),
        span_id: format!("{:016x}", data.span_context.span_id()),
        parent_span_id,
        name: data.name.to_string(),
        kind: Some(Enumeration::Code(span_kind(&data.span_kind))),
        start_time_unix_nano: unix_nanos(data.start_time),
        end_time_unix_nano: unix_nanos(data.end_time),
        attributes: Some(key_values(&data.attributes)),
        events: Some(
            data.events
                .iter()
                .map(|event| otlp::Event {
                    time_unix_nano: unix_nanos(event.timestamp),
                    name: event.name.to_string(),
                    attributes: Some(key_values(&event.attributes)),
                })
                .collect(),
        ),
        links: Some(
            data.links
                .iter()
                .map(|link| otlp::Link {
                    trace_id: format!("{:032x}", link.span_context.trace_id()),
                    span_id: format!("{:016x}", link.span_context.span_id()),
                    attributes: Some(key_values(&link.attributes)),
                })
                .collect(),
        ),
        status: status(&data.status),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use opentelemetry::trace::{Span as _, Tracer as _, TracerProvider as _};
    use opentelemetry::KeyValue;

    #[test]
    fn test_exported_spans_read_back_as_otlp() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("spans.jsonl");
        let resource = Resource::new(vec![KeyValue::new("service.name", "tracelens")]);

        let provider = create_tracer_provider(&path, resource).unwrap();
        let tracer = provider.tracer(SCOPE_NAME);
        let mut span = tracer.start("decode");
        span.set_attribute(KeyValue::new("query.len", 12_i64));
        span.set_status(Status::error("syntax error"));
        span.end();
        drop(provider);

        let contents = std::fs::read_to_string(&path).unwrap();
        let line = contents.lines().next().unwrap();
        let data: otlp::TracesData = serde_json::from_str(line).unwrap();

        let resource_spans = &data.resource_spans[0];
        let service = &resource_spans.resource.as_ref().unwrap().attributes.as_ref().unwrap()[0];
        assert_eq!(service.key, "service.name");
        assert_eq!(service.value, AnyValue::String("tracelens".to_string()));

        let exported = &resource_spans.scope_spans[0].spans[0];
        assert_eq!(exported.name, "decode");
        assert_eq!(exported.parent_span_id, None);
        assert_eq!(exported.trace_id.as_ref().map(String::len), Some(32));
        assert_eq!(
            exported.attributes.as_ref().unwrap()[0],
            otlp::KeyValue::new("query.len", AnyValue::Int("12".to_string()))
        );
        assert_eq!(
            exported.status,
            Some(otlp::Status {
                code: Some(Enumeration::Code(2)),
                message: Some("syntax error".to_string()),
            })
        );
    }

    #[test]
    fn test_exported_trace_transforms() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("spans.jsonl");

        let provider = create_tracer_provider(&path, Resource::empty()).unwrap();
        provider.tracer(SCOPE_NAME).in_span("transform", |_cx| {});
        drop(provider);

        let contents = std::fs::read_to_string(&path).unwrap();
        let data: otlp::TracesData = serde_json::from_str(contents.lines().next().unwrap()).unwrap();
        let transformed = crate::transform::transform(&data).unwrap();
        assert_eq!(transformed.resource_spans[0].scope_spans[0].spans[0].name, "transform");
    }

    #[test]
    fn test_array_values() {
        let value = Value::Array(Array::I64(vec![1, 2]));
        assert_eq!(
            any_value(&value),
            AnyValue::Array(vec![AnyValue::Int("1".to_string()), AnyValue::Int("2".to_string())])
        );
    }
}
