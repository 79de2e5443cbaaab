//! OTLP trace → compact, model-friendly JSON.
//!
//! OTLP/JSON spends most of its bytes on attribute envelopes
//! (`{"key": "k", "value": {"stringValue": "v"}}`). [`transform`] flattens
//! those to plain objects, drops empty optional members and adds a
//! `durationMs` to every span, which makes a trace much cheaper to hand to a
//! language model for summarization.
//!
//! # Example
//!
//! ```
//! use tracelens::otlp::TracesData;
//! use tracelens::transform::transform;
//!
//! let trace: TracesData = serde_json::from_value(serde_json::json!({
//!     "resourceSpans": [{
//!         "resource": {
//!             "attributes": [{"key": "service.name", "value": {"stringValue": "frontend"}}]
//!         },
//!         "scopeSpans": [{
//!             "spans": [{
//!                 "traceId": "5b8efff798038103d269b633813fc60c",
//!                 "spanId": "eee19b7ec3c1b174",
//!                 "name": "GET /",
//!                 "kind": 2,
//!                 "startTimeUnixNano": "1000000",
//!                 "endTimeUnixNano": "2500000"
//!             }]
//!         }]
//!     }]
//! }))?;
//!
//! let transformed = transform(&trace).expect("trace has spans");
//! let json = serde_json::to_value(&transformed)?;
//! assert_eq!(json["resourceSpans"][0]["attributes"]["service.name"], "frontend");
//! assert_eq!(json["resourceSpans"][0]["scopeSpans"][0]["spans"][0]["durationMs"], 1.5);
//! # Ok::<(), serde_json::Error>(())
//! ```

mod attributes;
mod model;

pub use attributes::{parse_int_prefix, AttributeValue, Attributes};
pub use model::{
    TransformedEvent, TransformedLink, TransformedResourceSpans, TransformedScope,
    TransformedScopeSpans, TransformedSpan, TransformedTrace,
};

use crate::otlp::{Event, KeyValue, Link, ResourceSpans, ScopeSpans, Span, TracesData};

/// Returns the trace id of the first span of the first scope of the first
/// resource, if it is present and non-empty.
#[must_use]
pub fn first_trace_id(trace: &TracesData) -> Option<&str> {
    trace
        .resource_spans
        .first()?
        .scope_spans
        .first()?
        .spans
        .first()?
        .trace_id
        .as_deref()
        .filter(|id| !id.is_empty())
}

/// Converts an OTLP trace into its compact form.
///
/// Returns `None` if the trace has no first span or that span has no trace
/// id. The trace id of the result is taken from that first span.
#[must_use]
pub fn transform(trace: &TracesData) -> Option<TransformedTrace> {
    let trace_id = first_trace_id(trace)?;
    Some(TransformedTrace {
        trace_id: trace_id.to_string(),
        resource_spans: trace.resource_spans.iter().map(transform_resource_spans).collect(),
    })
}

fn transform_attributes(attributes: Option<&Vec<KeyValue>>) -> Option<Attributes> {
    attributes.map(|list| list.iter().collect())
}

fn transform_resource_spans(resource_spans: &ResourceSpans) -> TransformedResourceSpans {
    TransformedResourceSpans {
        attributes: transform_attributes(
            resource_spans
                .resource
                .as_ref()
                .and_then(|r| r.attributes.as_ref()),
        ),
        scope_spans: resource_spans.scope_spans.iter().map(transform_scope_spans).collect(),
    }
}

fn transform_scope_spans(scope_spans: &ScopeSpans) -> TransformedScopeSpans {
    let scope = scope_spans
        .scope
        .as_ref()
        .and_then(|s| s.name.as_deref())
        .filter(|name| !name.is_empty())
        .map(|name| TransformedScope {
            name: name.to_string(),
        });

    TransformedScopeSpans {
        scope,
        spans: scope_spans.spans.iter().map(transform_span).collect(),
    }
}

/// Milliseconds between two nanosecond timestamps, rounded half up to three
/// decimals.
///
/// ```
/// use tracelens::transform::duration_ms;
///
/// assert_eq!(duration_ms("1000000", "2500000"), 1.5);
/// assert_eq!(duration_ms("0", "1234567"), 1.235);
/// assert!(duration_ms("", "1").is_nan());
/// ```
#[must_use]
pub fn duration_ms(start_unix_nano: &str, end_unix_nano: &str) -> f64 {
    let start_ms = parse_int_prefix(start_unix_nano) * 1e-6;
    let end_ms = parse_int_prefix(end_unix_nano) * 1e-6;
    ((end_ms - start_ms) * 1000.0 + 0.5).floor() / 1000.0
}

fn transform_span(span: &Span) -> TransformedSpan {
    TransformedSpan {
        span_id: span.span_id.clone(),
        parent_span_id: span.parent_span_id.clone().filter(|id| !id.is_empty()),
        name: span.name.clone(),
        kind: span.kind.clone(),
        start_time_unix_nano: span.start_time_unix_nano.clone(),
        end_time_unix_nano: span.end_time_unix_nano.clone(),
        duration_ms: duration_ms(&span.start_time_unix_nano, &span.end_time_unix_nano),
        attributes: transform_attributes(span.attributes.as_ref()),
        events: span
            .events
            .as_ref()
            .map(|events| events.iter().map(transform_event).collect()),
        links: span
            .links
            .as_ref()
            .map(|links| links.iter().map(transform_link).collect()),
        status: span.status.clone().filter(crate::otlp::Status::is_set),
    }
}

fn transform_event(event: &Event) -> TransformedEvent {
    TransformedEvent {
        name: event.name.clone(),
        time_unix_nano: event.time_unix_nano.clone(),
        attributes: transform_attributes(event.attributes.as_ref()),
    }
}

fn transform_link(link: &Link) -> TransformedLink {
    TransformedLink {
        trace_id: link.trace_id.clone(),
        span_id: link.span_id.clone(),
        attributes: transform_attributes(link.attributes.as_ref()),
    }
}
