//! Handing a trace to an AI assistant for summarization.
//!
//! The assistant receives a prompt and a list of attachments. A trace is
//! attached in its transformed form (see [`crate::transform`]), named after its
//! root span, and refused if it is too large to send.

use crate::domain::error::{Result, TracelensError};
use crate::otlp::{AnyValue, TracesData};
use crate::transform::{first_trace_id, transform};
use serde::{Deserialize, Serialize};

/// Prompt sent with a trace attachment unless configured otherwise.
pub const DEFAULT_PROMPT: &str = "Analyze this distributed trace from my OpenShift cluster and summarize: errors, services needing investigation and performance bottlenecks.";

/// Largest attachment accepted by default (1 MiB).
pub const DEFAULT_MAX_ATTACHMENT_BYTES: usize = 1024 * 1024;

/// `[assist]` section of the configuration file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AssistConfig {
    pub prompt: String,
    pub max_attachment_bytes: usize,
}

impl Default for AssistConfig {
    fn default() -> Self {
        Self {
            prompt: DEFAULT_PROMPT.to_string(),
            max_attachment_bytes: DEFAULT_MAX_ATTACHMENT_BYTES,
        }
    }
}

/// Display name of a trace: `"{service}: {root span name}"`.
///
/// Uses the first root span (one without a parent) whose resource has a
/// string `service.name` attribute. Falls back to `fallback`, typically the
/// trace id, when there is no such span.
///
/// # Example
///
/// ```
/// use tracelens::assist::trace_name;
/// use tracelens::otlp::TracesData;
///
/// let trace: TracesData = serde_json::from_value(serde_json::json!({
///     "resourceSpans": [{
///         "resource": {"attributes": [{"key": "service.name", "value": {"stringValue": "frontend"}}]},
///         "scopeSpans": [{"spans": [{"traceId": "t1", "spanId": "s1", "name": "GET /cart"}]}]
///     }]
/// }))?;
///
/// assert_eq!(trace_name(&trace, "t1"), "frontend: GET /cart");
/// assert_eq!(trace_name(&TracesData::default(), "t1"), "t1");
/// # Ok::<(), serde_json::Error>(())
/// ```
#[must_use]
pub fn trace_name(trace: &TracesData, fallback: &str) -> String {
    trace
        .resource_spans
        .iter()
        .find_map(|resource_spans| {
            let root = resource_spans
                .scope_spans
                .iter()
                .flat_map(|scope_spans| scope_spans.spans.iter())
                .find(|span| span.parent_span_id.as_deref().map_or(true, str::is_empty))?;

            let service = resource_spans
                .resource
                .as_ref()?
                .attributes
                .as_ref()?
                .iter()
                .find_map(|kv| match (&*kv.key, &kv.value) {
                    ("service.name", AnyValue::String(name)) => Some(name),
                    _ => None,
                })?;

            Some(format!("{service}: {}", root.name))
        })
        .unwrap_or_else(|| fallback.to_string())
}

/// Format of an attachment's `value`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum AttachmentType {
    Json,
}

/// A transformed trace, ready to be attached to an assistant request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TraceAttachment {
    pub attachment_type: AttachmentType,
    /// Always `"Trace"`.
    pub kind: String,
    pub name: String,
    /// Traces are not namespaced; always empty.
    pub namespace: String,
    /// Pretty-printed transformed trace.
    pub value: String,
}

impl TraceAttachment {
    /// Transforms, names and serializes `trace`.
    ///
    /// Returns `Ok(None)` if the trace is empty (see [`transform`]).
    ///
    /// # Errors
    ///
    /// - [`TracelensError::AttachmentTooLarge`] if the serialized trace is larger
    ///   than `config.max_attachment_bytes`
    /// - [`TracelensError::Json`] if serialization fails
    pub fn build(trace: &TracesData, config: &AssistConfig) -> Result<Option<Self>> {
        let _span = tracing::debug_span!("build_attachment").entered();

        let Some(transformed) = transform(trace) else {
            tracing::debug!("trace has no spans, nothing to attach");
            return Ok(None);
        };

        let value = serde_json::to_string_pretty(&transformed)?;
        if value.len() > config.max_attachment_bytes {
            return Err(TracelensError::AttachmentTooLarge {
                size: value.len(),
                max: config.max_attachment_bytes,
            });
        }

        let fallback = first_trace_id(trace).unwrap_or_default();
        let name = trace_name(trace, fallback);
        tracing::debug!(name = %name, bytes = value.len(), "built trace attachment");

        Ok(Some(Self {
            attachment_type: AttachmentType::Json,
            kind: "Trace".to_string(),
            name,
            namespace: String::new(),
            value,
        }))
    }
}

/// Prompt and attachments for one assistant request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SummaryRequest {
    pub prompt: String,
    pub attachments: Vec<TraceAttachment>,
}

impl SummaryRequest {
    /// A request summarizing `trace` with the configured prompt, or `Ok(None)`
    /// if the trace is empty.
    ///
    /// # Errors
    ///
    /// See [`TraceAttachment::build`].
    pub fn for_trace(trace: &TracesData, config: &AssistConfig) -> Result<Option<Self>> {
        Ok(TraceAttachment::build(trace, config)?.map(|attachment| Self {
            prompt: config.prompt.clone(),
            attachments: vec![attachment],
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample_trace() -> TracesData {
        serde_json::from_value(json!({
            "resourceSpans": [
                {
                    "resource": {"attributes": [{"key": "service.name", "value": {"stringValue": "db"}}]},
                    "scopeSpans": [{"spans": [{
                        "traceId": "t1", "spanId": "s2", "parentSpanId": "s1", "name": "SELECT",
                        "startTimeUnixNano": "1000000", "endTimeUnixNano": "2000000"
                    }]}]
                },
                {
                    "resource": {"attributes": [
                        {"key": "service.name", "value": {"intValue": "7"}},
                        {"key": "service.name", "value": {"stringValue": "frontend"}}
                    ]},
                    "scopeSpans": [{"spans": [{
                        "traceId": "t1", "spanId": "s1", "parentSpanId": "", "name": "GET /cart",
                        "startTimeUnixNano": "0", "endTimeUnixNano": "3000000"
                    }]}]
                }
            ]
        }))
        .unwrap()
    }

    #[test]
    fn test_trace_name_uses_root_span() {
        assert_eq!(trace_name(&sample_trace(), "t1"), "frontend: GET /cart");
    }

    #[test]
    fn test_trace_name_requires_string_service_name() {
        let trace: TracesData = serde_json::from_value(json!({
            "resourceSpans": [{
                "resource": {"attributes": [{"key": "service.name", "value": {"intValue": "1"}}]},
                "scopeSpans": [{"spans": [{"traceId": "t9", "spanId": "s1", "name": "root"}]}]
            }]
        }))
        .unwrap();
        assert_eq!(trace_name(&trace, "t9"), "t9");
    }

    #[test]
    fn test_attachment_fields() {
        let attachment = TraceAttachment::build(&sample_trace(), &AssistConfig::default())
            .unwrap()
            .unwrap();

        assert_eq!(attachment.kind, "Trace");
        assert_eq!(attachment.name, "frontend: GET /cart");
        assert!(attachment.namespace.is_empty());

        let value: serde_json::Value = serde_json::from_str(&attachment.value).unwrap();
        assert_eq!(value["traceId"], "t1");

        let json = serde_json::to_value(&attachment).unwrap();
        assert_eq!(json["attachmentType"], "JSON");
    }

    #[test]
    fn test_attachment_too_large() {
        let config = AssistConfig {
            max_attachment_bytes: 16,
            ..AssistConfig::default()
        };
        let err = TraceAttachment::build(&sample_trace(), &config).unwrap_err();
        assert!(matches!(err, TracelensError::AttachmentTooLarge { max: 16, .. }));
    }

    #[test]
    fn test_empty_trace_has_no_attachment() {
        let request = SummaryRequest::for_trace(&TracesData::default(), &AssistConfig::default()).unwrap();
        assert!(request.is_none());
    }

    #[test]
    fn test_summary_request_uses_configured_prompt() {
        let config = AssistConfig {
            prompt: "Why is checkout slow?".to_string(),
            ..AssistConfig::default()
        };
        let request = SummaryRequest::for_trace(&sample_trace(), &config).unwrap().unwrap();
        assert_eq!(request.prompt, "Why is checkout slow?");
        assert_eq!(request.attachments.len(), 1);
    }

    #[test]
    fn test_default_config() {
        let config = AssistConfig::default();
        assert_eq!(config.prompt, DEFAULT_PROMPT);
        assert_eq!(config.max_attachment_bytes, 1_048_576);
    }
}
