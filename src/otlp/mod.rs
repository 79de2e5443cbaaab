//! OTLP/JSON trace model.
//!
//! Mirrors the JSON encoding of `opentelemetry.proto.trace.v1.TracesData` as
//! returned by trace query backends. Only the fields the transformer reads are
//! modelled; unknown fields are ignored on input.
//!
//! The model is also serializable so spans recorded by this crate's own
//! exporter (see `observability`) can be written in the same shape and read
//! back.

use serde::{Deserialize, Deserializer, Serialize};

/// Top-level OTLP trace payload.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TracesData {
    #[serde(default)]
    pub resource_spans: Vec<ResourceSpans>,
}

/// Spans sharing one resource.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceSpans {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource: Option<Resource>,
    #[serde(default)]
    pub scope_spans: Vec<ScopeSpans>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Resource {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attributes: Option<Vec<KeyValue>>,
}

/// Spans emitted by one instrumentation scope.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScopeSpans {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scope: Option<InstrumentationScope>,
    #[serde(default)]
    pub spans: Vec<Span>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstrumentationScope {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

/// A single span.
///
/// Timestamps are kept as the decimal nanosecond strings of the wire format;
/// numeric timestamps are accepted and converted to strings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Span {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trace_id: Option<String>,
    #[serde(default)]
    pub span_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_span_id: Option<String>,
    #[serde(default)]
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<Enumeration>,
    #[serde(default, deserialize_with = "string_or_number")]
    pub start_time_unix_nano: String,
    #[serde(default, deserialize_with = "string_or_number")]
    pub end_time_unix_nano: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attributes: Option<Vec<KeyValue>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub events: Option<Vec<Event>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub links: Option<Vec<Link>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<Status>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Event {
    #[serde(default, deserialize_with = "string_or_number")]
    pub time_unix_nano: String,
    #[serde(default)]
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attributes: Option<Vec<KeyValue>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Link {
    #[serde(default)]
    pub trace_id: String,
    #[serde(default)]
    pub span_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attributes: Option<Vec<KeyValue>>,
}

/// Span status. `code` is `0` (unset), `1` (ok) or `2` (error), or the
/// `STATUS_CODE_*` name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Status {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<Enumeration>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl Status {
    /// Returns `true` if the status carries a non-zero code or a non-empty
    /// message.
    #[must_use]
    pub fn is_set(&self) -> bool {
        self.code.as_ref().is_some_and(Enumeration::is_set)
            || self.message.as_deref().is_some_and(|m| !m.is_empty())
    }
}

/// A protobuf enum value, encoded either as its number or its name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Enumeration {
    Code(i64),
    Name(String),
}

impl Enumeration {
    /// Returns `false` for the zero value and the empty name.
    #[must_use]
    pub fn is_set(&self) -> bool {
        match self {
            Self::Code(code) => *code != 0,
            Self::Name(name) => !name.is_empty(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KeyValue {
    pub key: String,
    #[serde(default)]
    pub value: AnyValue,
}

impl KeyValue {
    pub fn new(key: impl Into<String>, value: AnyValue) -> Self {
        Self {
            key: key.into(),
            value,
        }
    }
}

/// An attribute value.
///
/// On the wire this is an object with exactly one `*Value` member. Members are
/// checked in the order string, int, double, bool, array; anything else
/// (`kvlistValue`, `bytesValue`, an empty object) is [`AnyValue::Unknown`].
///
/// ```
/// use tracelens::otlp::AnyValue;
///
/// let value: AnyValue = serde_json::from_str(r#"{"intValue": "42"}"#)?;
/// assert_eq!(value, AnyValue::Int("42".to_string()));
///
/// let value: AnyValue = serde_json::from_str(r#"{"bytesValue": "AAE="}"#)?;
/// assert_eq!(value, AnyValue::Unknown);
/// # Ok::<(), serde_json::Error>(())
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "RawAnyValue", into = "RawAnyValue")]
pub enum AnyValue {
    String(String),
    /// Decimal integer, as a string to preserve 64-bit precision.
    Int(String),
    Double(f64),
    Bool(bool),
    Array(Vec<AnyValue>),
    #[default]
    Unknown,
}

impl From<&str> for AnyValue {
    fn from(value: &str) -> Self {
        Self::String(value.to_string())
    }
}

impl From<i64> for AnyValue {
    fn from(value: i64) -> Self {
        Self::Int(value.to_string())
    }
}

impl From<f64> for AnyValue {
    fn from(value: f64) -> Self {
        Self::Double(value)
    }
}

impl From<bool> for AnyValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

#[derive(Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawAnyValue {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    string_value: Option<String>,
    #[serde(
        default,
        deserialize_with = "optional_string_or_number",
        skip_serializing_if = "Option::is_none"
    )]
    int_value: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    double_value: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    bool_value: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    array_value: Option<RawArrayValue>,
}

#[derive(Default, Serialize, Deserialize)]
struct RawArrayValue {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    values: Option<Vec<AnyValue>>,
}

impl From<RawAnyValue> for AnyValue {
    fn from(raw: RawAnyValue) -> Self {
        if let Some(value) = raw.string_value {
            Self::String(value)
        } else if let Some(value) = raw.int_value {
            Self::Int(value)
        } else if let Some(value) = raw.double_value {
            Self::Double(value)
        } else if let Some(value) = raw.bool_value {
            Self::Bool(value)
        } else if let Some(array) = raw.array_value {
            Self::Array(array.values.unwrap_or_default())
        } else {
            Self::Unknown
        }
    }
}

impl From<AnyValue> for RawAnyValue {
    fn from(value: AnyValue) -> Self {
        match value {
            AnyValue::String(value) => Self {
                string_value: Some(value),
                ..Self::default()
            },
            AnyValue::Int(value) => Self {
                int_value: Some(value),
                ..Self::default()
            },
            AnyValue::Double(value) => Self {
                double_value: Some(value),
                ..Self::default()
            },
            AnyValue::Bool(value) => Self {
                bool_value: Some(value),
                ..Self::default()
            },
            AnyValue::Array(values) => Self {
                array_value: Some(RawArrayValue {
                    values: Some(values),
                }),
                ..Self::default()
            },
            AnyValue::Unknown => Self::default(),
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum StringOrNumber {
    String(String),
    Number(serde_json::Number),
}

impl From<StringOrNumber> for String {
    fn from(value: StringOrNumber) -> Self {
        match value {
            StringOrNumber::String(s) => s,
            StringOrNumber::Number(n) => n.to_string(),
        }
    }
}

fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    StringOrNumber::deserialize(deserializer).map(String::from)
}

fn optional_string_or_number<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Option::<StringOrNumber>::deserialize(deserializer).map(|value| value.map(String::from))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_minimal_span() {
        let span: Span = serde_json::from_value(json!({
            "traceId": "abc",
            "spanId": "01",
            "name": "GET /",
            "kind": 2,
            "startTimeUnixNano": "1000",
            "endTimeUnixNano": "2000",
        }))
        .unwrap();

        assert_eq!(span.trace_id.as_deref(), Some("abc"));
        assert_eq!(span.kind, Some(Enumeration::Code(2)));
        assert_eq!(span.start_time_unix_nano, "1000");
        assert!(span.attributes.is_none());
        assert!(span.status.is_none());
    }

    #[test]
    fn test_numeric_timestamps_become_strings() {
        let event: Event = serde_json::from_value(json!({
            "timeUnixNano": 1_700_000_000_000_000_000_u64,
            "name": "exception",
        }))
        .unwrap();
        assert_eq!(event.time_unix_nano, "1700000000000000000");
    }

    #[test]
    fn test_any_value_tag_precedence() {
        let value: AnyValue =
            serde_json::from_value(json!({"stringValue": "s", "intValue": "1"})).unwrap();
        assert_eq!(value, AnyValue::String("s".to_string()));
    }

    #[test]
    fn test_any_value_numeric_int() {
        let value: AnyValue = serde_json::from_value(json!({"intValue": 7})).unwrap();
        assert_eq!(value, AnyValue::Int("7".to_string()));
    }

    #[test]
    fn test_any_value_array_without_values() {
        let value: AnyValue = serde_json::from_value(json!({"arrayValue": {}})).unwrap();
        assert_eq!(value, AnyValue::Array(vec![]));
    }

    #[test]
    fn test_any_value_nested_array() {
        let value: AnyValue = serde_json::from_value(json!({
            "arrayValue": {"values": [{"boolValue": true}, {"kvlistValue": {"values": []}}]}
        }))
        .unwrap();
        assert_eq!(
            value,
            AnyValue::Array(vec![AnyValue::Bool(true), AnyValue::Unknown])
        );
    }

    #[test]
    fn test_any_value_serializes_single_member() {
        assert_eq!(
            serde_json::to_value(AnyValue::from(42_i64)).unwrap(),
            json!({"intValue": "42"})
        );
        assert_eq!(serde_json::to_value(AnyValue::Unknown).unwrap(), json!({}));
    }

    #[test]
    fn test_status_is_set() {
        let unset = Status {
            code: Some(Enumeration::Code(0)),
            message: Some(String::new()),
        };
        assert!(!unset.is_set());

        let named = Status {
            code: Some(Enumeration::Name("STATUS_CODE_ERROR".to_string())),
            message: None,
        };
        assert!(named.is_set());

        let message_only = Status {
            code: None,
            message: Some("timeout".to_string()),
        };
        assert!(message_only.is_set());
    }

    #[test]
    fn test_missing_collections_default_to_empty() {
        let data: TracesData = serde_json::from_str("{}").unwrap();
        assert!(data.resource_spans.is_empty());

        let data: TracesData =
            serde_json::from_str(r#"{"resourceSpans": [{"resource": {}}]}"#).unwrap();
        assert!(data.resource_spans[0].scope_spans.is_empty());
        assert_eq!(data.resource_spans[0].resource, Some(Resource { attributes: None }));
    }
}
