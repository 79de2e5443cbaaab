//! Filter model for the trace search toolbar.
//!
//! A [`Filter`] is the structured view of a TraceQL query that the toolbar edits:
//! a handful of commonly used attributes with multi-value selection, duration
//! bounds, and a list of verbatim matchers for everything else. Conversion to and
//! from TraceQL lives in [`crate::traceql`].

use serde::{Deserialize, Serialize};

/// Values accepted by the `status` intrinsic.
pub const STATUS_VALUES: [&str; 3] = ["unset", "ok", "error"];

/// Structured model of a toolbar which filters for common tracing attributes.
///
/// Every typed field is OR-matched within itself and AND-ed with the other
/// fields. Value order is preserved for deterministic encoding but carries no
/// meaning.
///
/// Serialized with camelCase field names, matching the shape used by the
/// console front-end:
///
/// ```json
/// {
///   "serviceName": ["frontend"],
///   "spanName": [],
///   "namespace": [],
///   "status": ["error"],
///   "spanDuration": { "min": "100ms" },
///   "traceDuration": {},
///   "customMatchers": ["span.http.method=\"GET\""]
/// }
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Filter {
    /// Service names (`resource.service.name`).
    pub service_name: Vec<String>,
    /// Span names (`name`).
    pub span_name: Vec<String>,
    /// Kubernetes namespaces (`resource.k8s.namespace.name`).
    pub namespace: Vec<String>,
    /// Span status keywords, see [`STATUS_VALUES`].
    pub status: Vec<String>,
    /// Bounds on the span duration.
    pub span_duration: DurationField,
    /// Bounds on the whole-trace duration.
    pub trace_duration: DurationField,
    /// Matchers the typed fields cannot represent, kept verbatim.
    pub custom_matchers: Vec<String>,
}

/// Inclusive lower and upper bounds for a duration attribute.
///
/// Both bounds are TraceQL duration literals such as `"100ms"` or `"2s"`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DurationField {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max: Option<String>,
}

impl DurationField {
    /// A field with only a lower bound.
    #[must_use]
    pub fn at_least(min: impl Into<String>) -> Self {
        Self {
            min: Some(min.into()),
            max: None,
        }
    }

    /// A field with only an upper bound.
    #[must_use]
    pub fn at_most(max: impl Into<String>) -> Self {
        Self {
            min: None,
            max: Some(max.into()),
        }
    }

    /// A field with both bounds.
    #[must_use]
    pub fn between(min: impl Into<String>, max: impl Into<String>) -> Self {
        Self {
            min: Some(min.into()),
            max: Some(max.into()),
        }
    }

    /// Returns `true` if neither bound is set to a non-empty literal.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.min.as_deref().map_or(true, str::is_empty) && self.max.as_deref().map_or(true, str::is_empty)
    }
}

/// The typed fields of a [`Filter`].
///
/// Used to address one field at a time, e.g. when looking up the candidate
/// values of a field under the constraints of all the other fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FilterField {
    ServiceName,
    SpanName,
    Namespace,
    Status,
    SpanDuration,
    TraceDuration,
}

impl FilterField {
    /// All typed fields, in encoding order.
    pub const ALL: [Self; 6] = [
        Self::ServiceName,
        Self::SpanName,
        Self::Namespace,
        Self::Status,
        Self::SpanDuration,
        Self::TraceDuration,
    ];

    /// The TraceQL attribute or intrinsic this field maps to.
    ///
    /// ```
    /// use tracelens::FilterField;
    ///
    /// assert_eq!(FilterField::ServiceName.attribute(), "resource.service.name");
    /// assert_eq!(FilterField::TraceDuration.attribute(), "traceDuration");
    /// ```
    #[must_use]
    pub const fn attribute(self) -> &'static str {
        match self {
            Self::ServiceName => "resource.service.name",
            Self::SpanName => "name",
            Self::Namespace => "resource.k8s.namespace.name",
            Self::Status => "status",
            Self::SpanDuration => "duration",
            Self::TraceDuration => "traceDuration",
        }
    }

    /// Looks up the field mapped to a TraceQL attribute path.
    #[must_use]
    pub fn from_attribute(attribute: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|field| field.attribute() == attribute)
    }
}

impl Filter {
    /// Returns `true` if the filter constrains nothing.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.service_name.is_empty()
            && self.span_name.is_empty()
            && self.namespace.is_empty()
            && self.status.is_empty()
            && self.span_duration.is_empty()
            && self.trace_duration.is_empty()
            && self.custom_matchers.is_empty()
    }

    /// Returns a copy of the filter with one typed field cleared.
    ///
    /// # Example
    ///
    /// ```
    /// use tracelens::{Filter, FilterField};
    ///
    /// let filter = Filter {
    ///     service_name: vec!["frontend".to_string()],
    ///     status: vec!["error".to_string()],
    ///     ..Filter::default()
    /// };
    ///
    /// let scoped = filter.without(FilterField::ServiceName);
    /// assert!(scoped.service_name.is_empty());
    /// assert_eq!(scoped.status, vec!["error"]);
    /// ```
    #[must_use]
    pub fn without(&self, field: FilterField) -> Self {
        let mut filter = self.clone();
        match field {
            FilterField::ServiceName => filter.service_name.clear(),
            FilterField::SpanName => filter.span_name.clear(),
            FilterField::Namespace => filter.namespace.clear(),
            FilterField::Status => filter.status.clear(),
            FilterField::SpanDuration => filter.span_duration = DurationField::default(),
            FilterField::TraceDuration => filter.trace_duration = DurationField::default(),
        }
        filter
    }
}

/// Splits a string on spaces, except when inside double quotes.
///
/// A quote preceded by a backslash does not open or close a quoted segment.
/// Empty chunks (from repeated spaces) are dropped. Used to turn the free-text
/// "custom matchers" input into individual matchers.
///
/// ```
/// use tracelens::split_by_unquoted_whitespace;
///
/// assert_eq!(
///     split_by_unquoted_whitespace(r#"key=value   key3="string value""#),
///     vec!["key=value", r#"key3="string value""#],
/// );
/// ```
#[must_use]
pub fn split_by_unquoted_whitespace(input: &str) -> Vec<String> {
    let bytes = input.as_bytes();
    let mut quoted = false;
    let mut from = 0;
    let mut chunks = Vec::new();

    for (i, &byte) in bytes.iter().enumerate() {
        if byte == b'"' && (i == 0 || bytes[i - 1] != b'\\') {
            quoted = !quoted;
        } else if byte == b' ' && !quoted {
            chunks.push(&input[from..i]);
            from = i + 1;
        }
    }
    chunks.push(&input[from..]);

    chunks
        .into_iter()
        .filter(|chunk| !chunk.is_empty())
        .map(String::from)
        .collect()
}
