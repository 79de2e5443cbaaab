//! Output types of [`transform`](super::transform).
//!
//! Same tree shape as the OTLP input with attributes flattened to objects and
//! a computed `durationMs` on every span. Optional members are omitted from the
//! JSON when absent.

use super::attributes::Attributes;
use crate::otlp::{Enumeration, Status};
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TransformedTrace {
    pub trace_id: String,
    pub resource_spans: Vec<TransformedResourceSpans>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TransformedResourceSpans {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attributes: Option<Attributes>,
    pub scope_spans: Vec<TransformedScopeSpans>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TransformedScopeSpans {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scope: Option<TransformedScope>,
    pub spans: Vec<TransformedSpan>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TransformedScope {
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TransformedSpan {
    pub span_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_span_id: Option<String>,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kind: Option<Enumeration>,
    pub start_time_unix_nano: String,
    pub end_time_unix_nano: String,
    /// Span duration in milliseconds, rounded to three decimals. `NaN`
    /// (serialized as `null`) if a timestamp does not parse.
    pub duration_ms: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attributes: Option<Attributes>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub events: Option<Vec<TransformedEvent>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub links: Option<Vec<TransformedLink>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<Status>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TransformedEvent {
    pub name: String,
    pub time_unix_nano: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attributes: Option<Attributes>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TransformedLink {
    pub trace_id: String,
    pub span_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attributes: Option<Attributes>,
}
