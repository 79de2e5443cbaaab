//! TraceQL → Filter.
//!
//! Decoding happens in two phases. The syntax tree is folded into a
//! [`MatcherIndex`], an insertion-ordered map from attribute path to every
//! `attribute op value` comparison found for it. The index is then mapped onto
//! the typed [`Filter`] fields; attributes the filter has no field for become
//! custom matchers.

use super::syntax::{parse, FieldExpr, SpansetExpr, Static, StaticKind};
use crate::domain::error::Result;
use crate::domain::filter::{DurationField, Filter, FilterField};

/// One comparison captured from the query, with operator and value exactly as
/// written.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Matcher<'a> {
    pub operator: &'a str,
    pub value: Static<'a>,
}

/// Comparisons grouped by attribute, in order of first appearance.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MatcherIndex<'a> {
    entries: Vec<(&'a str, Vec<Matcher<'a>>)>,
}

impl<'a> MatcherIndex<'a> {
    /// Returns the index with `matcher` appended to the matchers of `attribute`.
    #[must_use]
    pub fn with(mut self, attribute: &'a str, matcher: Matcher<'a>) -> Self {
        match self.entries.iter_mut().find(|(attr, _)| *attr == attribute) {
            Some((_, matchers)) => matchers.push(matcher),
            None => self.entries.push((attribute, vec![matcher])),
        }
        self
    }

    /// Matchers recorded for `attribute`, empty if there are none.
    #[must_use]
    pub fn get(&self, attribute: &str) -> &[Matcher<'a>] {
        self.entries
            .iter()
            .find(|(attr, _)| *attr == attribute)
            .map(|(_, matchers)| matchers.as_slice())
            .unwrap_or_default()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&'a str, &[Matcher<'a>])> + '_ {
        self.entries
            .iter()
            .map(|(attr, matchers)| (*attr, matchers.as_slice()))
    }

    /// Builds the index for a whole query.
    #[must_use]
    pub fn from_query(query: &SpansetExpr<'a>) -> Self {
        collect_spanset(query, Self::default())
    }
}

fn collect_spanset<'a>(expr: &SpansetExpr<'a>, index: MatcherIndex<'a>) -> MatcherIndex<'a> {
    match expr {
        SpansetExpr::Filter(filter) => match &filter.expr {
            Some(field_expr) => collect_field(field_expr, index),
            None => index,
        },
        SpansetExpr::Binary { lhs, rhs, .. } => collect_spanset(rhs, collect_spanset(lhs, index)),
    }
}

fn collect_field<'a>(expr: &FieldExpr<'a>, index: MatcherIndex<'a>) -> MatcherIndex<'a> {
    match expr {
        FieldExpr::Comparison { lhs, op, rhs } => match (lhs.as_ref(), rhs.as_ref()) {
            (FieldExpr::Field(field), FieldExpr::Static(value)) => index.with(
                field.text,
                Matcher {
                    operator: op.text,
                    value: *value,
                },
            ),
            _ => collect_field(rhs, collect_field(lhs, index)),
        },
        FieldExpr::Logical { lhs, rhs, .. } => collect_field(rhs, collect_field(lhs, index)),
        FieldExpr::Not(inner) | FieldExpr::Group(inner) => collect_field(inner, index),
        FieldExpr::Field(_) | FieldExpr::Static(_) => index,
    }
}

/// Parses a TraceQL query into a [`Filter`].
///
/// Comparisons on the filter's attributes are mapped back onto the typed
/// fields; comparisons on any other attribute are kept verbatim in
/// `custom_matchers`. Comparisons on a filter attribute that use an operator
/// the filter cannot express (for example `name != "x"`) are not represented
/// in the result and are reported at `debug` level.
///
/// An empty or whitespace-only query decodes to an empty filter.
///
/// # Errors
///
/// Returns [`crate::TracelensError::Query`] if the query is not valid TraceQL
/// in the supported subset.
///
/// # Example
///
/// ```
/// use tracelens::traceql;
///
/// let filter = traceql::decode(r#"{ name = "span\"name" && span.http.method="GET" }"#)?;
/// assert_eq!(filter.span_name, vec![r#"span"name"#]);
/// assert_eq!(filter.custom_matchers, vec![r#"span.http.method="GET""#]);
/// # Ok::<(), tracelens::TracelensError>(())
/// ```
pub fn decode(query: &str) -> Result<Filter> {
    if query.trim().is_empty() {
        return Ok(Filter::default());
    }

    let tree = parse(query)?;
    let index = MatcherIndex::from_query(&tree);

    Ok(Filter {
        service_name: reverse_string_matcher(FilterField::ServiceName, &index),
        span_name: reverse_string_matcher(FilterField::SpanName, &index),
        namespace: reverse_string_matcher(FilterField::Namespace, &index),
        status: reverse_intrinsic_matcher(FilterField::Status, &index),
        span_duration: reverse_duration_matcher(FilterField::SpanDuration, &index),
        trace_duration: reverse_duration_matcher(FilterField::TraceDuration, &index),
        custom_matchers: reverse_custom_matcher(&index),
    })
}

fn report_dropped(attribute: &str, matcher: &Matcher<'_>) {
    tracing::debug!(
        attribute = %attribute,
        operator = %matcher.operator,
        value = %matcher.value.text,
        "matcher cannot be represented in the filter, dropping"
    );
}

/// Strips the quotes of a string literal and unescapes `\"`.
fn unquote(value: &Static<'_>) -> Option<String> {
    if value.kind != StaticKind::String {
        return None;
    }
    let text = value.text;
    if let Some(raw) = text.strip_prefix('`').and_then(|t| t.strip_suffix('`')) {
        return Some(raw.to_string());
    }
    text.strip_prefix('"')
        .and_then(|t| t.strip_suffix('"'))
        .map(|inner| inner.replace("\\\"", "\""))
}

fn reverse_string_matcher(field: FilterField, index: &MatcherIndex<'_>) -> Vec<String> {
    let attribute = field.attribute();
    let mut values = Vec::new();
    for matcher in index.get(attribute) {
        match (matcher.operator, unquote(&matcher.value)) {
            ("=", Some(value)) => values.push(value),
            ("=~", Some(value)) => values.extend(value.split('|').map(String::from)),
            _ => report_dropped(attribute, matcher),
        }
    }
    values
}

fn reverse_intrinsic_matcher(field: FilterField, index: &MatcherIndex<'_>) -> Vec<String> {
    let attribute = field.attribute();
    let mut values = Vec::new();
    for matcher in index.get(attribute) {
        if matcher.operator == "=" {
            values.push(matcher.value.text.to_string());
        } else {
            report_dropped(attribute, matcher);
        }
    }
    values
}

fn reverse_duration_matcher(field: FilterField, index: &MatcherIndex<'_>) -> DurationField {
    let attribute = field.attribute();
    index
        .get(attribute)
        .iter()
        .fold(DurationField::default(), |mut duration, matcher| {
            match matcher.operator {
                ">=" => duration.min = Some(matcher.value.text.to_string()),
                "<=" => duration.max = Some(matcher.value.text.to_string()),
                _ => report_dropped(attribute, matcher),
            }
            duration
        })
}

fn reverse_custom_matcher(index: &MatcherIndex<'_>) -> Vec<String> {
    index
        .iter()
        .filter(|(attribute, _)| FilterField::from_attribute(attribute).is_none())
        .flat_map(|(attribute, matchers)| {
            matchers
                .iter()
                .map(move |m| format!("{attribute}{}{}", m.operator, m.value.text))
        })
        .collect()
}
