//! Filter → TraceQL.

use crate::domain::filter::{DurationField, Filter, FilterField};

/// Renders a [`Filter`] as a TraceQL spanset filter.
///
/// Clauses are emitted in a fixed order (service name, span name, namespace,
/// status, span duration, trace duration, custom matchers) and joined with
/// `&&`. An empty filter renders as `{}`.
///
/// Multiple values of a string attribute become one regex alternation. The
/// values are not regex-escaped, so a value containing `|` is split again when
/// the query is decoded.
///
/// # Example
///
/// ```
/// use tracelens::{traceql, Filter};
///
/// let filter = Filter {
///     service_name: vec!["service1".to_string(), "service2".to_string()],
///     status: vec!["error".to_string()],
///     ..Filter::default()
/// };
///
/// assert_eq!(
///     traceql::encode(&filter),
///     r#"{ resource.service.name =~ "service1|service2" && status = error }"#
/// );
/// ```
#[must_use]
pub fn encode(filter: &Filter) -> String {
    let matchers: Vec<String> = [
        string_matcher(FilterField::ServiceName.attribute(), &filter.service_name),
        string_matcher(FilterField::SpanName.attribute(), &filter.span_name),
        string_matcher(FilterField::Namespace.attribute(), &filter.namespace),
        intrinsic_matcher(FilterField::Status.attribute(), &filter.status),
        duration_matcher(FilterField::SpanDuration.attribute(), &filter.span_duration),
        duration_matcher(FilterField::TraceDuration.attribute(), &filter.trace_duration),
        filter.custom_matchers.clone(),
    ]
    .into_iter()
    .flatten()
    .collect();

    if matchers.is_empty() {
        return "{}".to_string();
    }
    format!("{{ {} }}", matchers.join(" && "))
}

/// Escapes double quotes for use inside a TraceQL string literal.
fn escape(value: &str) -> String {
    value.replace('"', "\\\"")
}

fn string_matcher(attribute: &str, values: &[String]) -> Vec<String> {
    match values {
        [] => vec![],
        [value] => vec![format!("{attribute} = \"{}\"", escape(value))],
        _ => {
            let alternation: Vec<String> = values.iter().map(|v| escape(v)).collect();
            vec![format!("{attribute} =~ \"{}\"", alternation.join("|"))]
        }
    }
}

fn intrinsic_matcher(attribute: &str, values: &[String]) -> Vec<String> {
    let conditions: Vec<String> = values
        .iter()
        .map(|value| format!("{attribute} = {value}"))
        .collect();

    match conditions.len() {
        0 => vec![],
        1 => conditions,
        _ => vec![format!("({})", conditions.join(" || "))],
    }
}

fn duration_matcher(attribute: &str, value: &DurationField) -> Vec<String> {
    let non_empty = |bound: &Option<String>| bound.clone().filter(|b| !b.is_empty());

    let mut matchers = Vec::new();
    if let Some(min) = non_empty(&value.min) {
        matchers.push(format!("{attribute} >= {min}"));
    }
    if let Some(max) = non_empty(&value.max) {
        matchers.push(format!("{attribute} <= {max}"));
    }
    matchers
}
