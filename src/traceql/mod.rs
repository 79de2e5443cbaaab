//! Conversion between [`Filter`](crate::Filter) and TraceQL.
//!
//! The toolbar edits a [`Filter`](crate::Filter); the query backend speaks
//! TraceQL. [`encode`] renders a filter as a single spanset filter and
//! [`decode`] recovers a filter from a query, keeping everything the typed
//! fields cannot represent as verbatim custom matchers.
//!
//! # Modules
//!
//! - [`lexer`]: tokenizer producing byte-ranged tokens
//! - [`syntax`]: syntax tree and parser for the supported TraceQL subset
//!
//! # Example
//!
//! ```
//! use tracelens::{traceql, Filter};
//!
//! let query = r#"{ resource.service.name = "frontend" && span.http.method="GET" }"#;
//! let filter = traceql::decode(query)?;
//! assert_eq!(filter.service_name, vec!["frontend"]);
//! assert_eq!(traceql::encode(&filter), query);
//! # Ok::<(), tracelens::TracelensError>(())
//! ```

mod decode;
mod encode;
pub mod lexer;
pub mod syntax;

pub use decode::{decode, Matcher, MatcherIndex};
pub use encode::encode;

use crate::domain::filter::{Filter, FilterField};

/// Returns `true` if the toolbar can represent `query` without loss.
///
/// A query is simple when it parses and encoding its decoded filter gives back
/// exactly the same text. Anything else (other operators, other nesting,
/// different spacing) has to be edited as raw TraceQL.
///
/// ```
/// use tracelens::traceql::is_simple_query;
///
/// assert!(is_simple_query(r#"{ name = "GET /" && status = error }"#));
/// assert!(!is_simple_query(r#"{ name != "GET /" }"#));
/// assert!(!is_simple_query("{ status = error"));
/// ```
#[must_use]
pub fn is_simple_query(query: &str) -> bool {
    decode(query).is_ok_and(|filter| encode(&filter) == query)
}

/// Encodes `filter` with `field` cleared.
///
/// This is the query used to look up the candidate values of `field`: the
/// values offered for it should respect every other active constraint, but
/// not the field's own current selection.
#[must_use]
pub fn scope_query(filter: &Filter, field: FilterField) -> String {
    encode(&filter.without(field))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::filter::DurationField;

    #[test]
    fn test_simple_query_accepts_canonical_text() {
        assert!(is_simple_query("{}"));
        assert!(is_simple_query(
            r#"{ resource.service.name =~ "a|b" && (status = ok || status = unset) && duration >= 1s }"#
        ));
    }

    #[test]
    fn test_simple_query_accepts_hyphenated_custom_matcher() {
        assert!(is_simple_query(
            r#"{ resource.service.name = "frontend" && span.x-request-id="abc" }"#
        ));
    }

    #[test]
    fn test_simple_query_rejects_non_canonical_spacing() {
        assert!(!is_simple_query(r#"{name="GET"}"#));
    }

    #[test]
    fn test_simple_query_rejects_blank_input() {
        assert!(!is_simple_query(""));
    }

    #[test]
    fn test_simple_query_rejects_spanset_operators() {
        assert!(!is_simple_query(r#"{ name = "a" } >> { name = "b" }"#));
    }

    #[test]
    fn test_scope_query_drops_only_the_scoped_field() {
        let filter = Filter {
            service_name: vec!["frontend".to_string()],
            status: vec!["error".to_string()],
            span_duration: DurationField::at_least("10ms"),
            ..Filter::default()
        };

        assert_eq!(
            scope_query(&filter, FilterField::ServiceName),
            "{ status = error && duration >= 10ms }"
        );
        assert_eq!(
            scope_query(&filter, FilterField::SpanDuration),
            r#"{ resource.service.name = "frontend" && status = error }"#
        );
    }

    #[test]
    fn test_scope_query_of_single_field_filter_is_empty() {
        let filter = Filter {
            namespace: vec!["shop".to_string()],
            ..Filter::default()
        };
        assert_eq!(scope_query(&filter, FilterField::Namespace), "{}");
    }
}
