//! Property tests for the Filter ⇄ TraceQL codec.

use proptest::collection::{btree_set, vec};
use proptest::option;
use proptest::prelude::*;
use proptest::sample::subsequence;
use tracelens::{traceql, DurationField, Filter, STATUS_VALUES};

/// String values without `|` (the alternation separator) or `\`.
fn string_values() -> impl Strategy<Value = Vec<String>> {
    vec(r#"[a-zA-Z0-9 _./:"-]{1,12}"#, 0..4)
}

fn duration_literal() -> impl Strategy<Value = String> {
    "[1-9][0-9]{0,3}(ns|us|ms|s|m|h)"
}

fn duration_field() -> impl Strategy<Value = DurationField> {
    (option::of(duration_literal()), option::of(duration_literal()))
        .prop_map(|(min, max)| DurationField { min, max })
}

fn matcher_value() -> impl Strategy<Value = String> {
    prop_oneof![
        "[0-9]{1,4}",
        "[a-z ]{0,8}".prop_map(|s| format!("\"{s}\"")),
        Just("true".to_string()),
    ]
}

/// Custom matchers on distinct span attributes, so decoding keeps their order.
fn custom_matchers() -> impl Strategy<Value = Vec<String>> {
    btree_set("[a-z][a-z_-]{0,8}", 0..4).prop_flat_map(|names| {
        let count = names.len();
        (
            Just(names),
            vec(
                (
                    prop_oneof![
                        Just("="),
                        Just("!="),
                        Just(">"),
                        Just(">="),
                        Just("<"),
                        Just("<=")
                    ],
                    matcher_value(),
                ),
                count,
            ),
        )
            .prop_map(|(names, matchers)| {
                names
                    .into_iter()
                    .zip(matchers)
                    .map(|(name, (op, value))| format!("span.{name}{op}{value}"))
                    .collect()
            })
    })
}

prop_compose! {
    fn canonical_filter()(
        service_name in string_values(),
        span_name in string_values(),
        namespace in string_values(),
        status in subsequence(STATUS_VALUES.to_vec(), 0..=3),
        span_duration in duration_field(),
        trace_duration in duration_field(),
        custom_matchers in custom_matchers(),
    ) -> Filter {
        Filter {
            service_name,
            span_name,
            namespace,
            status: status.into_iter().map(String::from).collect(),
            span_duration,
            trace_duration,
            custom_matchers,
        }
    }
}

proptest! {
    #[test]
    fn prop_decode_inverts_encode(filter in canonical_filter()) {
        let query = traceql::encode(&filter);
        let decoded = traceql::decode(&query);
        prop_assert!(decoded.is_ok(), "failed to decode {query:?}: {decoded:?}");
        prop_assert_eq!(decoded.unwrap(), filter);
    }

    #[test]
    fn prop_encoded_filters_are_simple_queries(filter in canonical_filter()) {
        let query = traceql::encode(&filter);
        prop_assert!(traceql::is_simple_query(&query), "not simple: {query:?}");
    }

    #[test]
    fn prop_decode_never_panics(query in r#"[{}()a-z.:"=~!<>&| 0-9]{0,40}"#) {
        let _ = traceql::decode(&query);
    }
}
