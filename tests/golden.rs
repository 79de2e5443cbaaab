//! Transforms the fixture trace and compares it with the expected output.

use std::path::PathBuf;

use tracelens::assist::{trace_name, TraceAttachment};
use tracelens::otlp::TracesData;
use tracelens::transform::{first_trace_id, transform};
use tracelens::{AssistConfig, TracelensError};

fn fixture(name: &str) -> String {
    let path = PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests/fixtures")
        .join(name);
    std::fs::read_to_string(&path).unwrap_or_else(|e| panic!("{}: {e}", path.display()))
}

fn fixture_trace() -> TracesData {
    serde_json::from_str(&fixture("trace.json")).unwrap()
}

#[test]
fn test_transform_matches_golden_fixture() {
    let transformed = transform(&fixture_trace()).unwrap();
    let expected: serde_json::Value = serde_json::from_str(&fixture("transformed.json")).unwrap();
    assert_eq!(serde_json::to_value(&transformed).unwrap(), expected);
}

#[test]
fn test_fixture_trace_name() {
    let trace = fixture_trace();
    assert_eq!(
        first_trace_id(&trace),
        Some("5b8efff798038103d269b633813fc60c")
    );
    assert_eq!(trace_name(&trace, "fallback"), "frontend: GET /cart");
}

#[test]
fn test_fixture_attachment() {
    let trace = fixture_trace();
    let attachment = TraceAttachment::build(&trace, &AssistConfig::default())
        .unwrap()
        .unwrap();
    assert_eq!(attachment.name, "frontend: GET /cart");
    assert_eq!(attachment.kind, "Trace");

    let value: serde_json::Value = serde_json::from_str(&attachment.value).unwrap();
    let expected: serde_json::Value = serde_json::from_str(&fixture("transformed.json")).unwrap();
    assert_eq!(value, expected);
}

#[test]
fn test_fixture_attachment_too_large() {
    let config = AssistConfig {
        max_attachment_bytes: 64,
        ..AssistConfig::default()
    };
    assert!(matches!(
        TraceAttachment::build(&fixture_trace(), &config),
        Err(TracelensError::AttachmentTooLarge { max: 64, .. })
    ));
}
