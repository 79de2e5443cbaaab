//! Flattened attribute maps.

use crate::otlp::{AnyValue, KeyValue};
use serde::ser::{SerializeMap, Serializer};
use serde::Serialize;

/// A plain attribute value.
///
/// Integers that do not fit an exact `i64` (or do not parse at all) are
/// represented as [`AttributeValue::Double`]; a `NaN` double serializes as
/// `null`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum AttributeValue {
    String(String),
    Int(i64),
    Double(f64),
    Bool(bool),
    /// Unknown elements are kept in place and serialize as `null`.
    Array(Vec<Option<AttributeValue>>),
}

impl AttributeValue {
    /// Converts an OTLP value. Returns `None` for values of unknown type.
    #[must_use]
    pub fn from_any(value: &AnyValue) -> Option<Self> {
        match value {
            AnyValue::String(s) => Some(Self::String(s.clone())),
            AnyValue::Int(s) => Some(number(parse_int_prefix(s))),
            AnyValue::Double(d) => Some(Self::Double(*d)),
            AnyValue::Bool(b) => Some(Self::Bool(*b)),
            AnyValue::Array(values) => Some(Self::Array(values.iter().map(Self::from_any).collect())),
            AnyValue::Unknown => None,
        }
    }

    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }
}

/// Largest integer magnitude an `f64` represents exactly.
const MAX_SAFE_INTEGER: f64 = 9_007_199_254_740_991.0;

#[allow(clippy::cast_possible_truncation)]
fn number(value: f64) -> AttributeValue {
    if value.fract() == 0.0 && value.abs() <= MAX_SAFE_INTEGER {
        AttributeValue::Int(value as i64)
    } else {
        AttributeValue::Double(value)
    }
}

/// Parses the leading integer of `input` the way a lenient decimal parser
/// does: surrounding whitespace is skipped, an optional sign and `0x` prefix
/// are accepted, and parsing stops at the first character that is not a digit.
/// Returns `NaN` when there are no digits.
///
/// ```
/// use tracelens::transform::parse_int_prefix;
///
/// assert_eq!(parse_int_prefix("1500000"), 1_500_000.0);
/// assert_eq!(parse_int_prefix(" 12abc"), 12.0);
/// assert!(parse_int_prefix("abc").is_nan());
/// ```
#[must_use]
pub fn parse_int_prefix(input: &str) -> f64 {
    let trimmed = input.trim_start();
    let (negative, unsigned) = match trimmed.as_bytes().first() {
        Some(b'-') => (true, &trimmed[1..]),
        Some(b'+') => (false, &trimmed[1..]),
        _ => (false, trimmed),
    };

    let (radix, digits) = match unsigned.get(..2) {
        Some("0x" | "0X") => (16, &unsigned[2..]),
        _ => (10, unsigned),
    };

    let end = digits
        .find(|c: char| !c.is_digit(radix))
        .unwrap_or(digits.len());
    if end == 0 {
        return f64::NAN;
    }

    let digits = &digits[..end];
    let magnitude = if radix == 10 {
        digits.parse::<f64>().unwrap_or(f64::NAN)
    } else {
        digits
            .chars()
            .filter_map(|c| c.to_digit(radix))
            .fold(0.0_f64, |acc, d| acc.mul_add(f64::from(radix), f64::from(d)))
    };

    if negative {
        -magnitude
    } else {
        magnitude
    }
}

/// Attribute map flattened from an OTLP key/value list.
///
/// Keys keep the position of their first occurrence; a repeated key takes the
/// value of its last occurrence. Keys whose value has an unknown type are kept
/// for ordering but left out when serialized.
///
/// Serializes as a JSON object.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Attributes(Vec<(String, Option<AttributeValue>)>);

impl Attributes {
    /// Sets `key`, replacing any earlier value.
    pub fn insert(&mut self, key: impl Into<String>, value: Option<AttributeValue>) {
        let key = key.into();
        match self.0.iter_mut().find(|(k, _)| *k == key) {
            Some((_, slot)) => *slot = value,
            None => self.0.push((key, value)),
        }
    }

    #[must_use]
    pub fn get(&self, key: &str) -> Option<&AttributeValue> {
        self.0
            .iter()
            .find(|(k, _)| k == key)
            .and_then(|(_, value)| value.as_ref())
    }

    /// Iterates over the keys with a known value, in order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &AttributeValue)> {
        self.0
            .iter()
            .filter_map(|(key, value)| value.as_ref().map(|v| (key.as_str(), v)))
    }

    /// Number of keys with a known value.
    #[must_use]
    pub fn len(&self) -> usize {
        self.iter().count()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<'a> FromIterator<&'a KeyValue> for Attributes {
    fn from_iter<I: IntoIterator<Item = &'a KeyValue>>(iter: I) -> Self {
        let mut attributes = Self::default();
        for kv in iter {
            attributes.insert(kv.key.as_str(), AttributeValue::from_any(&kv.value));
        }
        attributes
    }
}

impl Serialize for Attributes {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.len()))?;
        for (key, value) in self.iter() {
            map.serialize_entry(key, value)?;
        }
        map.end()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn kv(key: &str, value: AnyValue) -> KeyValue {
        KeyValue::new(key, value)
    }

    #[test]
    fn test_int_value_becomes_number() {
        let attributes: Attributes = [kv("count", AnyValue::Int("42".to_string()))].iter().collect();
        assert_eq!(serde_json::to_value(&attributes).unwrap(), json!({"count": 42}));
    }

    #[test]
    fn test_unknown_value_is_omitted() {
        let attributes: Attributes = [
            kv("count", AnyValue::from(42_i64)),
            kv("blob", AnyValue::Unknown),
        ]
        .iter()
        .collect();
        assert_eq!(serde_json::to_value(&attributes).unwrap(), json!({"count": 42}));
        assert_eq!(attributes.len(), 1);
    }

    #[test]
    fn test_last_duplicate_wins_in_first_position() {
        let attributes: Attributes = [
            kv("a", AnyValue::from("first")),
            kv("b", AnyValue::from(true)),
            kv("a", AnyValue::from("second")),
        ]
        .iter()
        .collect();

        let keys: Vec<&str> = attributes.iter().map(|(k, _)| k).collect();
        assert_eq!(keys, vec!["a", "b"]);
        assert_eq!(attributes.get("a"), Some(&AttributeValue::String("second".to_string())));
    }

    #[test]
    fn test_duplicate_with_unknown_value_removes_key() {
        let attributes: Attributes = [kv("a", AnyValue::from("x")), kv("a", AnyValue::Unknown)]
            .iter()
            .collect();
        assert!(attributes.is_empty());
    }

    #[test]
    fn test_array_keeps_unknown_elements_as_null() {
        let attributes: Attributes = [kv(
            "list",
            AnyValue::Array(vec![AnyValue::from("a"), AnyValue::Unknown, AnyValue::from(1.5)]),
        )]
        .iter()
        .collect();
        assert_eq!(
            serde_json::to_value(&attributes).unwrap(),
            json!({"list": ["a", null, 1.5]})
        );
    }

    #[test]
    fn test_unparsable_int_serializes_as_null() {
        let attributes: Attributes = [kv("n", AnyValue::Int("oops".to_string()))].iter().collect();
        assert_eq!(serde_json::to_value(&attributes).unwrap(), json!({"n": null}));
    }

    #[test]
    fn test_parse_int_prefix() {
        assert_eq!(parse_int_prefix("42"), 42.0);
        assert_eq!(parse_int_prefix("-7"), -7.0);
        assert_eq!(parse_int_prefix("+3"), 3.0);
        assert_eq!(parse_int_prefix("  10ms"), 10.0);
        assert_eq!(parse_int_prefix("0x1f"), 31.0);
        assert_eq!(parse_int_prefix("1.9"), 1.0);
        assert!(parse_int_prefix("").is_nan());
        assert!(parse_int_prefix("-").is_nan());
        assert!(parse_int_prefix("x1").is_nan());
    }

    #[test]
    fn test_large_int_stays_exact_up_to_safe_range() {
        assert_eq!(
            AttributeValue::from_any(&AnyValue::Int("9007199254740991".to_string())),
            Some(AttributeValue::Int(9_007_199_254_740_991))
        );
        assert!(matches!(
            AttributeValue::from_any(&AnyValue::Int("18446744073709551615".to_string())),
            Some(AttributeValue::Double(_))
        ));
    }
}
