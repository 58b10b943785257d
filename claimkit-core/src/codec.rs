//! Timestamp codec for the transport form of claims.
//!
//! The transport format (JSON) has no temporal type, so timestamps travel as
//! ISO-8601 UTC strings (`YYYY-MM-DDTHH:MM:SS[.fff...]Z`). After generic
//! deserialization every string matching that shape is revived into a
//! [`DateTime<Utc>`], recursively through arrays and objects.

use std::collections::BTreeMap;
use std::sync::OnceLock;

use chrono::{DateTime, Datelike, SecondsFormat, Utc};
use regex::Regex;
use serde_json::Value;

use crate::claim::ClaimValue;

const ISO_UTC_PATTERN: &str = r"^(\d{4})-(\d{2})-(\d{2})T(\d{2}):(\d{2}):(\d{2}(?:\.\d*)?)Z$";

fn iso_utc() -> &'static Regex {
    static ISO_UTC: OnceLock<Regex> = OnceLock::new();
    ISO_UTC.get_or_init(|| Regex::new(ISO_UTC_PATTERN).expect("pattern is a valid regex"))
}

/// Returns `true` if `s` has the ISO-8601 UTC shape used on the wire.
#[must_use]
pub fn is_iso_utc(s: &str) -> bool {
    iso_utc().is_match(s)
}

/// Parses an ISO-8601 UTC string into a timestamp.
///
/// Returns `None` when the string does not have the wire shape or does not
/// denote a real instant (e.g. month 13).
#[must_use]
pub fn parse_timestamp(s: &str) -> Option<DateTime<Utc>> {
    if !is_iso_utc(s) {
        return None;
    }
    DateTime::parse_from_rfc3339(s)
        .ok()
        .map(|t| t.with_timezone(&Utc))
}

/// Formats a timestamp for the wire, keeping full sub-second precision.
#[must_use]
pub fn format_timestamp(t: &DateTime<Utc>) -> String {
    t.to_rfc3339_opts(SecondsFormat::AutoSi, true)
}

/// Returns `true` if `t` can be written in the wire shape, i.e. its year has
/// four digits (0000 through 9999).
#[must_use]
pub fn is_encodable(t: &DateTime<Utc>) -> bool {
    (0..=9999).contains(&t.year())
}

/// Converts a generic JSON value into a claim value, reviving timestamps.
#[must_use]
pub fn revive(value: Value) -> ClaimValue {
    match value {
        Value::Null => ClaimValue::Null,
        Value::Bool(b) => ClaimValue::Bool(b),
        Value::Number(n) => ClaimValue::Number(n),
        Value::String(s) => revive_string(s),
        Value::Array(items) => ClaimValue::List(items.into_iter().map(revive).collect()),
        Value::Object(map) => ClaimValue::Map(
            map.into_iter()
                .map(|(k, v)| (k, revive(v)))
                .collect::<BTreeMap<_, _>>(),
        ),
    }
}

/// Revives a single string: a timestamp if it has the wire shape, text otherwise.
#[must_use]
pub fn revive_string(s: String) -> ClaimValue {
    parse_timestamp(&s).map_or(ClaimValue::Text(s), ClaimValue::Timestamp)
}

/// Brings a claim value into its revived form: timestamp-shaped text becomes
/// a timestamp, recursively through lists and maps.
#[must_use]
pub fn normalize(value: ClaimValue) -> ClaimValue {
    match value {
        ClaimValue::Text(s) => revive_string(s),
        ClaimValue::List(items) => ClaimValue::List(items.into_iter().map(normalize).collect()),
        ClaimValue::Map(map) => ClaimValue::Map(map.into_iter().map(|(k, v)| (k, normalize(v))).collect()),
        other => other,
    }
}

/// Flattens a claim value back into generic JSON.
#[must_use]
pub fn flatten(value: ClaimValue) -> Value {
    match value {
        ClaimValue::Null => Value::Null,
        ClaimValue::Bool(b) => Value::Bool(b),
        ClaimValue::Number(n) => Value::Number(n),
        ClaimValue::Text(s) => Value::String(s),
        ClaimValue::Timestamp(t) => Value::String(format_timestamp(&t)),
        ClaimValue::List(items) => Value::Array(items.into_iter().map(flatten).collect()),
        ClaimValue::Map(map) => Value::Object(map.into_iter().map(|(k, v)| (k, flatten(v))).collect()),
    }
}

/// `serde(with = ...)` adapter for top-level claim timestamps.
pub mod timestamp {
    use chrono::{DateTime, Utc};
    use serde::{de::Error as _, Deserialize, Deserializer, Serializer};

    /// Serializes a timestamp as an ISO-8601 UTC string.
    ///
    /// # Errors
    ///
    /// Propagates serializer errors.
    #[allow(clippy::trivially_copy_pass_by_ref)]
    pub fn serialize<S: Serializer>(t: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&super::format_timestamp(t))
    }

    /// Deserializes a timestamp from an ISO-8601 UTC string.
    ///
    /// # Errors
    ///
    /// Fails if the value is not a string in the wire shape.
    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<DateTime<Utc>, D::Error> {
        let s = String::deserialize(deserializer)?;
        super::parse_timestamp(&s)
            .ok_or_else(|| D::Error::custom(format!("`{s}` is not an ISO-8601 UTC timestamp")))
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;
    use serde_json::json;
    use test_case::test_case;

    use super::*;

    #[test_case("2019-05-01T12:30:00Z", true ; "whole seconds")]
    #[test_case("2019-05-01T12:30:00.123Z", true ; "millis")]
    #[test_case("2019-05-01T12:30:00.123456789Z", true ; "nanos")]
    #[test_case("2019-05-01T12:30:00+02:00", false ; "offset instead of z")]
    #[test_case("2019-05-01 12:30:00Z", false ; "space separator")]
    #[test_case("19-05-01T12:30:00Z", false ; "short year")]
    #[test_case("prefix 2019-05-01T12:30:00Z", false ; "not anchored")]
    fn test_iso_utc_shape(input: &str, expected: bool) {
        assert_eq!(is_iso_utc(input), expected);
    }

    #[test]
    fn test_shape_without_real_instant_stays_text() {
        assert!(is_iso_utc("2019-13-01T12:30:00Z"));
        assert!(parse_timestamp("2019-13-01T12:30:00Z").is_none());
        assert_eq!(
            revive_string("2019-13-01T12:30:00Z".to_string()),
            ClaimValue::Text("2019-13-01T12:30:00Z".to_string())
        );
    }

    #[test]
    fn test_format_keeps_precision() {
        let t = Utc.timestamp_opt(1_556_713_800, 123_456_789).unwrap();
        let s = format_timestamp(&t);
        assert_eq!(s, "2019-05-01T12:30:00.123456789Z");
        assert_eq!(parse_timestamp(&s), Some(t));

        let whole = Utc.timestamp_opt(1_556_713_800, 0).unwrap();
        assert_eq!(format_timestamp(&whole), "2019-05-01T12:30:00Z");
    }

    #[test]
    fn test_revive_is_recursive() {
        let value = json!({
            "name": "Alice",
            "issued": "2020-01-02T03:04:05.600Z",
            "history": [
                { "at": "2018-01-01T00:00:00Z", "score": 7 },
                "2017-06-30T23:59:59Z"
            ]
        });

        let ClaimValue::Map(map) = revive(value) else {
            panic!("expected a map");
        };
        assert_eq!(map["name"], ClaimValue::Text("Alice".to_string()));
        assert!(matches!(map["issued"], ClaimValue::Timestamp(_)));

        let ClaimValue::List(history) = &map["history"] else {
            panic!("expected a list");
        };
        let ClaimValue::Map(first) = &history[0] else {
            panic!("expected a nested map");
        };
        assert!(matches!(first["at"], ClaimValue::Timestamp(_)));
        assert_eq!(first["score"], ClaimValue::Number(serde_json::Number::from(7u64)));
        assert!(matches!(history[1], ClaimValue::Timestamp(_)));
    }

    #[test]
    fn test_normalize_revives_text_built_directly() {
        let value = ClaimValue::List(vec![
            ClaimValue::Text("2019-05-01T12:30:00Z".to_string()),
            ClaimValue::Map(BTreeMap::from([(
                "at".to_string(),
                ClaimValue::Text("2020-01-02T03:04:05.6Z".to_string()),
            )])),
            ClaimValue::Text("plain".to_string()),
        ]);
        let normalized = normalize(value.clone());
        assert_eq!(normalized, revive(flatten(value)));

        let ClaimValue::List(items) = normalized else {
            panic!("expected a list");
        };
        assert!(matches!(items[0], ClaimValue::Timestamp(_)));
        assert_eq!(items[2], ClaimValue::Text("plain".to_string()));
    }

    #[test_case(0, true ; "year zero")]
    #[test_case(9999, true ; "last four digit year")]
    #[test_case(10_000, false ; "five digit year")]
    #[test_case(-1, false ; "negative year")]
    fn test_is_encodable(year: i32, expected: bool) {
        let t = Utc.with_ymd_and_hms(year, 1, 1, 0, 0, 0).unwrap();
        assert_eq!(is_encodable(&t), expected);
        if expected {
            assert_eq!(parse_timestamp(&format_timestamp(&t)), Some(t));
        }
    }

    #[test]
    fn test_flatten_then_revive_is_identity() {
        let value = json!({
            "flag": true,
            "nothing": null,
            "ratio": 0.25,
            "when": "2021-09-09T09:09:09.009Z",
            "tags": ["a", "b"]
        });
        let revived = revive(value);
        assert_eq!(revive(flatten(revived.clone())), revived);
    }
}
