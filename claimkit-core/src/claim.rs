//! The claim value model.
//!
//! A [`Claim`] is an attested fact about a DID, minted by an issuer with a
//! validity window. Claims are immutable once constructed; accounts only add
//! and look them up.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::codec;
use crate::error::{ClaimKitError, ClaimKitResult};

/// A single attribute value inside a claim.
///
/// Timestamps are a first-class variant. On the wire they are ISO-8601 UTC
/// strings; any string of that shape is read back as [`ClaimValue::Timestamp`],
/// and constructing a value from such a string yields the same variant, so the
/// in-memory and revived forms always agree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "serde_json::Value", into = "serde_json::Value")]
pub enum ClaimValue {
    /// JSON `null`.
    Null,
    /// A boolean.
    Bool(bool),
    /// A number, kept in its JSON representation.
    Number(serde_json::Number),
    /// Free text that is not timestamp-shaped.
    Text(String),
    /// A point in time, UTC.
    Timestamp(DateTime<Utc>),
    /// An ordered list of values.
    List(Vec<ClaimValue>),
    /// A nested object.
    Map(BTreeMap<String, ClaimValue>),
}

impl ClaimValue {
    /// Returns the text if this is a [`ClaimValue::Text`].
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Returns the timestamp if this is a [`ClaimValue::Timestamp`].
    #[must_use]
    pub const fn as_timestamp(&self) -> Option<&DateTime<Utc>> {
        match self {
            Self::Timestamp(t) => Some(t),
            _ => None,
        }
    }

    fn find_unencodable(&self) -> Option<&DateTime<Utc>> {
        match self {
            Self::Timestamp(t) => (!codec::is_encodable(t)).then_some(t),
            Self::List(items) => items.iter().find_map(Self::find_unencodable),
            Self::Map(map) => map.values().find_map(Self::find_unencodable),
            _ => None,
        }
    }
}

impl From<serde_json::Value> for ClaimValue {
    fn from(value: serde_json::Value) -> Self {
        codec::revive(value)
    }
}

impl From<ClaimValue> for serde_json::Value {
    fn from(value: ClaimValue) -> Self {
        codec::flatten(value)
    }
}

impl From<String> for ClaimValue {
    fn from(value: String) -> Self {
        codec::revive_string(value)
    }
}

impl From<&str> for ClaimValue {
    fn from(value: &str) -> Self {
        codec::revive_string(value.to_string())
    }
}

impl From<bool> for ClaimValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<i64> for ClaimValue {
    fn from(value: i64) -> Self {
        Self::Number(value.into())
    }
}

impl From<u64> for ClaimValue {
    fn from(value: u64) -> Self {
        Self::Number(value.into())
    }
}

impl From<f64> for ClaimValue {
    /// Non-finite floats have no JSON representation and become [`ClaimValue::Null`].
    fn from(value: f64) -> Self {
        serde_json::Number::from_f64(value).map_or(Self::Null, Self::Number)
    }
}

impl From<DateTime<Utc>> for ClaimValue {
    fn from(value: DateTime<Utc>) -> Self {
        Self::Timestamp(value)
    }
}

/// An attested fact bound to an owner DID.
///
/// Equality is structural, including the validity window at full precision.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Claim {
    id: String,
    schema_name: String,
    #[serde(default)]
    attributes: BTreeMap<String, ClaimValue>,
    #[serde(rename = "ownerDID")]
    owner_did: String,
    #[serde(rename = "issuerDID")]
    issuer_did: String,
    #[serde(with = "codec::timestamp")]
    valid_from: DateTime<Utc>,
    #[serde(with = "codec::timestamp")]
    valid_until: DateTime<Utc>,
}

impl Claim {
    /// Creates a claim.
    ///
    /// Attribute values are normalized the way they read back from the wire,
    /// so timestamp-shaped [`ClaimValue::Text`] becomes a timestamp. All other
    /// fields are copied verbatim. The id is expected to be non-empty;
    /// accounts reject claims without one.
    #[must_use]
    pub fn new(
        id: impl Into<String>,
        schema_name: impl Into<String>,
        attributes: BTreeMap<String, ClaimValue>,
        owner_did: impl Into<String>,
        issuer_did: impl Into<String>,
        valid_from: DateTime<Utc>,
        valid_until: DateTime<Utc>,
    ) -> Self {
        Self {
            id: id.into(),
            schema_name: schema_name.into(),
            attributes: attributes
                .into_iter()
                .map(|(name, value)| (name, codec::normalize(value)))
                .collect(),
            owner_did: owner_did.into(),
            issuer_did: issuer_did.into(),
            valid_from,
            valid_until,
        }
    }

    /// Identifier assigned by the issuer, unique within an account.
    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Name of the schema the claim was issued under.
    #[must_use]
    pub fn schema_name(&self) -> &str {
        &self.schema_name
    }

    /// All attributes of the claim.
    #[must_use]
    pub const fn attributes(&self) -> &BTreeMap<String, ClaimValue> {
        &self.attributes
    }

    /// A single attribute by name.
    #[must_use]
    pub fn attribute(&self, name: &str) -> Option<&ClaimValue> {
        self.attributes.get(name)
    }

    /// DID of the identity this claim is about.
    #[must_use]
    pub fn owner_did(&self) -> &str {
        &self.owner_did
    }

    /// DID of the issuer that attested the claim.
    #[must_use]
    pub fn issuer_did(&self) -> &str {
        &self.issuer_did
    }

    /// Start of the validity window.
    #[must_use]
    pub const fn valid_from(&self) -> DateTime<Utc> {
        self.valid_from
    }

    /// End of the validity window.
    #[must_use]
    pub const fn valid_until(&self) -> DateTime<Utc> {
        self.valid_until
    }

    /// Whether `valid_from <= valid_until`.
    #[must_use]
    pub fn has_valid_window(&self) -> bool {
        self.valid_from <= self.valid_until
    }

    /// Checks that every timestamp in the claim, attributes included, can be
    /// written in the wire shape.
    ///
    /// # Errors
    ///
    /// Returns [`ClaimKitError::InvalidClaim`] naming the first timestamp
    /// whose year falls outside 0000 through 9999.
    pub fn ensure_encodable(&self) -> ClaimKitResult<()> {
        let unencodable = [&self.valid_from, &self.valid_until]
            .into_iter()
            .find(|t| !codec::is_encodable(t))
            .or_else(|| self.attributes.values().find_map(ClaimValue::find_unencodable));
        match unencodable {
            Some(t) => Err(ClaimKitError::InvalidClaim(format!(
                "claim `{}` holds {t}, outside the four-digit year range",
                self.id
            ))),
            None => Ok(()),
        }
    }

    /// Whether `at` falls inside the validity window (inclusive on both ends).
    ///
    /// This is a local check only; ledger-side revocation is not observed here.
    #[must_use]
    pub fn is_valid_at(&self, at: DateTime<Utc>) -> bool {
        self.valid_from <= at && at <= self.valid_until
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, TimeZone};
    use serde_json::json;

    use super::*;

    fn sample() -> Claim {
        let from = Utc.timestamp_opt(1_600_000_000, 250_000_000).unwrap();
        let mut attributes = BTreeMap::new();
        attributes.insert("name".to_string(), ClaimValue::from("Alice"));
        attributes.insert("age".to_string(), ClaimValue::from(31_u64));
        attributes.insert("born".to_string(), ClaimValue::from("1989-04-02T00:00:00Z"));
        Claim::new(
            "C1",
            "Passport",
            attributes,
            "did:claim:test:owner",
            "did:claim:test:issuer",
            from,
            from + Duration::days(365),
        )
    }

    #[test]
    fn test_timestamp_shaped_text_becomes_timestamp() {
        assert!(matches!(
            ClaimValue::from("1989-04-02T00:00:00Z"),
            ClaimValue::Timestamp(_)
        ));
        assert_eq!(
            ClaimValue::from("not a date"),
            ClaimValue::Text("not a date".to_string())
        );
        assert_eq!(ClaimValue::from(f64::NAN), ClaimValue::Null);
    }

    #[test]
    fn test_json_shape() {
        let claim = sample();
        let value = serde_json::to_value(&claim).unwrap();
        assert_eq!(value["ownerDID"], json!("did:claim:test:owner"));
        assert_eq!(value["issuerDID"], json!("did:claim:test:issuer"));
        assert_eq!(value["schemaName"], json!("Passport"));
        assert_eq!(value["validFrom"], json!("2020-09-13T12:26:40.250Z"));
        assert_eq!(value["attributes"]["born"], json!("1989-04-02T00:00:00Z"));
    }

    #[test]
    fn test_json_round_trip_preserves_equality() {
        let claim = sample();
        let json = serde_json::to_string(&claim).unwrap();
        let decoded: Claim = serde_json::from_str(&json).unwrap();
        assert_eq!(decoded, claim);
        assert_eq!(decoded.valid_from(), claim.valid_from());
    }

    #[test]
    fn test_rejects_non_iso_validity() {
        let mut value = serde_json::to_value(sample()).unwrap();
        value["validFrom"] = json!("yesterday");
        assert!(serde_json::from_value::<Claim>(value).is_err());
    }

    #[test]
    fn test_validity_window() {
        let claim = sample();
        assert!(claim.has_valid_window());
        assert!(claim.is_valid_at(claim.valid_from()));
        assert!(claim.is_valid_at(claim.valid_until()));
        assert!(!claim.is_valid_at(claim.valid_until() + Duration::seconds(1)));
        assert_eq!(
            claim.attribute("name").and_then(ClaimValue::as_str),
            Some("Alice")
        );
    }

    #[test]
    fn test_new_normalizes_text_built_directly() {
        let attributes = BTreeMap::from([
            (
                "born".to_string(),
                ClaimValue::Text("2019-05-01T12:30:00Z".to_string()),
            ),
            (
                "history".to_string(),
                ClaimValue::List(vec![ClaimValue::Text("2001-01-01T00:00:00Z".to_string())]),
            ),
        ]);
        let from = Utc.timestamp_opt(1_600_000_000, 0).unwrap();
        let claim = Claim::new("C1", "Passport", attributes, "did:o", "did:i", from, from);

        assert_eq!(
            claim.attribute("born"),
            Some(&ClaimValue::Timestamp(Utc.with_ymd_and_hms(2019, 5, 1, 12, 30, 0).unwrap()))
        );
        let json = serde_json::to_string(&claim).unwrap();
        assert_eq!(serde_json::from_str::<Claim>(&json).unwrap(), claim);
    }

    #[test]
    fn test_ensure_encodable() {
        assert!(sample().ensure_encodable().is_ok());

        let from = Utc.timestamp_opt(1_600_000_000, 0).unwrap();
        let forever = Utc.with_ymd_and_hms(10_000, 1, 1, 0, 0, 0).unwrap();
        let claim = Claim::new("C1", "Passport", BTreeMap::new(), "did:o", "did:i", from, forever);
        assert!(matches!(
            claim.ensure_encodable(),
            Err(ClaimKitError::InvalidClaim(_))
        ));

        let nested = BTreeMap::from([(
            "events".to_string(),
            ClaimValue::Map(BTreeMap::from([(
                "ancient".to_string(),
                ClaimValue::List(vec![ClaimValue::from(
                    Utc.with_ymd_and_hms(-44, 3, 15, 0, 0, 0).unwrap(),
                )]),
            )])),
        )]);
        let claim = Claim::new("C2", "Passport", nested, "did:o", "did:i", from, from);
        assert!(matches!(
            claim.ensure_encodable(),
            Err(ClaimKitError::InvalidClaim(_))
        ));
    }
}
