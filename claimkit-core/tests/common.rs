//! Common test utilities shared across integration tests.

#![allow(dead_code)]

use std::collections::BTreeMap;

use chrono::{DateTime, Duration, TimeZone, Utc};
use claimkit_core::{Claim, ClaimValue, Issuer, KdfParams};

pub const ISSUER_DID: &str = "did:claim:test:issuer";

/// Minimum-cost KDF parameters so lifecycle tests stay fast.
pub fn fast_kdf() -> Option<KdfParams> {
    Some(KdfParams::new(8, 1, 1).expect("valid KDF parameters"))
}

/// A fixed instant with sub-second precision.
pub fn t0() -> DateTime<Utc> {
    Utc.timestamp_opt(1_700_000_000, 987_654_321)
        .single()
        .expect("valid timestamp")
}

/// A claim about `owner` with nested and temporal attributes.
pub fn sample_claim(id: &str, owner: &str) -> Claim {
    let from = t0();
    let until = from + Duration::days(90);
    let attributes = BTreeMap::from([
        ("name".to_string(), ClaimValue::from("Alice")),
        ("birthDate".to_string(), ClaimValue::from("1990-04-01T00:00:00Z")),
        ("verifiedAt".to_string(), ClaimValue::from(from)),
        (
            "address".to_string(),
            ClaimValue::from(serde_json::json!({
                "city": "Bern",
                "since": "2015-06-30T12:00:00.5Z",
                "history": ["2001-01-01T00:00:00Z", "old town"],
            })),
        ),
        ("score".to_string(), ClaimValue::from(0.75)),
    ]);
    Issuer::new(ISSUER_DID)
        .create_claim(id, "Passport", attributes, owner, from, until)
        .expect("valid claim")
}
