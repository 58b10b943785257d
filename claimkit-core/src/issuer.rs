//! Issuer-side claim construction.
//!
//! Schema registration, claim injection and revocation live on the issuer's
//! ledger and are not part of this crate.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};

use crate::claim::{Claim, ClaimValue};
use crate::error::{ClaimKitError, ClaimKitResult};

/// Local claim factory bound to one issuer DID. It only mints the claim value
/// a holder stores.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Issuer {
    did: String,
}

impl Issuer {
    /// Creates a factory that stamps `did` as the issuer of every claim.
    #[must_use]
    pub fn new(did: impl Into<String>) -> Self {
        Self { did: did.into() }
    }

    /// The issuer DID.
    #[must_use]
    pub fn did(&self) -> &str {
        &self.did
    }

    /// Mints a claim about `owner_did`.
    ///
    /// # Errors
    ///
    /// Returns [`ClaimKitError::InvalidClaim`] if `id` is empty,
    /// `valid_from` is after `valid_until`, or a timestamp year falls outside
    /// 0000 through 9999.
    pub fn create_claim(
        &self,
        id: impl Into<String>,
        schema_name: impl Into<String>,
        attributes: BTreeMap<String, ClaimValue>,
        owner_did: impl Into<String>,
        valid_from: DateTime<Utc>,
        valid_until: DateTime<Utc>,
    ) -> ClaimKitResult<Claim> {
        let id = id.into();
        if id.is_empty() {
            return Err(ClaimKitError::InvalidClaim("claim has no id".to_string()));
        }
        if valid_from > valid_until {
            return Err(ClaimKitError::InvalidClaim(format!(
                "claim `{id}` is valid from {valid_from} until {valid_until}"
            )));
        }
        let claim = Claim::new(
            id,
            schema_name,
            attributes,
            owner_did,
            self.did.clone(),
            valid_from,
            valid_until,
        );
        claim.ensure_encodable()?;
        Ok(claim)
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, TimeZone};

    use super::*;

    #[test]
    fn test_create_claim_stamps_issuer() {
        let issuer = Issuer::new("did:claim:main:issuer");
        let now = Utc::now();
        let attributes = BTreeMap::from([("age".to_string(), ClaimValue::from(42_u64))]);

        let claim = issuer
            .create_claim("C1", "Age", attributes, "did:claim:main:abc", now, now + Duration::days(365))
            .unwrap();

        assert_eq!(claim.issuer_did(), "did:claim:main:issuer");
        assert_eq!(claim.owner_did(), "did:claim:main:abc");
        assert_eq!(claim.attribute("age"), Some(&ClaimValue::from(42_u64)));
        assert!(claim.is_valid_at(now));
    }

    #[test]
    fn test_create_claim_rejects_empty_id() {
        let issuer = Issuer::new("did:claim:main:issuer");
        let now = Utc::now();
        assert!(matches!(
            issuer.create_claim("", "Age", BTreeMap::new(), "did:claim:main:abc", now, now),
            Err(ClaimKitError::InvalidClaim(_))
        ));
    }

    #[test]
    fn test_create_claim_rejects_inverted_window() {
        let issuer = Issuer::new("did:claim:main:issuer");
        let now = Utc::now();
        assert!(matches!(
            issuer.create_claim(
                "C1",
                "Age",
                BTreeMap::new(),
                "did:claim:main:abc",
                now,
                now - Duration::seconds(1)
            ),
            Err(ClaimKitError::InvalidClaim(_))
        ));
    }

    #[test]
    fn test_create_claim_rejects_unencodable_timestamps() {
        let issuer = Issuer::new("did:claim:main:issuer");
        let now = Utc::now();
        let forever = Utc.with_ymd_and_hms(10_000, 1, 1, 0, 0, 0).unwrap();
        assert!(matches!(
            issuer.create_claim("C1", "Age", BTreeMap::new(), "did:claim:main:abc", now, forever),
            Err(ClaimKitError::InvalidClaim(_))
        ));

        let attributes = BTreeMap::from([("expires".to_string(), ClaimValue::from(forever))]);
        assert!(matches!(
            issuer.create_claim("C2", "Age", attributes, "did:claim:main:abc", now, now),
            Err(ClaimKitError::InvalidClaim(_))
        ));
    }
}
