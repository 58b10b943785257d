//! Ed25519 identity with a base58check address.

use std::fmt;

use ed25519_dalek::{SigningKey, VerifyingKey, SECRET_KEY_LENGTH};
use rand::rngs::OsRng;
use secrecy::SecretString;
use sha2::{Digest, Sha256};
use zeroize::Zeroizing;

use super::{IdentityPrimitive, KeyRecord};
use crate::crypto::{KdfParams, SealedBox};
use crate::defaults::{ADDRESS_VERSION, LABEL_PRIVATE_KEY};
use crate::error::{ClaimKitError, ClaimKitResult};

/// An Ed25519 key pair whose private half may be locked under a passphrase.
///
/// The address is `base58(version || SHA256(public_key)[..20] || checksum)`
/// where the checksum is the first four bytes of a double SHA256 over the
/// preceding bytes.
#[derive(Clone)]
pub struct LocalIdentity {
    address: String,
    signing_key: Option<SigningKey>,
    sealed_key: Option<SealedBox>,
}

impl LocalIdentity {
    /// Wraps an existing signing key.
    #[must_use]
    pub fn from_signing_key(signing_key: SigningKey) -> Self {
        Self {
            address: address_from(&signing_key.verifying_key()),
            signing_key: Some(signing_key),
            sealed_key: None,
        }
    }

    /// An address-only identity with no private key.
    #[must_use]
    pub const fn watch_only(address: String) -> Self {
        Self {
            address,
            signing_key: None,
            sealed_key: None,
        }
    }
}

fn address_from(verifying_key: &VerifyingKey) -> String {
    let digest = Sha256::digest(verifying_key.as_bytes());
    let mut payload = Vec::with_capacity(1 + 20 + 4);
    payload.push(ADDRESS_VERSION);
    payload.extend_from_slice(&digest[..20]);
    let checksum = Sha256::digest(Sha256::digest(&payload));
    payload.extend_from_slice(&checksum[..4]);
    bs58::encode(payload).into_string()
}

impl IdentityPrimitive for LocalIdentity {
    fn generate() -> Self {
        Self::from_signing_key(SigningKey::generate(&mut OsRng))
    }

    fn from_record(record: &KeyRecord) -> ClaimKitResult<Self> {
        if record.address.is_empty() {
            return Err(ClaimKitError::Identity("record has no address".to_string()));
        }
        let sealed_key = record
            .key
            .as_deref()
            .map(SealedBox::decode)
            .transpose()
            .map_err(|err| ClaimKitError::Identity(format!("unreadable locked key: {err}")))?;
        Ok(Self {
            address: record.address.clone(),
            signing_key: None,
            sealed_key,
        })
    }

    fn derive_address(&self) -> String {
        self.signing_key
            .as_ref()
            .map_or_else(|| self.address.clone(), |key| address_from(&key.verifying_key()))
    }

    fn public_key(&self) -> Option<String> {
        self.signing_key
            .as_ref()
            .map(|key| hex::encode(key.verifying_key().as_bytes()))
    }

    fn is_locked(&self) -> bool {
        self.signing_key.is_none() && self.sealed_key.is_some()
    }

    fn encrypt(&mut self, passphrase: &SecretString, params: &KdfParams) -> ClaimKitResult<()> {
        let Some(signing_key) = self.signing_key.take() else {
            // Already locked, or watch-only.
            return Ok(());
        };
        let secret = Zeroizing::new(signing_key.to_bytes());
        match SealedBox::seal(
            passphrase,
            params,
            LABEL_PRIVATE_KEY,
            self.address.as_bytes(),
            secret.as_slice(),
        ) {
            Ok(sealed) => {
                self.sealed_key = Some(sealed);
                Ok(())
            }
            Err(err) => {
                self.signing_key = Some(signing_key);
                Err(err)
            }
        }
    }

    fn decrypt(&mut self, passphrase: &SecretString, params: Option<&KdfParams>) -> ClaimKitResult<()> {
        if self.signing_key.is_some() {
            return Ok(());
        }
        let Some(sealed) = &self.sealed_key else {
            return Ok(());
        };
        let plaintext = sealed.open(passphrase, params, LABEL_PRIVATE_KEY, self.address.as_bytes())?;
        let bytes: [u8; SECRET_KEY_LENGTH] = plaintext.as_slice().try_into().map_err(|_| {
            ClaimKitError::decryption(format!(
                "invalid private key length: expected {SECRET_KEY_LENGTH}, got {}",
                plaintext.len()
            ))
        })?;
        let bytes = Zeroizing::new(bytes);
        let signing_key = SigningKey::from_bytes(&bytes);
        if address_from(&signing_key.verifying_key()) != self.address {
            return Err(ClaimKitError::Identity(
                "unlocked private key does not match the address".to_string(),
            ));
        }
        self.signing_key = Some(signing_key);
        Ok(())
    }

    fn to_record(&self) -> ClaimKitResult<KeyRecord> {
        Ok(KeyRecord {
            address: self.address.clone(),
            key: self.sealed_key.as_ref().map(SealedBox::encode).transpose()?,
        })
    }
}

impl fmt::Debug for LocalIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LocalIdentity")
            .field("address", &self.address)
            .field("signing_key", &self.signing_key.as_ref().map(|_| "[REDACTED]"))
            .field("sealed_key", &self.sealed_key.is_some())
            .finish()
    }
}
