//! Identity and key-management primitive.
//!
//! Accounts do not manage key material themselves. They compose with a value
//! implementing [`IdentityPrimitive`], which owns the key pair, derives the
//! account address, and locks or unlocks its private key under a passphrase.
//! The account only relies on the success or failure of those operations.
//!
//! [`LocalIdentity`] is the bundled Ed25519 implementation.

mod local;

pub use local::LocalIdentity;

use secrecy::SecretString;
use serde::{Deserialize, Serialize};

use crate::crypto::KdfParams;
use crate::error::ClaimKitResult;

/// Key fields of a persisted account record.
///
/// `key` holds the passphrase-locked private key. Records never carry a
/// plaintext private key; a record without `key` describes a watch-only
/// identity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KeyRecord {
    /// Address derived from the public key.
    pub address: String,
    /// Sealed private key, if the identity has one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,
}

/// Contract of the external identity/key-management collaborator.
///
/// Implementations are cloned into a blocking worker while a passphrase is
/// being stretched, so they must be cheap enough to clone and `'static`.
pub trait IdentityPrimitive: Clone + Send + Sync + 'static {
    /// Generates fresh key material.
    fn generate() -> Self;

    /// Reconstructs an identity from persisted key fields.
    ///
    /// # Errors
    ///
    /// Returns an error if the record is malformed.
    fn from_record(record: &KeyRecord) -> ClaimKitResult<Self>;

    /// The address identifying this key pair.
    fn derive_address(&self) -> String;

    /// Hex-encoded public key, if currently available.
    fn public_key(&self) -> Option<String>;

    /// Whether the private key exists only in locked form.
    fn is_locked(&self) -> bool;

    /// Locks the private key under `passphrase` and drops the plaintext copy.
    ///
    /// # Errors
    ///
    /// Returns an error if key derivation or sealing fails.
    fn encrypt(&mut self, passphrase: &SecretString, params: &KdfParams) -> ClaimKitResult<()>;

    /// Unlocks the private key with `passphrase`.
    ///
    /// # Errors
    ///
    /// Returns [`ClaimKitError::DecryptionFailure`](crate::ClaimKitError::DecryptionFailure)
    /// on a wrong passphrase.
    fn decrypt(&mut self, passphrase: &SecretString, params: Option<&KdfParams>) -> ClaimKitResult<()>;

    /// Persistable key fields. Only the locked form of the private key is emitted.
    ///
    /// # Errors
    ///
    /// Returns an error if the locked key cannot be encoded.
    fn to_record(&self) -> ClaimKitResult<KeyRecord>;
}
