//! Error types for claim storage and wallet routing.

use thiserror::Error;

/// Result type for `ClaimKit` operations.
pub type ClaimKitResult<T> = Result<T, ClaimKitError>;

/// Errors raised by accounts, wallets and their persisted forms.
#[derive(Debug, Error)]
pub enum ClaimKitError {
    /// The claim has no identifier (or an otherwise unusable shape).
    #[error("invalid_claim: {0}")]
    InvalidClaim(String),

    /// A claim with the same identifier is already stored in the account.
    #[error("duplicate_claim: claim `{id}` already exists")]
    DuplicateClaim {
        /// Identifier of the colliding claim.
        id: String,
    },

    /// The account is locked and its claims cannot be read or mutated.
    #[error("locked_account: decrypt the account first")]
    LockedAccount,

    /// An account was added without a DID network.
    #[error("missing_did_network: add the account with an explicit DID network")]
    MissingDidNetwork,

    /// No account in the wallet is registered for the DID.
    #[error("unknown_did: `{did}` is not part of this wallet")]
    UnknownDid {
        /// The DID that could not be resolved.
        did: String,
    },

    /// Export was attempted before the claims were ever encrypted.
    #[error("not_encrypted: encrypt the account before exporting it")]
    NotEncrypted,

    /// Wrong passphrase or corrupted ciphertext.
    #[error("decryption_failure: {0}")]
    DecryptionFailure(String),

    /// The identity primitive rejected its key material.
    #[error("identity_error: {0}")]
    Identity(String),

    /// Serialization or deserialization of a record failed.
    #[error("serialization_error: {0}")]
    Serialization(String),

    /// Key derivation or cipher setup failed.
    #[error("crypto_error: {0}")]
    Crypto(String),

    /// A persisted envelope or record carries a version this build cannot read.
    #[error("unsupported_version: {0}")]
    UnsupportedVersion(String),

    /// The blocking key-derivation worker did not complete.
    #[error("task_error: {0}")]
    Task(String),
}

impl ClaimKitError {
    /// Creates a decryption failure with context.
    #[must_use]
    pub fn decryption<S: Into<String>>(context: S) -> Self {
        Self::DecryptionFailure(context.into())
    }

    /// Creates a serialization error.
    #[must_use]
    pub fn serialization<S: Into<String>>(message: S) -> Self {
        Self::Serialization(message.into())
    }
}

impl From<serde_json::Error> for ClaimKitError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}
